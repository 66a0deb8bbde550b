// Integration tests for Relief Map

use reliefmap::core::{extract_contours, parse_bbox, render_map, tiles_for_bbox};
use reliefmap::core::{decode_terrarium, parse_hex_color, ElevationMosaic, TileData, TILE_SIZE};
use reliefmap::models::TileCoord;
use reliefmap::services::{OverpassClient, TerrainClient};
use std::io::Cursor;

/// Build a synthetic tile whose elevation rises linearly with the row index
fn ramp_tile(coord: TileCoord) -> TileData {
    let n = TILE_SIZE as usize;
    let mut elevations = vec![0.0f32; n * n];
    for y in 0..n {
        for x in 0..n {
            elevations[y * n + x] = y as f32;
        }
    }
    TileData { coord, elevations }
}

/// Encode a Terrarium PNG where every pixel decodes to `elevation` meters
fn terrarium_png(elevation: f32) -> Vec<u8> {
    let packed = (elevation + 32768.0) as u32;
    let r = (packed / 256) as u8;
    let g = (packed % 256) as u8;
    let img = image::RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, image::Rgba([r, g, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_pipeline_tiles_to_png() {
    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let zoom = 10;

    let tiles: Vec<TileData> = tiles_for_bbox(&bbox, zoom)
        .into_iter()
        .map(ramp_tile)
        .collect();

    let mosaic = ElevationMosaic::build(&bbox, zoom, &tiles).unwrap();
    assert!(mosaic.width() > 1 && mosaic.height() > 1);

    // A ramp from 0 to 255 m crossed every 20 m produces many contours
    let contours = extract_contours(&mosaic, 20.0).unwrap();
    assert!(contours.line_count() > 0);

    // Every contour vertex lands near the bbox
    for level in &contours.levels {
        for line in &level.lines {
            for coord in &line.0 {
                assert!(coord.x >= bbox.min_lon - 0.01 && coord.x <= bbox.max_lon + 0.01);
                assert!(coord.y >= bbox.min_lat - 0.01 && coord.y <= bbox.max_lat + 0.01);
            }
        }
    }

    let png = render_map(
        &bbox,
        &contours,
        None,
        parse_hex_color("#f2efe9").unwrap(),
        800,
        600,
    )
    .unwrap();

    let img = image::load_from_memory(&png).unwrap();
    assert_eq!(img.width(), 800);
    assert_eq!(img.height(), 600);
}

#[tokio::test]
async fn test_terrain_client_fetches_and_decodes_tiles() {
    let mut server = mockito::Server::new_async().await;

    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let zoom = 9;
    let coords = tiles_for_bbox(&bbox, zoom);

    let body = terrarium_png(150.0);
    let mut mocks = Vec::new();
    for c in &coords {
        mocks.push(
            server
                .mock("GET", format!("/{}/{}/{}.png", c.zoom, c.x, c.y).as_str())
                .with_status(200)
                .with_header("content-type", "image/png")
                .with_body(body.clone())
                .create_async()
                .await,
        );
    }

    let client = TerrainClient::new(server.url(), 5).unwrap();
    let tiles = client.fetch_tiles(&bbox, zoom).await.unwrap();

    assert_eq!(tiles.len(), coords.len());
    for tile in &tiles {
        assert_eq!(tile.elevations.len(), (TILE_SIZE * TILE_SIZE) as usize);
        assert!((tile.elevations[0] - 150.0).abs() < 1.0);
    }

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_terrain_client_propagates_tile_errors() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", mockito::Matcher::Regex(r"^/\d+/\d+/\d+\.png$".to_string()))
        .with_status(404)
        .create_async()
        .await;

    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let client = TerrainClient::new(server.url(), 5).unwrap();

    let result = client.fetch_tiles(&bbox, 9).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_overpass_client_parses_ways() {
    let mut server = mockito::Server::new_async().await;

    let body = serde_json::json!({
        "elements": [
            {
                "type": "way",
                "id": 1,
                "geometry": [
                    {"lat": 43.65, "lon": 7.15},
                    {"lat": 43.66, "lon": 7.16},
                    {"lat": 43.67, "lon": 7.17}
                ]
            },
            {
                "type": "node",
                "id": 2
            },
            {
                "type": "way",
                "id": 3,
                "geometry": [
                    {"lat": 43.70, "lon": 7.20}
                ]
            }
        ]
    });

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let client = OverpassClient::new(server.url() + "/", 5).unwrap();

    let roads = client.fetch_roads(&bbox).await.unwrap();

    // The node and the single-point way are dropped
    assert_eq!(roads.len(), 1);
    assert_eq!(roads[0].0.len(), 3);
    assert!((roads[0].0[0].x - 7.15).abs() < 1e-9);
    assert!((roads[0].0[0].y - 43.65).abs() < 1e-9);
}

#[tokio::test]
async fn test_overpass_client_surfaces_api_errors() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let client = OverpassClient::new(server.url() + "/", 5).unwrap();

    assert!(client.fetch_roads(&bbox).await.is_err());
}

#[tokio::test]
async fn test_overpass_client_rejects_malformed_body() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"version": 0.6}"#)
        .create_async()
        .await;

    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let client = OverpassClient::new(server.url() + "/", 5).unwrap();

    assert!(client.fetch_roads(&bbox).await.is_err());
}

#[test]
fn test_terrarium_png_helper_roundtrips() {
    let png = terrarium_png(150.0);
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    let [r, g, b, _] = img.get_pixel(0, 0).0;
    assert!((decode_terrarium(r, g, b) - 150.0).abs() < 1.0);
}
