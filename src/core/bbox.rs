use crate::models::{BoundingBox, TileCoord};
use thiserror::Error;

/// Pixel size of a slippy-map tile
pub const TILE_SIZE: u32 = 256;

/// Errors produced while validating user-supplied map parameters
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Bounding box must be 'min_lon,min_lat,max_lon,max_lat'")]
    BadFormat,

    #[error("Longitude must be between -180 and 180")]
    LongitudeRange,

    #[error("Latitude must be between -85 and 85")]
    LatitudeRange,

    #[error("Invalid bbox: ensure min < max for lon and lat")]
    EmptyExtent,

    #[error("Contour interval must be positive")]
    NonPositiveInterval,

    #[error("{axis} must be between {min} and {max} pixels")]
    DimensionRange { axis: &'static str, min: u32, max: u32 },

    #[error("Invalid color '{0}': expected hex like #f2efe9")]
    BadColor(String),
}

/// Parse and range-check a bounding box string
///
/// Input format: "min_lon,min_lat,max_lon,max_lat" in degrees.
/// Longitude must be within [-180, 180], latitude within [-85, 85]
/// (the Web Mercator usable range), and min < max on both axes.
pub fn parse_bbox(s: &str) -> Result<BoundingBox, ValidationError> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ValidationError::BadFormat)?;

    if parts.len() != 4 {
        return Err(ValidationError::BadFormat);
    }

    let bbox = BoundingBox {
        min_lon: parts[0],
        min_lat: parts[1],
        max_lon: parts[2],
        max_lat: parts[3],
    };

    validate_bbox(&bbox)?;
    Ok(bbox)
}

/// Range-check an already-constructed bounding box
pub fn validate_bbox(bbox: &BoundingBox) -> Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&bbox.min_lon) || !(-180.0..=180.0).contains(&bbox.max_lon) {
        return Err(ValidationError::LongitudeRange);
    }
    if !(-85.0..=85.0).contains(&bbox.min_lat) || !(-85.0..=85.0).contains(&bbox.max_lat) {
        return Err(ValidationError::LatitudeRange);
    }
    if bbox.min_lon >= bbox.max_lon || bbox.min_lat >= bbox.max_lat {
        return Err(ValidationError::EmptyExtent);
    }
    Ok(())
}

/// Project lon/lat into the normalized Web Mercator square [0,1)x[0,1)
///
/// x grows east from the antimeridian, y grows south from the north edge.
/// Latitude is clamped to the projection's valid range.
pub fn mercator_norm(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let siny = lat.to_radians().sin().clamp(-0.9999, 0.9999);
    let y = 0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * std::f64::consts::PI);
    (x, y)
}

/// Project lon/lat into global pixel coordinates at a zoom level
pub fn lonlat_to_global_pixel(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
    let scale = (TILE_SIZE as f64) * (1u64 << zoom) as f64;
    let (nx, ny) = mercator_norm(lon, lat);
    (nx * scale, ny * scale)
}

/// Inverse of [`lonlat_to_global_pixel`]
pub fn global_pixel_to_lonlat(px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let scale = (TILE_SIZE as f64) * (1u64 << zoom) as f64;
    let lon = px / scale * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * py / scale))
        .sinh()
        .atan()
        .to_degrees();
    (lon, lat)
}

/// Compute the slippy-map tiles covering a bounding box at a zoom level
///
/// Returns tiles in row-major order (west to east, north to south).
pub fn tiles_for_bbox(bbox: &BoundingBox, zoom: u8) -> Vec<TileCoord> {
    let max_index = (1u64 << zoom) - 1;

    let (x0, y0) = lonlat_to_global_pixel(bbox.min_lon, bbox.max_lat, zoom);
    let (x1, y1) = lonlat_to_global_pixel(bbox.max_lon, bbox.min_lat, zoom);

    let tile = |px: f64| (px / TILE_SIZE as f64).floor().max(0.0) as u64;
    let tx0 = tile(x0).min(max_index);
    let tx1 = tile(x1).min(max_index);
    let ty0 = tile(y0).min(max_index);
    let ty1 = tile(y1).min(max_index);

    let mut tiles = Vec::with_capacity(((tx1 - tx0 + 1) * (ty1 - ty0 + 1)) as usize);
    for ty in ty0..=ty1 {
        for tx in tx0..=tx1 {
            tiles.push(TileCoord {
                zoom,
                x: tx as u32,
                y: ty as u32,
            });
        }
    }
    tiles
}

/// Pick a zoom level from the bounding box's angular size
///
/// Larger areas get coarser tiles so the mosaic stays a manageable size.
pub fn auto_zoom(bbox: &BoundingBox) -> u8 {
    let area_size = (bbox.max_lon - bbox.min_lon).max(bbox.max_lat - bbox.min_lat);

    if area_size > 2.0 {
        8
    } else if area_size > 1.0 {
        9
    } else if area_size > 0.5 {
        10
    } else if area_size > 0.2 {
        11
    } else if area_size > 0.1 {
        12
    } else if area_size > 0.05 {
        13
    } else {
        14
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_bbox() {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        assert_eq!(bbox.min_lon, 7.1);
        assert_eq!(bbox.max_lat, 43.8);
    }

    #[test]
    fn test_parse_rejects_out_of_range_longitude() {
        assert!(matches!(
            parse_bbox("200,40,210,41"),
            Err(ValidationError::LongitudeRange)
        ));
    }

    #[test]
    fn test_parse_rejects_inverted_extent() {
        assert!(matches!(
            parse_bbox("7.4,43.6,7.1,43.8"),
            Err(ValidationError::EmptyExtent)
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_bbox("not,a,bbox"), Err(ValidationError::BadFormat)));
        assert!(matches!(parse_bbox("1,2,3"), Err(ValidationError::BadFormat)));
    }

    #[test]
    fn test_mercator_roundtrip() {
        let (px, py) = lonlat_to_global_pixel(7.25, 43.7, 12);
        let (lon, lat) = global_pixel_to_lonlat(px, py, 12);
        assert!((lon - 7.25).abs() < 1e-9);
        assert!((lat - 43.7).abs() < 1e-9);
    }

    #[test]
    fn test_tiles_cover_bbox() {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        let tiles = tiles_for_bbox(&bbox, 10);
        assert!(!tiles.is_empty());
        // Tiles form a contiguous rectangle
        let min_x = tiles.iter().map(|t| t.x).min().unwrap();
        let max_x = tiles.iter().map(|t| t.x).max().unwrap();
        let min_y = tiles.iter().map(|t| t.y).min().unwrap();
        let max_y = tiles.iter().map(|t| t.y).max().unwrap();
        assert_eq!(
            tiles.len(),
            ((max_x - min_x + 1) * (max_y - min_y + 1)) as usize
        );
    }

    #[test]
    fn test_auto_zoom_ladder() {
        let big = parse_bbox("0,0,3,3").unwrap();
        assert_eq!(auto_zoom(&big), 8);

        let small = parse_bbox("7.1,43.6,7.14,43.63").unwrap();
        assert_eq!(auto_zoom(&small), 14);

        let medium = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        assert_eq!(auto_zoom(&medium), 11);
    }
}
