// Criterion benchmarks for Relief Map

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reliefmap::core::{
    decode_terrarium, extract_contours, parse_bbox, parse_hex_color, render_map, tiles_for_bbox,
    ElevationMosaic, TileData, TILE_SIZE,
};
use reliefmap::models::TileCoord;

fn hill_tile(coord: TileCoord) -> TileData {
    let n = TILE_SIZE as usize;
    let mut elevations = vec![0.0f32; n * n];
    for y in 0..n {
        for x in 0..n {
            // Rolling terrain with a couple of hundred meters of relief
            let fx = x as f32 / n as f32;
            let fy = y as f32 / n as f32;
            elevations[y * n + x] =
                150.0 + 120.0 * (fx * 9.0).sin() * (fy * 7.0).cos() + 60.0 * (fx * 23.0).sin();
        }
    }
    TileData { coord, elevations }
}

fn build_mosaic() -> (reliefmap::models::BoundingBox, ElevationMosaic) {
    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let zoom = 10;
    let tiles: Vec<TileData> = tiles_for_bbox(&bbox, zoom).into_iter().map(hill_tile).collect();
    let mosaic = ElevationMosaic::build(&bbox, zoom, &tiles).unwrap();
    (bbox, mosaic)
}

fn bench_terrarium_decode(c: &mut Criterion) {
    c.bench_function("decode_terrarium", |b| {
        b.iter(|| decode_terrarium(black_box(131), black_box(200), black_box(64)));
    });
}

fn bench_mosaic_build(c: &mut Criterion) {
    let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
    let zoom = 10;
    let tiles: Vec<TileData> = tiles_for_bbox(&bbox, zoom).into_iter().map(hill_tile).collect();

    c.bench_function("mosaic_build", |b| {
        b.iter(|| ElevationMosaic::build(black_box(&bbox), black_box(zoom), black_box(&tiles)));
    });
}

fn bench_contour_extraction(c: &mut Criterion) {
    let (_bbox, mosaic) = build_mosaic();

    let mut group = c.benchmark_group("contours");
    for interval in [10.0f32, 20.0, 50.0].iter() {
        group.bench_with_input(
            BenchmarkId::new("extract", format!("{}m", interval)),
            interval,
            |b, &interval| {
                b.iter(|| extract_contours(black_box(&mosaic), black_box(interval)));
            },
        );
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let (bbox, mosaic) = build_mosaic();
    let contours = extract_contours(&mosaic, 20.0).unwrap();
    let background = parse_hex_color("#f2efe9").unwrap();

    c.bench_function("render_1600x1200", |b| {
        b.iter(|| {
            render_map(
                black_box(&bbox),
                black_box(&contours),
                None,
                background,
                1600,
                1200,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_terrarium_decode,
    bench_mosaic_build,
    bench_contour_extraction,
    bench_render
);

criterion_main!(benches);
