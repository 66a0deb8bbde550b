use crate::core::bbox::ValidationError;
use crate::core::mosaic::ElevationMosaic;
use geo::{Coord, LineString};

/// Contour polylines for a single iso-elevation level
#[derive(Debug, Clone)]
pub struct ContourLevel {
    /// Elevation in meters; always an exact multiple of the requested interval
    pub elevation: f32,
    /// Polylines in geographic coordinates (lon/lat)
    pub lines: Vec<LineString<f64>>,
}

/// Ordered collection of contour levels derived from one mosaic
#[derive(Debug, Clone, Default)]
pub struct ContourSet {
    pub levels: Vec<ContourLevel>,
}

impl ContourSet {
    pub fn line_count(&self) -> usize {
        self.levels.iter().map(|l| l.lines.len()).sum()
    }
}

/// One marching-squares crossing in grid coordinates
#[derive(Debug, Clone, Copy)]
struct GridSegment {
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
}

/// Compute the iso levels for a value range: every multiple of `interval`
/// within [min, max] inclusive
pub fn contour_levels(min: f32, max: f32, interval: f32) -> Vec<f32> {
    if interval <= 0.0 || max < min {
        return vec![];
    }

    let start = (min / interval).ceil() * interval;
    let mut levels = Vec::new();
    let mut level = start;
    while level <= max {
        levels.push(level);
        level += interval;
    }
    levels
}

/// Trace iso-elevation lines through the mosaic at multiples of `interval`
///
/// Runs marching squares per level, chains the resulting segments into
/// polylines, and converts vertices to geographic coordinates through the
/// mosaic's affine mapping. Deterministic for identical inputs.
pub fn extract_contours(
    mosaic: &ElevationMosaic,
    interval: f32,
) -> Result<ContourSet, ValidationError> {
    if interval <= 0.0 {
        return Err(ValidationError::NonPositiveInterval);
    }

    let Some((min_e, max_e)) = mosaic.min_max() else {
        return Ok(ContourSet::default());
    };

    let mut set = ContourSet::default();
    for level in contour_levels(min_e, max_e, interval) {
        let segments = march_squares(mosaic, level);
        let lines = chain_segments(&segments)
            .into_iter()
            .map(|pts| {
                LineString::from(
                    pts.iter()
                        .map(|&(x, y)| {
                            let (lon, lat) = mosaic.grid_to_lonlat(x, y);
                            Coord { x: lon, y: lat }
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        set.levels.push(ContourLevel { elevation: level, lines });
    }

    Ok(set)
}

/// Marching squares over the mosaic grid at one iso level
///
/// Cells touching a NaN sample are skipped; crossings are linearly
/// interpolated along cell edges.
fn march_squares(mosaic: &ElevationMosaic, level: f32) -> Vec<GridSegment> {
    let (w, h) = (mosaic.width(), mosaic.height());
    if w < 2 || h < 2 {
        return vec![];
    }

    let mut segments = Vec::new();
    for y in 0..h - 1 {
        for x in 0..w - 1 {
            let tl = mosaic.get(x, y);
            let tr = mosaic.get(x + 1, y);
            let bl = mosaic.get(x, y + 1);
            let br = mosaic.get(x + 1, y + 1);

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }

            let (fx, fy) = (x as f64, y as f64);
            let top = cross(fx, fy, fx + 1.0, fy, tl, tr, level);
            let right = cross(fx + 1.0, fy, fx + 1.0, fy + 1.0, tr, br, level);
            let bottom = cross(fx, fy + 1.0, fx + 1.0, fy + 1.0, bl, br, level);
            let left = cross(fx, fy, fx, fy + 1.0, tl, bl, level);

            let seg = |a: (f64, f64), b: (f64, f64)| GridSegment {
                ax: a.0,
                ay: a.1,
                bx: b.0,
                by: b.1,
            };

            match case {
                0 | 15 => {}
                1 | 14 => segments.push(seg(left, top)),
                2 | 13 => segments.push(seg(top, right)),
                3 | 12 => segments.push(seg(left, right)),
                4 | 11 => segments.push(seg(right, bottom)),
                6 | 9 => segments.push(seg(top, bottom)),
                7 | 8 => segments.push(seg(left, bottom)),
                // Saddle cases produce two disjoint crossings
                5 => {
                    segments.push(seg(left, top));
                    segments.push(seg(right, bottom));
                }
                10 => {
                    segments.push(seg(top, right));
                    segments.push(seg(left, bottom));
                }
                _ => unreachable!(),
            }
        }
    }

    segments
}

/// Interpolate where the iso level crosses the edge between two samples
#[inline]
fn cross(x1: f64, y1: f64, x2: f64, y2: f64, v1: f32, v2: f32, level: f32) -> (f64, f64) {
    let dv = (v2 - v1) as f64;
    if dv.abs() < 1e-9 {
        return ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }
    let t = (((level - v1) as f64) / dv).clamp(0.0, 1.0);
    (x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

const CHAIN_EPSILON: f64 = 1e-3;

/// Chain unordered segments into continuous polylines
///
/// Greedy endpoint matching; each segment is consumed once.
fn chain_segments(segments: &[GridSegment]) -> Vec<Vec<(f64, f64)>> {
    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    let close = |a: (f64, f64), b: (f64, f64)| {
        (a.0 - b.0).abs() < CHAIN_EPSILON && (a.1 - b.1).abs() < CHAIN_EPSILON
    };

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let mut points = vec![
            (segments[start].ax, segments[start].ay),
            (segments[start].bx, segments[start].by),
        ];

        let mut extended = true;
        while extended {
            extended = false;
            let tail = *points.last().unwrap();
            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if close((seg.ax, seg.ay), tail) {
                    points.push((seg.bx, seg.by));
                } else if close((seg.bx, seg.by), tail) {
                    points.push((seg.ax, seg.ay));
                } else {
                    continue;
                }
                used[i] = true;
                extended = true;
                break;
            }
        }

        lines.push(points);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bbox::{parse_bbox, tiles_for_bbox, TILE_SIZE};
    use crate::core::mosaic::{ElevationMosaic, TileData};

    fn peak_mosaic() -> ElevationMosaic {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        let zoom = 10;
        let tiles: Vec<TileData> = tiles_for_bbox(&bbox, zoom)
            .into_iter()
            .map(|coord| {
                let n = TILE_SIZE as usize;
                let mut elevations = vec![0.0f32; n * n];
                for y in 0..n {
                    for x in 0..n {
                        // Radial peak centered in the tile, up to ~200 m
                        let dx = x as f32 - n as f32 / 2.0;
                        let dy = y as f32 - n as f32 / 2.0;
                        let d = (dx * dx + dy * dy).sqrt();
                        elevations[y * n + x] = (200.0 - d).max(0.0);
                    }
                }
                TileData { coord, elevations }
            })
            .collect();
        ElevationMosaic::build(&bbox, zoom, &tiles).unwrap()
    }

    #[test]
    fn test_contour_levels_are_interval_multiples() {
        let levels = contour_levels(12.0, 61.0, 20.0);
        assert_eq!(levels, vec![20.0, 40.0, 60.0]);
        for level in &levels {
            assert_eq!(level % 20.0, 0.0);
        }
    }

    #[test]
    fn test_contour_levels_empty_for_bad_interval() {
        assert!(contour_levels(0.0, 100.0, 0.0).is_empty());
        assert!(contour_levels(0.0, 100.0, -5.0).is_empty());
    }

    #[test]
    fn test_extract_rejects_non_positive_interval() {
        let mosaic = peak_mosaic();
        assert!(extract_contours(&mosaic, 0.0).is_err());
        assert!(extract_contours(&mosaic, -20.0).is_err());
    }

    #[test]
    fn test_extract_produces_lines_around_peak() {
        let mosaic = peak_mosaic();
        let set = extract_contours(&mosaic, 50.0).unwrap();
        assert!(set.line_count() > 0);
        for level in &set.levels {
            assert_eq!(level.elevation % 50.0, 0.0);
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let mosaic = peak_mosaic();
        let a = extract_contours(&mosaic, 25.0).unwrap();
        let b = extract_contours(&mosaic, 25.0).unwrap();
        assert_eq!(a.levels.len(), b.levels.len());
        for (la, lb) in a.levels.iter().zip(&b.levels) {
            assert_eq!(la.elevation, lb.elevation);
            assert_eq!(la.lines.len(), lb.lines.len());
            for (lna, lnb) in la.lines.iter().zip(&lb.lines) {
                assert_eq!(lna.0.len(), lnb.0.len());
            }
        }
    }

    #[test]
    fn test_flat_field_has_no_contours_between_levels() {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        let zoom = 10;
        let tiles: Vec<TileData> = tiles_for_bbox(&bbox, zoom)
            .into_iter()
            .map(|coord| TileData {
                coord,
                elevations: vec![37.0; (TILE_SIZE * TILE_SIZE) as usize],
            })
            .collect();
        let mosaic = ElevationMosaic::build(&bbox, zoom, &tiles).unwrap();

        // 37 is not a multiple of 20, so no levels fall inside [37, 37]
        let set = extract_contours(&mosaic, 20.0).unwrap();
        assert_eq!(set.line_count(), 0);
    }
}
