use crate::core::bbox::{mercator_norm, ValidationError};
use crate::core::contour::ContourSet;
use crate::models::BoundingBox;
use geo::LineString;
use thiserror::Error;
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Errors that can occur while rasterizing a map
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Canvas dimensions must be positive, got {width}x{height}")]
    BadDimensions { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Stroke widths in pixels
const CONTOUR_STROKE: f32 = 0.75;
const ROAD_STROKE: f32 = 1.25;

/// Parse a hex color like "#f2efe9", "f2efe9" or "#fff"
pub fn parse_hex_color(s: &str) -> Result<Color, ValidationError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ValidationError::BadColor(s.to_string());

    let (r, g, b) = match hex.len() {
        6 => (
            u8::from_str_radix(&hex[0..2], 16).map_err(|_| bad())?,
            u8::from_str_radix(&hex[2..4], 16).map_err(|_| bad())?,
            u8::from_str_radix(&hex[4..6], 16).map_err(|_| bad())?,
        ),
        3 => {
            let c = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
            (
                c(0).map_err(|_| bad())?,
                c(1).map_err(|_| bad())?,
                c(2).map_err(|_| bad())?,
            )
        }
        _ => return Err(bad()),
    };

    Ok(Color::from_rgba8(r, g, b, 255))
}

/// Rasterize contours and optional roads onto a PNG canvas
///
/// The bounding box defines the projection window: polylines in geographic
/// coordinates are mapped through normalized Web Mercator so that the bbox
/// fills the canvas exactly. Lines are stroked in black over the background.
pub fn render_map(
    bbox: &BoundingBox,
    contours: &ContourSet,
    roads: Option<&[LineString<f64>]>,
    background: Color,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderError> {
    let mut pixmap =
        Pixmap::new(width, height).ok_or(RenderError::BadDimensions { width, height })?;
    pixmap.fill(background);

    // Projection window in normalized mercator space
    let (nx0, ny0) = mercator_norm(bbox.min_lon, bbox.max_lat);
    let (nx1, ny1) = mercator_norm(bbox.max_lon, bbox.min_lat);
    let sx = width as f64 / (nx1 - nx0);
    let sy = height as f64 / (ny1 - ny0);

    let project = |lon: f64, lat: f64| -> (f32, f32) {
        let (nx, ny) = mercator_norm(lon, lat);
        (((nx - nx0) * sx) as f32, ((ny - ny0) * sy) as f32)
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;

    let mut stroke = Stroke {
        width: CONTOUR_STROKE,
        ..Stroke::default()
    };
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    for level in &contours.levels {
        for line in &level.lines {
            stroke_polyline(&mut pixmap, line, &paint, &stroke, &project);
        }
    }

    if let Some(roads) = roads {
        stroke.width = ROAD_STROKE;
        for line in roads {
            stroke_polyline(&mut pixmap, line, &paint, &stroke, &project);
        }
    }

    pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}

fn stroke_polyline(
    pixmap: &mut Pixmap,
    line: &LineString<f64>,
    paint: &Paint,
    stroke: &Stroke,
    project: &dyn Fn(f64, f64) -> (f32, f32),
) {
    if line.0.len() < 2 {
        return;
    }

    let mut pb = PathBuilder::new();
    let (x0, y0) = project(line.0[0].x, line.0[0].y);
    pb.move_to(x0, y0);
    for coord in &line.0[1..] {
        let (x, y) = project(coord.x, coord.y);
        pb.line_to(x, y);
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, paint, stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bbox::parse_bbox;

    #[test]
    fn test_parse_hex_color_forms() {
        assert!(parse_hex_color("#f2efe9").is_ok());
        assert!(parse_hex_color("f2efe9").is_ok());
        assert!(parse_hex_color("#fff").is_ok());
        assert!(parse_hex_color("not-a-color").is_err());
        assert!(parse_hex_color("#f2ef").is_err());
    }

    #[test]
    fn test_render_dimensions_match_request() {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        let png = render_map(
            &bbox,
            &ContourSet::default(),
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

    #[test]
    fn test_render_rejects_zero_dimensions() {
        let bbox = parse_bbox("7.1,43.6,7.4,43.8").unwrap();
        let result = render_map(
            &bbox,
            &ContourSet::default(),
            None,
            Color::WHITE,
            0,
            600,
        );
        assert!(matches!(result, Err(RenderError::BadDimensions { .. })));
    }
}
