use crate::core::bbox::{auto_zoom, validate_bbox, ValidationError};
use crate::core::contour::extract_contours;
use crate::core::mosaic::{ElevationMosaic, MosaicError};
use crate::core::render::{parse_hex_color, render_map, RenderError};
use crate::models::{BoundingBox, RenderSettings};
use crate::services::overpass::OverpassClient;
use crate::services::terrain::{TerrainClient, TerrainError};
use std::sync::Arc;
use thiserror::Error;

/// Errors from the map generation pipeline
///
/// Variants map onto the stage that failed; the HTTP layer uses this to pick
/// status codes and decide whether a spent credit must be refunded.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Elevation data unavailable: {0}")]
    Terrain(#[from] TerrainError),

    #[error(transparent)]
    Mosaic(#[from] MosaicError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// A finished map artifact
pub struct RenderedMap {
    pub png: Vec<u8>,
    /// Present when the road overlay was requested but could not be fetched
    pub warning: Option<String>,
}

/// Orchestrates the elevation-to-PNG pipeline
///
/// Fetch tiles, stitch the mosaic, trace contours, optionally overlay roads,
/// then rasterize. Road failures degrade to a warning rather than aborting.
pub struct MapGenerator {
    terrain: Arc<TerrainClient>,
    overpass: Arc<OverpassClient>,
}

impl MapGenerator {
    pub fn new(terrain: Arc<TerrainClient>, overpass: Arc<OverpassClient>) -> Self {
        Self { terrain, overpass }
    }

    pub async fn generate(
        &self,
        bbox: BoundingBox,
        settings: &RenderSettings,
    ) -> Result<RenderedMap, GenerateError> {
        validate_bbox(&bbox)?;
        let background = parse_hex_color(&settings.background)?;

        let zoom = settings.zoom.unwrap_or_else(|| auto_zoom(&bbox));
        tracing::info!("Generating map for {} at zoom {}", bbox, zoom);

        let tiles = self.terrain.fetch_tiles(&bbox, zoom).await?;
        let mosaic = ElevationMosaic::build(&bbox, zoom, &tiles)?;

        let contours = extract_contours(&mosaic, settings.interval as f32)?;
        tracing::info!(
            "Extracted {} contour polylines across {} levels",
            contours.line_count(),
            contours.levels.len()
        );

        let mut warning = None;
        let roads = if settings.include_roads {
            match self.overpass.fetch_roads(&bbox).await {
                Ok(lines) => Some(lines),
                Err(e) => {
                    tracing::warn!("Road overlay unavailable: {}", e);
                    warning = Some("Road data unavailable; map rendered without roads".to_string());
                    None
                }
            }
        } else {
            None
        };

        let png = render_map(
            &bbox,
            &contours,
            roads.as_deref(),
            background,
            settings.width,
            settings.height,
        )?;

        Ok(RenderedMap { png, warning })
    }
}
