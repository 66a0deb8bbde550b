use crate::core::bbox::tiles_for_bbox;
use crate::core::mosaic::{decode_tile, MosaicError, TileData};
use crate::models::{BoundingBox, TileCoord};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching elevation tiles
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Tile service returned {status} for {zoom}/{x}/{y}")]
    TileStatus { status: u16, zoom: u8, x: u32, y: u32 },

    #[error("Failed to decode tile image: {0}")]
    DecodeError(String),

    #[error(transparent)]
    MosaicError(#[from] MosaicError),

    #[error("No tiles cover the requested bounding box")]
    NoTiles,
}

/// HTTP client for a Terrarium elevation tile service
///
/// Tiles are keyed by zoom/x/y and carry elevation packed into RGB channels.
/// One attempt per tile; downloads are sequential within a request.
pub struct TerrainClient {
    base_url: String,
    client: Client,
}

impl TerrainClient {
    /// Create a new tile client
    ///
    /// `base_url` is the service root; tile paths `/{z}/{x}/{y}.png` are
    /// appended to it.
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, TerrainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }

    fn tile_url(&self, coord: TileCoord) -> String {
        format!(
            "{}/{}/{}/{}.png",
            self.base_url.trim_end_matches('/'),
            coord.zoom,
            coord.x,
            coord.y
        )
    }

    /// Download and decode a single elevation tile
    pub async fn fetch_tile(&self, coord: TileCoord) -> Result<TileData, TerrainError> {
        let url = self.tile_url(coord);
        tracing::debug!("Fetching elevation tile: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TerrainError::TileStatus {
                status: response.status().as_u16(),
                zoom: coord.zoom,
                x: coord.x,
                y: coord.y,
            });
        }

        let bytes = response.bytes().await?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| TerrainError::DecodeError(e.to_string()))?
            .to_rgba8();

        Ok(decode_tile(coord, &img)?)
    }

    /// Download every tile covering the bounding box at the given zoom
    ///
    /// Any single tile failure aborts the whole fetch; the caller decides
    /// whether to refund credits.
    pub async fn fetch_tiles(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
    ) -> Result<Vec<TileData>, TerrainError> {
        let coords = tiles_for_bbox(bbox, zoom);
        if coords.is_empty() {
            return Err(TerrainError::NoTiles);
        }

        tracing::info!("Fetching {} elevation tiles at zoom {}", coords.len(), zoom);

        let mut tiles = Vec::with_capacity(coords.len());
        for coord in coords {
            tiles.push(self.fetch_tile(coord).await?);
        }

        Ok(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_format() {
        let client = TerrainClient::new("https://tiles.test/terrarium/".to_string(), 30).unwrap();
        let url = client.tile_url(TileCoord { zoom: 12, x: 2129, y: 1498 });
        assert_eq!(url, "https://tiles.test/terrarium/12/2129/1498.png");
    }
}
