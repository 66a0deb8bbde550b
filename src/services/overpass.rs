use crate::models::BoundingBox;
use geo::{Coord, LineString};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while querying the road service
#[derive(Debug, Error)]
pub enum OverpassError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Road service returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// HTTP client for an Overpass-style road query API
///
/// Road fetch failures are non-fatal at the pipeline level; the orchestrator
/// degrades to a contours-only map and surfaces a warning.
pub struct OverpassClient {
    endpoint: String,
    client: Client,
}

impl OverpassClient {
    pub fn new(endpoint: String, timeout_secs: u64) -> Result<Self, OverpassError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { endpoint, client })
    }

    /// Fetch road way geometries within the bounding box
    pub async fn fetch_roads(&self, bbox: &BoundingBox) -> Result<Vec<LineString<f64>>, OverpassError> {
        // Overpass wants south,west,north,east
        let query = format!(
            "[out:json][timeout:25];(way[\"highway\"]({},{},{},{}););out geom;",
            bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
        );

        tracing::debug!("Querying road service at {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .body(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OverpassError::ApiError(format!(
                "Road query failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let elements = json
            .get("elements")
            .and_then(|e| e.as_array())
            .ok_or_else(|| OverpassError::InvalidResponse("Missing elements array".into()))?;

        let mut lines = Vec::new();
        for el in elements {
            if el.get("type").and_then(|t| t.as_str()) != Some("way") {
                continue;
            }
            let Some(geometry) = el.get("geometry").and_then(|g| g.as_array()) else {
                continue;
            };

            let coords: Vec<Coord<f64>> = geometry
                .iter()
                .filter_map(|pt| {
                    let lon = pt.get("lon")?.as_f64()?;
                    let lat = pt.get("lat")?.as_f64()?;
                    Some(Coord { x: lon, y: lat })
                })
                .collect();

            if coords.len() >= 2 {
                lines.push(LineString::from(coords));
            }
        }

        tracing::debug!("Road service returned {} ways", lines.len());

        Ok(lines)
    }
}
