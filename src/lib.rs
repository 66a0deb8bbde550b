//! Relief Map - Contour map generation service
//!
//! This library turns a geographic bounding box into a rendered contour map.
//! Elevation comes from Terrarium-encoded tiles, contours are traced with
//! marching squares, and the result is rasterized to PNG. The HTTP layer adds
//! accounts with a per-map credit balance.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{auto_zoom, extract_contours, parse_bbox, render_map, ContourSet, ElevationMosaic};
pub use models::{BoundingBox, GenerateMapRequest, GenerateMapResponse, RenderSettings, TileCoord};
