// Core pipeline exports
pub mod bbox;
pub mod contour;
pub mod mosaic;
pub mod render;

pub use bbox::{auto_zoom, parse_bbox, tiles_for_bbox, ValidationError, TILE_SIZE};
pub use contour::{contour_levels, extract_contours, ContourLevel, ContourSet};
pub use mosaic::{decode_terrarium, decode_tile, ElevationMosaic, MosaicError, TileData};
pub use render::{parse_hex_color, render_map, RenderError};
