use crate::core::bbox::{global_pixel_to_lonlat, lonlat_to_global_pixel, TILE_SIZE};
use crate::models::{BoundingBox, TileCoord};
use thiserror::Error;

/// Errors that can occur while assembling the elevation mosaic
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("No tiles cover the requested bounding box")]
    NoTiles,

    #[error("Tile {zoom}/{x}/{y} has unexpected size {width}x{height}")]
    BadTileSize { zoom: u8, x: u32, y: u32, width: u32, height: u32 },

    #[error("Cropped mosaic is empty; check bbox/zoom values")]
    EmptyCrop,
}

/// A downloaded and decoded elevation tile
#[derive(Debug, Clone)]
pub struct TileData {
    pub coord: TileCoord,
    /// Row-major elevations in meters, TILE_SIZE * TILE_SIZE samples
    pub elevations: Vec<f32>,
}

/// Decode one Terrarium-encoded pixel into meters of elevation
///
/// elevation = R * 256 + G + B / 256 - 32768
#[inline]
pub fn decode_terrarium(r: u8, g: u8, b: u8) -> f32 {
    (r as f32) * 256.0 + (g as f32) + (b as f32) / 256.0 - 32768.0
}

/// Decode a Terrarium tile image into a row-major elevation grid
pub fn decode_tile(coord: TileCoord, img: &image::RgbaImage) -> Result<TileData, MosaicError> {
    if img.width() != TILE_SIZE || img.height() != TILE_SIZE {
        return Err(MosaicError::BadTileSize {
            zoom: coord.zoom,
            x: coord.x,
            y: coord.y,
            width: img.width(),
            height: img.height(),
        });
    }

    let mut elevations = Vec::with_capacity((TILE_SIZE * TILE_SIZE) as usize);
    for pixel in img.pixels() {
        let [r, g, b, _] = pixel.0;
        elevations.push(decode_terrarium(r, g, b));
    }

    Ok(TileData { coord, elevations })
}

/// A contiguous elevation raster covering a bounding box
///
/// Stitched from slippy-map tiles and cropped to the bbox's global-pixel
/// rectangle. `origin_px` holds the global Web Mercator pixel coordinates of
/// the top-left sample, which together with `zoom` defines the affine mapping
/// from grid cell to geographic coordinate. Read-only after construction.
#[derive(Debug, Clone)]
pub struct ElevationMosaic {
    data: Vec<f32>,
    width: usize,
    height: usize,
    zoom: u8,
    origin_px: (f64, f64),
}

impl ElevationMosaic {
    /// Stitch decoded tiles into a single raster cropped to the bounding box
    ///
    /// Tiles are placed by pixel offset according to their tile index; cells
    /// not covered by any supplied tile stay NaN.
    pub fn build(bbox: &BoundingBox, zoom: u8, tiles: &[TileData]) -> Result<Self, MosaicError> {
        if tiles.is_empty() {
            return Err(MosaicError::NoTiles);
        }

        let min_tx = tiles.iter().map(|t| t.coord.x).min().unwrap();
        let max_tx = tiles.iter().map(|t| t.coord.x).max().unwrap();
        let min_ty = tiles.iter().map(|t| t.coord.y).min().unwrap();
        let max_ty = tiles.iter().map(|t| t.coord.y).max().unwrap();

        let tile = TILE_SIZE as usize;
        let full_w = (max_tx - min_tx + 1) as usize * tile;
        let full_h = (max_ty - min_ty + 1) as usize * tile;

        let mut full = vec![f32::NAN; full_w * full_h];
        for t in tiles {
            let ox = (t.coord.x - min_tx) as usize * tile;
            let oy = (t.coord.y - min_ty) as usize * tile;
            for row in 0..tile {
                let src = &t.elevations[row * tile..(row + 1) * tile];
                let dst_start = (oy + row) * full_w + ox;
                full[dst_start..dst_start + tile].copy_from_slice(src);
            }
        }

        // Crop to the bbox's global-pixel rectangle
        let origin_x = (min_tx as f64) * TILE_SIZE as f64;
        let origin_y = (min_ty as f64) * TILE_SIZE as f64;
        let (gx0, gy0) = lonlat_to_global_pixel(bbox.min_lon, bbox.max_lat, zoom);
        let (gx1, gy1) = lonlat_to_global_pixel(bbox.max_lon, bbox.min_lat, zoom);

        let left = ((gx0 - origin_x).floor().max(0.0)) as usize;
        let top = ((gy0 - origin_y).floor().max(0.0)) as usize;
        let right = ((gx1 - origin_x).ceil() as usize).min(full_w);
        let bottom = ((gy1 - origin_y).ceil() as usize).min(full_h);

        if right <= left || bottom <= top {
            return Err(MosaicError::EmptyCrop);
        }

        let width = right - left;
        let height = bottom - top;
        let mut data = Vec::with_capacity(width * height);
        for row in top..bottom {
            data.extend_from_slice(&full[row * full_w + left..row * full_w + right]);
        }

        Ok(Self {
            data,
            width,
            height,
            zoom,
            origin_px: (origin_x + left as f64, origin_y + top as f64),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Elevation at a grid cell; NaN where no tile covered the cell
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Minimum and maximum finite elevation, or None if the grid is all NaN
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut bounds: Option<(f32, f32)> = None;
        for &v in &self.data {
            if v.is_finite() {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        bounds
    }

    /// Map fractional grid coordinates to geographic lon/lat
    pub fn grid_to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        global_pixel_to_lonlat(self.origin_px.0 + x, self.origin_px.1 + y, self.zoom)
    }
}
