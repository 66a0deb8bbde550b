//! Command-line contour map generator
//!
//! Runs the same pipeline as the service without accounts or a database:
//! fetch elevation tiles, trace contours, optionally overlay roads, write a
//! PNG.

use anyhow::Context;
use clap::Parser;
use reliefmap::services::{MapGenerator, OverpassClient, TerrainClient};
use reliefmap::{parse_bbox, RenderSettings};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mapgen", about = "Generate a contour map PNG for a bounding box")]
struct Args {
    /// Bounding box as "minLon,minLat,maxLon,maxLat"
    #[arg(long)]
    bbox: String,

    /// Contour interval in meters
    #[arg(long, default_value_t = 20.0)]
    interval: f64,

    /// Background color as a hex string
    #[arg(long, default_value = "#ffffff")]
    bg: String,

    /// Overlay roads from Overpass
    #[arg(long, default_value_t = false)]
    roads: bool,

    /// Output image width in pixels
    #[arg(long, default_value_t = 1600)]
    width: u32,

    /// Output image height in pixels
    #[arg(long, default_value_t = 1200)]
    height: u32,

    /// Elevation tile zoom level; auto-selected when omitted
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=15))]
    zoom: Option<u8>,

    /// Output file path
    #[arg(long, default_value = "contour_map.png")]
    out: PathBuf,

    /// Terrarium tile service base URL
    #[arg(
        long,
        default_value = "https://elevation-tiles-prod.s3.amazonaws.com/terrarium"
    )]
    tile_url: String,

    /// Overpass API endpoint
    #[arg(long, default_value = "https://overpass-api.de/api/interpreter")]
    overpass_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(log_level)
        .init();

    let args = Args::parse();

    let bbox = parse_bbox(&args.bbox).context("Invalid --bbox")?;

    let terrain = Arc::new(TerrainClient::new(args.tile_url, 30)?);
    let overpass = Arc::new(OverpassClient::new(args.overpass_url, 30)?);
    let generator = MapGenerator::new(terrain, overpass);

    let settings = RenderSettings {
        background: args.bg,
        width: args.width,
        height: args.height,
        include_roads: args.roads,
        interval: args.interval,
        zoom: args.zoom,
    };

    let rendered = generator
        .generate(bbox, &settings)
        .await
        .context("Map generation failed")?;

    if let Some(warning) = &rendered.warning {
        eprintln!("warning: {}", warning);
    }

    std::fs::write(&args.out, &rendered.png)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    println!("Wrote {} ({} bytes)", args.out.display(), rendered.png.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_bounds_enforced() {
        let base = ["mapgen", "--bbox", "7.1,43.6,7.4,43.8"];

        let args = Args::try_parse_from(base.iter().copied().chain(["--zoom", "12"])).unwrap();
        assert_eq!(args.zoom, Some(12));

        assert!(Args::try_parse_from(base.iter().copied().chain(["--zoom", "0"])).is_err());
        assert!(Args::try_parse_from(base.iter().copied().chain(["--zoom", "16"])).is_err());
        assert!(Args::try_parse_from(base.iter().copied().chain(["--zoom", "33"])).is_err());
    }

    #[test]
    fn test_defaults_match_service() {
        let args = Args::try_parse_from(["mapgen", "--bbox", "7.1,43.6,7.4,43.8"]).unwrap();
        assert_eq!(args.interval, 20.0);
        assert_eq!(args.bg, "#ffffff");
        assert_eq!(args.width, 1600);
        assert_eq!(args.height, 1200);
        assert!(!args.roads);
        assert!(args.zoom.is_none());
    }
}
