use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "band-index")]
#[command(about = "Normalized-difference band indices and DEM elevation queries")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Number of threads (default: all available)
    #[arg(short, long, global = true, value_name = "N")]
    pub threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vegetation index (NIR - Red) / (NIR + Red)
    Ndvi {
        /// Red band GeoTIFF
        #[arg(long, value_name = "FILE")]
        red: PathBuf,
        /// Near-infrared band GeoTIFF
        #[arg(long, value_name = "FILE")]
        nir: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Water index (Green - NIR) / (Green + NIR)
    Ndwi {
        /// Green band GeoTIFF
        #[arg(long, value_name = "FILE")]
        green: PathBuf,
        /// Near-infrared band GeoTIFF
        #[arg(long, value_name = "FILE")]
        nir: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Built-up index (SWIR - NIR) / (SWIR + NIR)
    Ndbi {
        /// Near-infrared band GeoTIFF
        #[arg(long, value_name = "FILE")]
        nir: PathBuf,
        /// Shortwave-infrared band GeoTIFF
        #[arg(long, value_name = "FILE")]
        swir: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Elevation at a WGS84 point
    Point {
        /// DEM GeoTIFF
        #[arg(long, value_name = "FILE")]
        dem: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Elevation profile between two WGS84 points
    Profile {
        /// DEM GeoTIFF
        #[arg(long, value_name = "FILE")]
        dem: PathBuf,
        /// Start point as LON,LAT
        #[arg(
            long,
            value_name = "LON,LAT",
            value_parser = parse_lon_lat,
            allow_hyphen_values = true
        )]
        start: (f64, f64),
        /// End point as LON,LAT
        #[arg(
            long,
            value_name = "LON,LAT",
            value_parser = parse_lon_lat,
            allow_hyphen_values = true
        )]
        end: (f64, f64),
        /// Number of segments along the line
        #[arg(long, default_value_t = crate::elevation::DEFAULT_PROFILE_SAMPLES)]
        samples: usize,
    },
}

#[derive(ClapArgs, Debug)]
pub struct OutputArgs {
    /// Folder receiving `{index}_{first input name}`
    #[arg(short, long, value_name = "DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// GeoTIFF compression (DEFLATE, LZW, ZSTD, NONE)
    #[arg(long, value_name = "TYPE")]
    pub compress: Option<String>,

    /// Write tiled output with this block size (multiple of 16)
    #[arg(long, value_name = "PIXELS")]
    pub tile_size: Option<usize>,
}

pub fn parse_lon_lat(value: &str) -> Result<(f64, f64), String> {
    let (lon, lat) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT, got '{}'", value))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{}': {}", lon, e))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{}': {}", lat, e))?;
    Ok((lon, lat))
}
