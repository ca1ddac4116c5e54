use band_index::cli::{Args, Command, OutputArgs};
use band_index::creation::CreationOptions;
use band_index::elevation;
use band_index::pipeline::{run_index, IndexRequest};
use band_index::{IndexKind, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

fn index_request(
    kind: IndexKind,
    first_band: PathBuf,
    second_band: PathBuf,
    output: OutputArgs,
) -> Result<IndexRequest> {
    Ok(IndexRequest {
        kind,
        first_band,
        second_band,
        output_folder: output.output_dir,
        creation: CreationOptions::new(output.compress.as_deref(), output.tile_size)?,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    // Set thread pool size if specified
    if let Some(n_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()?;
        info!("Using {} threads", n_threads);
    }

    match args.command {
        Command::Ndvi { red, nir, output } => {
            let request = index_request(IndexKind::Ndvi, red, nir, output)?;
            print_json(&run_index(&request)?)
        }
        Command::Ndwi { green, nir, output } => {
            let request = index_request(IndexKind::Ndwi, green, nir, output)?;
            print_json(&run_index(&request)?)
        }
        Command::Ndbi { nir, swir, output } => {
            let request = index_request(IndexKind::Ndbi, nir, swir, output)?;
            print_json(&run_index(&request)?)
        }
        Command::Point { dem, lon, lat } => {
            print_json(&elevation::point_elevation(&dem, lon, lat)?)
        }
        Command::Profile {
            dem,
            start,
            end,
            samples,
        } => print_json(&elevation::elevation_profile(&dem, start, end, samples)?),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} (status {})", e, e.http_status());
            ExitCode::FAILURE
        }
    }
}
