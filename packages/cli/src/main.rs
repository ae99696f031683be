#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the parcel API toolchain.
//!
//! Serves the HTTP API, crawls county `ArcGIS` parcel layers into
//! normalized `GeoJSON`, and loads those files into `PostGIS`.

mod counties;
mod load;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use parcel_api_database::db::{self, DatabaseConfig};
use parcel_api_database::{DbError, ensure_schema};
use parcel_api_parcel_models::BoundingBox;
use parcel_api_source::SourceError;
use parcel_api_source::crawl::{CrawlOptions, crawl_bbox};

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// Crawl failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Parcel store error.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Invalid command-line input.
    #[error("{message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

#[derive(Parser)]
#[command(name = "parcel_api", about = "Parcel lookup API and data tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,
    /// Crawl one county `ArcGIS` parcel layer to normalized `GeoJSON`
    Crawl {
        /// `FeatureServer` layer URL (e.g. `.../FeatureServer/0`)
        #[arg(long)]
        url: String,
        /// Bounding box in WGS84: `min_lon min_lat max_lon max_lat`
        #[arg(long, num_args = 4, allow_negative_numbers = true, value_names = ["MIN_LON", "MIN_LAT", "MAX_LON", "MAX_LAT"])]
        bbox: Vec<f64>,
        /// Output `GeoJSON` file (prints to stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Maximum number of features to fetch
        #[arg(long)]
        limit: Option<usize>,
        /// Seconds to wait between page requests
        #[arg(long, default_value = "0.5")]
        delay: f64,
    },
    /// Crawl every county in a JSON or CSV list, one file per county
    CrawlAll {
        /// County list (`.json` or `.csv`)
        #[arg(long, short)]
        list: PathBuf,
        /// Output directory for `GeoJSON` files
        #[arg(long, short, default_value = "data/parcels")]
        out_dir: PathBuf,
        /// Maximum number of features per county
        #[arg(long)]
        limit: Option<usize>,
        /// Seconds to wait between page requests
        #[arg(long, default_value = "0.5")]
        delay: f64,
    },
    /// Load normalized `GeoJSON` files into the `parcels` table
    Load {
        /// `.geojson` or `.json` files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// State for features that carry none
        #[arg(long)]
        state: Option<String>,
        /// County for features that carry none
        #[arg(long)]
        county: Option<String>,
    },
    /// Create the `parcels` table and indexes
    Migrate,
}

fn crawl_options(limit: Option<usize>, delay: f64) -> Result<CrawlOptions, CliError> {
    let delay = Duration::try_from_secs_f64(delay).map_err(|e| CliError::Invalid {
        message: format!("Invalid --delay: {e}"),
    })?;
    Ok(CrawlOptions { limit, delay })
}

fn bbox_from_args(values: &[f64]) -> Result<BoundingBox, CliError> {
    match *values {
        [min_lon, min_lat, max_lon, max_lat] => {
            Ok(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => Err(CliError::Invalid {
            message: "Provide --bbox min_lon min_lat max_lon max_lat".to_string(),
        }),
    }
}

fn write_collection(path: &Path, value: &impl serde::Serialize) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

async fn connect() -> Result<Box<dyn switchy_database::Database>, CliError> {
    let config = DatabaseConfig::from_env().ok_or_else(|| CliError::Invalid {
        message: "Set DATABASE_URL or PARCEL_DB_* to reach the parcel store".to_string(),
    })?;
    Ok(db::connect(&config).await?)
}

async fn crawl_all(
    list: &Path,
    out_dir: &Path,
    options: &CrawlOptions,
) -> Result<Vec<String>, CliError> {
    let entries = counties::load(list)?;
    if entries.is_empty() {
        return Err(CliError::Invalid {
            message: "No counties with a valid bbox in list".to_string(),
        });
    }

    std::fs::create_dir_all(out_dir)?;
    let mut failed = Vec::new();
    let total = entries.len();

    for (i, entry) in entries.iter().enumerate() {
        let label = format!("{}/{}", entry.state, entry.county);
        let out_path = out_dir.join(entry.output_file_name());
        log::info!("[{}/{total}] {label} -> {}", i + 1, out_path.display());

        if entry.parcel_layer_url.is_empty() {
            log::error!("{label}: no parcel_layer_url");
            failed.push(label);
            continue;
        }

        match crawl_bbox(&entry.parcel_layer_url, &entry.bbox, options).await {
            Ok(collection) => {
                write_collection(&out_path, &collection)?;
                log::info!("{label}: wrote {} feature(s)", collection.len());
            }
            Err(e) => {
                log::error!("{label}: {e}");
                failed.push(label);
            }
        }
    }

    Ok(failed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(parcel_api_server::serve())
            })
            .await??;
        }
        Commands::Crawl {
            url,
            bbox,
            out,
            limit,
            delay,
        } => {
            let bbox = bbox_from_args(&bbox)?;
            let options = crawl_options(limit, delay)?;
            let collection = crawl_bbox(&url, &bbox, &options).await?;

            if let Some(out) = out {
                write_collection(&out, &collection)?;
                log::info!("Wrote {} feature(s) to {}", collection.len(), out.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&collection)?);
            }
        }
        Commands::CrawlAll {
            list,
            out_dir,
            limit,
            delay,
        } => {
            let options = crawl_options(limit, delay)?;
            let failed = crawl_all(&list, &out_dir, &options).await?;

            if !failed.is_empty() {
                log::error!("Failed: {}", failed.join(", "));
                std::process::exit(1);
            }
            log::info!("Done. County files in {}", out_dir.display());
        }
        Commands::Load {
            files,
            state,
            county,
        } => {
            let db = connect().await?;
            ensure_schema(db.as_ref()).await?;

            let mut total = 0;
            for path in &files {
                if !load::is_geojson_path(path) {
                    continue;
                }
                if !path.is_file() {
                    log::warn!("Skip (not a file): {}", path.display());
                    continue;
                }
                let inserted =
                    load::load_file(db.as_ref(), path, state.as_deref(), county.as_deref())
                        .await?;
                log::info!("Loaded {inserted} feature(s) from {}", path.display());
                total += inserted;
            }
            log::info!("Total: {total} parcel(s) loaded");
        }
        Commands::Migrate => {
            log::info!("Creating parcel schema...");
            let db = connect().await?;
            ensure_schema(db.as_ref()).await?;
            log::info!("Migrations complete.");
        }
    }

    Ok(())
}
