#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for parcel lookups.
//!
//! Exposes bounding-box, point, and APN lookups as `GeoJSON`
//! `FeatureCollection` responses. Every lookup is answered by the
//! [`Resolver`], which falls back from the `PostGIS` store to the county
//! `ArcGIS` layer and bundled demo data; a missing store is a normal
//! configuration, not a startup error.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use parcel_api_resolver::{ParcelConfig, Resolver};
use parcel_api_server_models::ApiError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8001;

/// Shared application state.
pub struct AppState {
    /// Parcel resolution engine.
    pub resolver: Arc<Resolver>,
}

/// Registers the API routes and the JSON query-error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        let body = ApiError {
            error: err.to_string(),
        };
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(query_config)
        .route("/", web::get().to(handlers::root))
        .route("/health", web::get().to(handlers::health))
        .route("/parcels", web::get().to(handlers::parcels_in_bbox))
        .route("/parcels/point", web::get().to(handlers::parcels_at_point))
        .route("/parcels/by-apn", web::get().to(handlers::parcels_by_apn));
}

/// Initializes logging from `RUST_LOG` and runs [`serve`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if [`serve`] fails.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    serve().await
}

/// Starts the parcel API server.
///
/// Reads source configuration from the environment, loads the demo
/// dataset, and starts the Actix-Web HTTP server on `BIND_ADDR:PORT`
/// (default `127.0.0.1:8001`). The store connection is opened lazily on
/// the first lookup. This is a regular async function; the caller is
/// responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`) and for initializing logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if a configured source cannot be
/// initialized, or if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve() -> std::io::Result<()> {
    let config = ParcelConfig::from_env();
    let resolver = Resolver::from_config(&config).map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        resolver: Arc::new(resolver),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
