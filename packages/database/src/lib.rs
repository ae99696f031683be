#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `PostGIS` access for parcel lookups.
//!
//! Uses `switchy_database` raw SQL (`query_raw_params()`) for all spatial
//! predicates. The store is optional at runtime: callers treat a
//! [`DbError::Connection`] as "store unavailable" and fall back to other
//! parcel sources.

pub mod db;
pub mod queries;
pub mod row;

use switchy_database::Database;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The store could not be reached or the connection settings are
    /// invalid.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Creates the `parcels` table and its indexes if they don't already
/// exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails (for example when the
/// `PostGIS` extension is not installed).
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS parcels (
            id           SERIAL PRIMARY KEY,
            apn          TEXT,
            address      TEXT,
            owner        TEXT,
            acres        NUMERIC,
            legal_desc   TEXT,
            market_value NUMERIC,
            state        TEXT,
            county       TEXT,
            geom         GEOMETRY(Geometry, 4326)
        )",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_parcels_geom ON parcels USING GIST (geom)")
        .await?;
    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_parcels_apn ON parcels (apn)")
        .await?;
    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_parcels_state_county ON parcels (state, county)")
        .await?;

    log::info!("Parcel schema is up to date");
    Ok(())
}
