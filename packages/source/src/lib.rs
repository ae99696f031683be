#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parcel sources.
//!
//! Each backend that can answer parcel lookups implements the
//! [`ParcelSource`] trait: the `PostGIS` store ([`postgis`]), a county
//! `ArcGIS` `FeatureServer` layer ([`arcgis`]), and the bundled demo
//! dataset ([`demo`]). The [`crawl`] module pages whole bounding boxes out
//! of an `ArcGIS` layer for bulk loading.

pub mod arcgis;
pub mod crawl;
pub mod demo;
pub mod postgis;
pub mod retry;

use async_trait::async_trait;
use parcel_api_database::DbError;
use parcel_api_parcel_models::{ParcelFeature, ParcelQuery};

/// Errors that can occur while querying a parcel source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parcel store query failed.
    #[error("Parcel store error: {0}")]
    Database(#[from] DbError),

    /// The source is not configured or cannot be reached.
    #[error("Source unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// The source cannot answer this kind of query.
    #[error("Source {source_id} does not support {kind} queries")]
    Unsupported {
        /// Identifier of the source.
        source_id: String,
        /// Query kind (see [`ParcelQuery::kind`]).
        kind: &'static str,
    },

    /// The remote service answered with an error payload.
    #[error("Remote service error: {message}")]
    Remote {
        /// Message reported by the service.
        message: String,
    },
}

/// Trait that all parcel sources implement.
///
/// A source answers a [`ParcelQuery`] with raw parcel features in the
/// order it produced them. Normalization onto the canonical schema is the
/// caller's job.
#[async_trait]
pub trait ParcelSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"postgis"`).
    fn id(&self) -> &str;

    /// Runs a parcel lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source is unavailable, does not
    /// support the query kind, or the lookup fails.
    async fn query(&self, query: &ParcelQuery) -> Result<Vec<ParcelFeature>, SourceError>;
}

/// Converts a `u32` result limit to a `usize` for truncating vectors.
#[must_use]
pub fn limit_to_usize(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}
