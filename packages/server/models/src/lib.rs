#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the parcel API server.
//!
//! Parcel lookups answer with a bare `GeoJSON` `FeatureCollection`
//! ([`parcel_api_parcel_models::FeatureCollection`]); the types here cover
//! query parameters and the service's own JSON documents.

use parcel_api_parcel_models::{
    ApnQuery, BoundingBox, DEFAULT_BBOX_LIMIT, DEFAULT_POINT_LIMIT, MAX_BBOX_LIMIT,
    MAX_POINT_LIMIT,
};
use serde::{Deserialize, Serialize};

/// A query parameter outside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidParam {
    /// Human-readable description, returned to the caller.
    pub message: String,
}

fn checked_limit(limit: Option<u32>, default: u32, max: u32) -> Result<u32, InvalidParam> {
    match limit {
        None => Ok(default),
        Some(limit) if limit <= max => Ok(limit),
        Some(limit) => Err(InvalidParam {
            message: format!("limit must be at most {max} (got {limit})"),
        }),
    }
}

/// Query parameters for `GET /parcels`.
#[derive(Debug, Clone, Deserialize)]
pub struct BboxQueryParams {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Maximum number of parcels (default 500, at most 2000).
    pub limit: Option<u32>,
}

impl BboxQueryParams {
    /// The requested envelope.
    #[must_use]
    pub const fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    /// The effective limit.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParam`] if `limit` exceeds [`MAX_BBOX_LIMIT`].
    pub fn limit(&self) -> Result<u32, InvalidParam> {
        checked_limit(self.limit, DEFAULT_BBOX_LIMIT, MAX_BBOX_LIMIT)
    }
}

/// Query parameters for `GET /parcels/point`.
#[derive(Debug, Clone, Deserialize)]
pub struct PointQueryParams {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Maximum number of parcels (default 5, at most 20).
    pub limit: Option<u32>,
}

impl PointQueryParams {
    /// The effective limit.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParam`] if `limit` exceeds [`MAX_POINT_LIMIT`].
    pub fn limit(&self) -> Result<u32, InvalidParam> {
        checked_limit(self.limit, DEFAULT_POINT_LIMIT, MAX_POINT_LIMIT)
    }
}

/// Query parameters for `GET /parcels/by-apn`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApnQueryParams {
    /// Parcel number as printed (separators allowed).
    pub apn: String,
    /// Two-letter state, applied only together with `county`.
    pub state: Option<String>,
    /// County name, applied only together with `state`.
    pub county: Option<String>,
}

impl ApnQueryParams {
    /// Converts to a resolver query.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidParam`] if `apn` is blank.
    pub fn into_query(self) -> Result<ApnQuery, InvalidParam> {
        let apn = self.apn.trim();
        if apn.is_empty() {
            return Err(InvalidParam {
                message: "apn must not be blank".to_string(),
            });
        }

        Ok(ApnQuery {
            apn: apn.to_string(),
            state: self.state,
            county: self.county,
        })
    }
}

/// Endpoint listing returned by `GET /`.
#[derive(Debug, Serialize)]
pub struct ApiEndpoints {
    /// Bounding-box lookup usage.
    pub parcels_bbox: &'static str,
    /// Point lookup usage.
    pub parcels_point: &'static str,
    /// APN lookup usage.
    pub parcels_by_apn: &'static str,
}

/// Service description returned by `GET /`.
#[derive(Debug, Serialize)]
pub struct ApiRoot {
    /// Service name.
    pub message: &'static str,
    /// Query endpoints.
    pub endpoints: ApiEndpoints,
}

impl Default for ApiRoot {
    fn default() -> Self {
        Self {
            message: "Parcel API",
            endpoints: ApiEndpoints {
                parcels_bbox: "GET /parcels?min_lon=&min_lat=&max_lon=&max_lat=&limit=",
                parcels_point: "GET /parcels/point?lat=&lon=&limit=",
                parcels_by_apn: "GET /parcels/by-apn?apn=&state=&county=",
            },
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body for rejected requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// What was wrong with the request.
    pub error: String,
}

impl From<InvalidParam> for ApiError {
    fn from(value: InvalidParam) -> Self {
        Self {
            error: value.message,
        }
    }
}
