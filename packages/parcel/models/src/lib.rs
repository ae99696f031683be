#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel feature, feature collection, and query types.
//!
//! These types are shared by every parcel data source (spatial database,
//! county `ArcGIS` layer, demo dataset) and by the HTTP layer. Features
//! serialize as standard `GeoJSON` `Feature` / `FeatureCollection` objects
//! with geometry in EPSG:4326 longitude/latitude order.

use serde::{Deserialize, Serialize};

/// Free-form parcel attributes, keyed by attribute name.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Default result cap for bounding-box lookups.
pub const DEFAULT_BBOX_LIMIT: u32 = 500;

/// Hard maximum result cap for bounding-box lookups.
pub const MAX_BBOX_LIMIT: u32 = 2000;

/// Default result cap for point lookups.
pub const DEFAULT_POINT_LIMIT: u32 = 5;

/// Hard maximum result cap for point lookups.
pub const MAX_POINT_LIMIT: u32 = 20;

/// Maximum number of parcels returned for a single APN lookup.
pub const MAX_APN_MATCHES: usize = 5;

/// Maximum number of demo features held in memory.
pub const DEMO_FEATURE_CAP: usize = 500;

/// Half-width in degrees of the envelope used to approximate a point
/// lookup when no spatial engine is available (roughly 100 m).
pub const POINT_SEARCH_RADIUS_DEG: f64 = 0.001;

/// A geographic bounding box in WGS84 degrees.
///
/// Callers are expected to supply `min <= max` on both axes; boxes are not
/// validated beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub min_lon: f64,
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Eastern longitude boundary.
    pub max_lon: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Creates a degenerate box whose corners are both the given point.
    #[must_use]
    pub const fn from_point(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, lon, lat)
    }

    /// Creates a square box of half-width `radius` degrees centered on a
    /// point.
    #[must_use]
    pub fn around_point(lon: f64, lat: f64, radius: f64) -> Self {
        Self::new(lon - radius, lat - radius, lon + radius, lat + radius)
    }
}

/// A single parcel: geometry plus attributes.
///
/// `geometry` is kept as raw `GeoJSON` so that whatever a source returns
/// is handed back to the caller untouched, even when it is not a
/// well-formed polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct ParcelFeature {
    /// Canonical attributes plus any unmapped source attributes.
    #[serde(default)]
    pub properties: Properties,
    /// `GeoJSON` geometry (`Polygon`, `MultiPolygon`, or `Point`), or `null`.
    #[serde(default)]
    pub geometry: serde_json::Value,
}

impl ParcelFeature {
    /// Creates a feature from attributes and a raw `GeoJSON` geometry.
    #[must_use]
    pub const fn new(properties: Properties, geometry: serde_json::Value) -> Self {
        Self {
            properties,
            geometry,
        }
    }

    /// Builds a feature from an arbitrary `GeoJSON` feature object.
    ///
    /// Unlike deserialization this is lenient: a missing `type` is
    /// accepted, missing or non-object `properties` become empty, and a
    /// missing geometry becomes `null`. Returns `None` only when the value
    /// is not an object or declares a `type` other than `Feature`.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;

        if let Some(kind) = obj.get("type")
            && kind.as_str() != Some("Feature")
        {
            return None;
        }

        let properties = obj
            .get("properties")
            .and_then(serde_json::Value::as_object)
            .cloned()
            .unwrap_or_default();
        let geometry = obj
            .get("geometry")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        Some(Self::new(properties, geometry))
    }

    /// Returns an attribute rendered as text.
    ///
    /// Strings are returned as-is and numbers in their JSON form; any other
    /// value (including `null`) yields `None`.
    #[must_use]
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// An ordered list of parcels, serialized as a `GeoJSON`
/// `FeatureCollection`.
///
/// Order is the order in which the answering source produced the
/// features; no spatial or relevance sorting is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// The features, in source order.
    #[serde(default)]
    pub features: Vec<ParcelFeature>,
}

impl FeatureCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Returns the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl From<Vec<ParcelFeature>> for FeatureCollection {
    fn from(features: Vec<ParcelFeature>) -> Self {
        Self { features }
    }
}

/// An assessor parcel number lookup with optional location filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnQuery {
    /// The parcel identifier as typed by the caller (separators allowed).
    pub apn: String,
    /// Optional two-letter state filter.
    pub state: Option<String>,
    /// Optional county filter.
    pub county: Option<String>,
}

impl ApnQuery {
    /// Creates an APN query with no location filters.
    #[must_use]
    pub fn new(apn: impl Into<String>) -> Self {
        Self {
            apn: apn.into(),
            state: None,
            county: None,
        }
    }

    /// Adds state and county filters.
    #[must_use]
    pub fn in_county(mut self, state: impl Into<String>, county: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self.county = Some(county.into());
        self
    }

    /// Returns the state and county filters, but only when both are
    /// present and non-blank. Location filtering applies to neither
    /// otherwise.
    #[must_use]
    pub fn state_and_county(&self) -> Option<(&str, &str)> {
        let state = self.state.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let county = self.county.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((state, county))
    }
}

/// A parcel lookup handled by the resolution engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelQuery {
    /// Parcels intersecting an envelope.
    BoundingBox {
        /// Query envelope.
        bbox: BoundingBox,
        /// Maximum number of parcels to return.
        limit: u32,
    },
    /// Parcels containing a point.
    Point {
        /// Longitude (WGS84).
        lon: f64,
        /// Latitude (WGS84).
        lat: f64,
        /// Maximum number of parcels to return.
        limit: u32,
    },
    /// Parcels matching an assessor parcel number.
    Apn(ApnQuery),
}

impl ParcelQuery {
    /// Short label for log messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BoundingBox { .. } => "bbox",
            Self::Point { .. } => "point",
            Self::Apn(_) => "apn",
        }
    }
}
