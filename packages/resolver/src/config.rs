//! Process-wide parcel source configuration, read once at startup.

use std::path::PathBuf;

use parcel_api_database::db::DatabaseConfig;
use parcel_api_source::demo::DEFAULT_DEMO_PATH;

/// Source settings for a [`crate::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelConfig {
    /// `PostGIS` store connection, if any.
    pub database: Option<DatabaseConfig>,
    /// County `ArcGIS` layer URL (`PARCEL_ARCGIS_LAYER_URL`).
    pub arcgis_layer_url: Option<String>,
    /// APN field override for the county layer (`PARCEL_ARCGIS_APN_FIELD`).
    pub arcgis_apn_field: Option<String>,
    /// Demo dataset path (`PARCEL_DEMO_GEOJSON`).
    pub demo_path: PathBuf,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            database: None,
            arcgis_layer_url: None,
            arcgis_apn_field: None,
            demo_path: PathBuf::from(DEFAULT_DEMO_PATH),
        }
    }
}

impl ParcelConfig {
    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            database: DatabaseConfig::from_lookup(&lookup),
            arcgis_layer_url: get("PARCEL_ARCGIS_LAYER_URL"),
            arcgis_apn_field: get("PARCEL_ARCGIS_APN_FIELD"),
            demo_path: get("PARCEL_DEMO_GEOJSON")
                .map_or_else(|| PathBuf::from(DEFAULT_DEMO_PATH), PathBuf::from),
        }
    }
}
