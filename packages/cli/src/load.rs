//! Loads normalized parcel `GeoJSON` files into the `parcels` table.

use std::path::Path;

use parcel_api_database::queries;
use parcel_api_parcel_models::ParcelFeature;
use switchy_database::Database;

use crate::CliError;

/// Returns `true` for files the loader accepts (`.geojson` or `.json`).
#[must_use]
pub fn is_geojson_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
}

/// Reads the features of a `FeatureCollection` file. Entries that are not
/// `Feature` objects are dropped.
///
/// # Errors
///
/// Returns [`CliError`] if the file cannot be read or is not JSON.
pub fn read_features(path: &Path) -> Result<Vec<ParcelFeature>, CliError> {
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;

    Ok(value
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map(|features| {
            features
                .iter()
                .filter(|f| f.get("type").and_then(serde_json::Value::as_str) == Some("Feature"))
                .filter_map(ParcelFeature::from_value)
                .collect()
        })
        .unwrap_or_default())
}

/// Inserts every feature with a geometry from `path`. Returns the number
/// of rows inserted.
///
/// # Errors
///
/// Returns [`CliError`] if the file cannot be read or an insert fails.
pub async fn load_file(
    db: &dyn Database,
    path: &Path,
    default_state: Option<&str>,
    default_county: Option<&str>,
) -> Result<u64, CliError> {
    let features = read_features(path)?;
    let mut inserted = 0;

    for feature in &features {
        if queries::insert_feature(db, feature, default_state, default_county).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
