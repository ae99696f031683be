//! Demo parcel source.
//!
//! Serves a small bundled `GeoJSON` file so the service answers something
//! useful with no store or county layer configured. The file is read once
//! at startup; a missing or malformed file yields an empty dataset rather
//! than an error.

use std::path::Path;

use async_trait::async_trait;
use parcel_api_parcel_models::{
    ApnQuery, BoundingBox, DEMO_FEATURE_CAP, MAX_APN_MATCHES, POINT_SEARCH_RADIUS_DEG,
    ParcelFeature, ParcelQuery,
};
use parcel_api_schema::normalize_apn;
use parcel_api_spatial::FeatureIndex;

use crate::{ParcelSource, SourceError, limit_to_usize};

/// Default location of the demo dataset, relative to the working
/// directory.
pub const DEFAULT_DEMO_PATH: &str = "data/demo_parcels.geojson";

/// In-memory parcel source over a fixed feature list.
pub struct DemoSource {
    features: Vec<ParcelFeature>,
    index: FeatureIndex,
}

impl DemoSource {
    /// Wraps an already loaded feature list, keeping at most
    /// [`DEMO_FEATURE_CAP`] features.
    #[must_use]
    pub fn from_features(mut features: Vec<ParcelFeature>) -> Self {
        features.truncate(DEMO_FEATURE_CAP);
        let index = FeatureIndex::build(&features);
        Self { features, index }
    }

    /// Loads the dataset at `path`.
    ///
    /// Never fails: an unreadable or unparseable file is logged and
    /// treated as an empty dataset.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match read_features(path) {
            Ok(features) => {
                log::info!(
                    "Loaded {} demo parcel(s) from {}",
                    features.len().min(DEMO_FEATURE_CAP),
                    path.display()
                );
                Self::from_features(features)
            }
            Err(e) => {
                log::warn!("Demo parcels unavailable ({}): {e}", path.display());
                Self::from_features(Vec::new())
            }
        }
    }

    /// Number of loaded features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if no features are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose geometry envelope intersects `bbox`, in dataset
    /// order, at most `limit`.
    #[must_use]
    pub fn in_bbox(&self, bbox: &BoundingBox, limit: usize) -> Vec<ParcelFeature> {
        self.index
            .intersecting(bbox, limit)
            .into_iter()
            .filter_map(|i| self.features.get(i).cloned())
            .collect()
    }

    /// Features near a point.
    ///
    /// Approximates containment with a square of
    /// [`POINT_SEARCH_RADIUS_DEG`] around the point, so parcels adjacent to
    /// the point may also be returned.
    #[must_use]
    pub fn at_point(&self, lon: f64, lat: f64, limit: usize) -> Vec<ParcelFeature> {
        let bbox = BoundingBox::around_point(lon, lat, POINT_SEARCH_RADIUS_DEG);
        self.in_bbox(&bbox, limit)
    }

    /// Features whose `apn` has the same digits as the query.
    ///
    /// State and county filters apply only when both are given; state is
    /// compared case-insensitively after trimming, as is county.
    #[must_use]
    pub fn by_apn(&self, query: &ApnQuery) -> Vec<ParcelFeature> {
        let digits = normalize_apn(&query.apn);
        if digits.is_empty() {
            return Vec::new();
        }
        let location = query
            .state_and_county()
            .map(|(state, county)| (state.to_uppercase(), county.to_lowercase()));

        self.features
            .iter()
            .filter(|f| {
                f.property_text("apn")
                    .is_some_and(|apn| normalize_apn(&apn) == digits)
            })
            .filter(|f| {
                location.as_ref().is_none_or(|(state, county)| {
                    let f_state = f.property_text("state").unwrap_or_default();
                    let f_county = f.property_text("county").unwrap_or_default();
                    f_state.trim().to_uppercase() == *state
                        && f_county.trim().to_lowercase() == *county
                })
            })
            .take(MAX_APN_MATCHES)
            .cloned()
            .collect()
    }
}

fn read_features(path: &Path) -> Result<Vec<ParcelFeature>, SourceError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let features = value
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map(|features| {
            features
                .iter()
                .filter_map(ParcelFeature::from_value)
                .collect()
        })
        .unwrap_or_default();

    Ok(features)
}

#[async_trait]
impl ParcelSource for DemoSource {
    fn id(&self) -> &'static str {
        "demo"
    }

    async fn query(&self, query: &ParcelQuery) -> Result<Vec<ParcelFeature>, SourceError> {
        Ok(match query {
            ParcelQuery::BoundingBox { bbox, limit } => self.in_bbox(bbox, limit_to_usize(*limit)),
            ParcelQuery::Point { lon, lat, limit } => {
                self.at_point(*lon, *lat, limit_to_usize(*limit))
            }
            ParcelQuery::Apn(apn) => self.by_apn(apn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(apn: &str, state: &str, county: &str, lon: f64, lat: f64) -> ParcelFeature {
        ParcelFeature::from_value(&json!({
            "type": "Feature",
            "properties": {"apn": apn, "state": state, "county": county},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [lon, lat], [lon + 0.01, lat], [lon + 0.01, lat + 0.01],
                    [lon, lat + 0.01], [lon, lat]
                ]]
            }
        }))
        .unwrap()
    }

    fn sample() -> DemoSource {
        DemoSource::from_features(vec![
            square("123-456", "TX", "Harris", -95.40, 29.70),
            square("123456", "TX", "Fort Bend", -95.50, 29.60),
            square("999-000", "TX", "Harris", -95.30, 29.80),
        ])
    }

    fn apns(features: &[ParcelFeature]) -> Vec<String> {
        features
            .iter()
            .filter_map(|f| f.property_text("apn"))
            .collect()
    }

    #[test]
    fn bbox_returns_intersecting_in_dataset_order() {
        let demo = sample();
        let bbox = BoundingBox::new(-95.6, 29.5, -95.35, 29.75);
        assert_eq!(apns(&demo.in_bbox(&bbox, 10)), vec!["123-456", "123456"]);
        assert_eq!(apns(&demo.in_bbox(&bbox, 1)), vec!["123-456"]);
    }

    #[test]
    fn point_uses_a_small_envelope() {
        let demo = sample();
        assert_eq!(apns(&demo.at_point(-95.395, 29.705, 5)), vec!["123-456"]);
        // Just outside the parcel edge but inside the search radius.
        assert_eq!(apns(&demo.at_point(-95.3895, 29.705, 5)), vec!["123-456"]);
        assert!(demo.at_point(-90.0, 30.0, 5).is_empty());
    }

    #[test]
    fn apn_matches_on_digits() {
        let demo = sample();
        assert_eq!(
            apns(&demo.by_apn(&ApnQuery::new("123456"))),
            vec!["123-456", "123456"]
        );
        assert!(demo.by_apn(&ApnQuery::new("---")).is_empty());
        assert!(demo.by_apn(&ApnQuery::new("555")).is_empty());
    }

    #[test]
    fn apn_location_filter_needs_both_parts() {
        let demo = sample();
        let query = ApnQuery::new("123456").in_county(" tx ", "FORT BEND");
        assert_eq!(apns(&demo.by_apn(&query)), vec!["123456"]);

        let mut state_only = ApnQuery::new("123456");
        state_only.state = Some("CA".to_string());
        assert_eq!(demo.by_apn(&state_only).len(), 2);
    }

    #[test]
    fn apn_matches_are_capped() {
        let features = (0..8)
            .map(|i| square("42", "TX", "Harris", -95.0 + f64::from(i), 29.0))
            .collect();
        let demo = DemoSource::from_features(features);
        assert_eq!(demo.by_apn(&ApnQuery::new("42")).len(), MAX_APN_MATCHES);
    }

    #[test]
    fn dataset_is_capped() {
        let features = (0..DEMO_FEATURE_CAP + 10)
            .map(|_| square("1", "TX", "Harris", -95.0, 29.0))
            .collect();
        assert_eq!(DemoSource::from_features(features).len(), DEMO_FEATURE_CAP);
    }

    #[test]
    fn missing_file_is_empty() {
        let demo = DemoSource::load(Path::new("/nonexistent/demo_parcels.geojson"));
        assert!(demo.is_empty());
    }

    #[test]
    fn loads_feature_collection_file() {
        let path = std::env::temp_dir().join(format!(
            "parcel_api_demo_{}.geojson",
            std::process::id()
        ));
        std::fs::write(
            &path,
            json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"apn": "1"}, "geometry": null},
                    {"type": "Feature", "properties": {"apn": "2"}, "geometry": null},
                ]
            })
            .to_string(),
        )
        .unwrap();

        let demo = DemoSource::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(demo.len(), 2);
    }

    #[tokio::test]
    async fn answers_every_query_kind() {
        let demo = sample();
        let found = demo
            .query(&ParcelQuery::BoundingBox {
                bbox: BoundingBox::new(-96.0, 29.0, -95.0, 30.0),
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let found = demo
            .query(&ParcelQuery::Apn(ApnQuery::new("999000")))
            .await
            .unwrap();
        assert_eq!(apns(&found), vec!["999-000"]);
    }
}
