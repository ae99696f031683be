#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Tiered parcel resolution.
//!
//! Each lookup walks an ordered list of [`Tier`]s and answers with the
//! first tier that produces features. A tier that fails is logged and
//! treated as having produced nothing; whether the walk then continues
//! depends on the tier's [`Fallthrough`] policy. Results are never merged
//! across tiers and every returned feature has been normalized onto the
//! canonical schema.
//!
//! | Query      | Tiers                                                    |
//! |------------|----------------------------------------------------------|
//! | bbox/point | store (falls through on failure only), demo              |
//! | APN        | store, county layer if configured, else demo             |

pub mod config;

use std::sync::Arc;

use parcel_api_database::db::DatabaseConfig;
use parcel_api_parcel_models::{
    ApnQuery, BoundingBox, FeatureCollection, MAX_APN_MATCHES, ParcelQuery,
};
use parcel_api_schema::normalize_feature;
use parcel_api_source::arcgis::ArcGisSource;
use parcel_api_source::demo::DemoSource;
use parcel_api_source::postgis::PostgisSource;
use parcel_api_source::{ParcelSource, SourceError, limit_to_usize};

pub use config::ParcelConfig;

/// Errors that can occur while assembling a [`Resolver`].
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A configured source could not be constructed.
    #[error("Failed to initialize parcel source: {0}")]
    Source(#[from] SourceError),
}

/// When the walk moves past a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallthrough {
    /// Continue when the tier fails or answers with no features.
    OnEmptyOrFailure,
    /// Continue only when the tier fails; an empty answer is final.
    OnFailure,
    /// The tier's answer is final, even when it fails.
    Never,
}

/// One source in a resolution chain.
#[derive(Clone)]
pub struct Tier {
    source: Arc<dyn ParcelSource>,
    fallthrough: Fallthrough,
}

impl Tier {
    /// Creates a tier.
    #[must_use]
    pub fn new(source: Arc<dyn ParcelSource>, fallthrough: Fallthrough) -> Self {
        Self {
            source,
            fallthrough,
        }
    }

    /// Identifier of the tier's source.
    #[must_use]
    pub fn id(&self) -> &str {
        self.source.id()
    }
}

impl std::fmt::Debug for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tier")
            .field("source", &self.source.id())
            .field("fallthrough", &self.fallthrough)
            .finish()
    }
}

/// Resolves parcel lookups across the configured sources.
#[derive(Debug, Clone)]
pub struct Resolver {
    spatial: Vec<Tier>,
    apn: Vec<Tier>,
}

impl Resolver {
    /// Assembles the resolution chains from individual sources.
    ///
    /// `store` is consulted first for every query. `remote` answers APN
    /// lookups only; when it is present the demo source is never consulted
    /// for APN lookups, so a failing county layer does not leak demo
    /// parcels.
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn ParcelSource>>,
        remote: Option<Arc<dyn ParcelSource>>,
        demo: Arc<dyn ParcelSource>,
    ) -> Self {
        let mut spatial = Vec::new();
        let mut apn = Vec::new();

        if let Some(store) = store {
            spatial.push(Tier::new(Arc::clone(&store), Fallthrough::OnFailure));
            apn.push(Tier::new(store, Fallthrough::OnEmptyOrFailure));
        }

        spatial.push(Tier::new(Arc::clone(&demo), Fallthrough::Never));
        match remote {
            Some(remote) => apn.push(Tier::new(remote, Fallthrough::Never)),
            None => apn.push(Tier::new(demo, Fallthrough::Never)),
        }

        Self { spatial, apn }
    }

    /// Builds the store, county layer, and demo sources described by
    /// `config`.
    ///
    /// The store tier is always present; when no connection is configured
    /// it reports itself unavailable and lookups fall through.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError`] if the county layer client cannot be
    /// built.
    pub fn from_config(config: &ParcelConfig) -> Result<Self, ResolverError> {
        let store: Arc<dyn ParcelSource> = Arc::new(PostgisSource::new(config.database.clone()));

        match config.database.as_ref().map(DatabaseConfig::redacted_url) {
            Some(url) => log::info!("Parcel store: {url}"),
            None => log::info!("Parcel store not configured; spatial lookups use demo data"),
        }

        let remote = match &config.arcgis_layer_url {
            Some(url) => {
                let source = ArcGisSource::new(url, config.arcgis_apn_field.clone())?;
                log::info!("County parcel layer: {}", source.endpoint());
                Some(Arc::new(source) as Arc<dyn ParcelSource>)
            }
            None => None,
        };

        let demo: Arc<dyn ParcelSource> = Arc::new(DemoSource::load(&config.demo_path));

        Ok(Self::new(Some(store), remote, demo))
    }

    /// The tiers consulted for bounding-box and point lookups, in order.
    #[must_use]
    pub fn spatial_tiers(&self) -> &[Tier] {
        &self.spatial
    }

    /// The tiers consulted for APN lookups, in order.
    #[must_use]
    pub fn apn_tiers(&self) -> &[Tier] {
        &self.apn
    }

    /// Parcels intersecting `bbox`, at most `limit`.
    pub async fn by_bbox(&self, bbox: BoundingBox, limit: u32) -> FeatureCollection {
        let query = ParcelQuery::BoundingBox { bbox, limit };
        resolve(&self.spatial, &query, limit_to_usize(limit)).await
    }

    /// Parcels containing (or, from demo data, near) the point, at most
    /// `limit`.
    pub async fn at_point(&self, lon: f64, lat: f64, limit: u32) -> FeatureCollection {
        let query = ParcelQuery::Point { lon, lat, limit };
        resolve(&self.spatial, &query, limit_to_usize(limit)).await
    }

    /// Parcels matching an assessor parcel number, at most
    /// [`MAX_APN_MATCHES`].
    pub async fn by_apn(&self, query: ApnQuery) -> FeatureCollection {
        resolve(&self.apn, &ParcelQuery::Apn(query), MAX_APN_MATCHES).await
    }
}

async fn resolve(tiers: &[Tier], query: &ParcelQuery, cap: usize) -> FeatureCollection {
    for tier in tiers {
        match tier.source.query(query).await {
            Ok(features) if !features.is_empty() => {
                log::debug!(
                    "{} lookup answered by {} with {} feature(s)",
                    query.kind(),
                    tier.id(),
                    features.len()
                );
                return features
                    .into_iter()
                    .take(cap)
                    .map(normalize_feature)
                    .collect::<Vec<_>>()
                    .into();
            }
            Ok(_) => {
                log::debug!("{} lookup: {} found nothing", query.kind(), tier.id());
                if tier.fallthrough != Fallthrough::OnEmptyOrFailure {
                    break;
                }
            }
            Err(e) => {
                log::warn!("{} lookup: {} failed: {e}", query.kind(), tier.id());
                if tier.fallthrough == Fallthrough::Never {
                    break;
                }
            }
        }
    }

    FeatureCollection::empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parcel_api_parcel_models::{ParcelFeature, Properties};
    use serde_json::json;

    enum Behavior {
        Features(Vec<ParcelFeature>),
        Unavailable,
    }

    struct FakeSource {
        id: &'static str,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(id: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn erased(source: &Arc<FakeSource>) -> Arc<dyn ParcelSource> {
        source.clone()
    }

    #[async_trait]
    impl ParcelSource for FakeSource {
        fn id(&self) -> &str {
            self.id
        }

        async fn query(&self, _query: &ParcelQuery) -> Result<Vec<ParcelFeature>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Features(features) => Ok(features.clone()),
                Behavior::Unavailable => Err(SourceError::Unavailable {
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn feature(props: serde_json::Value) -> ParcelFeature {
        let properties: Properties = props.as_object().cloned().unwrap();
        ParcelFeature::new(
            properties,
            json!({"type": "Point", "coordinates": [-95.0, 29.7]}),
        )
    }

    fn square(apn: &str, lon: f64) -> ParcelFeature {
        ParcelFeature::from_value(&json!({
            "type": "Feature",
            "properties": {"apn": apn},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[lon, 29.0], [lon + 0.1, 29.0], [lon + 0.1, 29.1], [lon, 29.0]]]
            }
        }))
        .unwrap()
    }

    fn apns(collection: &FeatureCollection) -> Vec<String> {
        collection
            .features
            .iter()
            .filter_map(|f| f.property_text("apn"))
            .collect()
    }

    #[tokio::test]
    async fn remote_answer_wins_over_demo() {
        let store = FakeSource::new("store", Behavior::Unavailable);
        let remote = FakeSource::new(
            "remote",
            Behavior::Features(vec![feature(json!({"ACCT_NUM": "123-456"}))]),
        );
        let demo = FakeSource::new(
            "demo",
            Behavior::Features(vec![feature(json!({"apn": "123456"}))]),
        );

        let resolver = Resolver::new(Some(erased(&store)), Some(erased(&remote)), demo.clone());
        let result = resolver.by_apn(ApnQuery::new("123456")).await;

        assert_eq!(apns(&result), vec!["123-456"]);
        assert_eq!(store.calls(), 1);
        assert_eq!(remote.calls(), 1);
        assert_eq!(demo.calls(), 0);
    }

    #[tokio::test]
    async fn unconfigured_remote_falls_through_to_demo() {
        let store = FakeSource::new("store", Behavior::Unavailable);
        let demo = DemoSource::from_features(vec![square("123-456", -95.0)]);

        let resolver = Resolver::new(Some(erased(&store)), None, Arc::new(demo));
        let result = resolver.by_apn(ApnQuery::new("123456")).await;

        assert_eq!(apns(&result), vec!["123-456"]);
    }

    #[tokio::test]
    async fn failing_remote_never_leaks_demo_data() {
        let remote = FakeSource::new("remote", Behavior::Unavailable);
        let demo = FakeSource::new("demo", Behavior::Features(vec![square("123-456", -95.0)]));

        let resolver = Resolver::new(None, Some(erased(&remote)), demo.clone());
        assert!(resolver.by_apn(ApnQuery::new("123456")).await.is_empty());

        let empty_remote = FakeSource::new("remote", Behavior::Features(Vec::new()));
        let resolver = Resolver::new(None, Some(erased(&empty_remote)), demo.clone());
        assert!(resolver.by_apn(ApnQuery::new("123456")).await.is_empty());

        assert_eq!(demo.calls(), 0);
    }

    #[tokio::test]
    async fn empty_store_falls_through_for_apn_lookups() {
        let store = FakeSource::new("store", Behavior::Features(Vec::new()));
        let demo = FakeSource::new("demo", Behavior::Features(vec![square("7", -95.0)]));

        let resolver = Resolver::new(Some(erased(&store)), None, demo);
        assert_eq!(apns(&resolver.by_apn(ApnQuery::new("7")).await), vec!["7"]);
    }

    #[tokio::test]
    async fn store_answer_is_final_for_spatial_lookups() {
        let store = FakeSource::new("store", Behavior::Features(Vec::new()));
        let demo = FakeSource::new("demo", Behavior::Features(vec![square("1", -95.0)]));

        let resolver = Resolver::new(Some(erased(&store)), None, demo.clone());
        let bbox = BoundingBox::new(-96.0, 28.0, -94.0, 30.0);
        assert!(resolver.by_bbox(bbox, 10).await.is_empty());
        assert!(resolver.at_point(-95.05, 29.05, 5).await.is_empty());
        assert_eq!(demo.calls(), 0);
    }

    #[tokio::test]
    async fn spatial_lookups_fall_back_to_demo_when_store_fails() {
        let store = FakeSource::new("store", Behavior::Unavailable);
        let demo = DemoSource::from_features(vec![square("1", -95.0), square("2", -80.0)]);

        let resolver = Resolver::new(Some(erased(&store)), None, Arc::new(demo));
        let bbox = BoundingBox::new(-96.0, 28.0, -94.0, 30.0);
        assert_eq!(apns(&resolver.by_bbox(bbox, 10).await), vec!["1"]);
        assert_eq!(apns(&resolver.at_point(-94.95, 29.05, 5).await), vec!["1"]);
    }

    #[tokio::test]
    async fn no_store_and_empty_demo_is_an_empty_collection() {
        let resolver = Resolver::new(None, None, Arc::new(DemoSource::from_features(Vec::new())));
        let result = resolver
            .by_bbox(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), 500)
            .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn demo_bbox_cap_keeps_list_order() {
        let demo = DemoSource::from_features(vec![
            square("a", -95.0),
            square("b", -94.9),
            square("c", -94.8),
        ]);
        let resolver = Resolver::new(None, None, Arc::new(demo));

        let result = resolver
            .by_bbox(BoundingBox::new(-96.0, 28.0, -94.0, 30.0), 2)
            .await;
        assert_eq!(apns(&result), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn caps_sources_that_ignore_the_limit() {
        let many = (0..9).map(|i| feature(json!({"apn": i.to_string()}))).collect();
        let resolver = Resolver::new(
            Some(erased(&FakeSource::new("store", Behavior::Features(many)))),
            None,
            FakeSource::new("demo", Behavior::Features(Vec::new())),
        );

        assert_eq!(resolver.by_apn(ApnQuery::new("1")).await.len(), MAX_APN_MATCHES);
        assert_eq!(
            resolver
                .by_bbox(BoundingBox::new(-96.0, 28.0, -94.0, 30.0), 3)
                .await
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn results_are_normalized() {
        let remote = FakeSource::new(
            "remote",
            Behavior::Features(vec![feature(json!({
                "HCAD_NUM": "0440070000012",
                "OWNER_NAME_1": "DOE JANE",
                "random_field": "x",
            }))]),
        );
        let resolver = Resolver::new(
            None,
            Some(erased(&remote)),
            FakeSource::new("demo", Behavior::Features(Vec::new())),
        );

        let result = resolver.by_apn(ApnQuery::new("0440070000012")).await;
        let props = &result.features[0].properties;
        assert_eq!(props.get("apn"), Some(&json!("0440070000012")));
        assert_eq!(props.get("owner"), Some(&json!("DOE JANE")));
        assert_eq!(props.get("random_field"), Some(&json!("x")));
        assert!(!props.contains_key("HCAD_NUM"));
    }

    #[test]
    fn chains_are_assembled_in_priority_order() {
        let store = FakeSource::new("store", Behavior::Unavailable);
        let remote = FakeSource::new("remote", Behavior::Unavailable);
        let demo = FakeSource::new("demo", Behavior::Unavailable);

        let resolver = Resolver::new(Some(erased(&store)), Some(erased(&remote)), demo.clone());
        let ids = |tiers: &[Tier]| tiers.iter().map(|t| t.id().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(resolver.spatial_tiers()), vec!["store", "demo"]);
        assert_eq!(ids(resolver.apn_tiers()), vec!["store", "remote"]);

        let resolver = Resolver::new(Some(erased(&store)), None, demo);
        assert_eq!(ids(resolver.apn_tiers()), vec!["store", "demo"]);
    }

    #[tokio::test]
    async fn from_config_without_settings_serves_demo_data() {
        let config = ParcelConfig {
            demo_path: "/nonexistent/demo.geojson".into(),
            ..ParcelConfig::default()
        };
        let resolver = Resolver::from_config(&config).unwrap();
        assert!(resolver.by_apn(ApnQuery::new("123")).await.is_empty());
        assert_eq!(
            resolver.spatial_tiers().iter().map(Tier::id).collect::<Vec<_>>(),
            vec!["postgis", "demo"]
        );
    }
}
