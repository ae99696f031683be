#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parcel geometry envelopes and an in-memory envelope index.
//!
//! Used when no spatial database is reachable: demo-mode bbox and point
//! lookups reduce every parcel geometry to its bounding box and test box
//! intersection. Point lookups are approximated with a small envelope
//! around the point instead of true point-in-polygon containment.

use geojson::Geometry;
use parcel_api_parcel_models::{BoundingBox, ParcelFeature};
use rstar::{AABB, RTree, RTreeObject};

/// Returns the envelope of a raw `GeoJSON` geometry.
///
/// A `Point` yields a degenerate box; `Polygon` and `MultiPolygon` yield
/// the min/max over every ring coordinate. Any other geometry type, and
/// any geometry that does not parse or carries non-finite coordinates,
/// yields `None`.
#[must_use]
pub fn bbox_of_geometry(geometry: &serde_json::Value) -> Option<BoundingBox> {
    if geometry.is_null() {
        return None;
    }
    let geometry: Geometry = serde_json::from_value(geometry.clone()).ok()?;

    match &geometry.value {
        geojson::Value::Point(position) => {
            let (lon, lat) = lon_lat(position)?;
            Some(BoundingBox::from_point(lon, lat))
        }
        geojson::Value::Polygon(rings) => envelope(rings.iter().flatten()),
        geojson::Value::MultiPolygon(polygons) => {
            envelope(polygons.iter().flatten().flatten())
        }
        _ => None,
    }
}

/// Returns `true` unless one box lies strictly outside the other on either
/// axis. Touching edges count as intersecting.
#[must_use]
pub fn intersects(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.max_lon < b.min_lon
        || a.min_lon > b.max_lon
        || a.max_lat < b.min_lat
        || a.min_lat > b.max_lat)
}

fn lon_lat(position: &[f64]) -> Option<(f64, f64)> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
        _ => None,
    }
}

fn envelope<'a>(positions: impl Iterator<Item = &'a Vec<f64>>) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for position in positions {
        let (lon, lat) = lon_lat(position)?;
        bbox = Some(match bbox {
            None => BoundingBox::from_point(lon, lat),
            Some(b) => BoundingBox::new(
                b.min_lon.min(lon),
                b.min_lat.min(lat),
                b.max_lon.max(lon),
                b.max_lat.max(lat),
            ),
        });
    }

    bbox
}

/// A feature envelope stored in the R-tree, remembering its position in
/// the source list.
struct IndexedEnvelope {
    position: usize,
    bbox: BoundingBox,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_aabb(&self.bbox)
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat])
}

/// R-tree over the envelopes of a fixed feature list.
///
/// Built once from an immutable list and only read afterwards. Lookups
/// return list positions in ascending order so callers keep source order.
pub struct FeatureIndex {
    tree: RTree<IndexedEnvelope>,
}

impl FeatureIndex {
    /// Builds the index. Features whose geometry has no envelope are left
    /// out and can never match a spatial lookup.
    #[must_use]
    pub fn build(features: &[ParcelFeature]) -> Self {
        let entries: Vec<IndexedEnvelope> = features
            .iter()
            .enumerate()
            .filter_map(|(position, feature)| {
                bbox_of_geometry(&feature.geometry).map(|bbox| IndexedEnvelope { position, bbox })
            })
            .collect();

        let skipped = features.len() - entries.len();
        if skipped > 0 {
            log::debug!("{skipped} features have no usable geometry and were not indexed");
        }

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns the positions of the first `limit` features (in list order)
    /// whose envelope intersects `query`.
    #[must_use]
    pub fn intersecting(&self, query: &BoundingBox, limit: usize) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(query))
            .filter(|entry| intersects(&entry.bbox, query))
            .map(|entry| entry.position)
            .collect();

        positions.sort_unstable();
        positions.truncate(limit);
        positions
    }
}
