//! Bulk crawl of an `ArcGIS` parcel layer by bounding box.
//!
//! Pages through every parcel intersecting an envelope with
//! `resultOffset`/`resultRecordCount` and normalizes each feature onto the
//! canonical schema. The output is ready for the loader.

use std::time::Duration;

use parcel_api_parcel_models::{BoundingBox, FeatureCollection, ParcelFeature};
use parcel_api_schema::normalize_feature;

use crate::{SourceError, arcgis, retry};

/// Records requested per page.
pub const PAGE_SIZE: usize = 2000;

/// Per-request timeout for crawl pages, which can be large.
pub const CRAWL_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Options for a single-layer crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Stop after this many features.
    pub limit: Option<usize>,
    /// Pause between page requests.
    pub delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            limit: None,
            delay: Duration::from_millis(500),
        }
    }
}

/// Serializes a WGS84 envelope as `ArcGIS` envelope geometry JSON.
#[must_use]
pub fn envelope_geometry(bbox: &BoundingBox) -> String {
    serde_json::json!({
        "xmin": bbox.min_lon,
        "ymin": bbox.min_lat,
        "xmax": bbox.max_lon,
        "ymax": bbox.max_lat,
        "spatialReference": {"wkid": 4326},
    })
    .to_string()
}

/// Result of parsing one crawl page.
#[derive(Debug, Default)]
pub struct Page {
    /// Normalized features on the page.
    pub features: Vec<ParcelFeature>,
    /// Number of raw entries the service returned, before filtering.
    pub raw_count: usize,
    /// Whether the service flagged more records beyond this page.
    pub exceeded_transfer_limit: bool,
}

/// Parses one page of a `f=geojson` query response.
///
/// # Errors
///
/// Returns [`SourceError::Remote`] if the body is an `ArcGIS` error
/// payload.
pub fn parse_page(body: &serde_json::Value) -> Result<Page, SourceError> {
    if let Some(message) = arcgis::error_message(body) {
        return Err(SourceError::Remote { message });
    }

    let raw = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    let features = raw
        .iter()
        .filter(|f| f.get("type").and_then(serde_json::Value::as_str) == Some("Feature"))
        .filter_map(ParcelFeature::from_value)
        .map(normalize_feature)
        .collect();

    // Some servers report the flag under `properties` in GeoJSON mode.
    let exceeded_transfer_limit = [
        body.get("exceededTransferLimit"),
        body.get("properties")
            .and_then(|p| p.get("exceededTransferLimit")),
    ]
    .into_iter()
    .flatten()
    .any(|v| v.as_bool() == Some(true));

    Ok(Page {
        features,
        raw_count: raw.len(),
        exceeded_transfer_limit,
    })
}

/// Crawls every parcel in `bbox` from the layer at `layer_url`.
///
/// # Errors
///
/// Returns [`SourceError`] if a page request fails after retries or the
/// service answers with an error payload.
pub async fn crawl_bbox(
    layer_url: &str,
    bbox: &BoundingBox,
    options: &CrawlOptions,
) -> Result<FeatureCollection, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(CRAWL_REQUEST_TIMEOUT)
        .build()?;
    let url = arcgis::query_url(layer_url);
    let geometry = envelope_geometry(bbox);
    let page_size = PAGE_SIZE.to_string();

    let mut features: Vec<ParcelFeature> = Vec::new();
    let mut offset: usize = 0;

    loop {
        let offset_param = offset.to_string();
        log::info!("Crawling {url} offset={offset}");

        let body = retry::send_json(|| {
            client.get(&url).query(&[
                ("where", "1=1"),
                ("geometry", geometry.as_str()),
                ("geometryType", "esriGeometryEnvelope"),
                ("inSR", "4326"),
                ("outSR", "4326"),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("resultOffset", offset_param.as_str()),
                ("resultRecordCount", page_size.as_str()),
                ("f", "geojson"),
            ])
        })
        .await?;

        let page = parse_page(&body)?;
        features.extend(page.features);

        if let Some(limit) = options.limit
            && features.len() >= limit
        {
            features.truncate(limit);
            break;
        }

        if page.raw_count == 0
            || (page.raw_count < PAGE_SIZE && !page.exceeded_transfer_limit)
        {
            break;
        }

        offset += page.raw_count;
        tokio::time::sleep(options.delay).await;
    }

    log::info!("Crawl complete: {} feature(s)", features.len());
    Ok(FeatureCollection::from(features))
}
