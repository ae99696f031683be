//! County `ArcGIS` `FeatureServer` parcel source.
//!
//! Answers APN lookups against a single county parcel layer by issuing
//! `where` queries with `f=geojson`. Counties name their parcel number
//! field differently, so unless a field is configured a list of common
//! spellings is tried in turn.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use parcel_api_parcel_models::{MAX_APN_MATCHES, ParcelFeature, ParcelQuery};
use parcel_api_schema::normalize_apn;

use crate::{ParcelSource, SourceError};

/// Per-request timeout for interactive lookups.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// APN field names tried in order when no field is configured.
pub const APN_FIELD_CANDIDATES: &[&str] = &[
    "apn",
    "parcelno",
    "parcel_no",
    "acct_id",
    "acct_num",
    "accountno",
    "pin",
    "parcel_id",
    "prop_id",
    "hcad_num",
    "lowparcelid",
    "rpardes",
    "APN",
    "ParcelNo",
    "ACCT_NUM",
    "ACCT_ID",
    "HCAD_NUM",
    "PIN",
];

/// Returns the `/query` endpoint for a layer URL.
///
/// Accepts the layer URL with or without a trailing `/` or `/query`.
#[must_use]
pub fn query_url(layer_url: &str) -> String {
    let base = layer_url.trim().trim_end_matches('/');
    let base = base.strip_suffix("/query").unwrap_or(base);
    format!("{base}/query")
}

/// Returns the message of an `ArcGIS` error payload, if the response is
/// one. The service reports most failures as HTTP 200 with an `error`
/// member.
#[must_use]
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
    )
}

/// Builds the `where` clauses tried for one field, in order: exact string
/// match, substring match on the digits (for dashed APNs), and numeric
/// match on the digits (for integer-typed fields).
#[must_use]
pub fn where_clauses(field: &str, apn: &str) -> Vec<String> {
    let quoted = apn.trim().replace('\'', "''");
    let digits = normalize_apn(apn);

    let mut clauses = vec![format!("{field} = '{quoted}'")];
    if !digits.is_empty() {
        clauses.push(format!("{field} LIKE '%{digits}%'"));
        clauses.push(format!("{field} = {digits}"));
    }
    clauses
}

/// Extracts up to [`MAX_APN_MATCHES`] features from a query response.
///
/// Returns `None` when the response holds no features, meaning the next
/// clause should be tried. Entries that are not `Feature` objects are
/// skipped but still count toward the cap.
#[must_use]
pub fn parse_query_response(body: &serde_json::Value) -> Option<Vec<ParcelFeature>> {
    if body.get("type").and_then(serde_json::Value::as_str) != Some("FeatureCollection") {
        return None;
    }

    let raw = body.get("features")?.as_array()?;
    if raw.is_empty() {
        return None;
    }

    Some(
        raw.iter()
            .take(MAX_APN_MATCHES)
            .filter(|f| f.get("type").and_then(serde_json::Value::as_str) == Some("Feature"))
            .filter_map(ParcelFeature::from_value)
            .collect(),
    )
}

/// Parcel source backed by a county `ArcGIS` layer. Supports APN lookups
/// only.
pub struct ArcGisSource {
    client: reqwest::Client,
    query_url: String,
    apn_field: Option<String>,
}

impl ArcGisSource {
    /// Creates a source for `layer_url`, optionally pinned to a single APN
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(layer_url: &str, apn_field: Option<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            query_url: query_url(layer_url),
            apn_field: apn_field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
        })
    }

    /// The resolved `/query` endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.query_url
    }

    fn fields(&self) -> Vec<&str> {
        self.apn_field.as_deref().map_or_else(
            || APN_FIELD_CANDIDATES.to_vec(),
            |field| vec![field],
        )
    }

    async fn run_where(&self, where_clause: &str) -> Result<serde_json::Value, SourceError> {
        let body: serde_json::Value = self
            .client
            .get(&self.query_url)
            .query(&[
                ("where", where_clause),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("returnIdsOnly", "false"),
                ("f", "geojson"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(message) = error_message(&body) {
            return Err(SourceError::Remote { message });
        }

        Ok(body)
    }

    /// Looks up parcels by APN, trying each field and clause until one
    /// returns features.
    ///
    /// A failing clause (network error, bad status, or an error payload)
    /// is logged and skipped. Returns an empty list when nothing matched.
    pub async fn by_apn(&self, apn: &str) -> Vec<ParcelFeature> {
        first_match(&self.fields(), apn, move |clause| async move {
            self.run_where(&clause).await
        })
        .await
    }
}

/// Walks `fields` × [`where_clauses`] in order, returning the features of
/// the first clause whose response holds any. Errors from `run_where` are
/// logged and the next clause is tried.
async fn first_match<F, Fut>(fields: &[&str], apn: &str, mut run_where: F) -> Vec<ParcelFeature>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, SourceError>>,
{
    if apn.trim().is_empty() {
        return Vec::new();
    }

    for field in fields {
        for clause in where_clauses(field, apn) {
            match run_where(clause.clone()).await {
                Ok(body) => {
                    if let Some(features) = parse_query_response(&body) {
                        log::debug!("ArcGIS matched {} feature(s) with `{clause}`", features.len());
                        return features;
                    }
                }
                Err(e) => {
                    log::debug!("ArcGIS query `{clause}` failed: {e}");
                }
            }
        }
    }

    Vec::new()
}

#[async_trait]
impl ParcelSource for ArcGisSource {
    fn id(&self) -> &'static str {
        "arcgis"
    }

    async fn query(&self, query: &ParcelQuery) -> Result<Vec<ParcelFeature>, SourceError> {
        match query {
            ParcelQuery::Apn(apn) => Ok(self.by_apn(&apn.apn).await),
            other => Err(SourceError::Unsupported {
                source_id: self.id().to_string(),
                kind: other.kind(),
            }),
        }
    }
}
