//! County crawl lists.
//!
//! A list is either a JSON array of
//! `{state, county, fips?, parcel_layer_url, bbox: [min_lon, min_lat, max_lon, max_lat]}`
//! objects or a CSV file with the columns
//! `state,county,fips,parcel_layer_url,min_lon,min_lat,max_lon,max_lat`.
//! Rows without a usable bounding box are skipped.

use std::path::Path;

use parcel_api_parcel_models::BoundingBox;
use serde::Deserialize;

use crate::CliError;

/// One county parcel layer to crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyEntry {
    /// State abbreviation.
    pub state: String,
    /// County name.
    pub county: String,
    /// County FIPS code, if known.
    pub fips: Option<String>,
    /// `ArcGIS` parcel layer URL.
    pub parcel_layer_url: String,
    /// Crawl envelope.
    pub bbox: BoundingBox,
}

impl CountyEntry {
    /// Output file name, `<state>_<county>.geojson` with spaces replaced by
    /// underscores.
    #[must_use]
    pub fn output_file_name(&self) -> String {
        let part = |s: &str| {
            let s = s.trim();
            if s.is_empty() {
                "unknown".to_string()
            } else {
                s.replace(' ', "_")
            }
        };
        format!("{}_{}.geojson", part(&self.state), part(&self.county))
    }
}

#[derive(Deserialize)]
struct JsonRow {
    #[serde(default)]
    state: String,
    #[serde(default)]
    county: String,
    #[serde(default)]
    fips: Option<serde_json::Value>,
    #[serde(default)]
    parcel_layer_url: String,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(default)]
    state: String,
    #[serde(default)]
    county: String,
    #[serde(default)]
    fips: String,
    #[serde(default)]
    parcel_layer_url: String,
    min_lon: Option<String>,
    min_lat: Option<String>,
    max_lon: Option<String>,
    max_lat: Option<String>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a JSON county list. A single object is accepted as a one-entry
/// list.
///
/// # Errors
///
/// Returns [`CliError::Json`] if the text is not a JSON object or array of
/// objects.
pub fn from_json_str(text: &str) -> Result<Vec<CountyEntry>, CliError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let rows: Vec<JsonRow> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let bbox = match row.bbox.as_deref() {
                Some(&[min_lon, min_lat, max_lon, max_lat]) => {
                    BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
                }
                _ => return None,
            };
            let fips = row.fips.and_then(|f| match f {
                serde_json::Value::String(s) => non_blank(&s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Some(CountyEntry {
                state: row.state,
                county: row.county,
                fips,
                parcel_layer_url: row.parcel_layer_url.trim().to_string(),
                bbox,
            })
        })
        .collect())
}

/// Parses a CSV county list with a header row.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if the CSV is malformed.
pub fn from_csv_reader(reader: impl std::io::Read) -> Result<Vec<CountyEntry>, CliError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();

    for row in csv.deserialize::<CsvRow>() {
        let row = row?;
        let coord = |v: Option<&String>| v.and_then(|v| v.trim().parse::<f64>().ok());
        let (Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) = (
            coord(row.min_lon.as_ref()),
            coord(row.min_lat.as_ref()),
            coord(row.max_lon.as_ref()),
            coord(row.max_lat.as_ref()),
        ) else {
            log::debug!("Skipping {}/{}: no bounding box", row.state, row.county);
            continue;
        };

        entries.push(CountyEntry {
            fips: non_blank(&row.fips),
            state: row.state,
            county: row.county,
            parcel_layer_url: row.parcel_layer_url,
            bbox: BoundingBox::new(min_lon, min_lat, max_lon, max_lat),
        });
    }

    Ok(entries)
}

/// Loads a county list, choosing the format by file extension (`.csv`,
/// otherwise JSON).
///
/// # Errors
///
/// Returns [`CliError`] if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<Vec<CountyEntry>, CliError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        from_csv_reader(std::fs::File::open(path)?)
    } else {
        from_json_str(&std::fs::read_to_string(path)?)
    }
}
