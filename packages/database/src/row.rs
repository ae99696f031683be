//! Parcel rows as read from the `parcels` table.

use moosicbox_json_utils::database::ToValue as _;
use parcel_api_parcel_models::{ParcelFeature, Properties};

/// Column list selected by every parcel query, in the shape
/// [`ParcelRow::from_row`] expects.
pub const PARCEL_COLUMNS: &str = "apn, address, owner, acres::float8 AS acres, legal_desc, \
     market_value::float8 AS market_value, state, county, ST_AsGeoJSON(geom) AS geometry";

/// A parcel row as retrieved from the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelRow {
    /// Assessor parcel number as stored (separators kept).
    pub apn: Option<String>,
    /// Situs address.
    pub address: Option<String>,
    /// Owner name.
    pub owner: Option<String>,
    /// Lot size in acres.
    pub acres: Option<f64>,
    /// Legal description.
    pub legal_desc: Option<String>,
    /// Market value.
    pub market_value: Option<f64>,
    /// Two-letter state abbreviation.
    pub state: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// Geometry serialized by `ST_AsGeoJSON`.
    pub geometry: Option<String>,
}

impl ParcelRow {
    /// Reads a row selected with [`PARCEL_COLUMNS`].
    #[must_use]
    pub fn from_row(row: &switchy_database::Row) -> Self {
        Self {
            apn: row.to_value("apn").unwrap_or(None),
            address: row.to_value("address").unwrap_or(None),
            owner: row.to_value("owner").unwrap_or(None),
            acres: row.to_value("acres").unwrap_or(None),
            legal_desc: row.to_value("legal_desc").unwrap_or(None),
            market_value: row.to_value("market_value").unwrap_or(None),
            state: row.to_value("state").unwrap_or(None),
            county: row.to_value("county").unwrap_or(None),
            geometry: row.to_value("geometry").unwrap_or(None),
        }
    }
}

impl From<ParcelRow> for ParcelFeature {
    fn from(row: ParcelRow) -> Self {
        let mut properties = Properties::new();

        let text = [
            ("apn", row.apn),
            ("address", row.address),
            ("owner", row.owner),
            ("legal_desc", row.legal_desc),
            ("state", row.state),
            ("county", row.county),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                properties.insert(key.to_string(), serde_json::Value::String(value));
            }
        }

        let numbers = [("acres", row.acres), ("market_value", row.market_value)];
        for (key, value) in numbers {
            if let Some(number) = value.and_then(serde_json::Number::from_f64) {
                properties.insert(key.to_string(), serde_json::Value::Number(number));
            }
        }

        let geometry = row
            .geometry
            .as_deref()
            .and_then(|json| match serde_json::from_str(json) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("Discarding unparseable parcel geometry: {e}");
                    None
                }
            })
            .unwrap_or(serde_json::Value::Null);

        Self::new(properties, geometry)
    }
}
