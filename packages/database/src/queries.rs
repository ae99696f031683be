//! Parcel queries against the `parcels` table.
//!
//! All spatial predicates are `PostGIS` functions issued through
//! `query_raw_params()`. Geometry is returned as `GeoJSON` text and parsed
//! by [`ParcelRow`].

use parcel_api_parcel_models::{BoundingBox, ParcelFeature};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;
use crate::row::{PARCEL_COLUMNS, ParcelRow};

fn limit_value(limit: impl Into<i64>) -> DatabaseValue {
    DatabaseValue::Int64(limit.into())
}

fn text_or_null(value: Option<&str>) -> DatabaseValue {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

fn into_features(rows: &[switchy_database::Row]) -> Vec<ParcelFeature> {
    rows.iter()
        .map(|row| ParcelFeature::from(ParcelRow::from_row(row)))
        .collect()
}

/// Returns up to `limit` parcels whose bounding box overlaps `bbox`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn parcels_in_bbox(
    db: &dyn Database,
    bbox: &BoundingBox,
    limit: u32,
) -> Result<Vec<ParcelFeature>, DbError> {
    let sql = format!(
        "SELECT {PARCEL_COLUMNS}
         FROM parcels
         WHERE geom && ST_MakeEnvelope($1, $2, $3, $4, 4326)
         LIMIT $5"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Real64(bbox.min_lon),
                DatabaseValue::Real64(bbox.min_lat),
                DatabaseValue::Real64(bbox.max_lon),
                DatabaseValue::Real64(bbox.max_lat),
                limit_value(limit),
            ],
        )
        .await?;

    Ok(into_features(&rows))
}

/// Returns up to `limit` parcels whose geometry contains the point.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn parcels_at_point(
    db: &dyn Database,
    lon: f64,
    lat: f64,
    limit: u32,
) -> Result<Vec<ParcelFeature>, DbError> {
    let sql = format!(
        "SELECT {PARCEL_COLUMNS}
         FROM parcels
         WHERE ST_Contains(geom, ST_SetSRID(ST_MakePoint($1, $2), 4326))
         LIMIT $3"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::Real64(lon),
                DatabaseValue::Real64(lat),
                limit_value(limit),
            ],
        )
        .await?;

    Ok(into_features(&rows))
}

/// Returns up to `limit` parcels whose stored APN equals `apn` exactly.
///
/// When `state_county` is given the match is restricted to that state
/// (case-insensitive) and county (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn parcels_by_apn(
    db: &dyn Database,
    apn: &str,
    state_county: Option<(&str, &str)>,
    limit: usize,
) -> Result<Vec<ParcelFeature>, DbError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows = if let Some((state, county)) = state_county {
        let sql = format!(
            "SELECT {PARCEL_COLUMNS}
             FROM parcels
             WHERE apn = $1
               AND UPPER(state) = UPPER($2)
               AND LOWER(county) = LOWER($3)
             LIMIT $4"
        );
        db.query_raw_params(
            &sql,
            &[
                DatabaseValue::String(apn.to_string()),
                DatabaseValue::String(state.trim().to_string()),
                DatabaseValue::String(county.trim().to_string()),
                limit_value(limit),
            ],
        )
        .await?
    } else {
        let sql = format!(
            "SELECT {PARCEL_COLUMNS}
             FROM parcels
             WHERE apn = $1
             LIMIT $2"
        );
        db.query_raw_params(
            &sql,
            &[DatabaseValue::String(apn.to_string()), limit_value(limit)],
        )
        .await?
    };

    Ok(into_features(&rows))
}

/// Returns up to `limit` parcels whose stored APN, stripped to its digits,
/// equals `digits`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn parcels_by_apn_digits(
    db: &dyn Database,
    digits: &str,
    limit: usize,
) -> Result<Vec<ParcelFeature>, DbError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let sql = format!(
        "SELECT {PARCEL_COLUMNS}
         FROM parcels
         WHERE REGEXP_REPLACE(apn, '[^0-9]', '', 'g') = $1
         LIMIT $2"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[DatabaseValue::String(digits.to_string()), limit_value(limit)],
        )
        .await?;

    Ok(into_features(&rows))
}

/// Inserts one normalized parcel feature.
///
/// `state` falls back to `mail_state` and then `default_state`; `county`
/// falls back to `site_county` and then `default_county`. Features without
/// geometry are skipped.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
///
/// Returns [`DbError`] if the geometry cannot be serialized or the insert
/// fails.
pub async fn insert_feature(
    db: &dyn Database,
    feature: &ParcelFeature,
    default_state: Option<&str>,
    default_county: Option<&str>,
) -> Result<bool, DbError> {
    if feature.geometry.is_null() {
        return Ok(false);
    }

    let geometry = serde_json::to_string(&feature.geometry).map_err(|e| DbError::Conversion {
        message: format!("Failed to serialize geometry: {e}"),
    })?;

    let text = |key: &str| feature.property_text(key);
    let number = |key: &str| {
        feature
            .properties
            .get(key)
            .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
            .map_or(DatabaseValue::Null, DatabaseValue::Real64)
    };

    let state = text("state")
        .or_else(|| text("mail_state"))
        .or_else(|| default_state.map(str::to_string));
    let county = text("county")
        .or_else(|| text("site_county"))
        .or_else(|| default_county.map(str::to_string));

    db.exec_raw_params(
        "INSERT INTO parcels
             (apn, address, owner, acres, legal_desc, market_value, state, county, geom)
         VALUES ($1, $2, $3, $4::float8, $5, $6::float8, $7, $8,
                 ST_SetSRID(ST_GeomFromGeoJSON($9), 4326))",
        &[
            text_or_null(text("apn").as_deref()),
            text_or_null(text("address").as_deref()),
            text_or_null(text("owner").as_deref()),
            number("acres"),
            text_or_null(text("legal_desc").as_deref()),
            number("market_value"),
            text_or_null(state.as_deref()),
            text_or_null(county.as_deref()),
            DatabaseValue::String(geometry),
        ],
    )
    .await?;

    Ok(true)
}
