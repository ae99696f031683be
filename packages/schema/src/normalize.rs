//! Maps arbitrarily named source attributes onto the canonical schema.
//!
//! For each [`CanonicalField`] the candidate spellings are tried in order
//! against the source keys (case-insensitively) and the first one carrying
//! a value wins. Every other attribute with a value is passed through
//! under its original key so nothing a county publishes is lost.

use std::collections::{BTreeMap, BTreeSet};

use parcel_api_parcel_models::{ParcelFeature, Properties};

use crate::CanonicalField;

/// Returns `true` if `value` counts as present.
///
/// `null` and blank strings are treated exactly like a missing key.
fn has_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Normalizes a source attribute map.
///
/// The output holds the canonical keys that could be resolved plus every
/// remaining source attribute with a value, except those whose key was
/// consumed to fill a canonical field (compared case-insensitively) and
/// those that would overwrite a canonical key already filled.
#[must_use]
pub fn normalize_properties(attrs: &Properties) -> Properties {
    let mut by_lower: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for key in attrs.keys() {
        by_lower.entry(key.to_lowercase()).or_default().push(key);
    }

    let mut out = Properties::new();
    let mut consumed: BTreeSet<&str> = BTreeSet::new();

    for field in CanonicalField::ALL {
        for candidate in field.candidates() {
            let Some(keys) = by_lower.get(*candidate) else {
                continue;
            };
            let value = keys
                .iter()
                .filter_map(|key| attrs.get(*key))
                .find(|value| has_value(value));

            if let Some(value) = value {
                out.insert(field.as_ref().to_string(), value.clone());
                consumed.insert(*candidate);
                break;
            }
        }
    }

    for (key, value) in attrs {
        if !has_value(value)
            || consumed.contains(key.to_lowercase().as_str())
            || out.contains_key(key)
        {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    out
}

/// Returns the feature with its properties normalized. Geometry is left
/// untouched.
#[must_use]
pub fn normalize_feature(feature: ParcelFeature) -> ParcelFeature {
    ParcelFeature {
        properties: normalize_properties(&feature.properties),
        geometry: feature.geometry,
    }
}
