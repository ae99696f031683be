//! Assessor parcel number comparison.
//!
//! Counties format the same parcel number as `11-444-000-40007`,
//! `1144400040007`, or with spaces and letter prefixes. Comparison is done
//! on the digits alone; the digit form is never stored or displayed.

/// Keeps only the ASCII decimal digits of `apn`.
///
/// Non-ASCII digits are dropped so the result matches the store's
/// `REGEXP_REPLACE(apn, '[^0-9]', '', 'g')` digit column.
#[must_use]
pub fn normalize_apn(apn: &str) -> String {
    apn.chars().filter(char::is_ascii_digit).collect()
}

/// Returns `true` if both identifiers carry digits and the digits match.
#[must_use]
pub fn same_apn(a: &str, b: &str) -> bool {
    let a = normalize_apn(a);
    !a.is_empty() && a == normalize_apn(b)
}
