#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical parcel attribute schema.
//!
//! County parcel layers name the same facts in dozens of ways (`ACCT_NUM`,
//! `ParcelNo`, `HCAD_NUM`, ...). This crate declares the canonical
//! attribute set, the ordered list of known source spellings for each
//! canonical attribute, and the procedures that map arbitrary source
//! attributes onto that set ([`normalize`]) and compare parcel numbers
//! across formatting conventions ([`apn`]).

pub mod apn;
pub mod normalize;

pub use apn::{normalize_apn, same_apn};
pub use normalize::{normalize_feature, normalize_properties};

use strum_macros::{AsRefStr, Display, EnumString};

/// A canonical parcel attribute.
///
/// The `snake_case` name of each variant is the key it is stored under in
/// normalized parcel properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalField {
    /// Assessor parcel number / account number.
    Apn,
    /// Situs (site) address.
    Address,
    /// Owner name.
    Owner,
    /// Lot size in acres.
    Acres,
    /// Legal description.
    LegalDesc,
    /// Market or assessed value.
    MarketValue,
    /// Two-letter state abbreviation.
    State,
    /// County name.
    County,
}

impl CanonicalField {
    /// Every canonical field, in the order they are resolved.
    pub const ALL: &[Self] = &[
        Self::Apn,
        Self::Address,
        Self::Owner,
        Self::Acres,
        Self::LegalDesc,
        Self::MarketValue,
        Self::State,
        Self::County,
    ];

    /// Known source field names for this attribute, lowercase, highest
    /// priority first.
    ///
    /// Lists are ordered by how common each spelling is across county
    /// layers; the first spelling present with a value wins.
    #[must_use]
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Apn => &[
                "apn",
                "parcelno",
                "parcel_no",
                "acct_id",
                "acct_num",
                "accountno",
                "pin",
                "parcel_id",
                "prop_id",
                "rprop_id",
                "rpardes",
                "hcad_num",
                "lowparcelid",
            ],
            Self::Address => &[
                "fulladdr",
                "site_address",
                "address",
                "prop_addr",
                "situs_addr",
                "location",
                "mail_addr_1",
                "site_str_num",
                "site_str_name",
                "site_str_sfx",
                "site_city",
                "site_zip",
            ],
            Self::Owner => &[
                "owner",
                "owner_name",
                "owner_name_1",
                "situs_owner",
                "mailname",
                "owner1",
            ],
            Self::Acres => &[
                "acreage",
                "acres",
                "grossacres",
                "landacres",
                "calc_acres",
                "statedarea",
            ],
            Self::LegalDesc => &[
                "legaldesc",
                "legal_desc",
                "legaldescription",
                "legal_dscr_1",
                "dscr",
            ],
            Self::MarketValue => &[
                "marketvalue",
                "market_value",
                "total_value",
                "assessed_val",
                "tax_val",
                "appraisedvalue",
                "market_val",
                "total_market_val",
                "total_appraised_val",
            ],
            Self::State => &["state", "site_state", "mail_state"],
            Self::County => &["county", "site_county", "county_name"],
        }
    }
}
