//! Location string normalization.
//!
//! Listing services print locations as `City (ON)` or `City, ON`. Full
//! province names are mapped onto their two-letter postal codes.

use regex::Regex;
use std::sync::LazyLock;

/// `Toronto (ON)`, `Saint-Jean-sur-Richelieu (QC)`
static PAREN_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s*\(\s*([A-Za-z .'-]+?)\s*\)\s*$").unwrap());

/// `Halifax, NS`, `Halifax, Nova Scotia`
static COMMA_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s*,\s*([A-Za-z .'-]+?)\s*$").unwrap());

const PROVINCES: &[(&str, &str)] = &[
    ("AB", "alberta"),
    ("BC", "british columbia"),
    ("MB", "manitoba"),
    ("NB", "new brunswick"),
    ("NL", "newfoundland and labrador"),
    ("NS", "nova scotia"),
    ("NT", "northwest territories"),
    ("NU", "nunavut"),
    ("ON", "ontario"),
    ("PE", "prince edward island"),
    ("QC", "quebec"),
    ("SK", "saskatchewan"),
    ("YT", "yukon"),
];

/// Derived city/province pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub province: Option<String>,
}

/// Normalize a province code or name to its two-letter code.
pub fn province_code(raw: &str) -> Option<&'static str> {
    let cleaned = raw.trim().trim_end_matches('.');
    let lower = cleaned.to_lowercase().replace('é', "e");

    PROVINCES
        .iter()
        .find(|(code, name)| code.eq_ignore_ascii_case(cleaned) || *name == lower)
        .map(|(code, _)| *code)
}

/// Split a raw location into city and province.
///
/// Returns empty fields when the province part is not recognizable, rather
/// than guessing.
pub fn parse_location(raw: &str) -> ParsedLocation {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedLocation::default();
    }

    for pattern in [&*PAREN_FORM, &*COMMA_FORM] {
        if let Some(caps) = pattern.captures(raw) {
            if let Some(code) = province_code(&caps[2]) {
                let city = caps[1].trim();
                return ParsedLocation {
                    city: (!city.is_empty()).then(|| city.to_string()),
                    province: Some(code.to_string()),
                };
            }
        }
    }

    ParsedLocation::default()
}
