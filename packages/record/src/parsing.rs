//! Parsing utilities for locale-formatted registry values.
//!
//! Registry exports write decimals with either `.` or `,` as the separator
//! and store numbers as strings, so every numeric field goes through
//! [`parse_decimal`]. None of these functions fail loudly: anything that
//! does not parse becomes `None` (or [`Year::Unknown`]).

use geo::Point;
use mastr_map_region_models::Year;
use serde::Deserialize;
use serde_json::Value;

/// Inclusive range of commissioning years accepted as known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YearRange {
    /// Earliest accepted year.
    pub min: u16,
    /// Latest accepted year.
    pub max: u16,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: 1900,
            max: 2025,
        }
    }
}

/// Parses a decimal from a JSON string or number.
///
/// Strings have `,` replaced with `.` before conversion. Returns `None`
/// for missing, non-numeric, or non-finite values.
#[must_use]
pub fn parse_decimal(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Builds a point from raw longitude/latitude values.
///
/// Returns `None` if either value is missing or not numeric, or if
/// longitude is outside [-180, 180] or latitude is outside [-90, 90].
#[must_use]
pub fn parse_point(longitude: Option<&Value>, latitude: Option<&Value>) -> Option<Point<f64>> {
    let lon = parse_decimal(longitude)?;
    let lat = parse_decimal(latitude)?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some(Point::new(lon, lat))
}

/// Derives the commissioning year from a date string.
///
/// The first four characters must be ASCII digits forming a year inside
/// `range`; anything else is [`Year::Unknown`].
#[must_use]
pub fn derive_year(date: Option<&str>, range: YearRange) -> Year {
    let Some(head) = date.map(str::trim).and_then(|d| d.get(..4)) else {
        return Year::Unknown;
    };
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return Year::Unknown;
    }
    match head.parse::<u16>() {
        Ok(year) if (range.min..=range.max).contains(&year) => Year::Known(year),
        _ => Year::Unknown,
    }
}

/// Renders a scalar JSON value as trimmed text.
///
/// Numbers keep their JSON rendering (so `1403.0` stays `"1403.0"`).
/// Blank strings, `null`, booleans, arrays and objects return `None`.
#[must_use]
pub fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
