//! German federal state code tables.
//!
//! Provides mappings from the registry's four-digit state identifier
//! (`1400`..`1415`) and from the two-digit municipality-key prefix
//! (`01`..`16`) to state names, and from either code to the normalized
//! region key produced by [`normalize_name`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use mastr_map_region_models::RegionName;

use crate::normalize::normalize_name;

/// Registry state identifiers for the 16 federal states.
pub const STATE_CODES: &[&str] = &[
    "1400", "1401", "1402", "1403", "1404", "1405", "1406", "1407", "1408", "1409", "1410", "1411",
    "1412", "1413", "1414", "1415",
];

/// Municipality-key prefixes for the 16 federal states.
pub const MUNICIPALITY_PREFIXES: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15", "16",
];

/// Maps a registry state identifier to the state name.
///
/// Returns `None` for unrecognized codes (including the offshore
/// economic zone, which is not a federal state).
#[must_use]
pub fn state_code_name(code: &str) -> Option<&'static str> {
    match code {
        "1400" => Some("Brandenburg"),
        "1401" => Some("Berlin"),
        "1402" => Some("Baden-Württemberg"),
        "1403" => Some("Bayern"),
        "1404" => Some("Bremen"),
        "1405" => Some("Hessen"),
        "1406" => Some("Hamburg"),
        "1407" => Some("Mecklenburg-Vorpommern"),
        "1408" => Some("Niedersachsen"),
        "1409" => Some("Nordrhein-Westfalen"),
        "1410" => Some("Rheinland-Pfalz"),
        "1411" => Some("Schleswig-Holstein"),
        "1412" => Some("Saarland"),
        "1413" => Some("Sachsen"),
        "1414" => Some("Sachsen-Anhalt"),
        "1415" => Some("Thüringen"),
        _ => None,
    }
}

/// Maps a two-digit municipality-key prefix to the state name.
///
/// Returns `None` for unrecognized prefixes.
#[must_use]
pub fn prefix_name(prefix: &str) -> Option<&'static str> {
    match prefix {
        "01" => Some("Schleswig-Holstein"),
        "02" => Some("Hamburg"),
        "03" => Some("Niedersachsen"),
        "04" => Some("Bremen"),
        "05" => Some("Nordrhein-Westfalen"),
        "06" => Some("Hessen"),
        "07" => Some("Rheinland-Pfalz"),
        "08" => Some("Baden-Wuerttemberg"),
        "09" => Some("Bayern"),
        "10" => Some("Saarland"),
        "11" => Some("Berlin"),
        "12" => Some("Brandenburg"),
        "13" => Some("Mecklenburg-Vorpommern"),
        "14" => Some("Sachsen"),
        "15" => Some("Sachsen-Anhalt"),
        "16" => Some("Thueringen"),
        _ => None,
    }
}

static STATE_CODE_REGIONS: LazyLock<BTreeMap<&'static str, RegionName>> =
    LazyLock::new(|| build_table(STATE_CODES, state_code_name));

static PREFIX_REGIONS: LazyLock<BTreeMap<&'static str, RegionName>> =
    LazyLock::new(|| build_table(MUNICIPALITY_PREFIXES, prefix_name));

fn build_table(
    codes: &[&'static str],
    name: fn(&str) -> Option<&'static str>,
) -> BTreeMap<&'static str, RegionName> {
    codes
        .iter()
        .filter_map(|&code| {
            let display = name(code)?;
            Some((
                code,
                RegionName {
                    key: normalize_name(display),
                    display: display.to_string(),
                },
            ))
        })
        .collect()
}

/// Maps a registry state identifier to its region.
///
/// Upstream numeric coercion can turn `1403` into `"1403.0"`; the
/// fractional zero is stripped before lookup. Blank or unknown codes
/// return `None`.
#[must_use]
pub fn map_state_code(code: &str) -> Option<&'static RegionName> {
    let trimmed = code.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    STATE_CODE_REGIONS.get(trimmed)
}

/// Maps a two-character municipality-key prefix to its region.
///
/// Prefixes shorter than two characters and unknown prefixes return
/// `None`.
#[must_use]
pub fn map_prefix_code(prefix: &str) -> Option<&'static RegionName> {
    if prefix.chars().count() < 2 {
        return None;
    }
    PREFIX_REGIONS.get(prefix)
}

/// Returns the first `len` characters of a municipality key.
///
/// Returns `None` when the key is shorter than `len`.
#[must_use]
pub fn municipality_prefix(key: &str, len: usize) -> Option<&str> {
    let key = key.trim();
    let end = key.char_indices().nth(len).map_or(key.len(), |(i, _)| i);
    let prefix = &key[..end];
    (prefix.chars().count() == len).then_some(prefix)
}
