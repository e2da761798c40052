//! Region name normalization.
//!
//! Applied symmetrically to lookup-table names, polygon properties, and
//! free-text district attributes. "Baden-Württemberg",
//! "Baden Wuerttemberg" and "BADEN-WÜRTTEMBERG" all produce
//! `"badenwuerttemberg"`.

use regex::Regex;
use std::sync::LazyLock;

/// Everything that is neither a letter nor a digit.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

/// Normalizes a region name into its lookup key.
///
/// The pipeline:
/// 1. Lowercase
/// 2. Transliterate German umlauts (ä→ae, ö→oe, ü→ue, ß→ss)
/// 3. Strip punctuation and whitespace entirely
#[must_use]
pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut transliterated = String::with_capacity(lower.len());

    for c in lower.chars() {
        match c {
            'ä' => transliterated.push_str("ae"),
            'ö' => transliterated.push_str("oe"),
            'ü' => transliterated.push_str("ue"),
            'ß' => transliterated.push_str("ss"),
            _ => transliterated.push(c),
        }
    }

    SEPARATOR_RE.replace_all(&transliterated, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_umlauts() {
        assert_eq!(normalize_name("Thüringen"), "thueringen");
        assert_eq!(normalize_name("Thueringen"), "thueringen");
    }

    #[test]
    fn hyphen_and_space_variants_are_equal() {
        let variants = [
            "Baden-Württemberg",
            "Baden Württemberg",
            "Baden-Wuerttemberg",
            "BADEN-WÜRTTEMBERG",
            " baden  wuerttemberg ",
        ];
        for variant in variants {
            assert_eq!(normalize_name(variant), "badenwuerttemberg", "{variant}");
        }
    }

    #[test]
    fn sharp_s() {
        assert_eq!(normalize_name("Gießen"), "giessen");
    }

    #[test]
    fn uppercase_umlauts() {
        assert_eq!(normalize_name("ÖSTLICHES Ämterland"), "oestlichesaemterland");
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(normalize_name("Mülheim a.d. Ruhr"), "muelheimadruhr");
        assert_eq!(normalize_name("Landkreis (Kreis) Aachen"), "landkreiskreisaachen");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" - "), "");
    }
}
