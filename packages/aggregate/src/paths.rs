//! Output file layout.
//!
//! | Key | Path |
//! |-----|------|
//! | `Region` | `<region>.geojson` |
//! | `RegionYear` | `<region>/<year>.geojson` |
//! | `DistrictYear` | `<state>/<district>/<year>.geojson` |
//! | `DistrictCodeYear` | `<code>/<year>.geojson` |

use std::path::PathBuf;

use mastr_map_region_models::GroupKey;

/// File extension of every output file.
pub const EXTENSION: &str = "geojson";

/// Returns the path of a group's file, relative to the output directory.
#[must_use]
pub fn relative_path(key: &GroupKey) -> PathBuf {
    let mut path = PathBuf::new();
    let file_stem = match key {
        GroupKey::Region { region } => sanitize(region),
        GroupKey::RegionYear { region, year } => {
            path.push(sanitize(region));
            year.to_string()
        }
        GroupKey::DistrictYear {
            state,
            district,
            year,
        } => {
            path.push(sanitize(state));
            path.push(sanitize(district));
            year.to_string()
        }
        GroupKey::DistrictCodeYear { code, year, .. } => {
            path.push(sanitize(code));
            year.to_string()
        }
    };
    path.push(format!("{file_stem}.{EXTENSION}"));
    path
}

/// Makes a name safe to use as a single path component.
///
/// Path separators, reserved characters, control characters and `%` are
/// percent-encoded, as is a leading dot, so a name can never point upwards.
/// Distinct names always map to distinct components.
#[must_use]
pub fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }

    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        let reserved = matches!(
            c,
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
        ) || c.is_control()
            || (i == 0 && c == '.');
        if reserved {
            let mut buf = [0; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}
