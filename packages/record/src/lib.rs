#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Power-plant registry records.
//!
//! A [`Record`] keeps the handful of fields the resolvers read as typed
//! optional values and carries every other property through untouched, so
//! output features can re-emit the original record without the core
//! knowing its full schema.

pub mod parsing;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::Point;
use mastr_map_region_models::Year;
use serde::Deserialize;
use serde_json::{Map, Value};

pub use parsing::{YearRange, derive_year, parse_decimal, parse_point, value_text};

/// Errors that can occur while loading an input file.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but holds no record list.
    #[error("Unexpected document shape: {message}")]
    Shape {
        /// Description of what was found instead.
        message: String,
    },
}

/// Names of the record fields the engine reads.
///
/// Defaults follow the registry's unit export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Longitude field.
    pub longitude: String,
    /// Latitude field.
    pub latitude: String,
    /// Four-digit state identifier field.
    pub state_code: String,
    /// Eight-digit municipality key field.
    pub municipality_key: String,
    /// Free-text district name field.
    pub district_name: String,
    /// Commissioning date field.
    pub commissioning_date: String,
    /// Energy-type code field.
    pub energy_type: String,
    /// Installed power field.
    pub installed_power: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            longitude: "Laengengrad".to_string(),
            latitude: "Breitengrad".to_string(),
            state_code: "Bundesland".to_string(),
            municipality_key: "Gemeindeschluessel".to_string(),
            district_name: "Landkreis".to_string(),
            commissioning_date: "Inbetriebnahmedatum".to_string(),
            energy_type: "Energietraeger".to_string(),
            installed_power: "Bruttoleistung".to_string(),
        }
    }
}

/// One power-generation unit.
///
/// Records are read-only once built. `properties` holds the original
/// object minus the two coordinate fields, which are promoted to
/// `longitude`/`latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Raw longitude value.
    pub longitude: Option<Value>,
    /// Raw latitude value.
    pub latitude: Option<Value>,
    /// State identifier as text.
    pub state_code: Option<String>,
    /// Municipality key as text.
    pub municipality_key: Option<String>,
    /// District name attribute.
    pub district_name: Option<String>,
    /// Commissioning date string.
    pub commissioning_date: Option<String>,
    /// Energy-type code as text.
    pub energy_type: Option<String>,
    /// Raw installed power value.
    pub installed_power: Option<Value>,
    /// Every non-coordinate property, including the typed ones above.
    pub properties: Map<String, Value>,
}

impl Record {
    /// Builds a record from a flat JSON object.
    #[must_use]
    pub fn from_object(mut object: Map<String, Value>, fields: &FieldNames) -> Self {
        let longitude = object.remove(&fields.longitude);
        let latitude = object.remove(&fields.latitude);
        let text = |name: &str| value_text(object.get(name));

        Self {
            longitude,
            latitude,
            state_code: text(&fields.state_code),
            municipality_key: text(&fields.municipality_key),
            district_name: text(&fields.district_name),
            commissioning_date: text(&fields.commissioning_date),
            energy_type: text(&fields.energy_type),
            installed_power: object.get(&fields.installed_power).cloned(),
            properties: object,
        }
    }

    /// Parses the record's coordinates.
    #[must_use]
    pub fn point(&self) -> Option<Point<f64>> {
        parse_point(self.longitude.as_ref(), self.latitude.as_ref())
    }

    /// Derives the record's commissioning year.
    #[must_use]
    pub fn year(&self, range: YearRange) -> Year {
        derive_year(self.commissioning_date.as_deref(), range)
    }

    /// Parses the record's installed power.
    #[must_use]
    pub fn installed_power(&self) -> Option<f64> {
        parse_decimal(self.installed_power.as_ref())
    }
}

/// Loads all records from a JSON file.
///
/// # Errors
///
/// Returns [`RecordError`] if the file cannot be read, is not valid JSON,
/// or does not contain a record list.
pub fn load_records(path: &Path, fields: &FieldNames) -> Result<Vec<Record>, RecordError> {
    let reader = BufReader::new(File::open(path)?);
    let document: Value = serde_json::from_reader(reader)?;
    let records = records_from_value(document, fields)?;
    log::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Extracts records from a parsed document.
///
/// Accepts a bare array of objects, or an object wrapping such an array
/// under one of its keys (the first array-valued member wins). Array
/// entries that are not objects are skipped.
///
/// # Errors
///
/// Returns [`RecordError::Shape`] if no record array can be found.
pub fn records_from_value(document: Value, fields: &FieldNames) -> Result<Vec<Record>, RecordError> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(object) => object
            .into_iter()
            .find_map(|(_, value)| match value {
                Value::Array(entries) => Some(entries),
                _ => None,
            })
            .ok_or_else(|| RecordError::Shape {
                message: "object without an array member".to_string(),
            })?,
        other => {
            return Err(RecordError::Shape {
                message: format!("expected array or object, found {}", json_kind(&other)),
            });
        }
    };

    let total = entries.len();
    let records: Vec<Record> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(object) => Some(Record::from_object(object, fields)),
            _ => None,
        })
        .collect();

    if records.len() < total {
        log::debug!("Skipped {} non-object entries", total - records.len());
    }

    Ok(records)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "EinheitMastrNummer": "SEE900000000001",
            "Laengengrad": "10,2",
            "Breitengrad": "50,0",
            "Bundesland": "1403",
            "Gemeindeschluessel": "09670000",
            "Landkreis": "Würzburg",
            "Inbetriebnahmedatum": "2015-06-30",
            "Energietraeger": "2495",
            "Bruttoleistung": "9,84"
        })
    }

    #[test]
    fn promotes_coordinates_out_of_properties() {
        let Value::Object(object) = sample() else {
            unreachable!()
        };
        let record = Record::from_object(object, &FieldNames::default());

        assert!(!record.properties.contains_key("Laengengrad"));
        assert!(!record.properties.contains_key("Breitengrad"));
        assert_eq!(record.properties.len(), 7);
        assert_eq!(record.properties["EinheitMastrNummer"], json!("SEE900000000001"));

        let point = record.point().unwrap();
        assert!((point.x() - 10.2).abs() < f64::EPSILON);
    }

    #[test]
    fn extracts_known_fields() {
        let Value::Object(object) = sample() else {
            unreachable!()
        };
        let record = Record::from_object(object, &FieldNames::default());

        assert_eq!(record.state_code.as_deref(), Some("1403"));
        assert_eq!(record.municipality_key.as_deref(), Some("09670000"));
        assert_eq!(record.district_name.as_deref(), Some("Würzburg"));
        assert_eq!(record.energy_type.as_deref(), Some("2495"));
        assert_eq!(record.year(YearRange::default()), Year::Known(2015));
        assert!((record.installed_power().unwrap() - 9.84).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_field_names() {
        let fields = FieldNames {
            longitude: "lon".to_string(),
            latitude: "lat".to_string(),
            ..FieldNames::default()
        };
        let Value::Object(object) = json!({"lon": 8.5, "lat": 49.0, "Laengengrad": "x"}) else {
            unreachable!()
        };
        let record = Record::from_object(object, &fields);

        assert!(record.point().is_some());
        assert_eq!(record.properties["Laengengrad"], json!("x"));
        assert!(record.state_code.is_none());
    }

    #[test]
    fn reads_bare_array() {
        let records =
            records_from_value(json!([sample(), sample(), 5]), &FieldNames::default()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn reads_wrapped_array() {
        let records = records_from_value(
            json!({"EinheitenSolar": [sample()]}),
            &FieldNames::default(),
        )
        .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn rejects_scalar_document() {
        let err = records_from_value(json!("nope"), &FieldNames::default()).unwrap_err();
        assert!(matches!(err, RecordError::Shape { .. }));
        let err = records_from_value(json!({"a": 1}), &FieldNames::default()).unwrap_err();
        assert!(matches!(err, RecordError::Shape { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!([sample()])).unwrap();

        let records = load_records(file.path(), &FieldNames::default()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{{\"Laengengrad\": ").unwrap();

        let err = load_records(file.path(), &FieldNames::default()).unwrap_err();
        assert!(matches!(err, RecordError::Json(_)));
    }
}
