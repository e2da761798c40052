#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region resolution for registry records.
//!
//! [`StateResolver`] cross-checks three independent state signals (state
//! polygon containment, the state identifier, and the municipality-key
//! prefix) and only accepts records where all three agree.
//! [`DistrictResolver`] assigns records to district polygons, falling back
//! to the record's district-name attribute, optionally on top of a state
//! pass.
//!
//! Resolvers are stateless per record. All run-level bookkeeping lives in
//! the counter types, which merge so partial counts from parallel workers
//! can be combined at the end.

pub mod consistency;
pub mod counters;
pub mod district;

pub use consistency::StateResolver;
pub use counters::{ConsistencyCounters, DistrictCounters};
pub use district::DistrictResolver;

#[cfg(test)]
pub(crate) mod test_support {
    use mastr_map_record::{FieldNames, Record};
    use mastr_map_spatial::{IndexOptions, NameFields, PolygonIndex};
    use serde_json::{Value, json};

    pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        })
    }

    pub fn states() -> PolygonIndex {
        let doc = json!({
            "features": [
                {"properties": {"name": "Baden-Württemberg"}, "geometry": square(7.0, 47.0, 10.0, 50.0)},
                {"properties": {"name": "Bayern"}, "geometry": square(10.0, 47.0, 13.0, 51.0)},
            ]
        });
        PolygonIndex::from_value(
            doc,
            &NameFields::State {
                name: "name".to_string(),
            },
            IndexOptions::default(),
            "states",
        )
        .unwrap()
    }

    pub fn districts() -> PolygonIndex {
        let doc = json!({
            "features": [
                {
                    "properties": {"NAME_1": "Bayern", "NAME_2": "Würzburg", "CC_2": "09679"},
                    "geometry": square(10.0, 49.5, 10.5, 50.0)
                },
                {
                    "properties": {"NAME_1": "Bayern", "NAME_2": "Landkreis München", "CC_2": "09184"},
                    "geometry": square(11.0, 48.0, 12.0, 48.5)
                },
                {
                    "properties": {"NAME_1": "Baden-Württemberg", "NAME_2": "Stuttgart", "CC_2": "08111"},
                    "geometry": square(9.0, 48.7, 9.3, 48.9)
                },
            ]
        });
        PolygonIndex::from_value(
            doc,
            &NameFields::District {
                state: "NAME_1".to_string(),
                district: "NAME_2".to_string(),
                code: Some("CC_2".to_string()),
            },
            IndexOptions::default(),
            "districts",
        )
        .unwrap()
    }

    pub fn record(lon: &str, lat: &str, state_code: &str, key: &str) -> Record {
        let Value::Object(object) = json!({
            "Laengengrad": lon,
            "Breitengrad": lat,
            "Bundesland": state_code,
            "Gemeindeschluessel": key,
        }) else {
            unreachable!()
        };
        Record::from_object(object, &FieldNames::default())
    }
}
