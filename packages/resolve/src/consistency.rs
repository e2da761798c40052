//! State-level consistency check.
//!
//! A record is consistent when the state polygon containing its point, the
//! region its state identifier maps to, and the region its municipality-key
//! prefix maps to are all the same. Every disagreement is recorded as its
//! own [`Discrepancy`] so counters can report each signal independently.

use geo::Point;
use mastr_map_record::Record;
use mastr_map_region::{map_prefix_code, map_state_code, municipality_prefix};
use mastr_map_region_models::{
    CodeSignal, Discrepancy, PolygonMatch, RegionAssignment, StateOutcome,
};
use mastr_map_spatial::PolygonIndex;

/// Resolves records against a state polygon index and the two code tables.
#[derive(Clone, Copy)]
pub struct StateResolver<'a> {
    index: &'a PolygonIndex,
}

impl<'a> StateResolver<'a> {
    /// Creates a resolver over a loaded state index.
    #[must_use]
    pub const fn new(index: &'a PolygonIndex) -> Self {
        Self { index }
    }

    /// Resolves one record whose coordinates already parsed.
    #[must_use]
    pub fn resolve(&self, point: &Point<f64>, record: &Record) -> RegionAssignment {
        let polygon = self.index.find_containing(point).map(|p| PolygonMatch {
            id: p.id,
            name: p.state.clone(),
        });
        let state_code = state_code_signal(record);
        let prefix = prefix_signal(record);

        let discrepancies = discrepancies(polygon.as_ref(), &state_code, &prefix);

        let outcome = match &polygon {
            None => StateOutcome::NoPolygonMatch,
            Some(_) if discrepancies.is_empty() => StateOutcome::Consistent,
            Some(_) => StateOutcome::Inconsistent,
        };

        RegionAssignment {
            polygon,
            state_code,
            prefix,
            discrepancies,
            outcome,
        }
    }
}

/// Maps the record's state identifier.
#[must_use]
pub fn state_code_signal(record: &Record) -> CodeSignal {
    match record.state_code.as_deref() {
        None => CodeSignal::Missing,
        Some(code) => map_state_code(code).map_or_else(
            || CodeSignal::Unmapped(code.to_string()),
            |region| CodeSignal::Resolved(region.key.clone()),
        ),
    }
}

/// Maps the first two characters of the record's municipality key.
#[must_use]
pub fn prefix_signal(record: &Record) -> CodeSignal {
    let Some(key) = record.municipality_key.as_deref() else {
        return CodeSignal::Missing;
    };
    municipality_prefix(key, 2)
        .and_then(map_prefix_code)
        .map_or_else(
            || CodeSignal::Unmapped(key.to_string()),
            |region| CodeSignal::Resolved(region.key.clone()),
        )
}

fn discrepancies(
    polygon: Option<&PolygonMatch>,
    state_code: &CodeSignal,
    prefix: &CodeSignal,
) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    if state_code.is_missing_or_unmapped() {
        found.push(Discrepancy::BundeslandMissingOrUnmapped);
    }
    if prefix.is_missing_or_unmapped() {
        found.push(Discrepancy::GemeindeschluesselMissingOrUnmapped);
    }

    // Code-vs-polygon mismatches need a polygon to compare against.
    if let Some(polygon) = polygon {
        let reference = polygon.name.key.as_str();
        if state_code.key().is_some_and(|key| key != reference) {
            found.push(Discrepancy::BundeslandMismatch);
        }
        if prefix.key().is_some_and(|key| key != reference) {
            found.push(Discrepancy::GemeindeschluesselMismatch);
        }
    }

    if let (Some(a), Some(b)) = (state_code.key(), prefix.key())
        && a != b
    {
        found.push(Discrepancy::CodePairMismatch);
    }

    found
}
