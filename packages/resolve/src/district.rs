//! District-level assignment.
//!
//! Primary signal is containment in a district polygon. When no polygon
//! contains the point, the record's free-text district attribute is matched
//! against the known districts of the record's state by normalized
//! substring, in either direction. The first hit in declared order wins;
//! there is no scoring.
//!
//! With `check_state` set, the resolver sits on top of a state pass: only
//! consistent records are considered, and a district is only accepted if it
//! lies in the state that pass resolved.

use geo::Point;
use mastr_map_record::Record;
use mastr_map_region::normalize_name;
use mastr_map_region_models::{
    DistrictAssignment, DistrictMatch, DistrictOutcome, DistrictVia, RegionAssignment,
};
use mastr_map_spatial::{NamedPolygon, PolygonIndex};

use crate::consistency::{prefix_signal, state_code_signal};

/// Resolves records against a district polygon index.
#[derive(Clone, Copy)]
pub struct DistrictResolver<'a> {
    index: &'a PolygonIndex,
    check_state: bool,
}

impl<'a> DistrictResolver<'a> {
    /// Creates a resolver over a loaded district index.
    #[must_use]
    pub const fn new(index: &'a PolygonIndex, check_state: bool) -> Self {
        Self { index, check_state }
    }

    /// Resolves one record whose coordinates already parsed.
    ///
    /// `state` is the record's state-level assignment, if a state pass ran.
    /// It is required when the resolver checks states; without it the
    /// record is rejected.
    #[must_use]
    pub fn resolve(
        &self,
        point: &Point<f64>,
        record: &Record,
        state: Option<&RegionAssignment>,
    ) -> DistrictAssignment {
        let required_state = if self.check_state {
            match state.and_then(RegionAssignment::resolved) {
                Some(resolved) => Some(resolved.name.key.as_str()),
                None => return DistrictAssignment::rejected(DistrictOutcome::StateRejected),
            }
        } else {
            None
        };

        if let Some(hit) = self.index.find_containing(point) {
            if required_state.is_some_and(|key| key != hit.state.key) {
                return DistrictAssignment::rejected(DistrictOutcome::StateMismatch);
            }
            return matched(hit, DistrictVia::Polygon);
        }

        let fallback_state = required_state
            .map(str::to_string)
            .or_else(|| code_state_key(record));

        let hit = fallback_state.as_deref().and_then(|state_key| {
            record
                .district_name
                .as_deref()
                .and_then(|name| find_by_name(self.index, state_key, name))
        });

        hit.map_or_else(
            || DistrictAssignment::rejected(DistrictOutcome::Unmatched),
            |hit| matched(hit, DistrictVia::NameFallback),
        )
    }
}

fn matched(hit: &NamedPolygon, via: DistrictVia) -> DistrictAssignment {
    let Some(district) = hit.district.clone() else {
        return DistrictAssignment::rejected(DistrictOutcome::Unmatched);
    };
    DistrictAssignment {
        district: Some(DistrictMatch {
            id: hit.id,
            state: hit.state.clone(),
            district,
            code: hit.code.clone(),
        }),
        via: Some(via),
        outcome: DistrictOutcome::Matched,
    }
}

/// State key from the record's own codes: state identifier first, then the
/// municipality-key prefix.
fn code_state_key(record: &Record) -> Option<String> {
    let state_code = state_code_signal(record);
    let prefix = prefix_signal(record);
    state_code
        .key()
        .or_else(|| prefix.key())
        .map(str::to_string)
}

/// Finds the first district of `state_key` whose normalized name contains,
/// or is contained in, the normalized `name`.
#[must_use]
pub fn find_by_name<'i>(
    index: &'i PolygonIndex,
    state_key: &str,
    name: &str,
) -> Option<&'i NamedPolygon> {
    let needle = normalize_name(name);
    if needle.is_empty() {
        return None;
    }
    index.in_state(state_key).find(|polygon| {
        polygon.district.as_ref().is_some_and(|district| {
            let known = district.key.as_str();
            !known.is_empty() && (known.contains(&needle) || needle.contains(known))
        })
    })
}

#[cfg(test)]
mod tests {
    use mastr_map_record::{FieldNames, Record};
    use serde_json::{Value, json};

    use super::*;
    use crate::StateResolver;
    use crate::test_support::{districts, record, states};

    fn with_district(lon: &str, lat: &str, code: &str, key: &str, name: &str) -> Record {
        let Value::Object(object) = json!({
            "Laengengrad": lon,
            "Breitengrad": lat,
            "Bundesland": code,
            "Gemeindeschluessel": key,
            "Landkreis": name,
        }) else {
            unreachable!()
        };
        Record::from_object(object, &FieldNames::default())
    }

    #[test]
    fn polygon_match() {
        let index = districts();
        let record = record("10,2", "49,8", "1403", "09679000");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::Matched);
        assert_eq!(assignment.via, Some(DistrictVia::Polygon));
        let district = assignment.district.unwrap();
        assert_eq!(district.district.display, "Würzburg");
        assert_eq!(district.state.display, "Bayern");
        assert_eq!(district.code.as_deref(), Some("09679"));
    }

    #[test]
    fn name_fallback_substring() {
        let index = districts();
        // Outside every district polygon, but "München" is a substring of
        // "Landkreis München".
        let record = with_district("12,5", "50,5", "1403", "09184000", "München");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::Matched);
        assert_eq!(assignment.via, Some(DistrictVia::NameFallback));
        assert_eq!(
            assignment.district.unwrap().district.display,
            "Landkreis München"
        );
    }

    #[test]
    fn name_fallback_reverse_substring() {
        let index = districts();
        let record = with_district("12,5", "50,5", "1403", "09679000", "Landkreis Würzburg");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.via, Some(DistrictVia::NameFallback));
        assert_eq!(assignment.district.unwrap().district.display, "Würzburg");
    }

    #[test]
    fn name_fallback_is_scoped_to_state() {
        let index = districts();
        // Stuttgart exists, but in Baden-Württemberg, not Bayern.
        let record = with_district("12,5", "50,5", "1403", "09184000", "Stuttgart");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::Unmatched);
        assert!(assignment.district.is_none());
    }

    #[test]
    fn fallback_uses_prefix_when_state_code_missing() {
        let index = districts();
        let record = with_district("12,5", "50,5", "", "09184000", "München");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::Matched);
    }

    #[test]
    fn unmatched_without_name() {
        let index = districts();
        let record = record("12,5", "50,5", "1403", "09184000");
        let point = record.point().unwrap();

        let assignment = DistrictResolver::new(&index, false).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::Unmatched);
    }

    #[test]
    fn state_check_rejects_inconsistent_records() {
        let states = states();
        let index = districts();
        let record = record("10,2", "49,8", "1403", "08111000");
        let point = record.point().unwrap();
        let state = StateResolver::new(&states).resolve(&point, &record);

        let assignment = DistrictResolver::new(&index, true).resolve(&point, &record, Some(&state));
        assert_eq!(assignment.outcome, DistrictOutcome::StateRejected);

        let assignment = DistrictResolver::new(&index, true).resolve(&point, &record, None);
        assert_eq!(assignment.outcome, DistrictOutcome::StateRejected);
    }

    #[test]
    fn state_check_accepts_consistent_records() {
        let states = states();
        let index = districts();
        let record = record("10,2", "49,8", "1403", "09679000");
        let point = record.point().unwrap();
        let state = StateResolver::new(&states).resolve(&point, &record);

        let assignment = DistrictResolver::new(&index, true).resolve(&point, &record, Some(&state));
        assert_eq!(assignment.outcome, DistrictOutcome::Matched);
    }

    #[test]
    fn state_check_rejects_district_in_other_state() {
        let states = states();
        let index = districts();
        let record = record("9,1", "48,8", "1402", "08111000");
        let point = record.point().unwrap();
        let mut state = StateResolver::new(&states).resolve(&point, &record);
        assert!(state.is_consistent());

        let resolver = DistrictResolver::new(&index, true);
        assert_eq!(
            resolver.resolve(&point, &record, Some(&state)).outcome,
            DistrictOutcome::Matched
        );

        // A state pass that disagrees with the district's parent state.
        let polygon = state.polygon.as_mut().unwrap();
        polygon.name.key = "bayern".to_string();
        assert_eq!(
            resolver.resolve(&point, &record, Some(&state)).outcome,
            DistrictOutcome::StateMismatch
        );
    }

    #[test]
    fn find_by_name_ignores_blank_needle() {
        let index = districts();
        assert!(find_by_name(&index, "bayern", " - ").is_none());
        assert_eq!(
            find_by_name(&index, "bayern", "wuerzburg").map(|p| p.id),
            Some(0)
        );
    }
}
