//! Run-scoped resolution counters.
//!
//! Counters are plain values: each worker fills its own and the results are
//! combined with `merge`. Field names are the keys of the JSON summary.

use mastr_map_region_models::{
    Discrepancy, DistrictAssignment, DistrictOutcome, DistrictVia, RegionAssignment,
    StateOutcome,
};
use serde::{Deserialize, Serialize};

/// State-level counters.
///
/// Every record read lands in exactly one of `invalid_coordinates`,
/// `no_polygon_match`, `consistent`, or `rejected_with_polygon`. The
/// per-signal counters are additive on top of that: one record can bump
/// several of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyCounters {
    /// Input files that loaded successfully.
    pub files_processed: u64,
    /// Records read from those files.
    pub entries_seen: u64,
    /// Records whose coordinates were missing, non-numeric or out of range.
    pub invalid_coordinates: u64,
    /// Records where polygon and both codes agree (written).
    pub consistent: u64,
    /// Records with valid coordinates outside every state polygon.
    pub no_polygon_match: u64,
    /// Records inside a state polygon that failed a code check.
    pub rejected_with_polygon: u64,
    /// State identifier absent or not in the lookup table.
    pub bundesland_missing_or_unmapped: u64,
    /// Municipality key absent, too short, or prefix not in the lookup table.
    pub gemeindeschluessel_missing_or_unmapped: u64,
    /// State identifier disagrees with the polygon.
    pub bundesland_mismatch_count: u64,
    /// Municipality-key prefix disagrees with the polygon.
    pub gemeindeschluessel_mismatch_count: u64,
    /// Both codes resolved but disagree with each other.
    pub code_pair_mismatch_count: u64,
}

impl ConsistencyCounters {
    /// Counts one successfully loaded file and its records.
    pub const fn record_file(&mut self, entries: u64) {
        self.files_processed += 1;
        self.entries_seen += entries;
    }

    /// Counts a record whose coordinates did not parse.
    pub const fn record_invalid_coordinates(&mut self) {
        self.invalid_coordinates += 1;
    }

    /// Counts one resolved record.
    pub fn record(&mut self, assignment: &RegionAssignment) {
        match assignment.outcome {
            StateOutcome::Consistent => self.consistent += 1,
            StateOutcome::NoPolygonMatch => self.no_polygon_match += 1,
            StateOutcome::Inconsistent => self.rejected_with_polygon += 1,
        }

        for discrepancy in &assignment.discrepancies {
            match discrepancy {
                Discrepancy::BundeslandMissingOrUnmapped => {
                    self.bundesland_missing_or_unmapped += 1;
                }
                Discrepancy::GemeindeschluesselMissingOrUnmapped => {
                    self.gemeindeschluessel_missing_or_unmapped += 1;
                }
                Discrepancy::BundeslandMismatch => self.bundesland_mismatch_count += 1,
                Discrepancy::GemeindeschluesselMismatch => {
                    self.gemeindeschluessel_mismatch_count += 1;
                }
                Discrepancy::CodePairMismatch => self.code_pair_mismatch_count += 1,
            }
        }
    }

    /// Adds another worker's counts into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.files_processed += other.files_processed;
        self.entries_seen += other.entries_seen;
        self.invalid_coordinates += other.invalid_coordinates;
        self.consistent += other.consistent;
        self.no_polygon_match += other.no_polygon_match;
        self.rejected_with_polygon += other.rejected_with_polygon;
        self.bundesland_missing_or_unmapped += other.bundesland_missing_or_unmapped;
        self.gemeindeschluessel_missing_or_unmapped += other.gemeindeschluessel_missing_or_unmapped;
        self.bundesland_mismatch_count += other.bundesland_mismatch_count;
        self.gemeindeschluessel_mismatch_count += other.gemeindeschluessel_mismatch_count;
        self.code_pair_mismatch_count += other.code_pair_mismatch_count;
    }

    /// Records classified into one of the four exclusive buckets.
    #[must_use]
    pub const fn classified(&self) -> u64 {
        self.invalid_coordinates + self.no_polygon_match + self.consistent + self.rejected_with_polygon
    }

    /// Whether every record seen is accounted for exactly once.
    #[must_use]
    pub const fn reconciles(&self) -> bool {
        self.classified() == self.entries_seen
    }
}

/// District-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCounters {
    /// Records that reached the district stage.
    pub entries_seen: u64,
    /// Matched by polygon containment.
    pub matched_polygon: u64,
    /// Matched by the district-name fallback.
    pub matched_name_fallback: u64,
    /// Neither containment nor the fallback found a district.
    pub unmatched: u64,
    /// Skipped because the state pass rejected the record.
    pub state_rejected: u64,
    /// District polygon lies in a different state than the state pass.
    pub state_mismatch: u64,
}

impl DistrictCounters {
    /// Counts one district assignment.
    pub const fn record(&mut self, assignment: &DistrictAssignment) {
        self.entries_seen += 1;
        match assignment.outcome {
            DistrictOutcome::Matched => match assignment.via {
                Some(DistrictVia::NameFallback) => self.matched_name_fallback += 1,
                Some(DistrictVia::Polygon) | None => self.matched_polygon += 1,
            },
            DistrictOutcome::Unmatched => self.unmatched += 1,
            DistrictOutcome::StateRejected => self.state_rejected += 1,
            DistrictOutcome::StateMismatch => self.state_mismatch += 1,
        }
    }

    /// Adds another worker's counts into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.entries_seen += other.entries_seen;
        self.matched_polygon += other.matched_polygon;
        self.matched_name_fallback += other.matched_name_fallback;
        self.unmatched += other.unmatched;
        self.state_rejected += other.state_rejected;
        self.state_mismatch += other.state_mismatch;
    }

    /// Total accepted district assignments.
    #[must_use]
    pub const fn matched(&self) -> u64 {
        self.matched_polygon + self.matched_name_fallback
    }
}
