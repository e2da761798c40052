#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grouping and output for resolved records.
//!
//! Accepted records are grouped by a [`GroupKey`] chosen by a [`Grouping`]
//! and either emitted as one `GeoJSON` `FeatureCollection` per group
//! ([`FeatureAggregator`]) or folded into installed-power totals per
//! energy type ([`PowerAggregator`]).
//!
//! Groups live in ordered maps and are fully materialized before anything
//! is written. A group only exists once a record was pushed into it, so no
//! empty file is ever created, and identical input always produces
//! byte-identical output.

pub mod features;
pub mod grouping;
pub mod paths;
pub mod power;

use serde::{Deserialize, Serialize};

pub use features::FeatureAggregator;
pub use grouping::{Grouping, Resolved};
pub use mastr_map_region_models::GroupKey;
pub use power::PowerAggregator;

/// Errors that can occur while writing aggregated output.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// I/O error (directory creation or file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to do with records whose commissioning year is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownYearPolicy {
    /// Leave them out of year-keyed output.
    Drop,
    /// Collect them in an `unknown` group.
    #[default]
    Bucket,
}

/// Aggregation counters reported in the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationCounters {
    /// Records placed into a group.
    pub grouped: u64,
    /// Records left out because their year was unknown.
    pub unknown_year_dropped: u64,
    /// Accepted records the grouping could not key (e.g. no district code).
    pub missing_group_key: u64,
    /// Grouped records whose installed power did not parse.
    pub missing_power: u64,
    /// Output files written.
    pub files_written: u64,
}

impl AggregationCounters {
    /// Adds another worker's counts into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.grouped += other.grouped;
        self.unknown_year_dropped += other.unknown_year_dropped;
        self.missing_group_key += other.missing_group_key;
        self.missing_power += other.missing_power;
        self.files_written += other.files_written;
    }
}
