#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region assignment types shared by the resolvers and the aggregator.
//!
//! These are per-record computed values: they are produced once by a
//! resolver, read by the aggregator, and never persisted on their own.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// A region name in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionName {
    /// Normalized lookup key (lowercase, transliterated, punctuation stripped).
    pub key: String,
    /// Name as it appears in the boundary file or lookup table.
    pub display: String,
}

/// Result of mapping one attribute code to a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum CodeSignal {
    /// The code mapped to this normalized region key.
    Resolved(String),
    /// The record did not carry the field (or it was blank).
    Missing,
    /// The field was present but not in the lookup table.
    Unmapped(String),
}

impl CodeSignal {
    /// Returns the normalized region key if the code resolved.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Missing | Self::Unmapped(_) => None,
        }
    }

    /// Whether the code could not be resolved at all.
    #[must_use]
    pub const fn is_missing_or_unmapped(&self) -> bool {
        matches!(self, Self::Missing | Self::Unmapped(_))
    }
}

/// Terminal state-level outcome for a record with parseable coordinates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateOutcome {
    /// Polygon and both codes agree. The record is written.
    Consistent,
    /// No state polygon contains the point.
    NoPolygonMatch,
    /// A polygon matched but at least one code did not agree with it.
    Inconsistent,
}

/// One independent reason a record was not consistent.
///
/// A record may carry several of these at once; each maps to its own
/// counter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Discrepancy {
    /// State code absent or not in the lookup table.
    BundeslandMissingOrUnmapped,
    /// Municipality key absent, too short, or prefix not in the lookup table.
    GemeindeschluesselMissingOrUnmapped,
    /// State code resolved to a different region than the polygon.
    BundeslandMismatch,
    /// Municipality-key prefix resolved to a different region than the polygon.
    GemeindeschluesselMismatch,
    /// Both codes resolved but to different regions.
    CodePairMismatch,
}

/// A state polygon that contains a record's point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonMatch {
    /// Declared position of the polygon in its boundary file.
    pub id: usize,
    /// Region name carried by the polygon.
    pub name: RegionName,
}

/// State-level resolution of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAssignment {
    /// Polygon containing the point, if any.
    pub polygon: Option<PolygonMatch>,
    /// Region derived from the numeric state code.
    pub state_code: CodeSignal,
    /// Region derived from the municipality-key prefix.
    pub prefix: CodeSignal,
    /// Every independent reason the record disagrees.
    pub discrepancies: Vec<Discrepancy>,
    /// Terminal classification.
    pub outcome: StateOutcome,
}

impl RegionAssignment {
    /// Returns the resolved region, which only exists for consistent records.
    #[must_use]
    pub fn resolved(&self) -> Option<&PolygonMatch> {
        match self.outcome {
            StateOutcome::Consistent => self.polygon.as_ref(),
            StateOutcome::NoPolygonMatch | StateOutcome::Inconsistent => None,
        }
    }

    /// Whether the record is written to the per-region output.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        matches!(self.outcome, StateOutcome::Consistent)
    }
}

/// A district polygon a record was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictMatch {
    /// Declared position of the polygon in its boundary file.
    pub id: usize,
    /// State the district belongs to.
    pub state: RegionName,
    /// District name.
    pub district: RegionName,
    /// Cross-state unique administrative code, when the boundary file has one.
    pub code: Option<String>,
}

/// How a district match was found.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistrictVia {
    /// Point-in-polygon containment.
    Polygon,
    /// Substring match of the record's district-name attribute.
    NameFallback,
}

/// Terminal district-level outcome.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DistrictOutcome {
    /// Polygon containment or the name fallback succeeded.
    Matched,
    /// Neither containment nor the fallback found a district.
    Unmatched,
    /// The record failed the preceding state-level check.
    StateRejected,
    /// The district found lies in a different state than the state check resolved.
    StateMismatch,
}

/// District-level resolution of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictAssignment {
    /// Accepted district, present only when `outcome` is `Matched`.
    pub district: Option<DistrictMatch>,
    /// How the district was found.
    pub via: Option<DistrictVia>,
    /// Terminal classification.
    pub outcome: DistrictOutcome,
}

impl DistrictAssignment {
    /// Builds a non-matching assignment with the given outcome.
    #[must_use]
    pub const fn rejected(outcome: DistrictOutcome) -> Self {
        Self {
            district: None,
            via: None,
            outcome,
        }
    }
}

/// Commissioning year of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Year {
    /// A validated four-digit year.
    Known(u16),
    /// Missing, malformed, or out-of-range date.
    Unknown,
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(year) => write!(f, "{year}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Key identifying one output group.
///
/// All names are display names; the aggregator turns them into paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    /// One group per resolved state.
    Region {
        /// State name.
        region: String,
    },
    /// One group per resolved state and year.
    RegionYear {
        /// State name.
        region: String,
        /// Commissioning year.
        year: Year,
    },
    /// One group per (state, district) pair and year.
    DistrictYear {
        /// State name.
        state: String,
        /// District name.
        district: String,
        /// Commissioning year.
        year: Year,
    },
    /// One group per nationwide district code and year.
    DistrictCodeYear {
        /// Five-digit administrative code.
        code: String,
        /// District name, for display.
        district: String,
        /// Commissioning year.
        year: Year,
    },
}

impl GroupKey {
    /// Returns the year dimension of the key, if it has one.
    #[must_use]
    pub const fn year(&self) -> Option<Year> {
        match self {
            Self::Region { .. } => None,
            Self::RegionYear { year, .. }
            | Self::DistrictYear { year, .. }
            | Self::DistrictCodeYear { year, .. } => Some(*year),
        }
    }

    /// Returns the same region with a different year.
    ///
    /// Region keys have no year dimension and are returned unchanged.
    #[must_use]
    pub fn with_year(&self, year: Year) -> Self {
        match self {
            Self::Region { region } => Self::Region {
                region: region.clone(),
            },
            Self::RegionYear { region, .. } => Self::RegionYear {
                region: region.clone(),
                year,
            },
            Self::DistrictYear {
                state, district, ..
            } => Self::DistrictYear {
                state: state.clone(),
                district: district.clone(),
                year,
            },
            Self::DistrictCodeYear { code, district, .. } => Self::DistrictCodeYear {
                code: code.clone(),
                district: district.clone(),
                year,
            },
        }
    }

    /// Human-readable label of the region part of the key.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Region { region } | Self::RegionYear { region, .. } => region.clone(),
            Self::DistrictYear {
                state, district, ..
            } => format!("{district} ({state})"),
            Self::DistrictCodeYear { code, district, .. } => format!("{district} ({code})"),
        }
    }
}
