//! Grouping dimensions.
//!
//! One parameterized key function replaces a separate pipeline per output
//! layout.

use mastr_map_region::municipality_prefix;
use mastr_map_region_models::{DistrictMatch, GroupKey, PolygonMatch, Year};
use serde::{Deserialize, Serialize};

use crate::UnknownYearPolicy;

/// Length of the nationwide district code (state + region + district).
const DISTRICT_CODE_LEN: usize = 5;

/// Resolution results of one accepted record, as seen by the grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved<'a> {
    /// Resolved state, when the state pass accepted the record.
    pub state: Option<&'a PolygonMatch>,
    /// Resolved district, when the district pass accepted the record.
    pub district: Option<&'a DistrictMatch>,
    /// Municipality key, used when the district polygon has no code.
    pub municipality_key: Option<&'a str>,
}

/// Output grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One group per state.
    Region,
    /// One group per state and year.
    RegionYear,
    /// One group per (state, district) and year.
    DistrictYear,
    /// One group per nationwide district code and year.
    DistrictCodeYear,
}

/// Why a record produced no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unkeyed {
    /// The record's year is unknown and the policy drops those.
    UnknownYearDropped,
    /// The resolution lacks what this grouping needs.
    MissingKey,
}

impl Grouping {
    /// Whether the grouping needs a district assignment.
    #[must_use]
    pub const fn needs_district(self) -> bool {
        matches!(self, Self::DistrictYear | Self::DistrictCodeYear)
    }

    /// Whether the grouping has a year dimension.
    #[must_use]
    pub const fn has_year(self) -> bool {
        !matches!(self, Self::Region)
    }

    /// Computes the group key for one accepted record.
    ///
    /// # Errors
    ///
    /// Returns [`Unkeyed`] when the record cannot be placed in a group.
    pub fn key(
        self,
        resolved: &Resolved<'_>,
        year: Year,
        unknown_years: UnknownYearPolicy,
    ) -> Result<GroupKey, Unkeyed> {
        if self.has_year() && year == Year::Unknown && unknown_years == UnknownYearPolicy::Drop {
            return Err(Unkeyed::UnknownYearDropped);
        }

        match self {
            Self::Region => {
                let state = resolved.state.ok_or(Unkeyed::MissingKey)?;
                Ok(GroupKey::Region {
                    region: state.name.display.clone(),
                })
            }
            Self::RegionYear => {
                let state = resolved.state.ok_or(Unkeyed::MissingKey)?;
                Ok(GroupKey::RegionYear {
                    region: state.name.display.clone(),
                    year,
                })
            }
            Self::DistrictYear => {
                let district = resolved.district.ok_or(Unkeyed::MissingKey)?;
                Ok(GroupKey::DistrictYear {
                    state: district.state.display.clone(),
                    district: district.district.display.clone(),
                    year,
                })
            }
            Self::DistrictCodeYear => {
                let district = resolved.district.ok_or(Unkeyed::MissingKey)?;
                let code = district
                    .code
                    .clone()
                    .or_else(|| {
                        resolved
                            .municipality_key
                            .and_then(|key| municipality_prefix(key, DISTRICT_CODE_LEN))
                            .map(str::to_string)
                    })
                    .ok_or(Unkeyed::MissingKey)?;
                Ok(GroupKey::DistrictCodeYear {
                    code,
                    district: district.district.display.clone(),
                    year,
                })
            }
        }
    }
}
