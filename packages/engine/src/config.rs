//! Run configuration.
//!
//! A [`RunConfig`] is read once from an optional TOML file, adjusted by CLI
//! flags, and passed by reference to the engine. Every section has
//! defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! input_dir = "data/json"
//! output_dir = "output"
//! parallel = true
//!
//! [states]
//! path = "data/boundaries/bundeslaender.geojson"
//!
//! [districts]
//! path = "data/boundaries/gadm41_DEU_2.json"
//!
//! [years]
//! max = 2024
//! unknown = "drop"
//! ```

use std::path::{Path, PathBuf};

use mastr_map_aggregate::{Grouping, UnknownYearPolicy};
use mastr_map_record::{FieldNames, YearRange};
use mastr_map_spatial::{Backend, Containment, IndexOptions, NameFields};
use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::EngineError;

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the `*.json` record files.
    pub input_dir: PathBuf,
    /// Directory the output files are written to.
    pub output_dir: PathBuf,
    /// Summary file; `<output_dir>/summary.json` when unset.
    pub summary_path: Option<PathBuf>,
    /// Resolve the records of each file on all cores.
    pub parallel: bool,
    /// Record field names.
    pub fields: FieldNames,
    /// State boundaries.
    pub states: StatesConfig,
    /// District boundaries, required by district modes.
    pub districts: Option<DistrictsConfig>,
    /// Commissioning-year handling.
    pub years: YearsConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/json"),
            output_dir: PathBuf::from("output"),
            summary_path: None,
            parallel: false,
            fields: FieldNames::default(),
            states: StatesConfig::default(),
            districts: None,
            years: YearsConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this structure.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        Ok(toml::de::from_str(contents)?)
    }

    /// Where the run summary is written.
    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.summary_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("summary.json"))
    }
}

/// State boundary source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatesConfig {
    /// `GeoJSON` file with one feature per state.
    pub path: PathBuf,
    /// Property holding the state name.
    pub name_field: String,
    /// Point-in-polygon predicate.
    pub containment: Containment,
    /// Lookup strategy.
    pub backend: Backend,
}

impl Default for StatesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/boundaries/states.geojson"),
            name_field: "name".to_string(),
            containment: Containment::default(),
            backend: Backend::default(),
        }
    }
}

impl StatesConfig {
    /// Name properties of the boundary file.
    #[must_use]
    pub fn name_fields(&self) -> NameFields {
        NameFields::State {
            name: self.name_field.clone(),
        }
    }

    /// Index query behavior.
    #[must_use]
    pub const fn options(&self) -> IndexOptions {
        IndexOptions {
            containment: self.containment,
            backend: self.backend,
        }
    }
}

/// District boundary source (GADM level 2 layout by default).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DistrictsConfig {
    /// `GeoJSON` file with one feature per district.
    pub path: PathBuf,
    /// Property holding the district's state name.
    pub state_field: String,
    /// Property holding the district name.
    pub district_field: String,
    /// Property holding the district's administrative code.
    pub code_field: Option<String>,
    /// Point-in-polygon predicate.
    pub containment: Containment,
    /// Lookup strategy.
    pub backend: Backend,
}

impl Default for DistrictsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/boundaries/districts.geojson"),
            state_field: "NAME_1".to_string(),
            district_field: "NAME_2".to_string(),
            code_field: Some("CC_2".to_string()),
            containment: Containment::default(),
            backend: Backend::default(),
        }
    }
}

impl DistrictsConfig {
    /// Name properties of the boundary file.
    #[must_use]
    pub fn name_fields(&self) -> NameFields {
        NameFields::District {
            state: self.state_field.clone(),
            district: self.district_field.clone(),
            code: self.code_field.clone(),
        }
    }

    /// Index query behavior.
    #[must_use]
    pub const fn options(&self) -> IndexOptions {
        IndexOptions {
            containment: self.containment,
            backend: self.backend,
        }
    }
}

/// Commissioning-year handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YearsConfig {
    /// Earliest accepted year.
    pub min: u16,
    /// Latest accepted year.
    pub max: u16,
    /// What happens to records with an unknown year in year-keyed modes.
    pub unknown: UnknownYearPolicy,
}

impl Default for YearsConfig {
    fn default() -> Self {
        let range = YearRange::default();
        Self {
            min: range.min,
            max: range.max,
            unknown: UnknownYearPolicy::default(),
        }
    }
}

impl YearsConfig {
    /// Accepted year range.
    #[must_use]
    pub const fn range(&self) -> YearRange {
        YearRange {
            min: self.min,
            max: self.max,
        }
    }
}

/// What a run groups by and what it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    /// One `FeatureCollection` per state.
    States,
    /// One `FeatureCollection` per state and year.
    StatesByYear,
    /// One `FeatureCollection` per (state, district) and year.
    DistrictsByYear {
        /// Only accept districts of records that passed the state check.
        check_state: bool,
    },
    /// One `FeatureCollection` per district code and year.
    DistrictsByCodeYear {
        /// Only accept districts of records that passed the state check.
        check_state: bool,
    },
    /// Installed power per state.
    PowerByState,
    /// Installed power per state and year.
    PowerByStateYear {
        /// Carry totals forward over years.
        cumulative: bool,
    },
    /// Installed power per (state, district) and year.
    PowerByDistrictYear {
        /// Only accept districts of records that passed the state check.
        check_state: bool,
        /// Carry totals forward over years.
        cumulative: bool,
    },
}

impl Mode {
    /// Grouping dimension of the mode.
    #[must_use]
    pub const fn grouping(self) -> Grouping {
        match self {
            Self::States | Self::PowerByState => Grouping::Region,
            Self::StatesByYear | Self::PowerByStateYear { .. } => Grouping::RegionYear,
            Self::DistrictsByYear { .. } | Self::PowerByDistrictYear { .. } => {
                Grouping::DistrictYear
            }
            Self::DistrictsByCodeYear { .. } => Grouping::DistrictCodeYear,
        }
    }

    /// Whether the mode writes power totals instead of records.
    #[must_use]
    pub const fn is_power(self) -> bool {
        matches!(
            self,
            Self::PowerByState | Self::PowerByStateYear { .. } | Self::PowerByDistrictYear { .. }
        )
    }

    /// Whether district matches are re-validated against the state pass.
    #[must_use]
    pub const fn check_state(self) -> bool {
        match self {
            Self::DistrictsByYear { check_state }
            | Self::DistrictsByCodeYear { check_state }
            | Self::PowerByDistrictYear { check_state, .. } => check_state,
            Self::States | Self::StatesByYear | Self::PowerByState | Self::PowerByStateYear { .. } => {
                false
            }
        }
    }

    /// Whether power totals accumulate over years.
    #[must_use]
    pub const fn cumulative(self) -> bool {
        match self {
            Self::PowerByStateYear { cumulative } | Self::PowerByDistrictYear { cumulative, .. } => {
                cumulative
            }
            Self::States
            | Self::StatesByYear
            | Self::DistrictsByYear { .. }
            | Self::DistrictsByCodeYear { .. }
            | Self::PowerByState => false,
        }
    }
}
