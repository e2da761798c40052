#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The reconciliation engine.
//!
//! One parameterized run covers every output layout: boundary indices are
//! loaded up front (a missing or empty boundary source aborts before any
//! record is read), then each `*.json` file of the input directory is
//! loaded, resolved and folded into the run's counters and groups. A file
//! that fails to load is logged, listed in the summary and skipped.
//!
//! Records of a file can be resolved on all cores. Each worker fills its
//! own partial counters; partials are merged and accepted records are put
//! back in input order before grouping, so sequential and parallel runs
//! produce identical output.

pub mod config;
pub mod progress;

use std::fs;
use std::path::{Path, PathBuf};

use geo::Point;
use mastr_map_aggregate::grouping::Unkeyed;
use mastr_map_aggregate::{
    AggregateError, AggregationCounters, FeatureAggregator, GroupKey, Grouping, PowerAggregator,
    Resolved, UnknownYearPolicy, features::record_feature,
};
use mastr_map_record::{Record, YearRange, load_records};
use mastr_map_region_models::{DistrictMatch, DistrictOutcome, PolygonMatch};
use mastr_map_report::{RunMetadata, RunSummary};
use mastr_map_resolve::{ConsistencyCounters, DistrictCounters, DistrictResolver, StateResolver};
use mastr_map_spatial::{PolygonIndex, SpatialError};
use rayon::prelude::*;

pub use config::{Mode, RunConfig};
pub use progress::{NullProgress, ProgressCallback};

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// I/O error (config file or input directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// A boundary index could not be built.
    #[error("Boundary error: {0}")]
    Spatial(#[from] SpatialError),

    /// Output could not be written.
    #[error("Output error: {0}")]
    Aggregate(#[from] AggregateError),

    /// The mode needs district boundaries but none are configured.
    #[error("Mode {mode} requires a [districts] boundary source")]
    MissingDistricts {
        /// The requested mode.
        mode: Mode,
    },
}

/// Record file extension the input directory is scanned for.
const INPUT_EXTENSION: &str = "json";

/// Runs the engine and writes outputs and summary.
///
/// A summary that cannot be written is logged; the run still succeeds and
/// returns it.
///
/// # Errors
///
/// Returns an error if a boundary index cannot be built, the input
/// directory cannot be listed, or output files cannot be written.
pub fn run(
    config: &RunConfig,
    mode: Mode,
    progress: &dyn ProgressCallback,
) -> Result<RunSummary, EngineError> {
    let grouping = mode.grouping();

    let states = PolygonIndex::load(
        &config.states.path,
        &config.states.name_fields(),
        config.states.options(),
    )?;

    let districts = if grouping.needs_district() {
        let districts_config = config
            .districts
            .as_ref()
            .ok_or(EngineError::MissingDistricts { mode })?;
        Some((
            districts_config,
            PolygonIndex::load(
                &districts_config.path,
                &districts_config.name_fields(),
                districts_config.options(),
            )?,
        ))
    } else {
        None
    };

    let resolvers = Resolvers {
        states: StateResolver::new(&states),
        districts: districts
            .as_ref()
            .map(|(_, index)| DistrictResolver::new(index, mode.check_state())),
    };

    let files = input_files(&config.input_dir)?;
    log::info!(
        "Processing {} input files from {} ({mode})",
        files.len(),
        config.input_dir.display()
    );
    progress.set_total(files.len() as u64);

    let mut state_counters = ConsistencyCounters::default();
    let mut district_counters = resolvers.districts.map(|_| DistrictCounters::default());
    let mut aggregation = AggregationCounters::default();
    let mut sink = if mode.is_power() {
        Sink::Power(PowerAggregator::new())
    } else {
        Sink::Features(FeatureAggregator::new())
    };
    let mut files_processed = Vec::new();
    let mut files_skipped = Vec::new();

    for path in &files {
        let name = file_name(path);
        progress.set_message(name.clone());

        let records = match load_records(path, &config.fields) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                files_skipped.push(name);
                progress.inc(1);
                continue;
            }
        };

        state_counters.record_file(records.len() as u64);
        let partial = resolvers.resolve_all(&records, config.parallel);
        state_counters.merge(&partial.state);
        if let Some(counters) = district_counters.as_mut() {
            counters.merge(&partial.district);
        }

        let grouped = sink.extend(
            partial.accepted,
            &GroupContext {
                grouping,
                years: config.years.range(),
                unknown_years: config.years.unknown,
                states: &states,
                districts: districts.as_ref().map(|(_, index)| index),
            },
        );
        aggregation.merge(&grouped);

        log::debug!(
            "{name}: {} records, {} grouped",
            records.len(),
            grouped.grouped
        );
        files_processed.push(name);
        progress.inc(1);
    }

    let written = sink.write(&config.output_dir, mode.cumulative())?;
    aggregation.files_written = written.len() as u64;
    progress.finish(format!("{} files written", written.len()));

    if !state_counters.reconciles() {
        log::error!(
            "Counters do not reconcile: {} entries seen, {} classified",
            state_counters.entries_seen,
            state_counters.classified()
        );
    }

    let summary = RunSummary::new(
        RunMetadata {
            mode: mode.to_string(),
            input_dir: config.input_dir.display().to_string(),
            output_dir: config.output_dir.display().to_string(),
            state_boundaries: config.states.path.display().to_string(),
            state_polygons: states.len(),
            district_boundaries: districts
                .as_ref()
                .map(|(c, _)| c.path.display().to_string()),
            district_polygons: districts.as_ref().map(|(_, index)| index.len()),
            files_processed,
            files_skipped,
            generated_at: String::new(),
        },
        state_counters,
        district_counters,
        aggregation,
    );

    if let Err(e) = summary.write(&config.summary_path()) {
        log::error!("Failed to write run summary: {e}");
    }

    Ok(summary)
}

/// Lists the record files of `dir`, sorted by name.
///
/// A missing directory yields no files.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn input_files(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if !dir.exists() {
        log::warn!("Input directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == INPUT_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// The resolvers of one run.
struct Resolvers<'i> {
    states: StateResolver<'i>,
    districts: Option<DistrictResolver<'i>>,
}

impl Resolvers<'_> {
    fn resolve_all<'r>(&self, records: &'r [Record], parallel: bool) -> Partial<'r> {
        let mut partial = if parallel {
            records
                .par_iter()
                .enumerate()
                .fold(Partial::default, |mut acc, (index, record)| {
                    self.visit(&mut acc, index, record);
                    acc
                })
                .reduce(Partial::default, Partial::merge)
        } else {
            records
                .iter()
                .enumerate()
                .fold(Partial::default(), |mut acc, (index, record)| {
                    self.visit(&mut acc, index, record);
                    acc
                })
        };
        partial.accepted.sort_by_key(|accepted| accepted.index);
        partial
    }

    fn visit<'r>(&self, acc: &mut Partial<'r>, index: usize, record: &'r Record) {
        let Some(point) = record.point() else {
            acc.state.record_invalid_coordinates();
            return;
        };

        let assignment = self.states.resolve(&point, record);
        acc.state.record(&assignment);

        if let Some(districts) = &self.districts {
            let district = districts.resolve(&point, record, Some(&assignment));
            acc.district.record(&district);
            if district.outcome == DistrictOutcome::Matched {
                acc.accepted.push(Accepted {
                    index,
                    record,
                    point,
                    state: assignment.resolved().cloned(),
                    district: district.district,
                });
            }
        } else if let Some(state) = assignment.resolved() {
            acc.accepted.push(Accepted {
                index,
                record,
                point,
                state: Some(state.clone()),
                district: None,
            });
        }
    }
}

/// A record that passed resolution, with what it resolved to.
struct Accepted<'r> {
    index: usize,
    record: &'r Record,
    point: Point<f64>,
    state: Option<PolygonMatch>,
    district: Option<DistrictMatch>,
}

/// One worker's share of a file.
#[derive(Default)]
struct Partial<'r> {
    state: ConsistencyCounters,
    district: DistrictCounters,
    accepted: Vec<Accepted<'r>>,
}

impl Partial<'_> {
    fn merge(mut self, other: Self) -> Self {
        self.state.merge(&other.state);
        self.district.merge(&other.district);
        self.accepted.extend(other.accepted);
        self
    }
}

/// What grouping needs besides the record.
struct GroupContext<'i> {
    grouping: Grouping,
    years: YearRange,
    unknown_years: UnknownYearPolicy,
    states: &'i PolygonIndex,
    districts: Option<&'i PolygonIndex>,
}

impl GroupContext<'_> {
    fn key(&self, accepted: &Accepted<'_>) -> Result<GroupKey, Unkeyed> {
        let resolved = Resolved {
            state: accepted.state.as_ref(),
            district: accepted.district.as_ref(),
            municipality_key: accepted.record.municipality_key.as_deref(),
        };
        self.grouping
            .key(&resolved, accepted.record.year(self.years), self.unknown_years)
    }

    /// Centroid of the polygon the record was grouped under.
    fn anchor(&self, accepted: &Accepted<'_>) -> Option<Point<f64>> {
        if self.grouping.needs_district() {
            let district = accepted.district.as_ref()?;
            self.districts?.centroid(district.id)
        } else {
            let state = accepted.state.as_ref()?;
            self.states.centroid(state.id)
        }
    }
}

/// Where grouped records go.
enum Sink {
    Features(FeatureAggregator),
    Power(PowerAggregator),
}

impl Sink {
    fn extend(&mut self, accepted: Vec<Accepted<'_>>, ctx: &GroupContext<'_>) -> AggregationCounters {
        let mut counters = AggregationCounters::default();

        for accepted in accepted {
            let key = match ctx.key(&accepted) {
                Ok(key) => key,
                Err(Unkeyed::UnknownYearDropped) => {
                    counters.unknown_year_dropped += 1;
                    continue;
                }
                Err(Unkeyed::MissingKey) => {
                    counters.missing_group_key += 1;
                    continue;
                }
            };
            counters.grouped += 1;

            match self {
                Self::Features(aggregator) => {
                    aggregator.push(key, record_feature(accepted.record, accepted.point));
                }
                Self::Power(aggregator) => {
                    let has_power = aggregator.push(
                        key,
                        accepted.record.energy_type.as_deref(),
                        accepted.record.installed_power(),
                        || ctx.anchor(&accepted),
                    );
                    if !has_power {
                        counters.missing_power += 1;
                    }
                }
            }
        }

        counters
    }

    fn write(self, dir: &Path, cumulative: bool) -> Result<Vec<PathBuf>, AggregateError> {
        match self {
            Self::Features(aggregator) => aggregator.write(dir),
            Self::Power(aggregator) => aggregator.write(dir, cumulative),
        }
    }
}
