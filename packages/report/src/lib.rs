#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Run summary.
//!
//! A [`RunSummary`] bundles the merged counters of one run with the paths
//! and files it used. It is written as pretty-printed JSON and rendered as
//! a short human-readable block for the terminal.

use std::fmt;
use std::fs;
use std::path::Path;

use mastr_map_aggregate::AggregationCounters;
use mastr_map_resolve::{ConsistencyCounters, DistrictCounters};
use serde::{Deserialize, Serialize};

/// Errors that can occur while writing the summary.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error (directory creation or file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the run read and where it wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run mode name.
    pub mode: String,
    /// Directory the input files were read from.
    pub input_dir: String,
    /// Directory the output files were written to.
    pub output_dir: String,
    /// State boundary file.
    pub state_boundaries: String,
    /// Polygons in the state index.
    pub state_polygons: usize,
    /// District boundary file, for district runs.
    pub district_boundaries: Option<String>,
    /// Polygons in the district index, for district runs.
    pub district_polygons: Option<usize>,
    /// Input files that loaded, in processing order.
    pub files_processed: Vec<String>,
    /// Input files that failed to load.
    pub files_skipped: Vec<String>,
    /// RFC 3339 timestamp of summary creation.
    pub generated_at: String,
}

/// Shares of `entries_seen`, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    /// Consistent records.
    pub consistent_pct: f64,
    /// Records outside every state polygon.
    pub no_polygon_match_pct: f64,
    /// Records rejected despite a polygon match.
    pub rejected_pct: f64,
    /// Records with unusable coordinates.
    pub invalid_coordinates_pct: f64,
}

impl Rates {
    /// Computes the rates for a set of counters.
    #[must_use]
    pub fn from_counters(counters: &ConsistencyCounters) -> Self {
        let whole = counters.entries_seen;
        Self {
            consistent_pct: percentage(counters.consistent, whole),
            no_polygon_match_pct: percentage(counters.no_polygon_match, whole),
            rejected_pct: percentage(counters.rejected_with_polygon, whole),
            invalid_coordinates_pct: percentage(counters.invalid_coordinates, whole),
        }
    }
}

/// Everything reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Paths and files.
    pub metadata: RunMetadata,
    /// State-level counters.
    pub state: ConsistencyCounters,
    /// District-level counters, for district runs.
    pub district: Option<DistrictCounters>,
    /// Grouping and output counters.
    pub aggregation: AggregationCounters,
    /// State-level rates.
    pub rates: Rates,
}

impl RunSummary {
    /// Assembles a summary and stamps it with the current time.
    #[must_use]
    pub fn new(
        mut metadata: RunMetadata,
        state: ConsistencyCounters,
        district: Option<DistrictCounters>,
        aggregation: AggregationCounters,
    ) -> Self {
        metadata.generated_at = chrono::Utc::now().to_rfc3339();
        let rates = Rates::from_counters(&state);
        Self {
            metadata,
            state,
            district,
            aggregation,
            rates,
        }
    }

    /// Writes the summary as pretty-printed JSON, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        log::info!("Wrote run summary to {}", path.display());
        Ok(())
    }

    /// Renders the human-readable block printed after a run.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.state;
        let r = &self.rates;

        writeln!(f, "MaStR map run: {}", self.metadata.mode)?;
        writeln!(
            f,
            "  Files:              {} processed, {} skipped",
            s.files_processed,
            self.metadata.files_skipped.len()
        )?;
        writeln!(f, "  Entries seen:       {}", s.entries_seen)?;
        writeln!(
            f,
            "  Invalid coords:     {} ({:.2}%)",
            s.invalid_coordinates, r.invalid_coordinates_pct
        )?;
        writeln!(
            f,
            "  Consistent:         {} ({:.2}%)",
            s.consistent, r.consistent_pct
        )?;
        writeln!(
            f,
            "  No polygon match:   {} ({:.2}%)",
            s.no_polygon_match, r.no_polygon_match_pct
        )?;
        writeln!(
            f,
            "  Rejected:           {} ({:.2}%)",
            s.rejected_with_polygon, r.rejected_pct
        )?;
        writeln!(
            f,
            "    Bundesland missing/unmapped:        {}",
            s.bundesland_missing_or_unmapped
        )?;
        writeln!(
            f,
            "    Gemeindeschluessel missing/unmapped: {}",
            s.gemeindeschluessel_missing_or_unmapped
        )?;
        writeln!(
            f,
            "    Bundesland mismatch:                {}",
            s.bundesland_mismatch_count
        )?;
        writeln!(
            f,
            "    Gemeindeschluessel mismatch:        {}",
            s.gemeindeschluessel_mismatch_count
        )?;
        writeln!(
            f,
            "    Code pair mismatch:                 {}",
            s.code_pair_mismatch_count
        )?;

        if let Some(d) = &self.district {
            writeln!(
                f,
                "  Districts:          {} matched ({} polygon, {} name fallback), {} unmatched, {} state rejected, {} state mismatch",
                d.matched(),
                d.matched_polygon,
                d.matched_name_fallback,
                d.unmatched,
                d.state_rejected,
                d.state_mismatch
            )?;
        }

        let a = &self.aggregation;
        writeln!(
            f,
            "  Grouped:            {} ({} unknown-year dropped, {} without key)",
            a.grouped, a.unknown_year_dropped, a.missing_group_key
        )?;
        write!(f, "  Files written:      {}", a.files_written)?;

        if !s.reconciles() {
            write!(
                f,
                "\n  WARNING: {} of {} entries unaccounted for",
                s.entries_seen.saturating_sub(s.classified()),
                s.entries_seen
            )?;
        }

        Ok(())
    }
}

/// `part` as a percentage of `whole`; 0 for an empty `whole`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn counters() -> ConsistencyCounters {
        ConsistencyCounters {
            files_processed: 1,
            entries_seen: 4,
            invalid_coordinates: 1,
            consistent: 2,
            no_polygon_match: 1,
            ..ConsistencyCounters::default()
        }
    }

    #[test]
    fn percentage_of_empty_set_is_zero() {
        assert!(percentage(0, 0).abs() < f64::EPSILON);
        assert!(percentage(5, 0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rates_follow_counters() {
        let rates = Rates::from_counters(&counters());
        assert!((rates.consistent_pct - 50.0).abs() < f64::EPSILON);
        assert!((rates.no_polygon_match_pct - 25.0).abs() < f64::EPSILON);
        assert!((rates.invalid_coordinates_pct - 25.0).abs() < f64::EPSILON);
        assert!(rates.rejected_pct.abs() < f64::EPSILON);
    }

    #[test]
    fn writes_json_with_counter_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("summary.json");
        let summary = RunSummary::new(
            RunMetadata {
                mode: "states".to_string(),
                files_processed: vec!["a.json".to_string()],
                ..RunMetadata::default()
            },
            counters(),
            None,
            AggregationCounters::default(),
        );
        summary.write(&path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["mode"], "states");
        assert_eq!(value["metadata"]["files_processed"][0], "a.json");
        assert_eq!(value["state"]["entries_seen"], 4);
        assert_eq!(value["state"]["consistent"], 2);
        assert_eq!(value["state"]["gemeindeschluessel_mismatch_count"], 0);
        assert!(value["district"].is_null());
        assert!(!value["metadata"]["generated_at"].as_str().unwrap().is_empty());

        let parsed: RunSummary = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.state, summary.state);
    }

    #[test]
    fn empty_run_renders() {
        let summary = RunSummary::new(
            RunMetadata::default(),
            ConsistencyCounters::default(),
            Some(DistrictCounters::default()),
            AggregationCounters::default(),
        );
        let text = summary.render();
        assert!(text.contains("Entries seen:       0"));
        assert!(text.contains("(0.00%)"));
        assert!(text.contains("Districts:"));
        assert!(!text.contains("WARNING"));
    }

    #[test]
    fn render_flags_unreconciled_counts() {
        let mut state = counters();
        state.entries_seen = 6;
        let summary = RunSummary::new(
            RunMetadata::default(),
            state,
            None,
            AggregationCounters::default(),
        );
        assert!(summary.render().contains("WARNING: 2 of 6 entries unaccounted for"));
    }

    #[test]
    fn display_matches_render_line_by_line() {
        let summary = RunSummary::new(
            RunMetadata {
                mode: "states".to_string(),
                ..RunMetadata::default()
            },
            counters(),
            None,
            AggregationCounters {
                files_written: 3,
                ..AggregationCounters::default()
            },
        );
        let text = format!("{summary}");
        assert_eq!(text, summary.render());

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"MaStR map run: states"));
        assert_eq!(lines.last(), Some(&"  Files written:      3"));
        assert!(!text.ends_with('\n'));
    }
}
