#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the MaStR map reconciliation engine.
//!
//! Each subcommand selects one run mode; global flags override values of
//! the optional TOML configuration file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mastr_map_cli_utils::IndicatifProgress;
use mastr_map_engine::config::DistrictsConfig;
use mastr_map_engine::{Mode, RunConfig};
use mastr_map_spatial::Backend;

#[derive(Parser)]
#[command(
    name = "mastr_map",
    about = "Resolve MaStR power-plant records to states and districts"
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Values that override the configuration file.
#[derive(Args)]
struct Overrides {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the `*.json` record files
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,
    /// Directory the output files are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Summary file (default: `<output-dir>/summary.json`)
    #[arg(long, global = true)]
    summary: Option<PathBuf>,
    /// State boundary `GeoJSON` file
    #[arg(long, global = true)]
    states: Option<PathBuf>,
    /// District boundary `GeoJSON` file
    #[arg(long, global = true)]
    districts: Option<PathBuf>,
    /// Polygon lookup strategy for both boundary sources
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,
    /// Resolve records on all cores
    #[arg(long, global = true)]
    parallel: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Rtree,
    Linear,
}

impl From<BackendArg> for Backend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Rtree => Self::Rtree,
            BackendArg::Linear => Self::Linear,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    State,
    District,
}

#[derive(Subcommand)]
enum Commands {
    /// Write consistent records grouped by state
    States {
        /// Split each state into one file per commissioning year
        #[arg(long)]
        by_year: bool,
    },
    /// Write records grouped by district and commissioning year
    Districts {
        /// Group by nationwide district code instead of state/district name
        #[arg(long)]
        nationwide: bool,
        /// Only accept districts of records that pass the state check
        #[arg(long)]
        check_state: bool,
    },
    /// Write installed-power totals per energy type
    Power {
        /// Region level to total by
        #[arg(long, value_enum, default_value = "state")]
        level: Level,
        /// One layer per commissioning year (always on for districts)
        #[arg(long)]
        by_year: bool,
        /// Carry totals forward over years (requires `--by-year`)
        #[arg(long, requires = "by_year")]
        cumulative: bool,
        /// Only accept districts of records that pass the state check
        #[arg(long)]
        check_state: bool,
    },
}

impl Commands {
    const fn mode(&self) -> Mode {
        match *self {
            Self::States { by_year: false } => Mode::States,
            Self::States { by_year: true } => Mode::StatesByYear,
            Self::Districts {
                nationwide: false,
                check_state,
            } => Mode::DistrictsByYear { check_state },
            Self::Districts {
                nationwide: true,
                check_state,
            } => Mode::DistrictsByCodeYear { check_state },
            Self::Power {
                level: Level::District,
                cumulative,
                check_state,
                ..
            } => Mode::PowerByDistrictYear {
                check_state,
                cumulative,
            },
            Self::Power {
                level: Level::State,
                by_year: true,
                cumulative,
                ..
            } => Mode::PowerByStateYear { cumulative },
            Self::Power {
                level: Level::State,
                by_year: false,
                ..
            } => Mode::PowerByState,
        }
    }
}

fn build_config(overrides: Overrides) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let mut config = match &overrides.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(dir) = overrides.input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = overrides.output_dir {
        config.output_dir = dir;
    }
    if let Some(path) = overrides.summary {
        config.summary_path = Some(path);
    }
    if let Some(path) = overrides.states {
        config.states.path = path;
    }
    if let Some(path) = overrides.districts {
        config
            .districts
            .get_or_insert_with(DistrictsConfig::default)
            .path = path;
    }
    if let Some(backend) = overrides.backend {
        config.states.backend = backend.into();
        if let Some(districts) = config.districts.as_mut() {
            districts.backend = backend.into();
        }
    }
    if overrides.parallel {
        config.parallel = true;
    }

    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = mastr_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mode = cli.command.mode();
    let config = build_config(cli.overrides)?;

    log::info!("Running {mode}");
    let progress = IndicatifProgress::files_bar(&multi, "Loading boundaries...");
    let summary = mastr_map_engine::run(&config, mode, progress.as_ref())?;

    println!();
    println!("{}", summary.render());

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cumulative_without_by_year_is_rejected() {
        let err = Cli::try_parse_from(["mastr_map", "power", "--cumulative"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from([
            "mastr_map",
            "power",
            "--level",
            "district",
            "--cumulative",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn cumulative_with_by_year_selects_cumulative_state_layers() {
        let cli = Cli::try_parse_from(["mastr_map", "power", "--by-year", "--cumulative"]).unwrap();
        assert_eq!(cli.command.mode(), Mode::PowerByStateYear { cumulative: true });

        let cli = Cli::try_parse_from([
            "mastr_map",
            "power",
            "--level",
            "district",
            "--by-year",
            "--cumulative",
        ])
        .unwrap();
        assert_eq!(
            cli.command.mode(),
            Mode::PowerByDistrictYear {
                check_state: false,
                cumulative: true,
            }
        );
    }

    #[test]
    fn power_defaults_to_state_totals() {
        let cli = Cli::try_parse_from(["mastr_map", "power"]).unwrap();
        assert_eq!(cli.command.mode(), Mode::PowerByState);
    }
}
