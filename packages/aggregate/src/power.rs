//! Installed-power totals per group and energy type.
//!
//! Chart layers need one point per group carrying the summed installed
//! power of each energy type. This is a fold over the grouped records, so
//! everything is materialized before output.
//!
//! Output layout: `power/<year>.geojson` for year-keyed groupings (one
//! point per region in each file), `power/all.geojson` otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use geo::Point;
use geojson::{Feature, Geometry, JsonObject};
use mastr_map_region_models::{GroupKey, Year};
use serde_json::json;

use crate::AggregateError;
use crate::features::write_collection;
use crate::paths::EXTENSION;

/// Subdirectory of the output directory holding power layers.
pub const POWER_DIR: &str = "power";

/// Category used for records without an energy-type code.
pub const UNKNOWN_ENERGY_TYPE: &str = "unknown";

/// Running totals of one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerGroup {
    /// Summed installed power per energy-type code.
    pub totals: BTreeMap<String, f64>,
    /// Records in the group, including those without a parseable power.
    pub count: u64,
    /// Representative point of the group's region.
    pub anchor: Option<Point<f64>>,
}

impl PowerGroup {
    /// Sum over all energy types.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.totals.values().sum()
    }

    fn absorb(&mut self, other: &Self) {
        for (energy_type, power) in &other.totals {
            *self.totals.entry(energy_type.clone()).or_default() += power;
        }
        self.count += other.count;
        if self.anchor.is_none() {
            self.anchor = other.anchor;
        }
    }
}

/// One output point of a power layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSummary {
    /// Group the totals belong to.
    pub key: GroupKey,
    /// Totals (cumulative up to `key`'s year when requested).
    pub group: PowerGroup,
    /// `group.total()` relative to the largest total in the same layer.
    pub scale: f64,
}

/// Folds accepted records into per-group power totals.
#[derive(Debug, Default)]
pub struct PowerAggregator {
    groups: BTreeMap<GroupKey, PowerGroup>,
}

impl PowerAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record's installed power to its group.
    ///
    /// `anchor` is only evaluated when the group is created. Returns
    /// whether `power` was present; records without one still count
    /// towards the group size.
    pub fn push(
        &mut self,
        key: GroupKey,
        energy_type: Option<&str>,
        power: Option<f64>,
        anchor: impl FnOnce() -> Option<Point<f64>>,
    ) -> bool {
        let group = self.groups.entry(key).or_insert_with(|| PowerGroup {
            anchor: anchor(),
            ..PowerGroup::default()
        });
        group.count += 1;

        let energy_type = energy_type.unwrap_or(UNKNOWN_ENERGY_TYPE);
        let total = group.totals.entry(energy_type.to_string()).or_default();
        if let Some(power) = power {
            *total += power;
            true
        } else {
            false
        }
    }

    /// Number of non-empty groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the totals of one group.
    #[must_use]
    pub fn get(&self, key: &GroupKey) -> Option<&PowerGroup> {
        self.groups.get(key)
    }

    /// Builds the output points, ordered by year and then key.
    ///
    /// With `cumulative`, each region gets a point in every known year from
    /// its first record onwards, carrying totals over all years up to and
    /// including that one. Unknown-year groups are never accumulated.
    #[must_use]
    pub fn summaries(&self, cumulative: bool) -> Vec<PowerSummary> {
        let mut layers: BTreeMap<Option<Year>, Vec<(GroupKey, PowerGroup)>> = BTreeMap::new();

        if cumulative {
            for (key, group) in self.cumulative_groups() {
                layers.entry(key.year()).or_default().push((key, group));
            }
        } else {
            for (key, group) in &self.groups {
                layers
                    .entry(key.year())
                    .or_default()
                    .push((key.clone(), group.clone()));
            }
        }

        layers
            .into_values()
            .flat_map(|layer| {
                let max = layer
                    .iter()
                    .map(|(_, group)| group.total())
                    .fold(0.0_f64, f64::max);
                layer.into_iter().map(move |(key, group)| PowerSummary {
                    scale: ratio(group.total(), max),
                    key,
                    group,
                })
            })
            .collect()
    }

    fn cumulative_groups(&self) -> Vec<(GroupKey, PowerGroup)> {
        let years: BTreeSet<Year> = self
            .groups
            .keys()
            .filter_map(GroupKey::year)
            .filter(|year| *year != Year::Unknown)
            .collect();

        // region (keyed with an unknown year) -> year -> group
        let mut series: BTreeMap<GroupKey, BTreeMap<Year, &PowerGroup>> = BTreeMap::new();
        let mut out = Vec::new();

        for (key, group) in &self.groups {
            match key.year() {
                Some(year @ Year::Known(_)) => {
                    series
                        .entry(key.with_year(Year::Unknown))
                        .or_default()
                        .insert(year, group);
                }
                Some(Year::Unknown) | None => out.push((key.clone(), group.clone())),
            }
        }

        for (region, by_year) in series {
            let mut running = PowerGroup::default();
            for year in &years {
                if let Some(group) = by_year.get(year) {
                    running.absorb(group);
                }
                if running.count > 0 {
                    out.push((region.with_year(*year), running.clone()));
                }
            }
        }

        out
    }

    /// Writes the power layers below `dir` and returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write(&self, dir: &Path, cumulative: bool) -> Result<Vec<PathBuf>, AggregateError> {
        let mut layers: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
        for summary in self.summaries(cumulative) {
            let layer = summary
                .key
                .year()
                .map_or_else(|| "all".to_string(), |year| year.to_string());
            layers.entry(layer).or_default().push(summary_feature(&summary));
        }

        let mut written = Vec::with_capacity(layers.len());
        for (layer, features) in layers {
            let path = dir.join(POWER_DIR).join(format!("{layer}.{EXTENSION}"));
            write_collection(&path, features)?;
            written.push(path);
        }

        log::info!("Wrote {} power layers to {}", written.len(), dir.display());
        Ok(written)
    }
}

/// Builds the chart-input feature for one summary.
#[must_use]
pub fn summary_feature(summary: &PowerSummary) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("region".to_string(), json!(summary.key.label()));
    if let Some(year) = summary.key.year() {
        properties.insert("year".to_string(), json!(year.to_string()));
    }
    if let GroupKey::DistrictCodeYear { code, .. } = &summary.key {
        properties.insert("code".to_string(), json!(code));
    }
    properties.insert("count".to_string(), json!(summary.group.count));
    properties.insert("total_power".to_string(), json!(summary.group.total()));
    properties.insert("scale".to_string(), json!(summary.scale));
    properties.insert("totals".to_string(), json!(summary.group.totals));

    Feature {
        bbox: None,
        geometry: summary
            .group
            .anchor
            .map(|p| Geometry::new(geojson::Value::Point(vec![p.x(), p.y()]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// `part / whole`, or 0 when `whole` is not positive.
fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::Value;

    use super::*;

    fn region_year(region: &str, year: Year) -> GroupKey {
        GroupKey::RegionYear {
            region: region.to_string(),
            year,
        }
    }

    fn anchor() -> Option<Point<f64>> {
        Some(Point::new(11.5, 49.0))
    }

    #[test]
    fn sums_per_energy_type() {
        let mut aggregator = PowerAggregator::new();
        let key = GroupKey::Region {
            region: "Bayern".to_string(),
        };
        assert!(aggregator.push(key.clone(), Some("2495"), Some(10.0), anchor));
        assert!(aggregator.push(key.clone(), Some("2495"), Some(5.5), anchor));
        assert!(aggregator.push(key.clone(), Some("2497"), Some(3000.0), anchor));
        assert!(!aggregator.push(key.clone(), None, None, anchor));

        let group = aggregator.get(&key).unwrap();
        assert_eq!(group.count, 4);
        assert!((group.totals["2495"] - 15.5).abs() < f64::EPSILON);
        assert!((group.totals["2497"] - 3000.0).abs() < f64::EPSILON);
        assert!(group.totals[UNKNOWN_ENERGY_TYPE].abs() < f64::EPSILON);
        assert!((group.total() - 3015.5).abs() < f64::EPSILON);
    }

    #[test]
    fn anchor_is_evaluated_once() {
        let mut aggregator = PowerAggregator::new();
        let key = GroupKey::Region {
            region: "Bayern".to_string(),
        };
        let mut calls = 0;
        for _ in 0..3 {
            aggregator.push(key.clone(), Some("2495"), Some(1.0), || {
                calls += 1;
                anchor()
            });
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn scale_is_relative_to_layer_max() {
        let mut aggregator = PowerAggregator::new();
        aggregator.push(region_year("Bayern", Year::Known(2015)), Some("2495"), Some(40.0), anchor);
        aggregator.push(region_year("Hessen", Year::Known(2015)), Some("2495"), Some(10.0), anchor);
        aggregator.push(region_year("Hessen", Year::Known(2019)), Some("2495"), Some(5.0), anchor);

        let summaries = aggregator.summaries(false);
        assert_eq!(summaries.len(), 3);
        assert!((summaries[0].scale - 1.0).abs() < f64::EPSILON);
        assert!((summaries[1].scale - 0.25).abs() < f64::EPSILON);
        assert_eq!(summaries[2].key, region_year("Hessen", Year::Known(2019)));
        assert!((summaries[2].scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_totals_scale_to_zero() {
        let mut aggregator = PowerAggregator::new();
        aggregator.push(region_year("Bayern", Year::Known(2015)), Some("2495"), None, anchor);
        let summaries = aggregator.summaries(false);
        assert!(summaries[0].scale.abs() < f64::EPSILON);
    }

    #[test]
    fn cumulative_carries_totals_forward() {
        let mut aggregator = PowerAggregator::new();
        aggregator.push(region_year("Bayern", Year::Known(2015)), Some("2495"), Some(10.0), anchor);
        aggregator.push(region_year("Bayern", Year::Known(2019)), Some("2497"), Some(20.0), anchor);
        aggregator.push(region_year("Hessen", Year::Known(2017)), Some("2495"), Some(5.0), anchor);
        aggregator.push(region_year("Hessen", Year::Unknown), Some("2495"), Some(1.0), anchor);

        let summaries = aggregator.summaries(true);
        let keys: Vec<String> = summaries
            .iter()
            .map(|s| format!("{}@{}", s.key.label(), s.key.year().unwrap()))
            .collect();
        assert_eq!(
            keys,
            vec![
                "Bayern@2015",
                "Bayern@2017",
                "Hessen@2017",
                "Bayern@2019",
                "Hessen@2019",
                "Hessen@unknown",
            ]
        );

        let bayern_2019 = &summaries[3].group;
        assert_eq!(bayern_2019.count, 2);
        assert!((bayern_2019.total() - 30.0).abs() < f64::EPSILON);
        let hessen_2019 = &summaries[4].group;
        assert!((hessen_2019.total() - 5.0).abs() < f64::EPSILON);
        let hessen_unknown = &summaries[5].group;
        assert!((hessen_unknown.total() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn writes_one_layer_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = PowerAggregator::new();
        aggregator.push(region_year("Bayern", Year::Known(2015)), Some("2495"), Some(10.0), anchor);
        aggregator.push(region_year("Bayern", Year::Known(2019)), Some("2495"), Some(2.0), anchor);

        let written = aggregator.write(dir.path(), false).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("power/2015.geojson"),
                dir.path().join("power/2019.geojson")
            ]
        );

        let content: Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        let feature = &content["features"][0];
        assert_eq!(feature["geometry"]["coordinates"], json!([11.5, 49.0]));
        assert_eq!(feature["properties"]["region"], "Bayern");
        assert_eq!(feature["properties"]["year"], "2015");
        assert_eq!(feature["properties"]["count"], 1);
        assert_eq!(feature["properties"]["totals"]["2495"], json!(10.0));
    }

    #[test]
    fn yearless_grouping_writes_single_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = PowerAggregator::new();
        aggregator.push(
            GroupKey::Region {
                region: "Bayern".to_string(),
            },
            Some("2495"),
            Some(10.0),
            || None,
        );

        let written = aggregator.write(dir.path(), false).unwrap();
        assert_eq!(written, vec![dir.path().join("power/all.geojson")]);

        let content: Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert!(content["features"][0]["geometry"].is_null());
    }

    #[test]
    fn ratio_handles_empty_whole() {
        assert!(ratio(5.0, 0.0).abs() < f64::EPSILON);
        assert!((ratio(5.0, 10.0) - 0.5).abs() < f64::EPSILON);
    }
}
