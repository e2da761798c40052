//! Per-group `FeatureCollection` output.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry};
use mastr_map_record::Record;
use mastr_map_region_models::GroupKey;

use crate::AggregateError;
use crate::paths::relative_path;

/// Builds the output feature for a record: its point as geometry and every
/// non-coordinate property unchanged.
#[must_use]
pub fn record_feature(record: &Record, point: Point<f64>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            point.x(),
            point.y(),
        ]))),
        id: None,
        properties: Some(record.properties.clone()),
        foreign_members: None,
    }
}

/// Collects features per group and writes one file per group.
#[derive(Debug, Default)]
pub struct FeatureAggregator {
    groups: BTreeMap<GroupKey, Vec<Feature>>,
}

impl FeatureAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one feature to its group, creating the group on first use.
    pub fn push(&mut self, key: GroupKey, feature: Feature) {
        self.groups.entry(key).or_default().push(feature);
    }

    /// Number of non-empty groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of features across groups.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Writes every group below `dir` and returns the written paths.
    ///
    /// Groups whose keys map to the same file are written together, in key
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write(self, dir: &Path) -> Result<Vec<PathBuf>, AggregateError> {
        let mut files: BTreeMap<PathBuf, (Vec<String>, Vec<Feature>)> = BTreeMap::new();
        for (key, features) in self.groups {
            let (labels, file) = files.entry(dir.join(relative_path(&key))).or_default();
            labels.push(key.label());
            file.extend(features);
        }

        let mut written = Vec::with_capacity(files.len());
        for (path, (labels, features)) in files {
            if labels.len() > 1 {
                log::warn!(
                    "Merging {} groups into {}: {}",
                    labels.len(),
                    path.display(),
                    labels.join(", ")
                );
            }
            let count = features.len();
            write_collection(&path, features)?;
            log::debug!("Wrote {count} features for {} to {}", labels.join(", "), path.display());
            written.push(path);
        }

        log::info!("Wrote {} feature collections to {}", written.len(), dir.display());
        Ok(written)
    }
}

/// Writes a `FeatureCollection` file, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_collection(path: &Path, features: Vec<Feature>) -> Result<(), AggregateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    fs::write(path, serde_json::to_string(&collection)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mastr_map_record::FieldNames;
    use mastr_map_region_models::Year;
    use serde_json::{Value, json};

    use super::*;

    fn record(id: &str) -> Record {
        let Value::Object(object) = json!({
            "EinheitMastrNummer": id,
            "Laengengrad": "10,2",
            "Breitengrad": "50,0",
            "Bundesland": "1403",
        }) else {
            unreachable!()
        };
        Record::from_object(object, &FieldNames::default())
    }

    fn region_year(year: u16) -> GroupKey {
        GroupKey::RegionYear {
            region: "Bayern".to_string(),
            year: Year::Known(year),
        }
    }

    #[test]
    fn feature_promotes_coordinates() {
        let record = record("SEE1");
        let feature = record_feature(&record, record.point().unwrap());
        let value = serde_json::to_value(&feature).unwrap();

        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["geometry"]["coordinates"], json!([10.2, 50.0]));
        assert_eq!(value["properties"]["EinheitMastrNummer"], "SEE1");
        assert!(value["properties"].get("Laengengrad").is_none());
        assert!(value["properties"].get("Breitengrad").is_none());
    }

    #[test]
    fn writes_one_file_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = FeatureAggregator::new();
        for (id, year) in [("SEE1", 2015), ("SEE2", 2019), ("SEE3", 2015)] {
            let record = record(id);
            aggregator.push(region_year(year), record_feature(&record, record.point().unwrap()));
        }
        assert_eq!(aggregator.group_count(), 2);
        assert_eq!(aggregator.feature_count(), 3);

        let written = aggregator.write(dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("Bayern/2015.geojson"),
                dir.path().join("Bayern/2019.geojson")
            ]
        );

        let content: Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(content["type"], "FeatureCollection");
        let ids: Vec<&str> = content["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["EinheitMastrNummer"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["SEE1", "SEE3"]);
    }

    #[test]
    fn empty_aggregator_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let written = FeatureAggregator::new().write(dir.path()).unwrap();
        assert!(written.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn ids(path: &Path) -> Vec<String> {
        let content: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        content["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["EinheitMastrNummer"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn similar_district_names_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = FeatureAggregator::new();
        for (id, district) in [("SEE1", "A/B"), ("SEE2", "A_B")] {
            let record = record(id);
            let key = GroupKey::DistrictYear {
                state: "Bayern".to_string(),
                district: district.to_string(),
                year: Year::Known(2020),
            };
            aggregator.push(key, record_feature(&record, record.point().unwrap()));
        }

        let written = aggregator.write(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(ids(&dir.path().join("Bayern/A%2FB/2020.geojson")), vec!["SEE1"]);
        assert_eq!(ids(&dir.path().join("Bayern/A_B/2020.geojson")), vec!["SEE2"]);
    }

    #[test]
    fn groups_sharing_a_file_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let mut aggregator = FeatureAggregator::new();
        for (id, district) in [("SEE1", "Würzburg"), ("SEE2", "Landkreis Würzburg")] {
            let record = record(id);
            let key = GroupKey::DistrictCodeYear {
                code: "09679".to_string(),
                district: district.to_string(),
                year: Year::Known(2020),
            };
            aggregator.push(key, record_feature(&record, record.point().unwrap()));
        }
        assert_eq!(aggregator.group_count(), 2);

        let written = aggregator.write(dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("09679/2020.geojson")]);
        assert_eq!(ids(&written[0]), vec!["SEE2", "SEE1"]);
    }
}
