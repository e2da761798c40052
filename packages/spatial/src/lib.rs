#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory polygon index for region attribution.
//!
//! Loads named state or district boundaries from a `GeoJSON` document,
//! normalizes every shape to a [`MultiPolygon`], and answers "which named
//! polygon contains this point" queries.
//!
//! Lookups return the first containing polygon in the order the boundary
//! file declares them. Points on a border shared by two polygons therefore
//! resolve to whichever polygon comes first in the file. The R-tree backend
//! only narrows the candidate set; it returns exactly what a linear scan
//! returns.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{BoundingRect, Centroid, Contains, Intersects, MultiPolygon, Point};
use mastr_map_region::normalize_name;
use mastr_map_region_models::RegionName;
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;
use serde_json::Value;

/// Errors that can occur while building a polygon index.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but not a feature list.
    #[error("Unexpected boundary document shape: {message}")]
    Shape {
        /// Description of what was found instead.
        message: String,
    },

    /// No feature survived geometry and name filtering.
    #[error("No usable polygons in {source_name}")]
    Empty {
        /// Path or label of the boundary source.
        source_name: String,
    },
}

/// Point-in-polygon predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Containment {
    /// Interior only; boundary points are not matched.
    Contains,
    /// Interior or boundary.
    #[default]
    Covers,
}

/// Lookup strategy. Both return identical results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Envelope pre-filter through an R-tree.
    #[default]
    Rtree,
    /// Scan every polygon in declared order.
    Linear,
}

/// Query behavior of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Point-in-polygon predicate.
    pub containment: Containment,
    /// Lookup strategy.
    pub backend: Backend,
}

/// Which feature properties name a polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFields {
    /// State boundaries: a single name property.
    State {
        /// State name property (e.g. `"name"`).
        name: String,
    },
    /// District boundaries: state and district name properties, plus an
    /// optional administrative code property.
    District {
        /// State name property (e.g. `"NAME_1"`).
        state: String,
        /// District name property (e.g. `"NAME_2"`).
        district: String,
        /// Administrative code property (e.g. `"CC_2"`).
        code: Option<String>,
    },
}

/// A named boundary polygon.
#[derive(Debug, Clone)]
pub struct NamedPolygon {
    /// Declared position among the surviving features.
    pub id: usize,
    /// State name (the only name for state boundaries).
    pub state: RegionName,
    /// District name, for district boundaries.
    pub district: Option<RegionName>,
    /// Administrative code, when the boundary file carries one.
    pub code: Option<String>,
    /// Boundary geometry.
    pub polygon: MultiPolygon<f64>,
}

impl NamedPolygon {
    fn matches(&self, point: &Point<f64>, containment: Containment) -> bool {
        match containment {
            Containment::Contains => self.polygon.contains(point),
            Containment::Covers => self.polygon.intersects(point),
        }
    }
}

/// Envelope of one polygon, stored in the R-tree by id.
struct EnvelopeEntry {
    id: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for EnvelopeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Named polygons with point lookup.
///
/// Read-only after construction and safe to share across threads.
pub struct PolygonIndex {
    polygons: Vec<NamedPolygon>,
    tree: RTree<EnvelopeEntry>,
    options: IndexOptions,
    /// normalized state key -> polygon ids, in declared order
    by_state: BTreeMap<String, Vec<usize>>,
}

impl PolygonIndex {
    /// Loads a boundary file and builds the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if no
    /// feature has both a polygon geometry and the configured names.
    pub fn load(
        path: &Path,
        fields: &NameFields,
        options: IndexOptions,
    ) -> Result<Self, SpatialError> {
        let reader = BufReader::new(File::open(path)?);
        let document: Value = serde_json::from_reader(reader)?;
        let index = Self::from_value(document, fields, options, &path.display().to_string())?;
        log::info!(
            "Loaded {} polygons from {} into spatial index",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Builds the index from a parsed `GeoJSON` document.
    ///
    /// Accepts a `FeatureCollection` object or a bare list of features.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a feature list or if no
    /// feature survives filtering.
    pub fn from_value(
        document: Value,
        fields: &NameFields,
        options: IndexOptions,
        source_name: &str,
    ) -> Result<Self, SpatialError> {
        let features = match document {
            Value::Array(features) => features,
            Value::Object(mut object) => match object.remove("features") {
                Some(Value::Array(features)) => features,
                _ => {
                    return Err(SpatialError::Shape {
                        message: "object without a \"features\" array".to_string(),
                    });
                }
            },
            _ => {
                return Err(SpatialError::Shape {
                    message: "expected a FeatureCollection or a feature list".to_string(),
                });
            }
        };

        let total = features.len();
        let mut polygons = Vec::with_capacity(total);

        for (position, feature) in features.into_iter().enumerate() {
            match parse_feature(feature, fields, polygons.len()) {
                Ok(polygon) => polygons.push(polygon),
                Err(reason) => {
                    log::debug!("Dropping boundary feature {position} from {source_name}: {reason}");
                }
            }
        }

        if polygons.is_empty() {
            return Err(SpatialError::Empty {
                source_name: source_name.to_string(),
            });
        }
        if polygons.len() < total {
            log::warn!(
                "Dropped {} of {total} boundary features from {source_name}",
                total - polygons.len()
            );
        }

        Ok(Self::from_polygons(polygons, options))
    }

    fn from_polygons(polygons: Vec<NamedPolygon>, options: IndexOptions) -> Self {
        let entries = polygons
            .iter()
            .filter_map(|p| {
                compute_envelope(&p.polygon).map(|envelope| EnvelopeEntry { id: p.id, envelope })
            })
            .collect();

        let mut by_state: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for polygon in &polygons {
            by_state
                .entry(polygon.state.key.clone())
                .or_default()
                .push(polygon.id);
        }

        Self {
            polygons,
            tree: RTree::bulk_load(entries),
            options,
            by_state,
        }
    }

    /// Returns the first polygon, in declared order, that contains `point`.
    #[must_use]
    pub fn find_containing(&self, point: &Point<f64>) -> Option<&NamedPolygon> {
        let containment = self.options.containment;
        match self.options.backend {
            Backend::Linear => self.polygons.iter().find(|p| p.matches(point, containment)),
            Backend::Rtree => {
                let query_env = AABB::from_point([point.x(), point.y()]);
                self.tree
                    .locate_in_envelope_intersecting(&query_env)
                    .map(|entry| &self.polygons[entry.id])
                    .filter(|p| p.matches(point, containment))
                    .min_by_key(|p| p.id)
            }
        }
    }

    /// Returns the polygon with the given id.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&NamedPolygon> {
        self.polygons.get(id)
    }

    /// Returns the polygons of one state, in declared order.
    pub fn in_state<'a>(&'a self, state_key: &str) -> impl Iterator<Item = &'a NamedPolygon> {
        self.by_state
            .get(state_key)
            .into_iter()
            .flatten()
            .map(|&id| &self.polygons[id])
    }

    /// Returns the centroid of the polygon with the given id.
    #[must_use]
    pub fn centroid(&self, id: usize) -> Option<Point<f64>> {
        self.get(id)?.polygon.centroid()
    }

    /// Number of polygons in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether the index holds no polygons. Never true for a loaded index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Builds a [`NamedPolygon`] from one feature, or explains why not.
fn parse_feature(feature: Value, fields: &NameFields, id: usize) -> Result<NamedPolygon, String> {
    let Value::Object(mut feature) = feature else {
        return Err("not an object".to_string());
    };

    let properties = match feature.remove("properties") {
        Some(Value::Object(properties)) => properties,
        _ => return Err("no properties".to_string()),
    };
    let name = |field: &str| -> Result<RegionName, String> {
        property_text(properties.get(field))
            .map(|display| RegionName {
                key: normalize_name(&display),
                display,
            })
            .ok_or_else(|| format!("missing name property {field:?}"))
    };

    let (state, district, code) = match fields {
        NameFields::State { name: field } => (name(field)?, None, None),
        NameFields::District {
            state,
            district,
            code,
        } => (
            name(state)?,
            Some(name(district)?),
            code.as_deref()
                .and_then(|field| code_text(properties.get(field))),
        ),
    };

    let geometry = feature
        .remove("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| "no geometry".to_string())?;
    let polygon = parse_multipolygon(geometry).ok_or_else(|| "not a polygon".to_string())?;

    Ok(NamedPolygon {
        id,
        state,
        district,
        code,
        polygon,
    })
}

/// Parses a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// `Polygon` becomes a single-member `MultiPolygon`, and a
/// `GeometryCollection` keeps its polygon members. Returns `None` when
/// nothing polygonal remains.
fn parse_multipolygon(geometry: Value) -> Option<MultiPolygon<f64>> {
    let geometry = geojson::Geometry::from_json_value(geometry).ok()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    let polygon = reduce_to_multipolygon(geo_geom)?;
    (!polygon.0.is_empty()).then_some(polygon)
}

fn reduce_to_multipolygon(geometry: geo::Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        geo::Geometry::GeometryCollection(collection) => {
            let members: Vec<_> = collection
                .into_iter()
                .filter_map(reduce_to_multipolygon)
                .flat_map(|mp| mp.0)
                .collect();
            (!members.is_empty()).then(|| MultiPolygon(members))
        }
        _ => None,
    }
}

/// Renders a property as text. Numbers keep their JSON rendering.
fn property_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Width of a district code. Numeric codes lose their leading zero in
/// some boundary exports and are padded back to this width.
const DISTRICT_CODE_LEN: usize = 5;

fn code_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .map(|code| format!("{code:0width$}", width = DISTRICT_CODE_LEN)),
        other => property_text(Some(other)),
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect().map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}
