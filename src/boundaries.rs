use crate::geometry::Geometry;
use anyhow::{anyhow, Context, Result};
use geo::bounding_rect::BoundingRect;
use geo::{MultiPolygon, Point};
use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;
use std::convert::TryInto;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Property keys checked, in order, for a feature's display name.
pub const NAME_KEYS: &[&str] = &[
    "name",
    "Name",
    "NAME",
    "AREA_NAME",
    "area_name",
    "Area_Name",
    "area",
    "Area",
    "AREA",
    "neighborhood",
    "Neighborhood",
    "NEIGHBORHOOD",
    "neighbourhood",
    "Neighbourhood",
    "NEIGHBOURHOOD",
    "ward",
    "Ward",
    "WARD",
];

/// Lat/lon extent of a boundary, used to frame it in the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub bounds: Bounds,
}

// Envelope entry for the R-tree; points back into `features`.
struct FeatureEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Neighbourhood polygons, addressable by stable position. Read-only after load.
pub struct BoundaryCollection {
    features: Vec<BoundaryFeature>,
    tree: RTree<FeatureEnvelope>,
}

impl std::fmt::Debug for BoundaryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryCollection")
            .field("features", &self.features.len())
            .finish()
    }
}

impl BoundaryCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        let items = features
            .iter()
            .enumerate()
            .map(|(index, feature)| FeatureEnvelope {
                index,
                aabb: AABB::from_corners(
                    [feature.bounds.west, feature.bounds.south],
                    [feature.bounds.east, feature.bounds.north],
                ),
            })
            .collect();
        Self {
            features,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoundaryFeature> {
        self.features.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundaryFeature> {
        self.features.iter()
    }

    /// Indices of every boundary containing `point`, ascending.
    pub fn indices_containing(&self, geometry: &impl Geometry, point: &Point<f64>) -> Vec<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|c| geometry.contains(&self.features[c.index].geometry, point))
            .map(|c| c.index)
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn any_contains(&self, geometry: &impl Geometry, point: &Point<f64>) -> bool {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .any(|c| geometry.contains(&self.features[c.index].geometry, point))
    }

    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let geojson: GeoJson = content.parse().context("Failed to parse boundary GeoJSON")?;
        Self::from_geojson(geojson)
    }

    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
        };

        // Fallback labels use the raw position in the file; the addressable
        // index is the position among the polygon features that load.
        let mut features = Vec::new();
        for (raw_position, feature) in collection.features.into_iter().enumerate() {
            match to_boundary(feature, raw_position) {
                Ok(Some(boundary)) => features.push(boundary),
                Ok(None) => {} // no polygon geometry
                Err(e) => warn!("Skipping boundary feature: {e:#}"),
            }
        }

        Ok(Self::new(features))
    }
}

/// Load the boundary FeatureCollection from disk.
pub fn load_boundaries(path: &Path) -> Result<BoundaryCollection> {
    info!("Loading boundaries from {:?}...", path);
    let file = File::open(path).with_context(|| format!("Failed to open boundary file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse boundary GeoJSON")?;
    let collection = BoundaryCollection::from_geojson(geojson)?;
    info!("Loaded {} boundaries", collection.len());
    Ok(collection)
}

/// Like [`load_boundaries`] but degrades to `None` on any failure.
pub fn load_boundaries_or_none(path: Option<&Path>) -> Option<BoundaryCollection> {
    let path = path?;
    match load_boundaries(path) {
        Ok(collection) => Some(collection),
        Err(e) => {
            warn!("Boundaries unavailable, showing all records: {e:#}");
            None
        }
    }
}

fn to_boundary(feature: Feature, position: usize) -> Result<Option<BoundaryFeature>> {
    let geometry = match feature.geometry.as_ref() {
        Some(geom) => {
            let valid_geo: geo::Geometry<f64> = geom
                .value
                .clone()
                .try_into()
                .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
            match valid_geo {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => return Ok(None),
            }
        }
        None => return Ok(None),
    };

    let rect = match geometry.bounding_rect() {
        Some(rect) => rect,
        None => return Ok(None),
    };

    Ok(Some(BoundaryFeature {
        name: display_name(&feature, position),
        bounds: Bounds {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        },
        geometry,
    }))
}

/// First non-blank value among [`NAME_KEYS`], else `Area {id}`.
pub fn display_name(feature: &Feature, position: usize) -> String {
    if let Some(props) = feature.properties.as_ref() {
        for key in NAME_KEYS {
            match props.get(*key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return s.trim().to_string()
                }
                Some(serde_json::Value::Number(n)) => return n.to_string(),
                _ => continue,
            }
        }
    }

    match &feature.id {
        Some(Id::String(s)) => format!("Area {s}"),
        Some(Id::Number(n)) => format!("Area {n}"),
        None => format!("Area {position}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::GeoEngine;

    /// Three adjacent 0.01° squares near downtown Toronto plus a feature with no
    /// geometry.
    pub(crate) const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": 17,
          "properties": { "AREA_NAME": "Kensington Market" },
          "geometry": { "type": "Polygon", "coordinates": [[
            [-79.41, 43.65], [-79.40, 43.65], [-79.40, 43.66], [-79.41, 43.66], [-79.41, 43.65]
          ]]}
        },
        {
          "type": "Feature",
          "properties": { "name": "Côte-des-Neiges" },
          "geometry": { "type": "MultiPolygon", "coordinates": [[[
            [-79.40, 43.65], [-79.39, 43.65], [-79.39, 43.66], [-79.40, 43.66], [-79.40, 43.65]
          ]]]}
        },
        {
          "type": "Feature",
          "properties": { "name": "Nowhere" },
          "geometry": null
        },
        {
          "type": "Feature",
          "id": "w-9",
          "properties": { "name": "  ", "WARD": "" },
          "geometry": { "type": "Polygon", "coordinates": [[
            [-79.39, 43.65], [-79.38, 43.65], [-79.38, 43.66], [-79.39, 43.66], [-79.39, 43.65]
          ]]}
        }
      ]
    }"#;

    pub(crate) fn sample() -> BoundaryCollection {
        BoundaryCollection::from_geojson_str(SAMPLE).unwrap()
    }

    #[test]
    fn loads_polygons_and_resolves_names() {
        let collection = sample();
        assert_eq!(collection.len(), 3);
        let names: Vec<&str> = collection.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Kensington Market", "Côte-des-Neiges", "Area w-9"]);

        let b = collection.get(0).unwrap().bounds;
        assert_eq!((b.south, b.west, b.north, b.east), (43.65, -79.41, 43.66, -79.40));
    }

    #[test]
    fn name_fallbacks() {
        let feature: Feature = r#"{"type":"Feature","properties":{"ward":"Ward 10"},"geometry":null}"#
            .parse::<GeoJson>()
            .map(|g| match g {
                GeoJson::Feature(f) => f,
                _ => unreachable!(),
            })
            .unwrap();
        assert_eq!(display_name(&feature, 3), "Ward 10");

        let bare = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert_eq!(display_name(&bare, 3), "Area 3");
    }

    #[test]
    fn fallback_label_counts_skipped_features() {
        let content = r#"{
          "type": "FeatureCollection",
          "features": [
            { "type": "Feature", "properties": { "name": "Empty" }, "geometry": null },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon", "coordinates": [[
                [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]
              ]]}}
          ]
        }"#;
        let collection = BoundaryCollection::from_geojson_str(content).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(0).unwrap().name, "Area 1");
    }

    #[test]
    fn point_membership() {
        let collection = sample();
        let inside_first = Point::new(-79.405, 43.655);
        let on_shared_edge = Point::new(-79.40, 43.655);
        let outside = Point::new(-79.30, 43.70);

        assert_eq!(collection.indices_containing(&GeoEngine, &inside_first), vec![0]);
        assert_eq!(collection.indices_containing(&GeoEngine, &on_shared_edge), vec![0, 1]);
        assert!(collection.any_contains(&GeoEngine, &inside_first));
        assert!(!collection.any_contains(&GeoEngine, &outside));
    }

    #[test]
    fn rejects_non_collections_and_missing_files() {
        let point = r#"{"type":"Point","coordinates":[0.0,0.0]}"#;
        assert!(BoundaryCollection::from_geojson_str(point).is_err());
        assert!(BoundaryCollection::from_geojson_str("not json").is_err());
        assert!(load_boundaries_or_none(Some(Path::new("/nonexistent/boundaries.geojson"))).is_none());
        assert!(load_boundaries_or_none(None).is_none());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neighbourhoods.geojson");
        std::fs::write(&path, SAMPLE).unwrap();
        let collection = load_boundaries_or_none(Some(&path)).unwrap();
        assert_eq!(collection.len(), 3);
    }
}
