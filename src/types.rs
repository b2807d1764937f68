use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Pending,
    InProgress,
    Repaired,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Repaired];
}

/// A single pothole observation. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectRecord {
    pub id: usize,
    pub lat: f64,
    pub lon: f64,
    pub severity: Severity,
    pub status: Status,
    /// Diameter in centimeters.
    pub size: u32,
    pub detected_at: DateTime<Utc>,
}

impl DefectRecord {
    /// Location as a geo point (x = lon, y = lat).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Records as GeoJSON point features carrying their attributes.
pub fn records_to_geojson(records: &[DefectRecord]) -> geojson::FeatureCollection {
    let features = records
        .iter()
        .map(|r| {
            let mut properties = match serde_json::to_value(r) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => serde_json::Map::new(),
            };
            properties.remove("lat");
            properties.remove("lon");
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                    r.lon, r.lat,
                ]))),
                id: Some(geojson::feature::Id::Number(r.id.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
