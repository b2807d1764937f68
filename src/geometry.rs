//! Geometry capability used by the filter and the generator.
//!
//! Both only need two questions answered: "is this point inside this area?" and
//! "how far apart are these points?". Keeping them behind a trait lets tests swap
//! in simple fakes.

use geo::{HaversineDistance, Intersects, MultiPolygon, Point};

pub trait Geometry {
    /// Point-in-polygon, boundary inclusive. Points are (x = lon, y = lat).
    fn contains(&self, polygon: &MultiPolygon<f64>, point: &Point<f64>) -> bool;

    /// Great-circle distance in meters.
    fn distance(&self, a: &Point<f64>, b: &Point<f64>) -> f64;
}

/// Default implementation backed by the `geo` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoEngine;

impl Geometry for GeoEngine {
    fn contains(&self, polygon: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
        polygon.intersects(point)
    }

    fn distance(&self, a: &Point<f64>, b: &Point<f64>) -> f64 {
        a.haversine_distance(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn unit_square() -> MultiPolygon<f64> {
        let p: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        MultiPolygon::new(vec![p])
    }

    #[test]
    fn contains_is_boundary_inclusive() {
        let engine = GeoEngine;
        let square = unit_square();
        assert!(engine.contains(&square, &Point::new(0.5, 0.5)));
        assert!(engine.contains(&square, &Point::new(1.0, 0.5)));
        assert!(engine.contains(&square, &Point::new(0.0, 0.0)));
        assert!(!engine.contains(&square, &Point::new(1.5, 0.5)));
    }

    #[test]
    fn distance_in_meters() {
        let engine = GeoEngine;
        // One thousandth of a degree of latitude is roughly 111 m.
        let a = Point::new(-79.38, 43.65);
        let b = Point::new(-79.38, 43.651);
        let d = engine.distance(&a, &b);
        assert!((d - 111.2).abs() < 1.0, "got {d}");
        assert_eq!(engine.distance(&a, &a), 0.0);
    }
}
