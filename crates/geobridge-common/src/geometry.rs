//! Coordinates, bounding boxes, and geometries in map units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datasource::GeometryType;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Coord2d {
    pub x: f64,
    pub y: f64,
}

impl Coord2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// GeoJSON positions may carry a third (or fourth) ordinate which is dropped here.
impl TryFrom<Vec<f64>> for Coord2d {
    type Error = String;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [x, y, ..] => Ok(Coord2d::new(*x, *y)),
            _ => Err(format!(
                "a position needs at least two ordinates, got {}",
                value.len()
            )),
        }
    }
}

impl From<Coord2d> for [f64; 2] {
    fn from(value: Coord2d) -> Self {
        [value.x, value.y]
    }
}

impl fmt::Display for Coord2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned box.
///
/// The four bounds are stored exactly as given. A box with `minx > maxx`
/// is not reordered and simply intersects nothing on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Box2d {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Box2d {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    pub fn from_coord(coord: Coord2d) -> Self {
        Self::new(coord.x, coord.y, coord.x, coord.y)
    }

    /// Boxes that only share an edge or a corner intersect.
    pub fn intersects(&self, other: &Box2d) -> bool {
        !(other.minx > self.maxx
            || other.maxx < self.minx
            || other.miny > self.maxy
            || other.maxy < self.miny)
    }

    pub fn expand_to_include(&mut self, coord: &Coord2d) {
        self.minx = self.minx.min(coord.x);
        self.miny = self.miny.min(coord.y);
        self.maxx = self.maxx.max(coord.x);
        self.maxy = self.maxy.max(coord.y);
    }
}

impl fmt::Display for Box2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "box2d({}, {}, {}, {})",
            self.minx, self.miny, self.maxx, self.maxy
        )
    }
}

/// A geometry in the GeoJSON object model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Coord2d,
    },
    LineString {
        coordinates: Vec<Coord2d>,
    },
    Polygon {
        coordinates: Vec<Vec<Coord2d>>,
    },
    MultiPoint {
        coordinates: Vec<Coord2d>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Coord2d>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Coord2d>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: Coord2d::new(x, y),
        }
    }

    pub fn kind(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } | Geometry::MultiPoint { .. } => GeometryType::Point,
            Geometry::LineString { .. } | Geometry::MultiLineString { .. } => {
                GeometryType::LineString
            }
            Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => GeometryType::Polygon,
            Geometry::GeometryCollection { .. } => GeometryType::Collection,
        }
    }

    /// Returns `None` for geometries without any coordinate.
    pub fn envelope(&self) -> Option<Box2d> {
        let mut envelope: Option<Box2d> = None;
        self.visit_coords(&mut |coord| match envelope.as_mut() {
            Some(b) => b.expand_to_include(coord),
            None => envelope = Some(Box2d::from_coord(*coord)),
        });
        envelope
    }

    fn visit_coords(&self, f: &mut impl FnMut(&Coord2d)) {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.iter().for_each(f)
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(f)
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.visit_coords(&mut *f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_box_intersects() {
        let world = Box2d::new(-10.0, -5.0, 10.0, 5.0);
        assert!(world.intersects(&Box2d::new(0.0, 0.0, 1.0, 1.0)));
        assert!(world.intersects(&Box2d::new(10.0, 5.0, 20.0, 20.0)));
        assert!(world.intersects(&Box2d::new(-100.0, -100.0, 100.0, 100.0)));
        assert!(!world.intersects(&Box2d::new(10.5, 0.0, 20.0, 1.0)));
        assert!(!world.intersects(&Box2d::new(0.0, -9.0, 1.0, -5.5)));
    }

    #[test]
    fn test_box_keeps_inverted_bounds() {
        let inverted = Box2d::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(inverted.minx, 10.0);
        assert_eq!(inverted.maxy, -5.0);
        assert!(!inverted.intersects(&Box2d::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_geometry_from_geojson() -> Result<(), serde_json::Error> {
        let geometry: Geometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[0, 0], [4, 0], [4, 3, 7.5], [0, 0]]],
        }))?;
        assert_eq!(geometry.kind(), GeometryType::Polygon);
        assert_eq!(geometry.envelope(), Some(Box2d::new(0.0, 0.0, 4.0, 3.0)));
        Ok(())
    }

    #[test]
    fn test_geometry_rejects_short_position() {
        let result: Result<Geometry, _> =
            serde_json::from_value(json!({"type": "Point", "coordinates": [1.0]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_geometry_collection_envelope() {
        let geometry = Geometry::GeometryCollection {
            geometries: vec![Geometry::point(1.0, 2.0), Geometry::point(-3.0, 8.0)],
        };
        assert_eq!(geometry.kind(), GeometryType::Collection);
        assert_eq!(geometry.envelope(), Some(Box2d::new(-3.0, 2.0, 1.0, 8.0)));
        let empty = Geometry::MultiPoint {
            coordinates: vec![],
        };
        assert_eq!(empty.envelope(), None);
    }

    #[test]
    fn test_geometry_serializes_as_geojson() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(Geometry::point(1.5, -2.0))?;
        assert_eq!(value, json!({"type": "Point", "coordinates": [1.5, -2.0]}));
        Ok(())
    }
}
