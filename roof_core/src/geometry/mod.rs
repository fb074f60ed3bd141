//! # Roof Outline Geometry
//!
//! Geographic points and polygons as handed over by the map-drawing UI, plus
//! the measurer that turns them into physical roof quantities.
//!
//! Coordinates are WGS84 degrees in GeoJSON order: `[longitude, latitude]`.
//!
//! ## Accepted Polygon JSON
//!
//! A bare ring:
//!
//! ```json
//! [[-97.7431, 30.2672], [-97.7429, 30.2672], [-97.7429, 30.2674]]
//! ```
//!
//! or a GeoJSON `Polygon` geometry (exterior ring only, holes are ignored):
//!
//! ```json
//! { "type": "Polygon", "coordinates": [[[-97.7431, 30.2672], [-97.7429, 30.2672], [-97.7429, 30.2674], [-97.7431, 30.2672]]] }
//! ```
//!
//! The first and last point may coincide (closed ring) or not (open ring);
//! both describe the same outline.

pub mod measure;

use serde::{Deserialize, Serialize};

use crate::errors::RoofError;

pub use measure::{measure, Measurement, MIN_VERTICES};

/// A geographic point in WGS84 degrees. No altitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Point { lon, lat }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for Point {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Point { lon, lat }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.lon, p.lat]
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(p: Point) -> Self {
        geo::Point::new(p.lon, p.lat)
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        geo::Coord { x: p.lon, y: p.lat }
    }
}

/// An ordered ring of points outlining a roof.
///
/// Self-intersections are not validated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolygonRepr", into = "Vec<Point>")]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Polygon { points }
    }

    /// Number of points as supplied, including a closing duplicate if present
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the caller closed the ring explicitly (first == last)
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Measure this outline. See [`measure`].
    pub fn measure(&self) -> crate::errors::RoofResult<Measurement> {
        measure(&self.points)
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Polygon { points }
    }
}

impl From<Vec<[f64; 2]>> for Polygon {
    fn from(pairs: Vec<[f64; 2]>) -> Self {
        Polygon {
            points: pairs.into_iter().map(Point::from).collect(),
        }
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

/// Wire forms a polygon may arrive in
#[derive(Deserialize)]
#[serde(untagged)]
enum PolygonRepr {
    Ring(Vec<Point>),
    GeoJson {
        #[serde(rename = "type")]
        kind: String,
        coordinates: Vec<Vec<Point>>,
    },
}

impl TryFrom<PolygonRepr> for Polygon {
    type Error = RoofError;

    fn try_from(repr: PolygonRepr) -> Result<Self, Self::Error> {
        match repr {
            PolygonRepr::Ring(points) => Ok(Polygon { points }),
            PolygonRepr::GeoJson { kind, coordinates } => {
                if kind != "Polygon" {
                    return Err(RoofError::invalid_geometry(format!(
                        "expected GeoJSON type 'Polygon', got '{}'",
                        kind
                    )));
                }
                let exterior = coordinates
                    .into_iter()
                    .next()
                    .ok_or_else(|| RoofError::invalid_geometry("GeoJSON polygon has no rings"))?;
                Ok(Polygon { points: exterior })
            }
        }
    }
}
