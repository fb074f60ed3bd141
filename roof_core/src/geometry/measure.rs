//! # Geodesic Roof Measurement
//!
//! Converts a traced roof outline into area, perimeter and roofing squares.
//!
//! ## Method
//!
//! - Area: geodesic polygon area on the WGS84 ellipsoid (Karney), in m²,
//!   converted with 1 m² = 10.7639 ft²
//! - Perimeter: sum of geodesic edge lengths around the closed ring, in m,
//!   converted with 1 m = 3.28084 ft
//! - Area and perimeter are rounded to whole feet; squares to 2 decimals
//!
//! An explicitly closed ring (first == last) and the same ring left open
//! measure identically: the closing edge is counted exactly once.
//!
//! ## Example
//!
//! ```rust
//! use roof_core::geometry::{measure, Point};
//!
//! let outline = vec![
//!     Point::new(-97.74310, 30.26720),
//!     Point::new(-97.74291, 30.26720),
//!     Point::new(-97.74291, 30.26736),
//!     Point::new(-97.74310, 30.26736),
//! ];
//!
//! let m = measure(&outline).unwrap();
//! assert!(m.area_sq_ft.0 > 0.0);
//! assert_eq!(m.roofing_squares, (m.area_sq_ft.0 / 100.0 * 100.0).round() / 100.0);
//! ```

use geo::orient::{Direction, Orient};
use geo::{Centroid, Distance, Geodesic, GeodesicArea, LineString};
use log::debug;
use serde::{Deserialize, Serialize};

use super::Point;
use crate::errors::{RoofError, RoofResult};
use crate::units::{round_to, Feet, Meters, SqFt, SqMeters};

/// Fewest distinct ring vertices [`measure`] accepts (closing duplicate excluded)
pub const MIN_VERTICES: usize = 3;

/// Physical quantities derived from one roof outline.
///
/// Computed once per completed drawing and never mutated; redrawing produces
/// a new `Measurement` that supersedes the old one.
///
/// ## JSON Example
///
/// ```json
/// {
///   "area_sq_ft": 3500.0,
///   "perimeter_ft": 237.0,
///   "roofing_squares": 35.0,
///   "area_sq_m": 325.16,
///   "perimeter_m": 72.13,
///   "vertex_count": 4,
///   "centroid": [-97.743005, 30.26728]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Roof area in square feet, rounded to the whole foot
    pub area_sq_ft: SqFt,

    /// Outline perimeter in feet, rounded to the whole foot
    pub perimeter_ft: Feet,

    /// `area_sq_ft / 100`, rounded to 2 decimals
    pub roofing_squares: f64,

    /// Unrounded geodesic area
    pub area_sq_m: SqMeters,

    /// Unrounded geodesic perimeter
    pub perimeter_m: Meters,

    /// Distinct ring vertices (closing duplicate not counted)
    pub vertex_count: usize,

    /// Planar centroid of the outline, in degrees
    pub centroid: Point,
}

impl Measurement {
    /// Guard used at the boundary of downstream computations.
    ///
    /// A measurement produced by [`measure`] always passes; one deserialized
    /// from elsewhere may not.
    pub fn validate(&self) -> RoofResult<()> {
        if !self.area_sq_ft.0.is_finite() || self.area_sq_ft.0 < 0.0 {
            return Err(RoofError::invalid_measurement(
                "area_sq_ft",
                self.area_sq_ft.0,
                "Area must be a non-negative number",
            ));
        }
        if !self.perimeter_ft.0.is_finite() || self.perimeter_ft.0 < 0.0 {
            return Err(RoofError::invalid_measurement(
                "perimeter_ft",
                self.perimeter_ft.0,
                "Perimeter must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Measure a roof outline.
///
/// # Errors
///
/// * `RoofError::InvalidGeometry` - fewer than 3 vertices once the ring is
///   closed (a closing duplicate is not a vertex), or a coordinate that is
///   not a finite WGS84 longitude/latitude
///
/// Zero area (e.g. every vertex identical) is not an error.
pub fn measure(polygon: &[Point]) -> RoofResult<Measurement> {
    if let Some((index, bad)) = polygon.iter().enumerate().find(|(_, p)| !p.is_valid()) {
        return Err(RoofError::invalid_geometry(format!(
            "point {} ({}, {}) is not a valid WGS84 longitude/latitude",
            index, bad.lon, bad.lat
        )));
    }

    let ring = closed_ring(polygon);
    let vertex_count = ring.len().saturating_sub(1);
    if vertex_count < MIN_VERTICES {
        return Err(RoofError::invalid_geometry(format!(
            "a roof outline needs at least {} vertices, got {}",
            MIN_VERTICES, vertex_count
        )));
    }

    let ring = unwrap_longitudes(&ring);
    let area_m2 = SqMeters(geodesic_area_m2(&ring));
    let perimeter_m = Meters(geodesic_perimeter_m(&ring));

    let area_sq_ft = SqFt::from(area_m2).rounded();
    let perimeter_ft = Feet::from(perimeter_m).rounded();
    let roofing_squares = round_to(area_sq_ft.squares(), 2);

    let centroid = ring_centroid(&ring).unwrap_or(polygon[0]);

    debug!(
        "measured {} vertices: {:.2} m2 -> {} sq ft, {:.2} m -> {} ft",
        vertex_count,
        area_m2.0,
        area_sq_ft.0,
        perimeter_m.0,
        perimeter_ft.0
    );

    Ok(Measurement {
        area_sq_ft,
        perimeter_ft,
        roofing_squares,
        area_sq_m: area_m2,
        perimeter_m,
        vertex_count,
        centroid,
    })
}

/// Copy of the outline with first == last
fn closed_ring(polygon: &[Point]) -> Vec<Point> {
    let mut ring = polygon.to_vec();
    if let Some(&first) = polygon.first() {
        if ring.last() != Some(&first) || ring.len() == 1 {
            ring.push(first);
        }
    }
    ring
}

/// Shift longitudes to within 180° of the first vertex, so a ring crossing
/// the antimeridian stays contiguous. Results may fall outside ±180.
fn unwrap_longitudes(ring: &[Point]) -> Vec<Point> {
    let Some(origin) = ring.first().map(|p| p.lon) else {
        return Vec::new();
    };
    ring.iter()
        .map(|p| {
            let mut lon = p.lon;
            while lon - origin > 180.0 {
                lon -= 360.0;
            }
            while lon - origin < -180.0 {
                lon += 360.0;
            }
            Point::new(lon, p.lat)
        })
        .collect()
}

/// Bring a longitude back into -180..=180
fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

fn to_geo_polygon(ring: &[Point]) -> geo::Polygon<f64> {
    let coords: Vec<geo::Coord<f64>> = ring.iter().copied().map(geo::Coord::from).collect();
    geo::Polygon::new(LineString::from(coords), vec![])
}

/// Unsigned geodesic area of a closed, unwrapped ring in m², independent of
/// winding. Orientation is decided on the unwrapped coordinates, which is
/// only sound because no edge jumps across the antimeridian.
fn geodesic_area_m2(ring: &[Point]) -> f64 {
    if distinct_points(ring) < MIN_VERTICES {
        return 0.0;
    }
    to_geo_polygon(ring)
        .orient(Direction::Default)
        .geodesic_area_unsigned()
}

/// Sum of geodesic edge lengths of a closed ring in meters
fn geodesic_perimeter_m(ring: &[Point]) -> f64 {
    ring.windows(2)
        .map(|edge| Geodesic::distance(geo::Point::from(edge[0]), geo::Point::from(edge[1])))
        .sum()
}

fn distinct_points(ring: &[Point]) -> usize {
    ring.iter()
        .enumerate()
        .filter(|(i, p)| !ring[..*i].contains(p))
        .count()
}

fn ring_centroid(ring: &[Point]) -> Option<Point> {
    to_geo_polygon(ring)
        .centroid()
        .map(|c| Point::new(wrap_longitude(c.x()), c.y()))
}
