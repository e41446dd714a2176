//! Polyline geometry with altitude
//!
//! Paths are stored as ordered vertices carrying an altitude. All measurements
//! (length, fractions, intersections) are planar; the altitude is carried along
//! and interpolated but never measured.

use crate::{NetworkError, Result};
use geo::{Coord, Line, LineString, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single vertex: planar position plus altitude
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    /// Altitude, ignored by every planar computation
    pub z: f64,
}

impl Vertex {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar position as a `geo` coordinate
    #[inline]
    pub fn xy(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Planar distance to another vertex
    #[inline]
    pub fn planar_distance(&self, other: &Vertex) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other`, altitude included
    #[inline]
    pub fn lerp(&self, other: &Vertex, t: f64) -> Vertex {
        Vertex {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Whether both vertices share the same planar position within `tolerance`
    #[inline]
    pub fn same_xy(&self, other: &Vertex, tolerance: f64) -> bool {
        self.planar_distance(other) <= tolerance
    }

    /// Whether this vertex sits on `coord` within `tolerance`
    #[inline]
    pub fn is_at(&self, coord: Coord<f64>, tolerance: f64) -> bool {
        (self.x - coord.x).hypot(self.y - coord.y) <= tolerance
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<(f64, f64, f64)> for Vertex {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Vertex::new(x, y, z)
    }
}

impl From<(f64, f64)> for Vertex {
    fn from((x, y): (f64, f64)) -> Self {
        Vertex::new(x, y, 0.0)
    }
}

/// Altitude statistics derived from a geometry
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    /// Sum of positive altitude differences along the geometry
    pub ascent: f64,
    /// Sum of negative altitude differences along the geometry (positive value)
    pub descent: f64,
}

/// An ordered sequence of vertices with precomputed cumulative planar lengths
///
/// Construction through [`Polyline::new`] guarantees at least two vertices, finite
/// coordinates and a non-zero length. Geometries derived internally (substrings,
/// resolved topologies) may be shorter and skip those checks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "Vec<Vertex>", into = "Vec<Vertex>")
)]
pub struct Polyline {
    vertices: Vec<Vertex>,
    /// `cumulative[i]` is the planar length from the first vertex to vertex `i`
    cumulative: Vec<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Polyline {
    /// Create a validated polyline
    ///
    /// # Errors
    /// Returns [`NetworkError::InvalidGeometry`] for fewer than 2 vertices, non-finite
    /// coordinates, or a zero-length geometry.
    pub fn new(vertices: Vec<Vertex>) -> Result<Self> {
        if vertices.len() < 2 {
            return Err(NetworkError::InvalidGeometry(format!(
                "a path needs at least 2 vertices, got {}",
                vertices.len()
            )));
        }
        if let Some(bad) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(NetworkError::InvalidGeometry(format!(
                "non-finite coordinate ({}, {}, {})",
                bad.x, bad.y, bad.z
            )));
        }

        let polyline = Self::from_vertices(vertices);
        if polyline.length() <= 0.0 {
            return Err(NetworkError::InvalidGeometry(
                "geometry has zero length".to_string(),
            ));
        }
        Ok(polyline)
    }

    /// Build a polyline from coordinate tuples (altitude included)
    pub fn from_xyz(coords: &[(f64, f64, f64)]) -> Result<Self> {
        Self::new(coords.iter().copied().map(Vertex::from).collect())
    }

    /// Build a polyline from planar coordinate tuples (altitude 0)
    pub fn from_xy(coords: &[(f64, f64)]) -> Result<Self> {
        Self::new(coords.iter().copied().map(Vertex::from).collect())
    }

    /// Build without validation; used for derived geometries
    pub(crate) fn from_vertices(vertices: Vec<Vertex>) -> Self {
        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        let mut prev: Option<&Vertex> = None;
        for vertex in &vertices {
            if let Some(p) = prev {
                total += p.planar_distance(vertex);
            }
            cumulative.push(total);
            prev = Some(vertex);
        }
        Self {
            vertices,
            cumulative,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Cumulative planar length at each vertex
    #[inline]
    pub fn cumulative_lengths(&self) -> &[f64] {
        &self.cumulative
    }

    /// Total planar length
    #[inline]
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn first(&self) -> Option<Vertex> {
        self.vertices.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<Vertex> {
        self.vertices.last().copied()
    }

    /// Iterate over consecutive vertex pairs as planar `geo` lines
    pub fn lines(&self) -> impl Iterator<Item = Line<f64>> + '_ {
        self.vertices
            .windows(2)
            .map(|pair| Line::new(pair[0].xy(), pair[1].xy()))
    }

    /// Whether the last vertex sits on the first one
    pub fn is_closed(&self, tolerance: f64) -> bool {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => self.vertices.len() > 2 && first.same_xy(&last, tolerance),
            _ => false,
        }
    }

    /// Planar bounding box
    pub fn bounding_rect(&self) -> Rect<f64> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for v in &self.vertices {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
        }

        if self.vertices.is_empty() {
            return Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 });
        }

        Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
    }

    /// Planar projection as a `geo` line string
    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(self.vertices.iter().map(Vertex::xy).collect())
    }

    /// The same geometry traversed backwards
    pub fn reversed(&self) -> Polyline {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self::from_vertices(vertices)
    }

    /// Replace the planar position of the end vertices, keeping their altitude
    pub(crate) fn snap_endpoints(self, start: Option<Coord<f64>>, end: Option<Coord<f64>>) -> Self {
        if start.is_none() && end.is_none() {
            return self;
        }
        let mut vertices = self.vertices;
        if let (Some(coord), Some(first)) = (start, vertices.first_mut()) {
            first.x = coord.x;
            first.y = coord.y;
        }
        if let (Some(coord), Some(last)) = (end, vertices.last_mut()) {
            last.x = coord.x;
            last.y = coord.y;
        }
        Self::from_vertices(vertices)
    }

    /// Compute min/max altitude and cumulative ascent/descent
    pub fn elevation(&self) -> ElevationStats {
        let mut stats = ElevationStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ascent: 0.0,
            descent: 0.0,
        };
        for v in &self.vertices {
            stats.min = stats.min.min(v.z);
            stats.max = stats.max.max(v.z);
        }
        for pair in self.vertices.windows(2) {
            let delta = pair[1].z - pair[0].z;
            if delta > 0.0 {
                stats.ascent += delta;
            } else {
                stats.descent -= delta;
            }
        }
        if self.vertices.is_empty() {
            return ElevationStats::default();
        }
        stats
    }

    /// Vertex-by-vertex comparison with a tolerance on every coordinate
    pub fn approx_eq(&self, other: &Polyline, tolerance: f64) -> bool {
        self.vertices.len() == other.vertices.len()
            && self.vertices.iter().zip(&other.vertices).all(|(a, b)| {
                (a.x - b.x).abs() <= tolerance
                    && (a.y - b.y).abs() <= tolerance
                    && (a.z - b.z).abs() <= tolerance
            })
    }
}

impl TryFrom<Vec<Vertex>> for Polyline {
    type Error = NetworkError;

    fn try_from(vertices: Vec<Vertex>) -> Result<Self> {
        Polyline::new(vertices)
    }
}

impl From<Polyline> for Vec<Vertex> {
    fn from(polyline: Polyline) -> Self {
        polyline.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_length() {
        let line = Polyline::from_xy(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]).unwrap();
        assert!((line.length() - 7.0).abs() < 1e-12);
        assert_eq!(line.cumulative_lengths(), &[0.0, 3.0, 7.0]);
    }

    #[test]
    fn test_length_ignores_altitude() {
        let line = Polyline::from_xyz(&[(0.0, 0.0, 0.0), (4.0, 0.0, 300.0)]).unwrap();
        assert!((line.length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_geometries() {
        assert!(Polyline::new(Vec::new()).is_err());
        assert!(Polyline::from_xy(&[(1.0, 1.0)]).is_err());
        assert!(Polyline::from_xy(&[(1.0, 1.0), (1.0, 1.0)]).is_err());
        assert!(Polyline::from_xy(&[(0.0, 0.0), (f64::NAN, 1.0)]).is_err());
    }

    #[test]
    fn test_bounding_rect() {
        let line = Polyline::from_xy(&[(1.0, -2.0), (4.0, 3.0), (-1.0, 0.0)]).unwrap();
        let rect = line.bounding_rect();
        assert_eq!(rect.min(), Coord { x: -1.0, y: -2.0 });
        assert_eq!(rect.max(), Coord { x: 4.0, y: 3.0 });
    }

    #[test]
    fn test_is_closed() {
        let ring = Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert!(ring.is_closed(1e-9));
        let open = Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0)]).unwrap();
        assert!(!open.is_closed(1e-9));
    }

    #[test]
    fn test_snap_endpoints_keeps_altitude() {
        let line = Polyline::from_xyz(&[(0.0, 0.0, 10.0), (2.0, 0.0, 20.0)]).unwrap();
        let snapped = line.snap_endpoints(None, Some(Coord { x: 2.5, y: 0.5 }));
        let last = snapped.last().unwrap();
        assert_eq!((last.x, last.y, last.z), (2.5, 0.5, 20.0));
        assert_eq!(snapped.first().unwrap(), Vertex::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_elevation_stats() {
        let line = Polyline::from_xyz(&[
            (0.0, 0.0, 100.0),
            (1.0, 0.0, 150.0),
            (2.0, 0.0, 120.0),
            (3.0, 0.0, 130.0),
        ])
        .unwrap();
        let stats = line.elevation();
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 150.0);
        assert!((stats.ascent - 60.0).abs() < 1e-12);
        assert!((stats.descent - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed() {
        let line = Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 2.0)]).unwrap();
        let rev = line.reversed();
        assert_eq!(rev.first().unwrap(), Vertex::new(1.0, 2.0, 0.0));
        assert!((rev.length() - line.length()).abs() < 1e-12);
    }
}
