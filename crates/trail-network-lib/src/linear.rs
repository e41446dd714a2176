//! Linear referencing along polylines
//!
//! Fractions run from 0 (first vertex) to 1 (last vertex) proportionally to the
//! planar length. These functions are pure and never fail; out-of-range fractions
//! are clamped.

use crate::{Polyline, Vertex};

/// Spans shorter than this (in fraction space) extract as a point
const DEGENERATE_SPAN: f64 = 1e-12;

/// Result of a substring extraction
#[derive(Clone, Debug, PartialEq)]
pub enum Extract {
    /// Zero-length extraction (start == end)
    Point(Vertex),
    /// Ordered from the start fraction's location to the end fraction's location
    Line(Polyline),
}

impl Extract {
    pub fn first(&self) -> Option<Vertex> {
        match self {
            Extract::Point(v) => Some(*v),
            Extract::Line(line) => line.first(),
        }
    }

    pub fn last(&self) -> Option<Vertex> {
        match self {
            Extract::Point(v) => Some(*v),
            Extract::Line(line) => line.last(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Extract::Point(_) => 0.0,
            Extract::Line(line) => line.length(),
        }
    }
}

/// Point at `fraction` of the total length, altitude interpolated
pub fn interpolate(geometry: &Polyline, fraction: f64) -> Vertex {
    let vertices = geometry.vertices();
    let (Some(first), Some(last)) = (geometry.first(), geometry.last()) else {
        return Vertex::default();
    };

    let total = geometry.length();
    let fraction = clamp_fraction(fraction);
    if total <= 0.0 || fraction <= 0.0 {
        return first;
    }
    if fraction >= 1.0 {
        return last;
    }

    let target = fraction * total;
    let cumulative = geometry.cumulative_lengths();
    // First vertex at or beyond the target distance; always >= 1 since cumulative[0] == 0
    let i = cumulative
        .partition_point(|&c| c < target)
        .clamp(1, vertices.len() - 1);

    let seg_len = cumulative[i] - cumulative[i - 1];
    if seg_len <= 0.0 {
        return vertices[i];
    }
    let t = (target - cumulative[i - 1]) / seg_len;
    vertices[i - 1].lerp(&vertices[i], t)
}

/// Fraction of the closest point of `geometry` to `point`
///
/// When several positions are equally close (repeated points, loops) the first
/// one along the geometry wins.
pub fn locate(geometry: &Polyline, point: &Vertex) -> f64 {
    let total = geometry.length();
    if total <= 0.0 {
        return 0.0;
    }

    let vertices = geometry.vertices();
    let cumulative = geometry.cumulative_lengths();

    let mut best_distance = f64::INFINITY;
    let mut best_position = 0.0;

    for i in 0..vertices.len().saturating_sub(1) {
        let a = &vertices[i];
        let b = &vertices[i + 1];
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len_sq = dx * dx + dy * dy;

        let t = if len_sq <= 0.0 {
            0.0
        } else {
            (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
        };

        let px = a.x + t * dx;
        let py = a.y + t * dy;
        let distance = (point.x - px).hypot(point.y - py);

        // Strictly smaller: the first closest approach is kept
        if distance < best_distance {
            best_distance = distance;
            best_position = cumulative[i] + t * len_sq.sqrt();
        }
    }

    clamp_fraction(best_position / total)
}

/// Part of `geometry` between two fractions
///
/// When `start > end` the result runs backwards, from the start location to the
/// end location.
pub fn substring(geometry: &Polyline, start: f64, end: f64) -> Extract {
    let start = clamp_fraction(start);
    let end = clamp_fraction(end);

    if (start - end).abs() < DEGENERATE_SPAN {
        return Extract::Point(interpolate(geometry, start));
    }

    let (lo, hi, reversed) = if start < end {
        (start, end, false)
    } else {
        (end, start, true)
    };

    let total = geometry.length();
    let lo_distance = lo * total;
    let hi_distance = hi * total;

    let mut vertices = Vec::with_capacity(geometry.vertex_count() + 2);
    vertices.push(interpolate(geometry, lo));
    vertices.extend(
        geometry
            .vertices()
            .iter()
            .zip(geometry.cumulative_lengths())
            .filter(|&(_, &c)| c > lo_distance && c < hi_distance)
            .map(|(v, _)| *v),
    );
    vertices.push(interpolate(geometry, hi));

    if reversed {
        vertices.reverse();
    }

    Extract::Line(Polyline::from_vertices(vertices))
}

#[inline]
fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
