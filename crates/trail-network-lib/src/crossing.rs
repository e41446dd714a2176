//! Crossing detection between a candidate geometry and the live network
//!
//! Broad phase: the repository's bounding-box candidate query (the quadtree for
//! [`NetworkStore`](crate::NetworkStore)). Narrow phase: `geo`'s segment/segment
//! intersection on every pair of segments.

use crate::index::expand;
use crate::{NetworkError, PathId, PathRepository, Polyline, Result, Vertex, linear};
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Closest, ClosestPoint, Coord, Line, Point};
use tracing::{trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point where the candidate meets an existing live path
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Crossing {
    /// The existing path
    pub path: PathId,
    pub fraction_on_path: f64,
    pub fraction_on_candidate: f64,
    /// Planar location of the crossing
    pub point: Coord<f64>,
}

/// Every crossing of `candidate` with the live paths of `repository`
///
/// `exclude` removes the candidate's own identity when re-checking an updated
/// path. Endpoint-to-endpoint touches are not reported, nor are collinear
/// overlaps (logged and skipped). An endpoint within `tolerance` of the other
/// geometry counts as touching it. Results are ordered by candidate fraction,
/// then path id, then path fraction.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn find_crossings<R: PathRepository>(
    candidate: &Polyline,
    repository: &R,
    exclude: Option<PathId>,
    tolerance: f64,
) -> Vec<Crossing> {
    let area = expand(candidate.bounding_rect(), tolerance);

    let mut crossings: Vec<Crossing> = repository
        .candidates(area)
        .into_iter()
        .filter(|&id| Some(id) != exclude)
        .filter_map(|id| repository.path(id).filter(|p| !p.is_deleted()))
        .flat_map(|path| {
            crossings_between(candidate, path.geometry(), tolerance)
                .into_iter()
                .map(move |(on_candidate, on_path, point)| Crossing {
                    path: path.id(),
                    fraction_on_path: on_path,
                    fraction_on_candidate: on_candidate,
                    point,
                })
        })
        .collect();

    crossings.sort_by(|a, b| {
        a.fraction_on_candidate
            .total_cmp(&b.fraction_on_candidate)
            .then(a.path.cmp(&b.path))
            .then(a.fraction_on_path.total_cmp(&b.fraction_on_path))
    });

    trace!(count = crossings.len(), "crossings found");
    crossings
}

/// Crossings between two geometries as `(fraction on a, fraction on b, point)`
///
/// Endpoint-to-endpoint touches are filtered out and crossings repeated on a
/// shared vertex are reported once. An endpoint of either geometry lying within
/// `tolerance` of the other one's interior is a crossing too, located on that
/// endpoint, unless it sits on a collinear overlap.
pub(crate) fn crossings_between(
    a: &Polyline,
    b: &Polyline,
    tolerance: f64,
) -> Vec<(f64, f64, Coord<f64>)> {
    let (found, overlaps) = scan(a, b, tolerance);
    for overlap in &overlaps {
        warn!(
            start = ?overlap.start,
            end = ?overlap.end,
            "collinear overlap between paths, not treated as a crossing"
        );
    }
    found
}

/// Stretches shared by two geometries, longer than `tolerance`
pub(crate) fn overlaps_between(a: &Polyline, b: &Polyline, tolerance: f64) -> Vec<Line<f64>> {
    scan(a, b, tolerance).1
}

/// Exact segment pass followed by the endpoint proximity pass
fn scan(
    a: &Polyline,
    b: &Polyline,
    tolerance: f64,
) -> (Vec<(f64, f64, Coord<f64>)>, Vec<Line<f64>>) {
    let mut found: Vec<(f64, f64, Coord<f64>)> = Vec::new();
    let mut overlaps: Vec<Line<f64>> = Vec::new();

    for (i, line_a) in a.lines().enumerate() {
        for (j, line_b) in b.lines().enumerate() {
            let point = match line_intersection(line_a, line_b) {
                None => continue,
                Some(LineIntersection::SinglePoint { intersection, .. }) => intersection,
                Some(LineIntersection::Collinear { intersection }) => {
                    if near(intersection.start, intersection.end, tolerance) {
                        intersection.start
                    } else {
                        overlaps.push(intersection);
                        continue;
                    }
                }
            };

            if is_endpoint(a, point, tolerance) && is_endpoint(b, point, tolerance) {
                continue; // Already a shared node
            }

            let on_a = fraction_on_segment(a, i, line_a, point);
            let on_b = fraction_on_segment(b, j, line_b, point);
            push_unique(&mut found, (on_a, on_b, point), tolerance);
        }
    }

    // Endpoints resting on the other geometry, missed by rounding
    for (on_a, end) in ends(a) {
        if let Some(on_b) = touch(end, b, &overlaps, &found, tolerance) {
            push_unique(&mut found, (on_a, on_b, end.xy()), tolerance);
        }
    }
    for (on_b, end) in ends(b) {
        if let Some(on_a) = touch(end, a, &overlaps, &found, tolerance) {
            push_unique(&mut found, (on_a, on_b, end.xy()), tolerance);
        }
    }

    (found, overlaps)
}

/// Fraction of `other` where the endpoint `end` touches its interior
fn touch(
    end: Vertex,
    other: &Polyline,
    overlaps: &[Line<f64>],
    found: &[(f64, f64, Coord<f64>)],
    tolerance: f64,
) -> Option<f64> {
    let point = end.xy();
    if is_endpoint(other, point, tolerance)
        || found.iter().any(|&(_, _, p)| near(p, point, tolerance))
        || overlaps.iter().any(|o| on_line(*o, point, tolerance))
    {
        return None;
    }

    let fraction = linear::locate(other, &end);
    linear::interpolate(other, fraction)
        .is_at(point, tolerance)
        .then_some(fraction)
}

fn ends(geometry: &Polyline) -> impl Iterator<Item = (f64, Vertex)> {
    [(0.0, geometry.first()), (1.0, geometry.last())]
        .into_iter()
        .filter_map(|(fraction, vertex)| vertex.map(|v| (fraction, v)))
}

fn push_unique(found: &mut Vec<(f64, f64, Coord<f64>)>, crossing: (f64, f64, Coord<f64>), tolerance: f64) {
    let (on_a, on_b, point) = crossing;
    let duplicate = found.iter().any(|&(fa, fb, p)| {
        (fa - on_a).abs() <= tolerance && (fb - on_b).abs() <= tolerance && near(p, point, tolerance)
    });
    if !duplicate {
        found.push(crossing);
    }
}

fn on_line(line: Line<f64>, point: Coord<f64>, tolerance: f64) -> bool {
    match line.closest_point(&Point::from(point)) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => near(p.0, point, tolerance),
        Closest::Indeterminate => false,
    }
}

/// Reject a candidate geometry that crosses itself
///
/// Non-adjacent segments may not meet, except for a closed ring meeting on its
/// first vertex; adjacent segments may not fold back onto each other.
///
/// # Errors
/// Returns [`NetworkError::InvalidGeometry`] describing the first self-crossing.
pub fn validate_candidate(candidate: &Polyline, tolerance: f64) -> Result<()> {
    // Consecutive duplicate vertices would make neighbours look non-adjacent
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(candidate.vertex_count());
    for vertex in candidate.vertices() {
        if coords.last().is_none_or(|last| !vertex.is_at(*last, tolerance)) {
            coords.push(vertex.xy());
        }
    }

    let lines: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let closed = candidate.is_closed(tolerance);

    for i in 0..lines.len() {
        for j in (i + 1)..lines.len() {
            let Some(intersection) = line_intersection(lines[i], lines[j]) else {
                continue;
            };

            let adjacent = j == i + 1;
            match intersection {
                LineIntersection::SinglePoint { .. } if adjacent => {}
                LineIntersection::SinglePoint { intersection: point, .. }
                    if closed && i == 0 && j == lines.len() - 1 && near(point, coords[0], tolerance) => {}
                LineIntersection::SinglePoint { intersection: point, .. } => {
                    return Err(NetworkError::InvalidGeometry(format!(
                        "geometry crosses itself at ({}, {})",
                        point.x, point.y
                    )));
                }
                LineIntersection::Collinear { intersection: overlap } => {
                    return Err(NetworkError::InvalidGeometry(format!(
                        "geometry overlaps itself between ({}, {}) and ({}, {})",
                        overlap.start.x, overlap.start.y, overlap.end.x, overlap.end.y
                    )));
                }
            }
        }
    }

    Ok(())
}

fn is_endpoint(geometry: &Polyline, point: Coord<f64>, tolerance: f64) -> bool {
    geometry.first().is_some_and(|v| v.is_at(point, tolerance))
        || geometry.last().is_some_and(|v| v.is_at(point, tolerance))
}

/// Fraction of `point` lying on the `index`-th segment of `geometry`
fn fraction_on_segment(geometry: &Polyline, index: usize, segment: Line<f64>, point: Coord<f64>) -> f64 {
    let total = geometry.length();
    if total <= 0.0 {
        return 0.0;
    }
    let along = (point.x - segment.start.x).hypot(point.y - segment.start.y);
    ((geometry.cumulative_lengths()[index] + along) / total).clamp(0.0, 1.0)
}

#[inline]
fn near(a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> bool {
    (a.x - b.x).hypot(a.y - b.y) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Path, PathAttributes};

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn line(coords: &[(f64, f64)]) -> Polyline {
        Polyline::from_xy(coords).unwrap()
    }

    fn repo(paths: &[(u64, &[(f64, f64)])]) -> Vec<Path> {
        paths
            .iter()
            .map(|(id, coords)| Path::new(PathId(*id), line(coords), PathAttributes::default()))
            .collect()
    }

    #[test]
    fn test_perpendicular_tee() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(2.0, 0.0), (2.0, 2.0)]), &paths, None, EPS);

        assert_eq!(crossings.len(), 1);
        let c = crossings[0];
        assert_eq!(c.path, PathId(1));
        assert!(approx(c.fraction_on_path, 0.5));
        assert!(approx(c.fraction_on_candidate, 0.0));
        assert_eq!(c.point, Coord { x: 2.0, y: 0.0 });
    }

    #[test]
    fn test_cross_in_the_middle() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(2.0, -2.0), (2.0, 2.0)]), &paths, None, EPS);
        assert_eq!(crossings.len(), 1);
        assert!(approx(crossings[0].fraction_on_candidate, 0.5));
        assert!(approx(crossings[0].fraction_on_path, 0.5));
    }

    #[test]
    fn test_crossing_twice_is_ordered() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let candidate = line(&[(1.0, 2.0), (1.0, -2.0), (3.0, -2.0), (3.0, 2.0)]);
        let crossings = find_crossings(&candidate, &paths, None, EPS);

        assert_eq!(crossings.len(), 2);
        assert!(approx(crossings[0].fraction_on_candidate, 0.2));
        assert!(approx(crossings[0].fraction_on_path, 0.25));
        assert!(approx(crossings[1].fraction_on_candidate, 0.8));
        assert!(approx(crossings[1].fraction_on_path, 0.75));
    }

    #[test]
    fn test_endpoint_touch_is_not_a_crossing() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(4.0, 0.0), (4.0, 3.0)]), &paths, None, EPS);
        assert!(crossings.is_empty());
    }

    #[test]
    fn test_crossing_on_shared_vertex_reported_once() {
        let paths = repo(&[(1, &[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(2.0, -1.0), (2.0, 1.0)]), &paths, None, EPS);
        assert_eq!(crossings.len(), 1);
        assert!(approx(crossings[0].fraction_on_path, 0.5));
    }

    #[test]
    fn test_collinear_overlap_is_skipped() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(1.0, 0.0), (3.0, 0.0)]), &paths, None, EPS);
        assert!(crossings.is_empty());
    }

    #[test]
    fn test_rounded_tee_within_tolerance() {
        // (0.3, 0.1) is not exactly representable, so it misses the segment by rounding
        let paths = repo(&[(1, &[(0.0, 0.0), (3.0, 1.0)])]);
        let crossings = find_crossings(&line(&[(0.3, 0.1), (0.3, 2.0)]), &paths, None, EPS);

        assert_eq!(crossings.len(), 1);
        let c = crossings[0];
        assert!(approx(c.fraction_on_candidate, 0.0));
        assert!(approx(c.fraction_on_path, 0.1));
        assert_eq!(c.point, Coord { x: 0.3, y: 0.1 });
    }

    #[test]
    fn test_existing_path_ending_near_candidate() {
        let paths = repo(&[(1, &[(0.3, 2.0), (0.3, 0.1 + 1e-12)])]);
        let crossings = find_crossings(&line(&[(0.0, 0.0), (3.0, 1.0)]), &paths, None, EPS);

        assert_eq!(crossings.len(), 1);
        assert!(approx(crossings[0].fraction_on_candidate, 0.1));
        assert!(approx(crossings[0].fraction_on_path, 1.0));
    }

    #[test]
    fn test_endpoint_beyond_tolerance_is_ignored() {
        let paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)])]);
        let crossings = find_crossings(&line(&[(2.0, 1e-6), (2.0, 2.0)]), &paths, None, EPS);
        assert!(crossings.is_empty());
    }

    #[test]
    fn test_overlaps_between() {
        let ab = line(&[(0.0, 0.0), (4.0, 0.0)]);
        let cd = line(&[(2.0, 2.0), (2.0, 0.0), (3.0, 0.0)]);

        let overlaps = overlaps_between(&ab, &cd, EPS);
        assert_eq!(overlaps.len(), 1);
        let (start, end) = if overlaps[0].start.x < overlaps[0].end.x {
            (overlaps[0].start, overlaps[0].end)
        } else {
            (overlaps[0].end, overlaps[0].start)
        };
        assert_eq!(start, Coord { x: 2.0, y: 0.0 });
        assert_eq!(end, Coord { x: 3.0, y: 0.0 });

        // The corner still splits; the overlap's far end does not
        let crossings = crossings_between(&ab, &cd, EPS);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].2, Coord { x: 2.0, y: 0.0 });

        assert!(overlaps_between(&ab, &line(&[(2.0, -2.0), (2.0, 2.0)]), EPS).is_empty());
    }

    #[test]
    fn test_deleted_and_excluded_paths_are_ignored() {
        let mut paths = repo(&[(1, &[(0.0, 0.0), (4.0, 0.0)]), (2, &[(0.0, 1.0), (4.0, 1.0)])]);
        paths[0].mark_deleted();
        let candidate = line(&[(2.0, -2.0), (2.0, 2.0)]);

        let crossings = find_crossings(&candidate, &paths, None, EPS);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].path, PathId(2));

        assert!(find_crossings(&candidate, &paths, Some(PathId(2)), EPS).is_empty());
    }

    #[test]
    fn test_ordering_ties_broken_by_path_id() {
        // Both existing paths meet the candidate at the same point
        let paths = repo(&[
            (3, &[(0.0, 0.0), (2.0, 0.0)]),
            (2, &[(2.0, -2.0), (2.0, 0.0)]),
        ]);
        let crossings = find_crossings(&line(&[(0.0, -1.0), (2.0, 0.0), (4.0, 1.0)]), &paths, None, EPS);
        assert_eq!(crossings.len(), 2);
        assert_eq!(crossings[0].path, PathId(2));
        assert_eq!(crossings[1].path, PathId(3));
    }

    #[test]
    fn test_validate_candidate() {
        assert!(validate_candidate(&line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]), EPS).is_ok());

        let bowtie = line(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        assert!(matches!(
            validate_candidate(&bowtie, EPS),
            Err(NetworkError::InvalidGeometry(_))
        ));

        let ring = line(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 0.0)]);
        assert!(validate_candidate(&ring, EPS).is_ok());

        let fold = line(&[(0.0, 0.0), (4.0, 0.0), (2.0, 0.0)]);
        assert!(validate_candidate(&fold, EPS).is_err());

        let repeated = line(&[(0.0, 0.0), (2.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        assert!(validate_candidate(&repeated, EPS).is_ok());
    }
}
