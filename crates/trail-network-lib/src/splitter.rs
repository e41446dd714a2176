//! Cutting a path into an identity segment and clones
//!
//! The first segment keeps the path's id; every following segment becomes a
//! clone carrying the same attributes. Aggregations on the path are reprojected
//! against the full, untouched geometry before the identity path is truncated.

use crate::linear::{self, Extract};
use crate::reproject::{SegmentSpan, reproject};
use crate::{NetworkStore, PathId, Polyline, Result, TopologyId};
use geo::Coord;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where to cut a path
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitPoint {
    pub fraction: f64,
    /// Exact planar location the adjacent segment ends are snapped to
    pub point: Option<Coord<f64>>,
}

impl SplitPoint {
    /// Cut at `fraction`, keeping the interpolated location
    pub fn at(fraction: f64) -> Self {
        Self {
            fraction,
            point: None,
        }
    }

    /// Cut at `fraction`, snapping the new node onto `point`
    pub fn snapped(fraction: f64, point: Coord<f64>) -> Self {
        Self {
            fraction,
            point: Some(point),
        }
    }
}

/// Split points of one path; most paths are cut once or twice
pub(crate) type SplitPoints = SmallVec<[SplitPoint; 4]>;

/// One planned segment of a split path
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPlan {
    /// Fraction range covered on the original geometry
    pub start: f64,
    pub end: f64,
    pub geometry: Polyline,
}

/// Result of applying splits to one path
#[derive(Clone, Debug, Default)]
pub(crate) struct SplitOutcome {
    /// Resulting paths in geometric order, the identity first
    pub segments: Vec<PathId>,
    /// Topologies whose aggregations were rewritten
    pub touched: BTreeSet<TopologyId>,
}

/// Compute the segments produced by cutting `geometry` at `points`
///
/// Points within `tolerance` of 0 or 1 are ignored; the rest are sorted and
/// de-duplicated. With no effective cut the whole geometry is a single segment.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn plan_segments(geometry: &Polyline, points: &[SplitPoint], tolerance: f64) -> Vec<SegmentPlan> {
    let mut cuts: SplitPoints = points
        .iter()
        .filter(|p| p.fraction > tolerance && p.fraction < 1.0 - tolerance)
        .copied()
        .collect();
    cuts.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
    cuts.dedup_by(|later, kept| later.fraction - kept.fraction <= tolerance);

    let mut bounds: SplitPoints = SmallVec::with_capacity(cuts.len() + 2);
    bounds.push(SplitPoint::at(0.0));
    bounds.extend(cuts);
    bounds.push(SplitPoint::at(1.0));

    bounds
        .windows(2)
        .filter_map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            match linear::substring(geometry, from.fraction, to.fraction) {
                Extract::Line(line) => Some(SegmentPlan {
                    start: from.fraction,
                    end: to.fraction,
                    geometry: line.snap_endpoints(from.point, to.point),
                }),
                Extract::Point(_) => None,
            }
        })
        .collect()
}

/// Split a stored path at `points`
///
/// Clones are inserted first, then every aggregation on the path is rewritten
/// in the original fraction space, and only then is the identity path's
/// geometry truncated to the first segment.
pub(crate) fn apply_splits(
    store: &mut NetworkStore,
    path: PathId,
    points: &[SplitPoint],
    tolerance: f64,
) -> Result<SplitOutcome> {
    // Profile one path split (planning + clones + reprojection)
    #[cfg(feature = "profiling")]
    profiling::scope!("splitter::apply_splits");

    let geometry = store.live_path(path)?.geometry().clone();
    let plans = plan_segments(&geometry, points, tolerance);

    let Some((identity, rest)) = plans.split_first() else {
        return Ok(SplitOutcome::default());
    };
    if rest.is_empty() {
        return Ok(SplitOutcome {
            segments: vec![path],
            touched: BTreeSet::new(),
        });
    }

    let mut segments = Vec::with_capacity(plans.len());
    let mut spans = Vec::with_capacity(plans.len());
    segments.push(path);
    spans.push(SegmentSpan {
        path,
        start: identity.start,
        end: identity.end,
    });
    for plan in rest {
        let clone = store.insert_clone(path, plan.geometry.clone())?;
        segments.push(clone);
        spans.push(SegmentSpan {
            path: clone,
            start: plan.start,
            end: plan.end,
        });
    }

    let aggregations = store.aggregations_on(path);
    let touched = aggregations.iter().map(|a| a.topology).collect();
    for (aggregation, pieces) in reproject(&aggregations, &spans, tolerance)? {
        store.replace_aggregation(aggregation, &pieces)?;
    }

    store.set_path_geometry(path, identity.geometry.clone())?;

    debug!(
        %path,
        pieces = segments.len(),
        aggregations = aggregations.len(),
        "path split"
    );

    Ok(SplitOutcome { segments, touched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PathAttributes, PathRepository, Vertex};
    use geo::Rect;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn ab() -> Polyline {
        Polyline::from_xy(&[(0.0, 0.0), (4.0, 0.0)]).unwrap()
    }

    fn create_test_store() -> NetworkStore {
        NetworkStore::new(Rect::new(
            Coord {
                x: -100.0,
                y: -100.0,
            },
            Coord { x: 100.0, y: 100.0 },
        ))
    }

    #[test]
    fn test_plan_single_cut() {
        let plans = plan_segments(&ab(), &[SplitPoint::at(0.5)], EPS);
        assert_eq!(plans.len(), 2);
        assert_eq!((plans[0].start, plans[0].end), (0.0, 0.5));
        assert!(approx(plans[0].geometry.length(), 2.0));
        assert!(approx(plans[1].geometry.length(), 2.0));
    }

    #[test]
    fn test_plan_drops_endpoint_and_duplicate_cuts() {
        let points = [
            SplitPoint::at(0.75),
            SplitPoint::at(0.0),
            SplitPoint::at(0.25),
            SplitPoint::at(0.25 + 1e-12),
            SplitPoint::at(1.0),
        ];
        let plans = plan_segments(&ab(), &points, EPS);
        let ranges: Vec<_> = plans.iter().map(|p| (p.start, p.end)).collect();
        assert_eq!(ranges, vec![(0.0, 0.25), (0.25, 0.75), (0.75, 1.0)]);
    }

    #[test]
    fn test_plan_without_cut_is_whole_geometry() {
        let plans = plan_segments(&ab(), &[SplitPoint::at(1.0)], EPS);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].geometry, ab());
    }

    #[test]
    fn test_plan_snaps_node_and_keeps_altitude() {
        let geometry = Polyline::from_xyz(&[(0.0, 0.0, 0.0), (4.0, 0.0, 40.0)]).unwrap();
        let node = Coord { x: 2.0 + 1e-13, y: 1e-13 };
        let plans = plan_segments(&geometry, &[SplitPoint::snapped(0.5, node)], EPS);

        let end = plans[0].geometry.last().unwrap();
        let start = plans[1].geometry.first().unwrap();
        assert_eq!((end.x, end.y), (node.x, node.y));
        assert_eq!(end, start);
        assert!(approx(end.z, 20.0));
    }

    #[test]
    fn test_length_is_conserved() {
        let geometry = Polyline::from_xy(&[(0.0, 0.0), (3.0, 0.0), (3.0, 5.0), (7.0, 5.0)]).unwrap();
        let points = [SplitPoint::at(0.1), SplitPoint::at(0.45), SplitPoint::at(0.9)];
        let total: f64 = plan_segments(&geometry, &points, EPS)
            .iter()
            .map(|p| p.geometry.length())
            .sum();
        assert!(approx(total, geometry.length()));
    }

    #[test]
    fn test_apply_splits_keeps_identity_first() {
        let mut store = create_test_store();
        let id = store.insert_path(ab(), PathAttributes::named("AB"));
        let outcome = apply_splits(&mut store, id, &[SplitPoint::at(0.25), SplitPoint::at(0.75)], EPS).unwrap();

        assert_eq!(outcome.segments.len(), 3);
        assert_eq!(outcome.segments[0], id);
        let identity = store.path(id).unwrap();
        assert!(approx(identity.length(), 1.0));
        assert_eq!(identity.geometry().last(), Some(Vertex::new(1.0, 0.0, 0.0)));

        let middle = store.path(outcome.segments[1]).unwrap();
        assert_eq!(middle.name(), Some("AB"));
        assert!(approx(middle.length(), 2.0));
        assert_eq!(store.live_paths().count(), 3);
    }

    #[test]
    fn test_apply_splits_reprojects_aggregations() {
        let mut store = create_test_store();
        let id = store.insert_path(ab(), PathAttributes::default());
        let topology = store.create_topology();
        store.attach(topology, id, 0.25, 0.75).unwrap();

        let outcome = apply_splits(&mut store, id, &[SplitPoint::at(0.5)], EPS).unwrap();
        assert!(outcome.touched.contains(&topology));

        let aggregations = store.topology_aggregations(topology).unwrap();
        assert_eq!(aggregations.len(), 2);
        assert_eq!(aggregations[0].path, id);
        assert!(approx(aggregations[0].start, 0.5) && approx(aggregations[0].end, 1.0));
        assert_eq!(aggregations[1].path, outcome.segments[1]);
        assert!(approx(aggregations[1].start, 0.0) && approx(aggregations[1].end, 0.5));
    }

    #[test]
    fn test_apply_splits_on_endpoint_is_noop() {
        let mut store = create_test_store();
        let id = store.insert_path(ab(), PathAttributes::default());
        let outcome = apply_splits(&mut store, id, &[SplitPoint::at(0.0)], EPS).unwrap();
        assert_eq!(outcome.segments, vec![id]);
        assert_eq!(store.path_count(), 1);
    }

    #[test]
    fn test_apply_splits_on_deleted_path_fails() {
        let mut store = create_test_store();
        let id = store.insert_path(ab(), PathAttributes::default());
        store.soft_delete_path(id).unwrap();
        assert!(apply_splits(&mut store, id, &[SplitPoint::at(0.5)], EPS).is_err());
    }
}
