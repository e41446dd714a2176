//! Reprojection of aggregations onto the segments of a split path
//!
//! Everything happens in the fraction space of the path before the split: a
//! segment covers `[start, end]` of that space, and an aggregation position `f`
//! inside it maps to the local fraction `(f - start) / (end - start)`. The
//! functions here are pure; the store applies their result.

use crate::{Aggregation, AggregationId, NetworkError, PathId, Result};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One resulting path and the fraction range it covers on the old geometry
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentSpan {
    pub path: PathId,
    pub start: f64,
    pub end: f64,
}

impl SegmentSpan {
    #[inline]
    fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Local fraction of `fraction` (old fraction space) within this segment
    fn local(&self, fraction: f64, tolerance: f64) -> f64 {
        let len = self.len();
        if len <= 0.0 {
            return 0.0;
        }
        snap((fraction - self.start) / len, tolerance)
    }
}

/// A rewritten aggregation span on one resulting path
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Piece {
    pub path: PathId,
    pub start: f64,
    pub end: f64,
}

/// Rewrite every aggregation of a split path onto its new segments
///
/// `segments` must be ordered and cover `[0, 1]` of the old fraction space.
/// Each aggregation maps to its pieces in traversal order; an empty list means
/// the aggregation no longer touches any segment and must be dropped.
///
/// # Errors
/// Returns [`NetworkError::Reprojection`] when `segments` is empty.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn reproject(
    aggregations: &[Aggregation],
    segments: &[SegmentSpan],
    tolerance: f64,
) -> Result<Vec<(AggregationId, Vec<Piece>)>> {
    if segments.is_empty() {
        return Err(NetworkError::Reprojection {
            reason: "no segment to reproject onto".to_string(),
        });
    }

    Ok(aggregations
        .iter()
        .map(|aggregation| {
            let pieces = if aggregation.is_point() {
                vec![reproject_point(aggregation.start, segments, tolerance)]
            } else {
                reproject_line(aggregation, segments, tolerance)
            };
            if pieces.is_empty() {
                warn!(
                    aggregation = %aggregation.id,
                    path = %aggregation.path,
                    "aggregation does not overlap any segment, dropping it"
                );
            }
            (aggregation.id, pieces)
        })
        .collect())
}

/// A point at a cut belongs to the segment ending there
fn reproject_point(fraction: f64, segments: &[SegmentSpan], tolerance: f64) -> Piece {
    let segment = if fraction <= tolerance {
        &segments[0]
    } else if fraction >= 1.0 - tolerance {
        &segments[segments.len() - 1]
    } else {
        segments
            .iter()
            .find(|s| fraction <= s.end + tolerance)
            .unwrap_or(&segments[segments.len() - 1])
    };

    let local = segment.local(fraction, tolerance);
    Piece {
        path: segment.path,
        start: local,
        end: local,
    }
}

fn reproject_line(aggregation: &Aggregation, segments: &[SegmentSpan], tolerance: f64) -> Vec<Piece> {
    let (lo, hi) = aggregation.span();
    let reversed = aggregation.is_reversed();

    let mut pieces: Vec<Piece> = segments
        .iter()
        .filter_map(|segment| {
            let from = lo.max(segment.start);
            let to = hi.min(segment.end);
            if to - from <= tolerance {
                return None;
            }

            let (local_from, local_to) = (segment.local(from, tolerance), segment.local(to, tolerance));
            Some(if reversed {
                Piece {
                    path: segment.path,
                    start: local_to,
                    end: local_from,
                }
            } else {
                Piece {
                    path: segment.path,
                    start: local_from,
                    end: local_to,
                }
            })
        })
        .collect();

    if reversed {
        pieces.reverse();
    }
    pieces
}

/// Snap to exactly 0 or 1 within `tolerance`, then clamp into [0, 1]
pub(crate) fn snap(fraction: f64, tolerance: f64) -> f64 {
    if fraction.abs() <= tolerance {
        0.0
    } else if (fraction - 1.0).abs() <= tolerance {
        1.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
