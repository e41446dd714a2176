//! Topologies and aggregations (linear referencing)
//!
//! A topology anchors an entity to the network through an ordered list of
//! aggregations, each one a `(path, start, end)` span expressed in fractions of
//! the path's geometry. The absolute geometry of a topology is never stored: it
//! is derived by [`resolve`] and memoized in a [`GeometryCache`] that mutations
//! invalidate explicitly.

use crate::linear::{self, Extract};
use crate::{Path, PathId, Polyline, Vertex};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identifier of a topology
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct TopologyId(pub u64);

impl fmt::Display for TopologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topology#{}", self.0)
    }
}

/// Stable identifier of an aggregation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct AggregationId(pub u64);

impl fmt::Display for AggregationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aggregation#{}", self.0)
    }
}

/// One span of a topology on one path
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aggregation {
    pub id: AggregationId,
    pub topology: TopologyId,
    pub path: PathId,
    /// Fraction in [0, 1]; may exceed `end` for a reversed traversal
    pub start: f64,
    pub end: f64,
    /// Position within the owning topology, contiguous from 0
    pub order: usize,
}

impl Aggregation {
    /// Zero-length span
    #[inline]
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// Traverses the path against its natural direction
    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    /// `(min, max)` of the two fractions
    #[inline]
    pub fn span(&self) -> (f64, f64) {
        (self.start.min(self.end), self.start.max(self.end))
    }
}

/// Whether a topology describes a location or a stretch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TopologyKind {
    Point,
    Line,
}

/// An ordered set of aggregations
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Topology {
    id: TopologyId,
    /// Aggregations in order-index order
    aggregations: Vec<AggregationId>,
    deleted: bool,
}

impl Topology {
    pub(crate) fn new(id: TopologyId) -> Self {
        Self {
            id,
            aggregations: Vec::new(),
            deleted: false,
        }
    }

    #[inline]
    pub fn id(&self) -> TopologyId {
        self.id
    }

    /// Aggregation ids, in order
    #[inline]
    pub fn aggregation_ids(&self) -> &[AggregationId] {
        &self.aggregations
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.aggregations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.aggregations.is_empty()
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn position_of(&self, aggregation: AggregationId) -> Option<usize> {
        self.aggregations.iter().position(|&a| a == aggregation)
    }

    pub(crate) fn push(&mut self, aggregation: AggregationId) {
        self.aggregations.push(aggregation);
    }

    pub(crate) fn insert(&mut self, index: usize, aggregation: AggregationId) {
        self.aggregations.insert(index, aggregation);
    }

    pub(crate) fn remove(&mut self, aggregation: AggregationId) -> bool {
        match self.position_of(aggregation) {
            Some(pos) => {
                self.aggregations.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_aggregations(&mut self) -> Vec<AggregationId> {
        std::mem::take(&mut self.aggregations)
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

/// Absolute geometry of a topology
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResolvedGeometry {
    /// No live aggregation
    Empty,
    /// Point topology
    Point(Vertex),
    /// One part per run of connected aggregations
    Lines(Vec<Polyline>),
}

impl ResolvedGeometry {
    pub fn first(&self) -> Option<Vertex> {
        match self {
            ResolvedGeometry::Empty => None,
            ResolvedGeometry::Point(v) => Some(*v),
            ResolvedGeometry::Lines(parts) => parts.first().and_then(Polyline::first),
        }
    }

    pub fn last(&self) -> Option<Vertex> {
        match self {
            ResolvedGeometry::Empty => None,
            ResolvedGeometry::Point(v) => Some(*v),
            ResolvedGeometry::Lines(parts) => parts.last().and_then(Polyline::last),
        }
    }

    /// Total planar length over all parts
    pub fn length(&self) -> f64 {
        match self {
            ResolvedGeometry::Lines(parts) => parts.iter().map(Polyline::length).sum(),
            _ => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResolvedGeometry::Empty)
    }

    /// More than one disconnected part
    pub fn is_multi(&self) -> bool {
        matches!(self, ResolvedGeometry::Lines(parts) if parts.len() > 1)
    }

    pub fn parts(&self) -> &[Polyline] {
        match self {
            ResolvedGeometry::Lines(parts) => parts,
            _ => &[],
        }
    }
}

/// Derive the absolute geometry of a topology
///
/// `aggregations` must be in order-index order. Aggregations whose path is
/// missing or deleted are skipped. Consecutive spans that meet within
/// `tolerance` are merged into one part.
pub fn resolve<'a, I, F>(aggregations: I, lookup: F, tolerance: f64) -> ResolvedGeometry
where
    I: IntoIterator<Item = &'a Aggregation>,
    F: Fn(PathId) -> Option<&'a Path>,
{
    let extracts: Vec<Extract> = aggregations
        .into_iter()
        .filter_map(|aggregation| {
            let path = lookup(aggregation.path).filter(|p| !p.is_deleted())?;
            Some(linear::substring(
                path.geometry(),
                aggregation.start,
                aggregation.end,
            ))
        })
        .collect();

    if extracts.is_empty() {
        return ResolvedGeometry::Empty;
    }

    if extracts.iter().all(|e| matches!(e, Extract::Point(_))) {
        return match extracts[0].first() {
            Some(v) => ResolvedGeometry::Point(v),
            None => ResolvedGeometry::Empty,
        };
    }

    let mut parts: Vec<Vec<Vertex>> = Vec::new();
    for extract in extracts {
        let Extract::Line(line) = extract else {
            continue; // Points inside a line topology carry no geometry
        };

        match parts.last_mut() {
            Some(current)
                if current
                    .last()
                    .zip(line.first())
                    .is_some_and(|(a, b)| a.same_xy(&b, tolerance)) =>
            {
                current.extend(line.vertices().iter().skip(1).copied());
            }
            _ => parts.push(line.vertices().to_vec()),
        }
    }

    ResolvedGeometry::Lines(parts.into_iter().map(Polyline::from_vertices).collect())
}

/// Cache state of one topology
#[derive(Clone, Debug)]
enum CacheEntry {
    Dirty,
    Clean(Arc<ResolvedGeometry>),
}

/// Memoized topology geometries with explicit invalidation
///
/// A missing entry counts as dirty. Reads take `&self`, so resolution can be
/// memoized from shared references.
#[derive(Clone, Debug, Default)]
pub(crate) struct GeometryCache {
    entries: DashMap<TopologyId, CacheEntry>,
}

impl GeometryCache {
    pub(crate) fn invalidate(&self, topology: TopologyId) {
        self.entries.insert(topology, CacheEntry::Dirty);
    }

    pub(crate) fn forget(&self, topology: TopologyId) {
        self.entries.remove(&topology);
    }

    pub(crate) fn is_dirty(&self, topology: TopologyId) -> bool {
        !matches!(
            self.entries.get(&topology).as_deref(),
            Some(CacheEntry::Clean(_))
        )
    }

    /// Return the cached geometry, recomputing it with `compute` when dirty
    pub(crate) fn get_or_resolve<F>(&self, topology: TopologyId, compute: F) -> Arc<ResolvedGeometry>
    where
        F: FnOnce() -> ResolvedGeometry,
    {
        if let Some(entry) = self.entries.get(&topology)
            && let CacheEntry::Clean(geometry) = entry.value()
        {
            return geometry.clone();
        }

        let geometry = Arc::new(compute());
        self.entries
            .insert(topology, CacheEntry::Clean(geometry.clone()));
        geometry
    }
}
