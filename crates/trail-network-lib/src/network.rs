//! Network facade
//!
//! `PathNetwork` is the public entry point. Every mutation is staged on a copy
//! of the store and swapped in only when the whole pipeline (crossing detection,
//! splitting, reprojection, node attachment) succeeded, so a failing operation
//! leaves the network untouched. Topology geometries are resolved lazily and
//! memoized until a mutation touches them.

use crate::crossing::overlaps_between;
use crate::index::expand;
use crate::splitter::{SplitPoints, apply_splits};
use crate::topology::GeometryCache;
use crate::{
    Aggregation, AggregationId, NetworkError, NetworkStore, Path, PathAttributes, PathId, PathRepository,
    Polyline, ResolvedGeometry, Result, SplitPoint, Topology, TopologyId, TopologyKind,
    find_crossings, resolve, validate_candidate,
};
use geo::{Coord, Rect};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a path network
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Fractions closer than this are considered equal; cuts this close to a
    /// path end are ignored.
    /// Default: 1e-9
    pub fraction_tolerance: f64,
    /// Planar distance under which two points are the same node.
    /// Default: 1e-9
    pub coordinate_tolerance: f64,
    /// Bounds of the spatial index root. Paths outside still work, they are
    /// just not subdivided.
    pub index_bounds: Rect<f64>,
    /// Attach point topologies sitting on a new node to every path meeting there
    pub attach_point_topologies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fraction_tolerance: 1e-9,
            coordinate_tolerance: 1e-9,
            index_bounds: Rect::new(
                Coord {
                    x: -1.0e7,
                    y: -1.0e7,
                },
                Coord { x: 1.0e7, y: 1.0e7 },
            ),
            attach_point_topologies: true,
        }
    }
}

/// Summary statistics of the network
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkInfo {
    /// Number of live paths
    pub path_count: usize,
    pub deleted_path_count: usize,
    /// Number of live topologies
    pub topology_count: usize,
    pub aggregation_count: usize,
    /// Sum of live path lengths
    pub total_length: f64,
}

/// Two live paths meeting away from a shared endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditCrossing {
    pub first: PathId,
    pub second: PathId,
    pub point: Coord<f64>,
}

/// Two live paths sharing a stretch of line between `start` and `end`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditOverlap {
    pub first: PathId,
    pub second: PathId,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
}

/// Result of a consistency check over the whole network
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditReport {
    /// Crossings left unsplit, each pair reported once
    pub crossings: Vec<AuditCrossing>,
    /// Collinear overlaps, never split, each pair reported once
    pub overlaps: Vec<AuditOverlap>,
    /// Aggregations with a fraction outside [0, 1]
    pub invalid_fractions: Vec<AggregationId>,
    /// Topologies whose order indices are not `0..n`
    pub broken_orders: Vec<TopologyId>,
}

impl AuditReport {
    /// No defect found
    pub fn is_clean(&self) -> bool {
        self.crossings.is_empty()
            && self.overlaps.is_empty()
            && self.invalid_fractions.is_empty()
            && self.broken_orders.is_empty()
    }
}

/// What one run of the split pipeline did
#[derive(Debug, Default)]
struct PipelineOutcome {
    crossings: usize,
    /// Paths that were actually cut
    split_paths: usize,
    touched: BTreeSet<TopologyId>,
}

/// A path network with topologies anchored on it
///
/// Each [`create_path`](Self::create_path), [`update_path`](Self::update_path)
/// and [`create_topology`](Self::create_topology) stages on a full clone of the
/// store, so a single mutation costs time and memory proportional to the whole
/// network and loading `n` paths one by one is quadratic.
#[derive(Debug, Clone)]
pub struct PathNetwork {
    store: NetworkStore,
    config: Config,
    geometry_cache: GeometryCache,
}

impl Default for PathNetwork {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PathNetwork {
    /// Create an empty network with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            store: NetworkStore::new(config.index_bounds),
            config,
            geometry_cache: GeometryCache::default(),
        }
    }

    // ---- Paths ----

    /// Insert a path, splitting it and every live path it crosses
    ///
    /// Returns the stored path as it stands once split: the segment from its
    /// first vertex to the first crossing.
    ///
    /// # Errors
    /// [`NetworkError::InvalidGeometry`] for a
    /// self-crossing geometry; any pipeline error aborts the whole operation.
    pub fn create_path(&mut self, geometry: Polyline, attributes: PathAttributes) -> Result<Path> {
        // Profile the full create pipeline (detection + splits + reprojection)
        #[cfg(feature = "profiling")]
        profiling::scope!("network::create_path");

        validate_candidate(&geometry, self.config.coordinate_tolerance)?;

        let mut staged = self.store.clone();
        let id = staged.insert_path(geometry, attributes);
        let outcome = run_pipeline(&self.config, &mut staged, id)?;

        self.commit(staged, &outcome.touched);
        info!(
            path = %id,
            crossings = outcome.crossings,
            split_paths = outcome.split_paths,
            topologies = outcome.touched.len(),
            "path created"
        );
        Ok(self.store.live_path(id)?.clone())
    }

    /// Replace a path's geometry and re-split against the network
    ///
    /// Aggregations keep their fractions, re-interpreted along the new geometry.
    /// Earlier splits are never merged back.
    pub fn update_path(&mut self, id: PathId, geometry: Polyline) -> Result<Path> {
        // Profile the full update pipeline
        #[cfg(feature = "profiling")]
        profiling::scope!("network::update_path");

        self.store.live_path(id)?;
        validate_candidate(&geometry, self.config.coordinate_tolerance)?;

        let mut staged = self.store.clone();
        let mut touched = staged.topologies_on(id);
        staged.set_path_geometry(id, geometry)?;
        let outcome = run_pipeline(&self.config, &mut staged, id)?;
        touched.extend(outcome.touched);

        self.commit(staged, &touched);
        info!(
            path = %id,
            crossings = outcome.crossings,
            split_paths = outcome.split_paths,
            topologies = touched.len(),
            "path updated"
        );
        Ok(self.store.live_path(id)?.clone())
    }

    /// Soft-delete a path; it stops splitting and being split
    pub fn delete_path(&mut self, id: PathId) -> Result<()> {
        let touched = self.store.topologies_on(id);
        self.store.soft_delete_path(id)?;
        for topology in &touched {
            self.geometry_cache.invalidate(*topology);
        }
        info!(path = %id, topologies = touched.len(), "path deleted");
        Ok(())
    }

    /// Lookup a path by id, deleted ones included
    #[inline]
    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.store.path(id)
    }

    /// Every live path, in id order
    pub fn live_paths(&self) -> impl Iterator<Item = &Path> {
        self.store.live_paths()
    }

    /// Live paths carrying `name`, in id order
    pub fn paths_named(&self, name: &str) -> Vec<&Path> {
        self.store
            .live_paths()
            .filter(|p| p.name() == Some(name))
            .collect()
    }

    /// Aggregations currently referencing a path
    pub fn path_aggregations(&self, id: PathId) -> Result<Vec<Aggregation>> {
        self.store
            .path(id)
            .ok_or(NetworkError::PathNotFound(id))?;
        Ok(self.store.aggregations_on(id))
    }

    // ---- Topologies ----

    /// Create a topology with initial `(path, start, end)` attachments
    ///
    /// Either every attachment is valid and the topology is created, or nothing
    /// is.
    pub fn create_topology(&mut self, attachments: &[(PathId, f64, f64)]) -> Result<Topology> {
        let mut staged = self.store.clone();
        let id = staged.create_topology();
        for &(path, start, end) in attachments {
            staged.attach(id, path, start, end)?;
        }

        self.commit(staged, &BTreeSet::from([id]));
        debug!(topology = %id, aggregations = attachments.len(), "topology created");
        self.store.live_topology(id).cloned()
    }

    /// Append a span to a topology
    pub fn add_path(&mut self, topology: TopologyId, path: PathId, start: f64, end: f64) -> Result<AggregationId> {
        let aggregation = self.store.attach(topology, path, start, end)?;
        self.geometry_cache.invalidate(topology);
        debug!(%topology, %path, start, end, "aggregation added");
        Ok(aggregation)
    }

    /// Soft-delete a topology, hard-deleting its aggregations
    pub fn delete_topology(&mut self, id: TopologyId) -> Result<()> {
        let removed = self.store.remove_topology(id)?;
        self.geometry_cache.forget(id);
        info!(topology = %id, aggregations = removed.len(), "topology deleted");
        Ok(())
    }

    /// Lookup a topology by id, deleted ones included
    #[inline]
    pub fn topology(&self, id: TopologyId) -> Option<&Topology> {
        self.store.topology(id)
    }

    /// Every live topology, in id order
    pub fn topologies(&self) -> impl Iterator<Item = &Topology> {
        self.store.topologies().filter(|t| !t.is_deleted())
    }

    /// Aggregations of a topology, in order-index order
    pub fn topology_aggregations(&self, id: TopologyId) -> Result<Vec<Aggregation>> {
        self.store.live_topology(id)?;
        Ok(self
            .store
            .topology_aggregations(id)?
            .into_iter()
            .copied()
            .collect())
    }

    /// Absolute geometry of a topology, memoized until a mutation touches it
    pub fn topology_geometry(&self, id: TopologyId) -> Result<Arc<ResolvedGeometry>> {
        self.store.live_topology(id)?;
        let aggregations = self.store.topology_aggregations(id)?;
        let tolerance = self.config.coordinate_tolerance;

        Ok(self.geometry_cache.get_or_resolve(id, || {
            resolve(aggregations, |path| self.store.path(path), tolerance)
        }))
    }

    /// Planar length of a topology's resolved geometry
    pub fn topology_length(&self, id: TopologyId) -> Result<f64> {
        Ok(self.topology_geometry(id)?.length())
    }

    /// Point when every aggregation is zero-length, line otherwise
    pub fn topology_kind(&self, id: TopologyId) -> Result<TopologyKind> {
        let aggregations = self.topology_aggregations(id)?;
        if !aggregations.is_empty() && aggregations.iter().all(Aggregation::is_point) {
            Ok(TopologyKind::Point)
        } else {
            Ok(TopologyKind::Line)
        }
    }

    /// Distinct live paths referenced by a topology, in order-index order
    pub fn topology_paths(&self, id: TopologyId) -> Result<Vec<&Path>> {
        self.store.live_topology(id)?;
        let mut seen = BTreeSet::new();
        Ok(self
            .store
            .topology_aggregations(id)?
            .into_iter()
            .filter(|a| seen.insert(a.path))
            .filter_map(|a| self.store.path(a.path))
            .filter(|p| !p.is_deleted())
            .collect())
    }

    /// Whether the topology's geometry is currently memoized
    pub fn is_geometry_cached(&self, id: TopologyId) -> bool {
        !self.geometry_cache.is_dirty(id)
    }

    // ---- Introspection ----

    /// Get summary statistics
    pub fn info(&self) -> NetworkInfo {
        let mut info = NetworkInfo {
            aggregation_count: self.store.aggregation_count(),
            topology_count: self.topologies().count(),
            ..NetworkInfo::default()
        };
        for path in self.store.paths() {
            if path.is_deleted() {
                info.deleted_path_count += 1;
            } else {
                info.path_count += 1;
                info.total_length += path.length();
            }
        }
        info
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the underlying store
    #[inline]
    pub fn repository(&self) -> &NetworkStore {
        &self.store
    }

    /// Check the network invariants
    ///
    /// Scans live paths in parallel for crossings that were not split and for
    /// collinear overlaps, then every topology for out-of-range fractions and non-contiguous order indices.
    pub fn audit(&self) -> AuditReport {
        // Profile the parallel consistency scan
        #[cfg(feature = "profiling")]
        profiling::scope!("network::audit");

        let tolerance = self.config.coordinate_tolerance;
        let paths: Vec<&Path> = self.store.live_paths().collect();

        let mut crossings: Vec<AuditCrossing> = paths
            .par_iter()
            .flat_map_iter(|path| {
                let id = path.id();
                find_crossings(path.geometry(), &self.store, Some(id), tolerance)
                    .into_iter()
                    .filter(move |c| c.path > id)
                    .map(move |c| AuditCrossing {
                        first: id,
                        second: c.path,
                        point: c.point,
                    })
            })
            .collect();
        crossings.sort_by(|a, b| (a.first, a.second).cmp(&(b.first, b.second)));

        let store = &self.store;
        let mut overlaps: Vec<AuditOverlap> = paths
            .par_iter()
            .flat_map_iter(move |&path| {
                let id = path.id();
                let area = expand(path.geometry().bounding_rect(), tolerance);
                store
                    .candidates(area)
                    .into_iter()
                    .filter(move |&other| other > id)
                    .filter_map(move |other| store.path(other).filter(|p| !p.is_deleted()))
                    .flat_map(move |other| {
                        overlaps_between(path.geometry(), other.geometry(), tolerance)
                            .into_iter()
                            .map(move |line| AuditOverlap {
                                first: id,
                                second: other.id(),
                                start: line.start,
                                end: line.end,
                            })
                    })
            })
            .collect();
        overlaps.sort_by(|a, b| (a.first, a.second).cmp(&(b.first, b.second)));

        let mut invalid_fractions = Vec::new();
        let mut broken_orders = Vec::new();
        for topology in self.topologies() {
            let Ok(aggregations) = self.store.topology_aggregations(topology.id()) else {
                broken_orders.push(topology.id());
                continue;
            };
            invalid_fractions.extend(
                aggregations
                    .iter()
                    .filter(|a| !(0.0..=1.0).contains(&a.start) || !(0.0..=1.0).contains(&a.end))
                    .map(|a| a.id),
            );
            if aggregations.iter().enumerate().any(|(i, a)| a.order != i) {
                broken_orders.push(topology.id());
            }
        }

        AuditReport {
            crossings,
            overlaps,
            invalid_fractions,
            broken_orders,
        }
    }

    /// Swap in a staged store and invalidate the touched topologies
    fn commit(&mut self, staged: NetworkStore, touched: &BTreeSet<TopologyId>) {
        self.store = staged;
        for topology in touched {
            self.geometry_cache.invalidate(*topology);
        }
    }
}

/// Split `id` and every live path it crosses, then attach point topologies
/// to the new nodes
fn run_pipeline(config: &Config, store: &mut NetworkStore, id: PathId) -> Result<PipelineOutcome> {
    let geometry = store.live_path(id)?.geometry().clone();
    let crossings = find_crossings(&geometry, &*store, Some(id), config.coordinate_tolerance);

    let mut outcome = PipelineOutcome {
        crossings: crossings.len(),
        ..PipelineOutcome::default()
    };
    if crossings.is_empty() {
        return Ok(outcome);
    }

    let mut existing: BTreeMap<PathId, SplitPoints> = BTreeMap::new();
    let mut own = SplitPoints::new();
    for crossing in &crossings {
        existing
            .entry(crossing.path)
            .or_default()
            .push(SplitPoint::snapped(crossing.fraction_on_path, crossing.point));
        own.push(SplitPoint::snapped(
            crossing.fraction_on_candidate,
            crossing.point,
        ));
    }

    for (path, points) in &existing {
        let split = apply_splits(store, *path, points, config.fraction_tolerance)?;
        if split.segments.len() > 1 {
            outcome.split_paths += 1;
        }
        outcome.touched.extend(split.touched);
    }

    let split = apply_splits(store, id, &own, config.fraction_tolerance)?;
    if split.segments.len() > 1 {
        outcome.split_paths += 1;
    }
    outcome.touched.extend(split.touched);

    if config.attach_point_topologies {
        let mut nodes: Vec<Coord<f64>> = Vec::with_capacity(crossings.len());
        for crossing in &crossings {
            let known = nodes.iter().any(|n| {
                (n.x - crossing.point.x).hypot(n.y - crossing.point.y) <= config.coordinate_tolerance
            });
            if !known {
                nodes.push(crossing.point);
            }
        }
        for node in nodes {
            outcome
                .touched
                .extend(attach_at_node(store, node, config)?);
        }
    }

    Ok(outcome)
}

/// Attach point topologies located at `node` to every live path ending there
///
/// Returns the topologies that gained an aggregation.
fn attach_at_node(store: &mut NetworkStore, node: Coord<f64>, config: &Config) -> Result<BTreeSet<TopologyId>> {
    let tolerance = config.coordinate_tolerance;
    let incident = store.paths_at(node, tolerance);
    if incident.len() < 2 {
        return Ok(BTreeSet::new());
    }

    let mut located: BTreeSet<TopologyId> = BTreeSet::new();
    for &path_id in &incident {
        let Some(path) = store.path(path_id) else {
            continue;
        };
        for aggregation in store.aggregations_on(path_id) {
            if aggregation.is_point() && sits_on_node(path, aggregation.start, node, config) {
                located.insert(aggregation.topology);
            }
        }
    }

    let mut attached = BTreeSet::new();
    for topology in located {
        let aggregations = store.topology_aggregations(topology)?;
        if !aggregations.iter().all(|a| a.is_point()) {
            continue; // Only point topologies follow nodes
        }
        let referenced: BTreeSet<PathId> = aggregations.iter().map(|a| a.path).collect();

        for &path_id in &incident {
            if referenced.contains(&path_id) {
                continue;
            }
            let Some(fraction) = store
                .path(path_id)
                .and_then(|p| p.endpoint_fraction_at(node, tolerance))
            else {
                continue;
            };
            store.attach(topology, path_id, fraction, fraction)?;
            attached.insert(topology);
            debug!(%topology, path = %path_id, fraction, "point topology attached to node");
        }
    }

    Ok(attached)
}

/// Whether a point aggregation at `fraction` on `path` is the path end at `node`
fn sits_on_node(path: &Path, fraction: f64, node: Coord<f64>, config: &Config) -> bool {
    let geometry = path.geometry();
    let at_start = fraction <= config.fraction_tolerance
        && geometry.first().is_some_and(|v| v.is_at(node, config.coordinate_tolerance));
    let at_end = fraction >= 1.0 - config.fraction_tolerance
        && geometry.last().is_some_and(|v| v.is_at(node, config.coordinate_tolerance));
    at_start || at_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn line(coords: &[(f64, f64)]) -> Polyline {
        Polyline::from_xy(coords).unwrap()
    }

    fn create_test_network() -> PathNetwork {
        PathNetwork::new(Config::default())
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.fraction_tolerance, 1e-9);
        assert_eq!(config.coordinate_tolerance, 1e-9);
        assert!(config.attach_point_topologies);
    }

    #[test]
    fn test_empty_network() {
        let network = create_test_network();
        assert_eq!(network.info(), NetworkInfo::default());
        assert!(network.audit().is_clean());
    }

    #[test]
    fn test_create_path_without_crossing() {
        let mut network = create_test_network();
        let path = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::named("AB"))
            .unwrap();

        assert_eq!(path.name(), Some("AB"));
        assert_eq!(path.length(), 4.0);
        let info = network.info();
        assert_eq!(info.path_count, 1);
        assert_eq!(info.total_length, 4.0);
    }

    #[test]
    fn test_self_crossing_is_rejected_without_side_effect() {
        let mut network = create_test_network();
        network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();

        let bowtie = line(&[(1.0, -1.0), (3.0, 1.0), (3.0, -1.0), (1.0, 1.0)]);
        let result = network.create_path(bowtie, PathAttributes::default());
        assert!(matches!(result, Err(NetworkError::InvalidGeometry(_))));
        assert_eq!(network.info().path_count, 1);
        assert_eq!(network.live_paths().next().unwrap().length(), 4.0);
    }

    #[test]
    fn test_failed_topology_creation_is_rolled_back() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();

        let result = network.create_topology(&[(ab.id(), 0.0, 0.5), (ab.id(), 0.5, 2.0)]);
        assert!(matches!(result, Err(NetworkError::InvalidFraction { .. })));
        assert_eq!(network.info().topology_count, 0);
        assert_eq!(network.info().aggregation_count, 0);
    }

    #[test]
    fn test_update_unknown_or_deleted_path() {
        let mut network = create_test_network();
        assert!(matches!(
            network.update_path(PathId(5), line(&[(0.0, 0.0), (1.0, 0.0)])),
            Err(NetworkError::PathNotFound(_))
        ));

        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        network.delete_path(ab.id()).unwrap();
        assert!(matches!(
            network.update_path(ab.id(), line(&[(0.0, 0.0), (1.0, 0.0)])),
            Err(NetworkError::PathDeleted(_))
        ));
    }

    #[test]
    fn test_geometry_cache_invalidation() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        let topology = network.create_topology(&[(ab.id(), 0.25, 0.75)]).unwrap();
        assert!(!network.is_geometry_cached(topology.id()));

        let first = network.topology_geometry(topology.id()).unwrap();
        assert!(network.is_geometry_cached(topology.id()));
        let again = network.topology_geometry(topology.id()).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        network
            .create_path(line(&[(2.0, 0.0), (2.0, 2.0)]), PathAttributes::default())
            .unwrap();
        assert!(!network.is_geometry_cached(topology.id()));

        // Same ground extent after the split
        let after = network.topology_geometry(topology.id()).unwrap();
        assert_eq!(after.first(), Some(Vertex::new(1.0, 0.0, 0.0)));
        assert_eq!(after.last(), Some(Vertex::new(3.0, 0.0, 0.0)));
        assert!(approx(network.topology_length(topology.id()).unwrap(), 2.0));
    }

    #[test]
    fn test_topology_kind() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        let point = network.create_topology(&[(ab.id(), 0.5, 0.5)]).unwrap();
        let stretch = network.create_topology(&[(ab.id(), 0.0, 0.5)]).unwrap();

        assert_eq!(network.topology_kind(point.id()).unwrap(), TopologyKind::Point);
        assert_eq!(network.topology_kind(stretch.id()).unwrap(), TopologyKind::Line);
    }

    #[test]
    fn test_add_path_and_topology_paths() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::named("AB"))
            .unwrap();
        let bc = network
            .create_path(line(&[(4.0, 0.0), (4.0, 4.0)]), PathAttributes::named("BC"))
            .unwrap();
        let topology = network.create_topology(&[(ab.id(), 0.5, 1.0)]).unwrap();
        network.add_path(topology.id(), bc.id(), 0.0, 0.5).unwrap();
        network.add_path(topology.id(), ab.id(), 1.0, 1.0).unwrap();

        let names: Vec<_> = network
            .topology_paths(topology.id())
            .unwrap()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec![Some("AB"), Some("BC")]);
        assert!(approx(network.topology_length(topology.id()).unwrap(), 4.0));
    }

    #[test]
    fn test_delete_topology() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        let topology = network.create_topology(&[(ab.id(), 0.0, 1.0)]).unwrap();
        network.delete_topology(topology.id()).unwrap();

        assert!(network.path_aggregations(ab.id()).unwrap().is_empty());
        assert!(matches!(
            network.topology_geometry(topology.id()),
            Err(NetworkError::TopologyDeleted(_))
        ));
        assert_eq!(network.topologies().count(), 0);
    }

    #[test]
    fn test_deleted_path_drops_out_of_resolution() {
        let mut network = create_test_network();
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        let topology = network.create_topology(&[(ab.id(), 0.0, 1.0)]).unwrap();
        network.topology_geometry(topology.id()).unwrap();

        network.delete_path(ab.id()).unwrap();
        assert!(network.topology_geometry(topology.id()).unwrap().is_empty());
        assert!(network.topology_paths(topology.id()).unwrap().is_empty());
        assert_eq!(network.info().deleted_path_count, 1);
    }

    #[test]
    fn test_paths_named() {
        let mut network = create_test_network();
        network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::named("AB"))
            .unwrap();
        network
            .create_path(line(&[(2.0, -2.0), (2.0, 2.0)]), PathAttributes::named("CD"))
            .unwrap();
        assert_eq!(network.paths_named("AB").len(), 2);
        assert_eq!(network.paths_named("CD").len(), 2);
        assert!(network.paths_named("EF").is_empty());
    }

    #[test]
    fn test_disabled_node_attachment() {
        let config = Config {
            attach_point_topologies: false,
            ..Config::default()
        };
        let mut network = PathNetwork::new(config);
        let ab = network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        let topology = network.create_topology(&[(ab.id(), 0.5, 0.5)]).unwrap();
        network
            .create_path(line(&[(2.0, 0.0), (2.0, 2.0)]), PathAttributes::default())
            .unwrap();

        let aggregations = network.topology_aggregations(topology.id()).unwrap();
        assert_eq!(aggregations.len(), 1);
        assert_eq!(aggregations[0].path, ab.id());
        assert_eq!((aggregations[0].start, aggregations[0].end), (1.0, 1.0));
    }

    #[test]
    fn test_grid_loaded_path_by_path() {
        let mut network = create_test_network();
        for row in 0..10 {
            let y = f64::from(row);
            network
                .create_path(line(&[(0.0, y), (10.0, y)]), PathAttributes::default())
                .unwrap();
        }
        let column = network
            .create_path(line(&[(5.0, -1.0), (5.0, 10.0)]), PathAttributes::default())
            .unwrap();

        // Every row is cut in two, the column into eleven pieces
        assert_eq!(network.info().path_count, 31);
        assert!(approx(network.path(column.id()).unwrap().length(), 1.0));
        assert!(network.audit().is_clean());
    }

    #[test]
    fn test_audit_after_splits_is_clean() {
        let mut network = create_test_network();
        network
            .create_path(line(&[(0.0, 0.0), (4.0, 0.0)]), PathAttributes::default())
            .unwrap();
        network
            .create_path(line(&[(2.0, -2.0), (2.0, 2.0)]), PathAttributes::default())
            .unwrap();
        network
            .create_path(line(&[(0.0, 1.0), (4.0, 1.0)]), PathAttributes::default())
            .unwrap();

        assert_eq!(network.info().path_count, 7);
        let report = network.audit();
        assert!(report.is_clean(), "unexpected defects: {report:?}");
    }
}
