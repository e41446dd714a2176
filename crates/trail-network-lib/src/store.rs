//! In-memory record store for paths, topologies and aggregations
//!
//! The store owns every record and keeps two derived structures up to date: the
//! quadtree of live path bounding boxes and the path → aggregations reverse
//! index. It is `Clone` so that the network can stage a mutation on a copy and
//! swap it in only once the whole pipeline succeeded.

use crate::index::intersects;
use crate::reproject::Piece;
use crate::{
    Aggregation, AggregationId, NetworkError, Path, PathAttributes, PathId, PathIndex, Polyline,
    Result, Topology, TopologyId,
};
use geo::{Coord, Rect};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Read access to the path registry
///
/// The crossing detector only needs this trait, so tests can run it against an
/// isolated set of paths.
pub trait PathRepository {
    /// Lookup by id, deleted paths included
    fn path(&self, id: PathId) -> Option<&Path>;

    /// Every non-deleted path
    fn live_paths(&self) -> impl Iterator<Item = &Path>;

    /// Ids of live paths whose bounding box touches `area`
    fn candidates(&self, area: Rect<f64>) -> Vec<PathId> {
        self.live_paths()
            .filter(|p| intersects(p.bounding_box(), area))
            .map(Path::id)
            .collect()
    }
}

impl PathRepository for Vec<Path> {
    fn path(&self, id: PathId) -> Option<&Path> {
        self.iter().find(|p| p.id() == id)
    }

    fn live_paths(&self) -> impl Iterator<Item = &Path> {
        self.iter().filter(|p| !p.is_deleted())
    }
}

/// Owner of every path, topology and aggregation record
#[derive(Clone, Debug)]
pub struct NetworkStore {
    paths: BTreeMap<PathId, Path>,
    topologies: BTreeMap<TopologyId, Topology>,
    aggregations: BTreeMap<AggregationId, Aggregation>,
    /// Reverse index: aggregations referencing each path
    by_path: HashMap<PathId, BTreeSet<AggregationId>>,
    /// Bounding boxes of live paths
    index: PathIndex,
    next_path: u64,
    next_topology: u64,
    next_aggregation: u64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl NetworkStore {
    /// Create an empty store whose spatial index covers `bounds`
    pub fn new(bounds: Rect<f64>) -> Self {
        Self {
            paths: BTreeMap::new(),
            topologies: BTreeMap::new(),
            aggregations: BTreeMap::new(),
            by_path: HashMap::new(),
            index: PathIndex::new(bounds),
            next_path: 1,
            next_topology: 1,
            next_aggregation: 1,
        }
    }

    // ---- Paths ----

    /// Store a new live path and index it
    pub fn insert_path(&mut self, geometry: Polyline, attributes: PathAttributes) -> PathId {
        let id = PathId(self.next_path);
        self.next_path += 1;

        let path = Path::new(id, geometry, attributes);
        self.index.insert(id, path.bounding_box());
        self.paths.insert(id, path);
        id
    }

    /// Store a copy of `source`'s attributes under a new id and geometry
    pub fn insert_clone(&mut self, source: PathId, geometry: Polyline) -> Result<PathId> {
        let id = PathId(self.next_path);
        let clone = self
            .paths
            .get(&source)
            .ok_or(NetworkError::PathNotFound(source))?
            .clone_with(id, geometry);
        self.next_path += 1;

        if !clone.is_deleted() {
            self.index.insert(id, clone.bounding_box());
        }
        self.paths.insert(id, clone);
        Ok(id)
    }

    /// Replace a path's geometry, refreshing its derived values and index entry
    pub fn set_path_geometry(&mut self, id: PathId, geometry: Polyline) -> Result<()> {
        let path = self
            .paths
            .get_mut(&id)
            .ok_or(NetworkError::PathNotFound(id))?;

        if !path.is_deleted() {
            self.index.remove(id, path.bounding_box());
        }
        path.set_geometry(geometry);
        if !path.is_deleted() {
            self.index.insert(id, path.bounding_box());
        }
        Ok(())
    }

    /// Flag a path as deleted and drop it from the spatial index
    ///
    /// Aggregations referencing it are kept; resolution skips deleted paths.
    pub fn soft_delete_path(&mut self, id: PathId) -> Result<()> {
        let path = self
            .paths
            .get_mut(&id)
            .ok_or(NetworkError::PathNotFound(id))?;
        if path.is_deleted() {
            return Err(NetworkError::PathDeleted(id));
        }

        self.index.remove(id, path.bounding_box());
        path.mark_deleted();
        Ok(())
    }

    /// Lookup a path, failing on missing or deleted ones
    pub fn live_path(&self, id: PathId) -> Result<&Path> {
        match self.paths.get(&id) {
            None => Err(NetworkError::PathNotFound(id)),
            Some(path) if path.is_deleted() => Err(NetworkError::PathDeleted(id)),
            Some(path) => Ok(path),
        }
    }

    /// Live paths with an endpoint at `coord`, in id order
    pub fn paths_at(&self, coord: Coord<f64>, tolerance: f64) -> Vec<PathId> {
        self.index
            .query_point(coord, tolerance)
            .into_iter()
            .filter(|id| {
                self.paths
                    .get(id)
                    .is_some_and(|p| !p.is_deleted() && p.endpoint_fraction_at(coord, tolerance).is_some())
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every path, deleted ones included, in id order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    // ---- Topologies ----

    /// Create an empty topology
    pub fn create_topology(&mut self) -> TopologyId {
        let id = TopologyId(self.next_topology);
        self.next_topology += 1;
        self.topologies.insert(id, Topology::new(id));
        id
    }

    pub fn topology(&self, id: TopologyId) -> Option<&Topology> {
        self.topologies.get(&id)
    }

    /// Lookup a topology, failing on missing or deleted ones
    pub fn live_topology(&self, id: TopologyId) -> Result<&Topology> {
        match self.topologies.get(&id) {
            None => Err(NetworkError::TopologyNotFound(id)),
            Some(topology) if topology.is_deleted() => Err(NetworkError::TopologyDeleted(id)),
            Some(topology) => Ok(topology),
        }
    }

    /// Every topology, deleted ones included, in id order
    pub fn topologies(&self) -> impl Iterator<Item = &Topology> {
        self.topologies.values()
    }

    /// Soft-delete a topology and hard-delete its aggregations
    ///
    /// Returns the removed aggregation ids.
    pub fn remove_topology(&mut self, id: TopologyId) -> Result<Vec<AggregationId>> {
        let topology = self
            .topologies
            .get_mut(&id)
            .ok_or(NetworkError::TopologyNotFound(id))?;
        if topology.is_deleted() {
            return Err(NetworkError::TopologyDeleted(id));
        }

        topology.mark_deleted();
        let removed = topology.take_aggregations();
        for aggregation_id in &removed {
            if let Some(aggregation) = self.aggregations.remove(aggregation_id) {
                self.unlink(aggregation.path, *aggregation_id);
            }
        }
        Ok(removed)
    }

    // ---- Aggregations ----

    /// Append a `(path, start, end)` span to a topology
    ///
    /// # Errors
    /// Fails on fractions outside [0, 1], on a missing or deleted topology, and
    /// on a missing or deleted path.
    pub fn attach(
        &mut self,
        topology: TopologyId,
        path: PathId,
        start: f64,
        end: f64,
    ) -> Result<AggregationId> {
        check_fraction(start)?;
        check_fraction(end)?;
        self.live_path(path)?;
        self.live_topology(topology)?;

        let id = self.allocate_aggregation();
        let Some(owner) = self.topologies.get_mut(&topology) else {
            return Err(NetworkError::TopologyNotFound(topology));
        };
        let order = owner.len();
        owner.push(id);

        self.aggregations.insert(
            id,
            Aggregation {
                id,
                topology,
                path,
                start,
                end,
                order,
            },
        );
        self.link(path, id);
        Ok(id)
    }

    pub fn aggregation(&self, id: AggregationId) -> Option<&Aggregation> {
        self.aggregations.get(&id)
    }

    /// Aggregations referencing `path`, in id order
    pub fn aggregations_on(&self, path: PathId) -> Vec<Aggregation> {
        self.by_path
            .get(&path)
            .into_iter()
            .flatten()
            .filter_map(|id| self.aggregations.get(id).copied())
            .collect()
    }

    /// Aggregations of a topology, in order-index order
    pub fn topology_aggregations(&self, topology: TopologyId) -> Result<Vec<&Aggregation>> {
        let topology = self
            .topologies
            .get(&topology)
            .ok_or(NetworkError::TopologyNotFound(topology))?;
        topology
            .aggregation_ids()
            .iter()
            .map(|id| {
                self.aggregations
                    .get(id)
                    .ok_or(NetworkError::AggregationNotFound(*id))
            })
            .collect()
    }

    /// Topologies owning at least one aggregation on `path`
    pub fn topologies_on(&self, path: PathId) -> BTreeSet<TopologyId> {
        self.aggregations_on(path)
            .into_iter()
            .map(|a| a.topology)
            .collect()
    }

    pub fn aggregation_count(&self) -> usize {
        self.aggregations.len()
    }

    /// Rewrite one aggregation into `pieces`
    ///
    /// The first piece reuses the aggregation's row; the others get new rows
    /// inserted right after it, and the owning topology's order indices are
    /// renumbered. No pieces drops the aggregation. Returns the ids now standing
    /// for the old aggregation.
    pub(crate) fn replace_aggregation(
        &mut self,
        id: AggregationId,
        pieces: &[Piece],
    ) -> Result<Vec<AggregationId>> {
        let current = *self
            .aggregations
            .get(&id)
            .ok_or(NetworkError::AggregationNotFound(id))?;

        let Some((first, rest)) = pieces.split_first() else {
            self.drop_aggregation(id)?;
            return Ok(Vec::new());
        };

        self.unlink(current.path, id);
        self.link(first.path, id);
        self.aggregations.insert(
            id,
            Aggregation {
                path: first.path,
                start: first.start,
                end: first.end,
                ..current
            },
        );

        let mut ids = Vec::with_capacity(pieces.len());
        ids.push(id);
        for _ in rest {
            ids.push(self.allocate_aggregation());
        }

        let topology = self
            .topologies
            .get_mut(&current.topology)
            .ok_or(NetworkError::TopologyNotFound(current.topology))?;
        let position = topology
            .position_of(id)
            .ok_or(NetworkError::AggregationNotFound(id))?;

        for (offset, (piece, &new_id)) in rest.iter().zip(&ids[1..]).enumerate() {
            topology.insert(position + 1 + offset, new_id);
            self.aggregations.insert(
                new_id,
                Aggregation {
                    id: new_id,
                    topology: current.topology,
                    path: piece.path,
                    start: piece.start,
                    end: piece.end,
                    order: 0,
                },
            );
            self.by_path.entry(piece.path).or_default().insert(new_id);
        }

        self.renumber(current.topology);
        Ok(ids)
    }

    fn drop_aggregation(&mut self, id: AggregationId) -> Result<()> {
        let aggregation = self
            .aggregations
            .remove(&id)
            .ok_or(NetworkError::AggregationNotFound(id))?;
        self.unlink(aggregation.path, id);
        if let Some(topology) = self.topologies.get_mut(&aggregation.topology) {
            topology.remove(id);
        }
        self.renumber(aggregation.topology);
        Ok(())
    }

    /// Make a topology's order indices the contiguous range `0..n`
    fn renumber(&mut self, topology: TopologyId) {
        let Some(topology) = self.topologies.get(&topology) else {
            return;
        };
        for (order, id) in topology.aggregation_ids().iter().enumerate() {
            if let Some(aggregation) = self.aggregations.get_mut(id) {
                aggregation.order = order;
            }
        }
    }

    fn allocate_aggregation(&mut self) -> AggregationId {
        let id = AggregationId(self.next_aggregation);
        self.next_aggregation += 1;
        id
    }

    fn link(&mut self, path: PathId, aggregation: AggregationId) {
        self.by_path.entry(path).or_default().insert(aggregation);
    }

    fn unlink(&mut self, path: PathId, aggregation: AggregationId) {
        if let Some(set) = self.by_path.get_mut(&path) {
            set.remove(&aggregation);
            if set.is_empty() {
                self.by_path.remove(&path);
            }
        }
    }
}

impl PathRepository for NetworkStore {
    fn path(&self, id: PathId) -> Option<&Path> {
        self.paths.get(&id)
    }

    fn live_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().filter(|p| !p.is_deleted())
    }

    fn candidates(&self, area: Rect<f64>) -> Vec<PathId> {
        self.index
            .query(area)
            .into_iter()
            .filter(|id| self.paths.get(id).is_some_and(|p| !p.is_deleted()))
            .collect()
    }
}

/// Reject fractions that are not finite numbers in [0, 1]
pub(crate) fn check_fraction(value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NetworkError::InvalidFraction { value })
    }
}
