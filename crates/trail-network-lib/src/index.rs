//! Quadtree spatial index over path bounding boxes
//!
//! Each path is stored once, at the deepest node whose bounds fully contain the
//! path's bounding box. Paths that straddle a node's center, or fall outside the
//! root bounds entirely, stay at the shallowest node that can hold them (the root
//! for out-of-bounds paths). Queries cull whole subtrees whose bounds do not touch
//! the query rectangle.

use crate::PathId;
use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum depth of the quadtree to prevent infinite recursion
const MAX_DEPTH: u32 = 16;

/// An indexed path: its id and the bounding box it was inserted with
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Entry {
    path: PathId,
    bounding_box: Rect<f64>,
}

/// Root container for the spatial index
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathIndex {
    root: IndexNode,
    len: usize,
}

/// A single node of the quadtree
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct IndexNode {
    /// Bounds covered by this node
    bounding_box: Rect<f64>,
    /// Depth level in the tree (0 = root)
    level: u32,
    /// Entries stored at this level
    entries: Vec<Entry>,
    /// Child nodes (NW, NE, SW, SE) if subdivided
    children: Option<Box<[IndexNode; 4]>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PathIndex {
    /// Create an empty index covering `bounds`
    pub fn new(bounds: Rect<f64>) -> Self {
        Self {
            root: IndexNode::new(bounds, 0),
            len: 0,
        }
    }

    /// Number of indexed paths
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index `path` under `bounding_box`
    pub fn insert(&mut self, path: PathId, bounding_box: Rect<f64>) {
        self.root.insert(Entry { path, bounding_box });
        self.len += 1;
    }

    /// Remove `path`, which must have been inserted with the same `bounding_box`
    ///
    /// Returns whether the entry was found.
    pub fn remove(&mut self, path: PathId, bounding_box: Rect<f64>) -> bool {
        let removed = self.root.remove(path, bounding_box);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Ids of every path whose bounding box touches `area`, sorted ascending
    pub fn query(&self, area: Rect<f64>) -> Vec<PathId> {
        let mut results = Vec::new();
        self.root.query(area, &mut results);
        results.sort_unstable();
        results
    }

    /// Ids of every path whose bounding box lies within `tolerance` of `coord`
    pub fn query_point(&self, coord: Coord<f64>, tolerance: f64) -> Vec<PathId> {
        self.query(expand(Rect::new(coord, coord), tolerance))
    }
}

impl IndexNode {
    fn new(bounding_box: Rect<f64>, level: u32) -> Self {
        Self {
            bounding_box,
            level,
            entries: Vec::new(),
            children: None,
        }
    }

    /// Subdivide this node into 4 children
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;
        let level = self.level + 1;

        let nw = IndexNode::new(
            Rect::new(Coord { x: min.x, y: mid_y }, Coord { x: mid_x, y: max.y }),
            level,
        );
        let ne = IndexNode::new(
            Rect::new(Coord { x: mid_x, y: mid_y }, Coord { x: max.x, y: max.y }),
            level,
        );
        let sw = IndexNode::new(
            Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid_x, y: mid_y }),
            level,
        );
        let se = IndexNode::new(
            Rect::new(Coord { x: mid_x, y: min.y }, Coord { x: max.x, y: mid_y }),
            level,
        );

        self.children = Some(Box::new([nw, ne, sw, se]));
    }

    /// Index of the child quadrant fully containing `rect`, if any
    fn child_for(&self, rect: Rect<f64>) -> Option<usize> {
        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;

        if !contains(self.bounding_box, rect) {
            return None;
        }

        let west = rect.max().x < mid_x;
        let east = rect.min().x >= mid_x;
        let north = rect.min().y >= mid_y;
        let south = rect.max().y < mid_y;

        match (west, east, north, south) {
            (true, _, true, _) => Some(0),
            (_, true, true, _) => Some(1),
            (true, _, _, true) => Some(2),
            (_, true, _, true) => Some(3),
            _ => None,
        }
    }

    fn insert(&mut self, entry: Entry) {
        let target = if self.level < MAX_DEPTH {
            self.child_for(entry.bounding_box)
        } else {
            None
        };

        match target {
            Some(quadrant) => {
                self.subdivide();
                if let Some(children) = &mut self.children {
                    children[quadrant].insert(entry);
                }
            }
            None => self.entries.push(entry),
        }
    }

    fn remove(&mut self, path: PathId, bounding_box: Rect<f64>) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.path == path) {
            self.entries.swap_remove(pos);
            return true;
        }

        let quadrant = if self.level < MAX_DEPTH {
            self.child_for(bounding_box)
        } else {
            None
        };

        match (quadrant, &mut self.children) {
            (Some(q), Some(children)) => children[q].remove(path, bounding_box),
            _ => false,
        }
    }

    fn query(&self, area: Rect<f64>, results: &mut Vec<PathId>) {
        // The root keeps out-of-bounds entries, so it is always visited
        if self.level > 0 && !intersects(self.bounding_box, area) {
            return;
        }

        results.extend(
            self.entries
                .iter()
                .filter(|e| intersects(e.bounding_box, area))
                .map(|e| e.path),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(area, results);
            }
        }
    }
}

/// Grow `rect` by `margin` on every side
pub(crate) fn expand(rect: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - margin,
            y: rect.min().y - margin,
        },
        Coord {
            x: rect.max().x + margin,
            y: rect.max().y + margin,
        },
    )
}

/// Closed-interval rectangle overlap (touching counts)
#[inline]
pub(crate) fn intersects(a: Rect<f64>, b: Rect<f64>) -> bool {
    !(a.max().x < b.min().x || a.min().x > b.max().x || a.max().y < b.min().y || a.min().y > b.max().y)
}

#[inline]
fn contains(outer: Rect<f64>, inner: Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.min().y >= outer.min().y
        && inner.max().x <= outer.max().x
        && inner.max().y <= outer.max().y
}
