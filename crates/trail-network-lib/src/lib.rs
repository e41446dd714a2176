//! Trail Network Library - Path Splitting and Topology Reprojection
//!
//! This library maintains a network of trail/road polylines ("paths") together with a
//! linear-referencing layer ("topologies") that anchors entities to fractions of those
//! paths. Whenever a path is created or reshaped, every crossing with another live path
//! splits both paths at the crossing, and every topology that referenced a split path is
//! rewritten so that it still describes the same place on the ground.
//!
//! # Architecture
//!
//! - **[`Polyline`] / [`linear`]**: Geometry with altitude and fraction-based operations
//! - **[`Path`]**: A network edge with cached length and elevation statistics
//! - **[`PathIndex`]**: Quadtree over path bounding boxes (broad phase)
//! - **[`find_crossings`]**: Pairwise crossing detection against live paths
//! - **[`plan_segments`]**: Cuts a path into an identity segment and clones
//! - **[`reproject`]**: Rewrites aggregations onto the segments of a split path
//! - **[`PathNetwork`]**: High-level, transactional API tying everything together
//!
//! # Guarantees
//!
//! - Every create/update is atomic: it either commits all splits and rewrites, or nothing
//! - Live paths only meet at shared endpoints once an operation has completed
//! - A topology's resolved geometry keeps its first and last coordinates across splits

mod crossing;
mod geometry;
mod index;
pub mod linear;
mod network;
mod path;
mod reproject;
mod splitter;
mod store;
mod topology;


// Public API exports
pub use crossing::{Crossing, find_crossings, validate_candidate};
pub use geometry::{ElevationStats, Polyline, Vertex};
pub use index::PathIndex;
pub use network::{AuditCrossing, AuditOverlap, AuditReport, Config, NetworkInfo, PathNetwork};
pub use path::{Path, PathAttributes, PathId};
pub use reproject::{Piece, SegmentSpan, reproject};
pub use splitter::{SegmentPlan, SplitPoint, plan_segments};
pub use store::{NetworkStore, PathRepository};
pub use topology::{
    Aggregation, AggregationId, ResolvedGeometry, Topology, TopologyId, TopologyKind, resolve,
};

/// Error types for the path network
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid fraction {value}: must be a finite number in [0, 1]")]
    InvalidFraction { value: f64 },

    #[error("Path not found: {0}")]
    PathNotFound(PathId),

    #[error("Path is deleted: {0}")]
    PathDeleted(PathId),

    #[error("Topology not found: {0}")]
    TopologyNotFound(TopologyId),

    #[error("Topology is deleted: {0}")]
    TopologyDeleted(TopologyId),

    #[error("Aggregation not found: {0}")]
    AggregationNotFound(AggregationId),

    #[error("Reprojection failed: {reason}")]
    Reprojection { reason: String },
}

pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(Config) -> PathNetwork = PathNetwork::new;
        let _: fn() -> Config = Config::default;
    }

    #[test]
    fn test_error_messages() {
        let err = NetworkError::PathNotFound(PathId(7));
        assert_eq!(err.to_string(), "Path not found: path#7");

        let err = NetworkError::InvalidFraction { value: 1.5 };
        assert!(err.to_string().contains("1.5"));
    }
}
