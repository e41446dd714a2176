//! Path records
//!
//! A `Path` is one edge of the network: a polyline with cached derived values
//! (length, elevation statistics) and free-form descriptive attributes that are
//! carried over to the clones created when the path is split.

use crate::{ElevationStats, Polyline};
use geo::{Coord, Rect};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identifier of a path
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path#{}", self.0)
    }
}

/// Non-geometric attributes, copied verbatim onto split clones
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathAttributes {
    pub name: Option<String>,
    /// Arbitrary key/value properties (surface, usage, comments, ...)
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: BTreeMap<String, String>,
}

impl PathAttributes {
    /// Attributes with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property insertion
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A network edge with cached derived values
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Path {
    id: PathId,
    geometry: Polyline,
    attributes: PathAttributes,
    /// Soft-delete flag; deleted paths never split nor get split
    deleted: bool,
    /// Cached planar length (recomputed on every geometry change)
    cached_length: f64,
    /// Cached elevation statistics (recomputed on every geometry change)
    cached_elevation: ElevationStats,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Path {
    /// Create a new live path
    pub fn new(id: PathId, geometry: Polyline, attributes: PathAttributes) -> Self {
        let cached_length = geometry.length();
        let cached_elevation = geometry.elevation();
        Self {
            id,
            geometry,
            attributes,
            deleted: false,
            cached_length,
            cached_elevation,
        }
    }

    /// Copy every non-geometric attribute under a new identity and geometry
    pub fn clone_with(&self, id: PathId, geometry: Polyline) -> Self {
        let mut clone = Self::new(id, geometry, self.attributes.clone());
        clone.deleted = self.deleted;
        clone
    }

    #[inline]
    pub fn id(&self) -> PathId {
        self.id
    }

    #[inline]
    pub fn geometry(&self) -> &Polyline {
        &self.geometry
    }

    #[inline]
    pub fn attributes(&self) -> &PathAttributes {
        &self.attributes
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.attributes.name.as_deref()
    }

    /// Planar length; O(1), cached on geometry change
    #[inline]
    pub fn length(&self) -> f64 {
        self.cached_length
    }

    /// Elevation statistics; O(1), cached on geometry change
    #[inline]
    pub fn elevation(&self) -> ElevationStats {
        self.cached_elevation
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.geometry.bounding_rect()
    }

    /// Fraction (0 or 1) of the endpoint located at `coord`, start checked first
    pub fn endpoint_fraction_at(&self, coord: Coord<f64>, tolerance: f64) -> Option<f64> {
        if self.geometry.first()?.is_at(coord, tolerance) {
            Some(0.0)
        } else if self.geometry.last()?.is_at(coord, tolerance) {
            Some(1.0)
        } else {
            None
        }
    }

    pub(crate) fn set_geometry(&mut self, geometry: Polyline) {
        self.cached_length = geometry.length();
        self.cached_elevation = geometry.elevation();
        self.geometry = geometry;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}
