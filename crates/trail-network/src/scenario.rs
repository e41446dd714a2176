//! Scenario files and their replay against a [`PathNetwork`]
//!
//! A scenario is a JSON object with an ordered list of operations. Paths and
//! topologies are named by labels chosen in the file; a path label keeps
//! pointing at the identity segment after the path gets split.

use crate::error::CliError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path as FsPath;
use trail_network_lib::{PathAttributes, PathId, PathNetwork, Polyline, TopologyId};

/// A coordinate written as `[x, y]` or `[x, y, z]`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Coordinate {
    Xyz([f64; 3]),
    Xy([f64; 2]),
}

impl Coordinate {
    fn tuple(self) -> (f64, f64, f64) {
        match self {
            Coordinate::Xyz([x, y, z]) => (x, y, z),
            Coordinate::Xy([x, y]) => (x, y, 0.0),
        }
    }
}

/// One aggregation of a `create_topology` operation
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Attachment {
    pub path: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreatePath {
        label: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        properties: BTreeMap<String, String>,
        coordinates: Vec<Coordinate>,
    },
    UpdatePath {
        path: String,
        coordinates: Vec<Coordinate>,
    },
    DeletePath {
        path: String,
    },
    CreateTopology {
        label: String,
        #[serde(default)]
        aggregations: Vec<Attachment>,
    },
    AddPath {
        topology: String,
        path: String,
        start: f64,
        end: f64,
    },
    DeleteTopology {
        topology: String,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreatePath { .. } => "create_path",
            Operation::UpdatePath { .. } => "update_path",
            Operation::DeletePath { .. } => "delete_path",
            Operation::CreateTopology { .. } => "create_topology",
            Operation::AddPath { .. } => "add_path",
            Operation::DeleteTopology { .. } => "delete_topology",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &FsPath) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// A network plus the labels assigned while replaying
pub struct Replay {
    pub network: PathNetwork,
    paths: HashMap<String, PathId>,
    topologies: HashMap<String, TopologyId>,
}

impl Replay {
    pub fn new(network: PathNetwork) -> Self {
        Self {
            network,
            paths: HashMap::new(),
            topologies: HashMap::new(),
        }
    }

    /// Apply every operation in order, stopping at the first failure
    ///
    /// Operations applied before the failure stay committed.
    pub fn run(&mut self, scenario: &Scenario) -> Result<(), CliError> {
        for (index, operation) in scenario.operations.iter().enumerate() {
            self.apply(operation).map_err(|source| CliError::Operation {
                index,
                operation: operation.kind(),
                source: Box::new(source),
            })?;
        }
        tracing::info!(operations = scenario.operations.len(), "scenario replayed");
        Ok(())
    }

    pub fn apply(&mut self, operation: &Operation) -> Result<(), CliError> {
        match operation {
            Operation::CreatePath {
                label,
                name,
                properties,
                coordinates,
            } => {
                if self.paths.contains_key(label) {
                    return Err(CliError::DuplicateLabel(label.clone()));
                }
                let attributes = PathAttributes {
                    name: name.clone(),
                    properties: properties.clone(),
                };
                let path = self.network.create_path(polyline(coordinates)?, attributes)?;
                self.paths.insert(label.clone(), path.id());
            }
            Operation::UpdatePath { path, coordinates } => {
                let id = self.path_id(path)?;
                self.network.update_path(id, polyline(coordinates)?)?;
            }
            Operation::DeletePath { path } => {
                let id = self.path_id(path)?;
                self.network.delete_path(id)?;
            }
            Operation::CreateTopology {
                label,
                aggregations,
            } => {
                if self.topologies.contains_key(label) {
                    return Err(CliError::DuplicateLabel(label.clone()));
                }
                let attachments = aggregations
                    .iter()
                    .map(|a| Ok((self.path_id(&a.path)?, a.start, a.end)))
                    .collect::<Result<Vec<_>, CliError>>()?;
                let topology = self.network.create_topology(&attachments)?;
                self.topologies.insert(label.clone(), topology.id());
            }
            Operation::AddPath {
                topology,
                path,
                start,
                end,
            } => {
                let topology = self.topology_id(topology)?;
                let path = self.path_id(path)?;
                self.network.add_path(topology, path, *start, *end)?;
            }
            Operation::DeleteTopology { topology } => {
                let id = self.topology_id(topology)?;
                self.network.delete_topology(id)?;
            }
        }
        Ok(())
    }

    fn path_id(&self, label: &str) -> Result<PathId, CliError> {
        self.paths
            .get(label)
            .copied()
            .ok_or_else(|| CliError::UnknownPath(label.to_string()))
    }

    fn topology_id(&self, label: &str) -> Result<TopologyId, CliError> {
        self.topologies
            .get(label)
            .copied()
            .ok_or_else(|| CliError::UnknownTopology(label.to_string()))
    }

    /// Label given to a path in the scenario, if any
    pub fn path_label(&self, id: PathId) -> Option<&str> {
        self.paths
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    pub fn topology_label(&self, id: TopologyId) -> Option<&str> {
        self.topologies
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }
}

fn polyline(coordinates: &[Coordinate]) -> Result<Polyline, CliError> {
    let tuples: Vec<_> = coordinates.iter().map(|c| c.tuple()).collect();
    Ok(Polyline::from_xyz(&tuples)?)
}
