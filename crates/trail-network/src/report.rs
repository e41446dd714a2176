//! JSON report of the network after a replay

use crate::scenario::Replay;
use serde::Serialize;
use trail_network_lib::{
    Aggregation, AuditReport, NetworkInfo, PathId, ResolvedGeometry, TopologyId, TopologyKind,
};

#[derive(Serialize, Debug)]
pub struct PathReport {
    pub id: PathId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub name: Option<String>,
    pub length: f64,
    pub coordinates: Vec<[f64; 3]>,
}

#[derive(Serialize, Debug)]
pub struct TopologyReport {
    pub id: TopologyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: TopologyKind,
    pub length: f64,
    pub aggregations: Vec<Aggregation>,
    pub geometry: ResolvedGeometry,
}

#[derive(Serialize, Debug)]
pub struct Report {
    pub info: NetworkInfo,
    pub paths: Vec<PathReport>,
    pub topologies: Vec<TopologyReport>,
    pub audit: AuditReport,
}

impl Report {
    /// Snapshot live paths and topologies
    pub fn build(replay: &Replay) -> Self {
        let network = &replay.network;

        let paths = network
            .live_paths()
            .map(|path| PathReport {
                id: path.id(),
                label: replay.path_label(path.id()).map(str::to_string),
                name: path.name().map(str::to_string),
                length: path.length(),
                coordinates: path
                    .geometry()
                    .vertices()
                    .iter()
                    .map(|v| [v.x, v.y, v.z])
                    .collect(),
            })
            .collect();

        let topologies = network
            .topologies()
            .filter(|t| !t.is_deleted())
            .filter_map(|topology| {
                let id = topology.id();
                let geometry = network.topology_geometry(id).ok()?;
                Some(TopologyReport {
                    id,
                    label: replay.topology_label(id).map(str::to_string),
                    kind: network.topology_kind(id).ok()?,
                    length: geometry.length(),
                    aggregations: network.topology_aggregations(id).ok()?,
                    geometry: (*geometry).clone(),
                })
            })
            .collect();

        Report {
            info: network.info(),
            paths,
            topologies,
            audit: network.audit(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
