use std::path::PathBuf;
use trail_network_lib::NetworkError;

/// Errors surfaced by the command line
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown path label: {0}")]
    UnknownPath(String),

    #[error("Unknown topology label: {0}")]
    UnknownTopology(String),

    #[error("Label already used: {0}")]
    DuplicateLabel(String),

    #[error("Operation {index} ({operation}) failed: {source}")]
    Operation {
        index: usize,
        operation: &'static str,
        #[source]
        source: Box<CliError>,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),
}
