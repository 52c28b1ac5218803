//! Error types for lattice-sim.

use std::path::PathBuf;

use lattice_topology::HexCoord;
use thiserror::Error;

/// Result type for lattice-sim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or running a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// The grid rejected an operation.
    #[error("grid error: {0}")]
    Machine(#[from] lattice_machine::Error),

    /// A scenario or snapshot could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scenario names the same position twice.
    #[error("scenario places more than one node at {0}")]
    DuplicatePosition(HexCoord),
}
