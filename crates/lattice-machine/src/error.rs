//! Error types for lattice-machine.

use lattice_topology::{Face, HexCoord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by operations on the grid.
///
/// None of these leave the grid in a partially modified state.
#[derive(Debug, Error)]
pub enum Error {
    /// A real module was offered for a face that is bridged to a neighboring casing.
    #[error("face {face} of casing at {pos} is linked to a neighboring casing")]
    SlotOccupiedByLink { pos: HexCoord, face: Face },

    /// A real module was offered for a face that touches a controller.
    #[error("face {face} of casing at {pos} is obstructed by a controller")]
    FaceObstructed { pos: HexCoord, face: Face },

    /// No casing at the given position.
    #[error("no casing at {0}")]
    NoCasing(HexCoord),

    /// No controller at the given position.
    #[error("no controller at {0}")]
    NoController(HexCoord),

    /// Nothing occupies the given position.
    #[error("no node at {0}")]
    Vacant(HexCoord),

    /// A node already exists at the given position.
    #[error("position {0} is already occupied")]
    PositionOccupied(HexCoord),

    /// The position lies in an unloaded chunk.
    #[error("position {0} is in an unloaded region")]
    Unloaded(HexCoord),

    /// An adjacency notification named a cell that is not behind the face.
    #[error("{neighbor} is not behind face {face} of {pos}")]
    NotAdjacent {
        pos: HexCoord,
        face: Face,
        neighbor: HexCoord,
    },

    /// Persisted node state could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted node state does not match the node it is applied to.
    #[error("persisted state for {pos} describes a {found}, not a {expected}")]
    NodeMismatch {
        pos: HexCoord,
        expected: &'static str,
        found: &'static str,
    },
}

/// A write hit a channel that still holds an unread value.
///
/// The rejected value is discarded, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel already holds an unread value")]
pub struct ChannelBusy;

/// Why a module's port operation did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PortError {
    /// Nothing to read (or nowhere to write) yet; retried on the next step.
    #[error("port would block")]
    WouldBlock,

    /// The module wrote twice into a channel before it was read.
    #[error("channel {from} -> {to} is busy")]
    ChannelBusy { from: Face, to: Face },

    /// The port does not connect to another face of the same casing.
    #[error("face {face} has no port towards {port}")]
    NotLateral { face: Face, port: Face },
}

/// Why a controller could not adopt a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFailure {
    /// More casings are reachable than a single controller may drive.
    #[error("too many casings in cluster")]
    TooManyNodes,

    /// Another controller is reachable from this one.
    #[error("multiple controllers in cluster")]
    MultipleControllers,

    /// Part of the cluster lies in an unloaded region.
    #[error("cluster extends into an unloaded region")]
    IncompleteRegion,
}
