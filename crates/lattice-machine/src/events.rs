//! Grid events for observers and replay timelines.

use lattice_topology::{ChunkCoord, Face, HexCoord};
use serde::{Deserialize, Serialize};

use crate::error::ScanFailure;
use crate::module::ComputeModule;

/// Which kind of node occupies a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Casing,
    Controller,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Casing => "casing",
            NodeKind::Controller => "controller",
        }
    }
}

/// Something that changed in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GridEvent {
    /// A node was placed.
    NodePlaced { pos: HexCoord, node: NodeKind },

    /// A node was removed.
    NodeRemoved { pos: HexCoord, node: NodeKind },

    /// Two casings were bridged by a forwarder pair.
    LinkEstablished {
        pos: HexCoord,
        face: Face,
        neighbor: HexCoord,
    },

    /// A forwarder pair was torn down.
    LinkSevered { pos: HexCoord, face: Face },

    /// A real module was ejected from its face.
    ModuleDropped {
        pos: HexCoord,
        face: Face,
        kind: String,
    },

    /// A controller will rescan on its next tick.
    ScanScheduled { controller: HexCoord },

    /// A controller adopted a cluster.
    ScanCompleted { controller: HexCoord, casings: usize },

    /// A controller's scan was rejected.
    ScanFailed {
        controller: HexCoord,
        reason: ScanFailure,
    },

    /// A controller entered or left the running state.
    EnabledChanged { controller: HexCoord, enabled: bool },

    /// A module violated the channel protocol during a tick.
    ModuleFaulted {
        pos: HexCoord,
        face: Face,
        reason: String,
    },

    /// A chunk was loaded or unloaded.
    RegionChanged { chunk: ChunkCoord, loaded: bool },
}

impl GridEvent {
    /// Position the event is about, if any.
    pub fn pos(&self) -> Option<HexCoord> {
        match self {
            GridEvent::NodePlaced { pos, .. }
            | GridEvent::NodeRemoved { pos, .. }
            | GridEvent::LinkEstablished { pos, .. }
            | GridEvent::LinkSevered { pos, .. }
            | GridEvent::ModuleDropped { pos, .. }
            | GridEvent::ModuleFaulted { pos, .. } => Some(*pos),
            GridEvent::ScanScheduled { controller }
            | GridEvent::ScanCompleted { controller, .. }
            | GridEvent::ScanFailed { controller, .. }
            | GridEvent::EnabledChanged { controller, .. } => Some(*controller),
            GridEvent::RegionChanged { .. } => None,
        }
    }
}

/// An event stamped with the grid frame it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded {
    pub frame: u64,
    #[serde(flatten)]
    pub event: GridEvent,
}

/// Receives grid notifications as they happen.
///
/// All methods have empty defaults so observers implement only what they need.
pub trait WorldObserver {
    /// A controller's cluster started or stopped running.
    fn on_enabled_changed(&mut self, _controller: HexCoord, _enabled: bool) {}

    /// A real module was ejected and handed back to the caller's world.
    fn on_module_dropped(&mut self, _pos: HexCoord, _face: Face, _module: &ComputeModule) {}

    /// Every recorded event, in order.
    fn on_event(&mut self, _event: &Recorded) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_event_is_flat_json() {
        let recorded = Recorded {
            frame: 7,
            event: GridEvent::ScanFailed {
                controller: HexCoord::ORIGIN,
                reason: ScanFailure::TooManyNodes,
            },
        };
        let json = serde_json::to_value(&recorded).unwrap();
        assert_eq!(json["frame"], 7);
        assert_eq!(json["type"], "ScanFailed");
        assert_eq!(json["reason"], "too_many_nodes");

        let parsed: Recorded = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, recorded);
    }

    #[test]
    fn event_position() {
        let pos = HexCoord::new(1, 2, 3);
        assert_eq!(
            GridEvent::LinkSevered { pos, face: Face::Up }.pos(),
            Some(pos)
        );
        assert_eq!(
            GridEvent::RegionChanged {
                chunk: ChunkCoord::new(0, 0),
                loaded: false
            }
            .pos(),
            None
        );
    }
}
