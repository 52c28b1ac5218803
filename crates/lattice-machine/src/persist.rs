//! Saving and restoring node state.
//!
//! Each node serializes to an opaque `serde_json::Value` tree. Forwarders are
//! never saved: they are rebuilt from adjacency when the node is placed
//! again. A casing remembers which controller owned it, and restoring it asks
//! that controller to rescan.

use std::collections::BTreeMap;

use lattice_topology::{ChunkCoord, Face, HexCoord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::GridConfig;
use crate::controller::ControllerState;
use crate::error::{Error, Result};
use crate::events::NodeKind;
use crate::module::ComputeModule;
use crate::world::{Node, World};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum NodeTree {
    Casing(CasingTree),
    Controller(ControllerTree),
}

impl NodeTree {
    fn kind(&self) -> NodeKind {
        match self {
            NodeTree::Casing(_) => NodeKind::Casing,
            NodeTree::Controller(_) => NodeKind::Controller,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CasingTree {
    #[serde(default)]
    modules: BTreeMap<Face, ComputeModule>,
    #[serde(default)]
    controller: Option<HexCoord>,
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ControllerTree {
    #[serde(default)]
    disabled: bool,
}

/// One node of a [`WorldSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNode {
    pub pos: HexCoord,
    pub tree: Value,
}

/// Everything needed to rebuild a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub config: GridConfig,
    #[serde(default)]
    pub frame: u64,
    pub nodes: Vec<SavedNode>,
    #[serde(default)]
    pub unloaded: Vec<ChunkCoord>,
}

impl World {
    /// Serialize the node at `pos`.
    pub fn save_node(&self, pos: HexCoord) -> Result<Value> {
        let tree = match self.node_at(pos) {
            Some(Node::Casing(casing)) => NodeTree::Casing(CasingTree {
                modules: Face::ALL
                    .into_iter()
                    .filter_map(|face| casing.compute(face).map(|m| (face, m.clone())))
                    .collect(),
                controller: casing.controller().and_then(|key| self.pos_of(key)),
                enabled: self.is_enabled(pos),
            }),
            Some(Node::Controller(controller)) => NodeTree::Controller(ControllerTree {
                disabled: controller.state() == ControllerState::Disabled,
            }),
            None => return Err(Error::Vacant(pos)),
        };
        Ok(serde_json::to_value(tree)?)
    }

    /// Apply a saved tree to the node already placed at `pos`.
    ///
    /// Real modules on the casing are replaced by the saved ones. A saved
    /// module whose face is now linked or obstructed is dropped.
    pub fn load_node(&mut self, pos: HexCoord, tree: &Value) -> Result<()> {
        let tree: NodeTree = serde_json::from_value(tree.clone())?;
        let found = self.node_at(pos).map(Node::kind).ok_or(Error::Vacant(pos))?;
        if found != tree.kind() {
            return Err(Error::NodeMismatch {
                pos,
                expected: found.as_str(),
                found: tree.kind().as_str(),
            });
        }

        match tree {
            NodeTree::Casing(tree) => self.load_casing(pos, tree),
            NodeTree::Controller(tree) => {
                if tree.disabled {
                    self.request_disable(pos)
                } else {
                    self.request_enable(pos)
                }
            }
        }
    }

    fn load_casing(&mut self, pos: HexCoord, tree: CasingTree) -> Result<()> {
        let key = self.casing_key(pos)?;
        if let Some(casing) = self.casing_mut(key) {
            casing.eject_all();
        }

        for (face, module) in tree.modules {
            match self.set_module(pos, face, Some(module.clone())) {
                Ok(_) => {}
                Err(Error::SlotOccupiedByLink { .. } | Error::FaceObstructed { .. }) => {
                    self.drop_module(pos, face, module);
                }
                Err(e) => return Err(e),
            }
        }

        let hinted = tree
            .controller
            .and_then(|p| self.controller_key(p).ok());
        match hinted {
            Some(controller) => self.schedule_scan(controller),
            None => self.schedule_scan_from(key),
        }
        debug!(%pos, was_enabled = tree.enabled, "casing restored");
        Ok(())
    }

    /// Capture the whole grid.
    pub fn snapshot(&self) -> Result<WorldSnapshot> {
        let nodes = self
            .positions()
            .into_iter()
            .map(|pos| Ok(SavedNode { pos, tree: self.save_node(pos)? }))
            .collect::<Result<Vec<_>>>()?;

        Ok(WorldSnapshot {
            config: *self.config(),
            frame: self.frame(),
            nodes,
            unloaded: self.unloaded_chunks(),
        })
    }

    /// Rebuild a grid from a snapshot.
    ///
    /// Links and forwarders are derived again from adjacency, and every
    /// controller rescans on its first tick. The event log starts empty.
    pub fn restore(snapshot: &WorldSnapshot) -> Result<World> {
        let mut world = World::new(snapshot.config);

        for saved in &snapshot.nodes {
            let tree: NodeTree = serde_json::from_value(saved.tree.clone())?;
            match tree.kind() {
                NodeKind::Casing => world.place_casing(saved.pos)?,
                NodeKind::Controller => world.place_controller(saved.pos)?,
            };
        }
        for saved in &snapshot.nodes {
            world.load_node(saved.pos, &saved.tree)?;
        }
        for chunk in &snapshot.unloaded {
            world.set_region_loaded(*chunk, false);
        }

        world.set_frame(snapshot.frame);
        world.take_events();
        Ok(world)
    }
}
