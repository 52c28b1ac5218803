//! The grid arena.
//!
//! Every casing and controller lives in one [`SlotMap`]; all cross-node
//! references (neighbors, owning controller, cluster members, forwarder
//! sinks) are [`NodeKey`]s into it, never owning pointers. Positions map to
//! keys, and loading chunks decide which positions are currently visible.

use std::collections::{HashMap, HashSet};
use std::fmt;

use lattice_topology::{ChunkCoord, Face, HexCoord};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, trace};

use crate::casing::{Casing, ModuleFault};
use crate::config::GridConfig;
use crate::controller::{Controller, ControllerState};
use crate::error::{Error, Result, ScanFailure};
use crate::events::{GridEvent, NodeKind, Recorded, WorldObserver};
use crate::module::ComputeModule;

new_key_type! {
    /// Stable handle to a node in the grid arena.
    pub struct NodeKey;
}

/// A grid cell occupant.
#[derive(Debug, Clone)]
pub enum Node {
    Casing(Casing),
    Controller(Controller),
}

impl Node {
    pub fn pos(&self) -> HexCoord {
        match self {
            Node::Casing(casing) => casing.pos(),
            Node::Controller(controller) => controller.pos(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Casing(_) => NodeKind::Casing,
            Node::Controller(_) => NodeKind::Controller,
        }
    }

    pub fn as_casing(&self) -> Option<&Casing> {
        match self {
            Node::Casing(casing) => Some(casing),
            Node::Controller(_) => None,
        }
    }

    pub fn as_controller(&self) -> Option<&Controller> {
        match self {
            Node::Controller(controller) => Some(controller),
            Node::Casing(_) => None,
        }
    }
}

/// What a position resolves to right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Unloaded,
    Empty,
    Casing(NodeKey),
    Controller(NodeKey),
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clusters whose modules were stepped.
    pub clusters: usize,
    /// Casings stepped across all clusters.
    pub casings: usize,
    /// Values moved across casing boundaries.
    pub forwarded: usize,
    pub faults: Vec<ModuleFault>,
}

impl TickReport {
    pub(crate) fn merge(&mut self, other: TickReport) {
        self.clusters += other.clusters;
        self.casings += other.casings;
        self.forwarded += other.forwarded;
        self.faults.extend(other.faults);
    }
}

/// A grid of casings and controllers.
pub struct World {
    config: GridConfig,
    nodes: SlotMap<NodeKey, Node>,
    positions: HashMap<HexCoord, NodeKey>,
    unloaded: HashSet<ChunkCoord>,
    frame: u64,
    events: Vec<Recorded>,
    dropped_events: u64,
    observers: Vec<Box<dyn WorldObserver>>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("unloaded", &self.unloaded)
            .field("frame", &self.frame)
            .field("events", &self.events.len())
            .field("dropped_events", &self.dropped_events)
            .finish_non_exhaustive()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl World {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            nodes: SlotMap::with_key(),
            positions: HashMap::new(),
            unloaded: HashSet::new(),
            frame: 0,
            events: Vec::new(),
            dropped_events: 0,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Number of completed [`World::tick`] calls.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// Events recorded since the last [`World::take_events`].
    ///
    /// The log is meant to be drained by the driver. A world that is never
    /// drained keeps at most [`GridConfig::event_capacity`] events: once the
    /// log is full its oldest quarter is discarded. Observers still see
    /// every event.
    pub fn events(&self) -> &[Recorded] {
        &self.events
    }

    /// Events discarded because the log was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn take_events(&mut self) -> Vec<Recorded> {
        std::mem::take(&mut self.events)
    }

    pub fn add_observer(&mut self, observer: impl WorldObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn key_at(&self, pos: HexCoord) -> Option<NodeKey> {
        self.positions.get(&pos).copied()
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_at(&self, pos: HexCoord) -> Option<&Node> {
        self.key_at(pos).and_then(|key| self.nodes.get(key))
    }

    pub fn casing(&self, pos: HexCoord) -> Option<&Casing> {
        self.node_at(pos).and_then(Node::as_casing)
    }

    pub fn controller(&self, pos: HexCoord) -> Option<&Controller> {
        self.node_at(pos).and_then(Node::as_controller)
    }

    pub fn casings(&self) -> impl Iterator<Item = &Casing> {
        self.nodes.values().filter_map(Node::as_casing)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.nodes.values().filter_map(Node::as_controller)
    }

    /// Positions of every node, sorted.
    pub fn positions(&self) -> Vec<HexCoord> {
        let mut positions: Vec<_> = self.positions.keys().copied().collect();
        positions.sort();
        positions
    }

    pub fn is_loaded(&self, pos: HexCoord) -> bool {
        !self.unloaded.contains(&pos.chunk(self.config.chunk_size))
    }

    /// Unloaded chunks, sorted.
    pub fn unloaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut chunks: Vec<_> = self.unloaded.iter().copied().collect();
        chunks.sort();
        chunks
    }

    /// Whether the casing at `pos` belongs to a running cluster.
    pub fn is_enabled(&self, pos: HexCoord) -> bool {
        self.casing(pos)
            .and_then(Casing::controller)
            .and_then(|key| self.controller_by_key(key))
            .is_some_and(Controller::is_running)
    }

    pub(crate) fn slot(&self, pos: HexCoord) -> Slot {
        if !self.is_loaded(pos) {
            return Slot::Unloaded;
        }
        let Some(key) = self.key_at(pos) else {
            return Slot::Empty;
        };
        match self.nodes.get(key) {
            Some(Node::Casing(_)) => Slot::Casing(key),
            Some(Node::Controller(_)) => Slot::Controller(key),
            None => Slot::Empty,
        }
    }

    pub(crate) fn pos_of(&self, key: NodeKey) -> Option<HexCoord> {
        self.nodes.get(key).map(Node::pos)
    }

    pub(crate) fn casing_by_key(&self, key: NodeKey) -> Option<&Casing> {
        self.nodes.get(key).and_then(Node::as_casing)
    }

    pub(crate) fn casing_mut(&mut self, key: NodeKey) -> Option<&mut Casing> {
        match self.nodes.get_mut(key) {
            Some(Node::Casing(casing)) => Some(casing),
            _ => None,
        }
    }

    pub(crate) fn controller_by_key(&self, key: NodeKey) -> Option<&Controller> {
        self.nodes.get(key).and_then(Node::as_controller)
    }

    pub(crate) fn controller_mut(&mut self, key: NodeKey) -> Option<&mut Controller> {
        match self.nodes.get_mut(key) {
            Some(Node::Controller(controller)) => Some(controller),
            _ => None,
        }
    }

    pub(crate) fn casing_key(&self, pos: HexCoord) -> Result<NodeKey> {
        self.key_at(pos)
            .filter(|key| self.casing_by_key(*key).is_some())
            .ok_or(Error::NoCasing(pos))
    }

    pub(crate) fn controller_key(&self, pos: HexCoord) -> Result<NodeKey> {
        self.key_at(pos)
            .filter(|key| self.controller_by_key(*key).is_some())
            .ok_or(Error::NoController(pos))
    }

    pub(crate) fn record(&mut self, event: GridEvent) {
        let recorded = Recorded {
            frame: self.frame,
            event,
        };
        for observer in &mut self.observers {
            observer.on_event(&recorded);
        }
        let capacity = self.config.event_capacity.max(1);
        if self.events.len() >= capacity {
            let excess = (capacity / 4).max(1).min(self.events.len());
            self.events.drain(..excess);
            self.dropped_events += excess as u64;
            debug!(discarded = excess, "event log full");
        }
        self.events.push(recorded);
    }

    pub(crate) fn notify_enabled(&mut self, controller: HexCoord, enabled: bool) {
        self.record(GridEvent::EnabledChanged {
            controller,
            enabled,
        });
        for observer in &mut self.observers {
            observer.on_enabled_changed(controller, enabled);
        }
    }

    pub(crate) fn drop_module(&mut self, pos: HexCoord, face: Face, module: ComputeModule) {
        debug!(%pos, %face, kind = module.kind(), "module dropped");
        for observer in &mut self.observers {
            observer.on_module_dropped(pos, face, &module);
        }
        self.record(GridEvent::ModuleDropped {
            pos,
            face,
            kind: module.kind().to_string(),
        });
    }

    /// Install (or clear) a real module on a casing face.
    ///
    /// See [`Casing::set_module`]; fails with [`Error::NoCasing`] when no
    /// casing sits at `pos`.
    pub fn set_module(
        &mut self,
        pos: HexCoord,
        face: Face,
        module: Option<ComputeModule>,
    ) -> Result<Option<ComputeModule>> {
        let key = self.casing_key(pos)?;
        match self.casing_mut(key) {
            Some(casing) => casing.set_module(face, module),
            None => Err(Error::NoCasing(pos)),
        }
    }

    pub fn place_casing(&mut self, pos: HexCoord) -> Result<NodeKey> {
        let key = self.place(Node::Casing(Casing::new(pos)))?;
        self.schedule_scan_from(key);
        Ok(key)
    }

    /// Place a controller. It starts scanning on its next tick.
    pub fn place_controller(&mut self, pos: HexCoord) -> Result<NodeKey> {
        self.place(Node::Controller(Controller::new(pos)))
    }

    fn place(&mut self, node: Node) -> Result<NodeKey> {
        let pos = node.pos();
        if !self.is_loaded(pos) {
            return Err(Error::Unloaded(pos));
        }
        if self.positions.contains_key(&pos) {
            return Err(Error::PositionOccupied(pos));
        }

        let kind = node.kind();
        let key = self.nodes.insert(node);
        self.positions.insert(pos, key);
        debug!(%pos, node = kind.as_str(), "node placed");
        self.record(GridEvent::NodePlaced { pos, node: kind });

        self.refresh_node(pos);
        for (_, neighbor) in pos.neighbors() {
            self.refresh_node(neighbor);
        }
        Ok(key)
    }

    /// Remove the node at `pos`.
    ///
    /// A removed casing drops its modules and makes its controller rescan.
    /// A removed controller releases its cluster.
    pub fn remove(&mut self, pos: HexCoord) -> Result<NodeKind> {
        if !self.is_loaded(pos) {
            return Err(Error::Unloaded(pos));
        }
        let key = self.key_at(pos).ok_or(Error::Vacant(pos))?;

        let kind = match self.nodes.get(key).map(Node::kind) {
            Some(NodeKind::Casing) => {
                self.remove_casing(key, pos);
                NodeKind::Casing
            }
            Some(NodeKind::Controller) => {
                self.remove_controller(key, pos);
                NodeKind::Controller
            }
            None => return Err(Error::Vacant(pos)),
        };

        debug!(%pos, node = kind.as_str(), "node removed");
        self.record(GridEvent::NodeRemoved { pos, node: kind });
        for (_, neighbor) in pos.neighbors() {
            self.refresh_node(neighbor);
        }
        Ok(kind)
    }

    fn remove_casing(&mut self, key: NodeKey, pos: HexCoord) {
        for face in Face::ALL {
            self.set_neighbor(key, face, None);
        }

        let (owner, modules) = match self.casing_mut(key) {
            Some(casing) => (casing.controller(), casing.eject_all()),
            None => return,
        };
        for (face, module) in modules {
            self.drop_module(pos, face, module);
        }

        self.nodes.remove(key);
        self.positions.remove(&pos);

        if let Some(owner) = owner {
            if let Some(controller) = self.controller_mut(owner) {
                controller.release(key);
            }
            self.schedule_scan(owner);
        }
    }

    fn remove_controller(&mut self, key: NodeKey, pos: HexCoord) {
        let Some(Node::Controller(controller)) = self.nodes.remove(key) else {
            return;
        };
        self.positions.remove(&pos);

        let mut released: Vec<NodeKey> = Vec::new();
        for &member in controller.cluster() {
            if let Some(casing) = self.casing_mut(member) {
                if casing.controller() == Some(key) {
                    casing.set_controller(None);
                    casing.set_enabled(false);
                    released.push(member);
                }
            }
        }
        if controller.is_running() {
            info!(controller = %pos, casings = released.len(), "cluster released");
            self.notify_enabled(pos, false);
        }

        // A rival that was blocked by this controller may now own these casings.
        for member in released {
            self.schedule_scan_from(member);
        }
    }

    /// Load or unload a chunk.
    ///
    /// Links across the chunk border are severed on unload and restored on
    /// load; clusters reaching into an unloaded chunk fail their next scan.
    pub fn set_region_loaded(&mut self, chunk: ChunkCoord, loaded: bool) {
        let changed = if loaded {
            self.unloaded.remove(&chunk)
        } else {
            self.unloaded.insert(chunk)
        };
        if !changed {
            return;
        }

        debug!(%chunk, loaded, "region changed");
        self.record(GridEvent::RegionChanged { chunk, loaded });

        let size = self.config.chunk_size;
        let mut inside: Vec<(HexCoord, NodeKey)> = self
            .positions
            .iter()
            .filter(|(pos, _)| pos.chunk(size) == chunk)
            .map(|(pos, key)| (*pos, *key))
            .collect();
        inside.sort_by_key(|(pos, _)| *pos);

        if !loaded {
            let owners: Vec<NodeKey> = inside
                .iter()
                .filter_map(|(_, key)| self.casing_by_key(*key).and_then(Casing::controller))
                .collect();
            for owner in owners {
                self.schedule_scan(owner);
            }
        }

        let mut border = Vec::new();
        for (pos, _) in &inside {
            if loaded {
                self.refresh_node(*pos);
            }
            border.extend(
                pos.neighbors()
                    .into_iter()
                    .map(|(_, n)| n)
                    .filter(|n| n.chunk(size) != chunk),
            );
        }
        border.sort();
        border.dedup();
        for pos in border {
            self.refresh_node(pos);
        }

        // An empty chunk has no nodes to relink, so retry every scan that
        // stopped at an unloaded cell.
        if loaded {
            let stalled: Vec<NodeKey> = self
                .nodes
                .iter()
                .filter_map(|(key, node)| match node {
                    Node::Controller(c)
                        if c.state() == ControllerState::Error(ScanFailure::IncompleteRegion) =>
                    {
                        Some(key)
                    }
                    _ => None,
                })
                .collect();
            for key in stalled {
                self.schedule_scan(key);
            }
        }
    }

    /// Advance every loaded controller by one tick, in position order.
    pub fn tick(&mut self) -> TickReport {
        let mut controllers: Vec<(HexCoord, NodeKey)> = self
            .nodes
            .iter()
            .filter_map(|(key, node)| match node {
                Node::Controller(c) if self.is_loaded(c.pos()) => Some((c.pos(), key)),
                _ => None,
            })
            .collect();
        controllers.sort_by_key(|(pos, _)| *pos);

        let mut report = TickReport::default();
        for (_, key) in controllers {
            report.merge(self.run_tick(key));
        }

        trace!(frame = self.frame, forwarded = report.forwarded, "frame complete");
        self.frame += 1;
        report
    }

    /// Step every forwarder of one casing. Returns the number of values moved.
    pub(crate) fn step_pipes(&mut self, key: NodeKey) -> usize {
        let forwarders: Vec<_> = match self.casing_by_key(key) {
            Some(casing) => casing.forwarders().map(|(_, f)| f).collect(),
            None => return 0,
        };

        let mut moved = 0;
        for forwarder in forwarders {
            let Some([here, there]) = self.nodes.get_disjoint_mut([key, forwarder.sink()]) else {
                trace!(face = %forwarder.face(), "forwarder sink missing");
                continue;
            };
            if let (Node::Casing(here), Node::Casing(there)) = (here, there) {
                moved += forwarder.step(here.pipes_mut(), there.pipes_mut());
            }
        }
        moved
    }
}
