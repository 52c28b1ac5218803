//! Cluster controllers.
//!
//! A controller owns the set of casings reachable from it and drives them in
//! lockstep. Membership is only ever recomputed by a full breadth-first scan,
//! which either adopts the whole reachable set or rejects it.
//!
//! # State machine
//!
//! ```text
//!            schedule_scan             scan ok
//! Disabled ---------------> Scanning ----------> Running
//!    ^     request_enable      |  ^                 |
//!    |                         |  +-----------------+ (change nearby)
//!    | request_disable         v scan failed
//!    +------------------- Error(reason)
//! ```
//!
//! Every transition into or out of `Running` updates the member casings'
//! enabled flag and is broadcast to observers.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use lattice_topology::HexCoord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, ScanFailure};
use crate::events::GridEvent;
use crate::world::{NodeKey, Slot, TickReport, World};

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ControllerState {
    /// A scan is pending or in progress; the cluster does not tick.
    Scanning,
    /// The cluster is adopted and ticks.
    Running,
    /// The last scan failed. The previous cluster is kept but does not tick.
    Error(ScanFailure),
    /// Switched off; ignores scan requests until enabled again.
    Disabled,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Scanning => write!(f, "scanning"),
            ControllerState::Running => write!(f, "running"),
            ControllerState::Error(reason) => write!(f, "error: {reason}"),
            ControllerState::Disabled => write!(f, "disabled"),
        }
    }
}

/// A node that discovers and drives one cluster of casings.
#[derive(Debug, Clone)]
pub struct Controller {
    pos: HexCoord,
    state: ControllerState,
    cluster: HashSet<NodeKey>,
    scan_pending: bool,
    ticks: u64,
    scans: u64,
}

impl Controller {
    /// A fresh controller, scanning on its first tick.
    pub fn new(pos: HexCoord) -> Self {
        Self {
            pos,
            state: ControllerState::Scanning,
            cluster: HashSet::new(),
            scan_pending: true,
            ticks: 0,
            scans: 0,
        }
    }

    pub fn pos(&self) -> HexCoord {
        self.pos
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ControllerState::Running
    }

    /// Casings adopted by the last successful scan.
    pub fn cluster(&self) -> &HashSet<NodeKey> {
        &self.cluster
    }

    pub fn scan_pending(&self) -> bool {
        self.scan_pending
    }

    /// Ticks this controller's cluster has executed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Scans performed so far.
    pub fn scans(&self) -> u64 {
        self.scans
    }

    pub(crate) fn release(&mut self, casing: NodeKey) -> bool {
        self.cluster.remove(&casing)
    }
}

/// Why a scan stopped, and which rival controller stopped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanError {
    pub reason: ScanFailure,
    pub rival: Option<NodeKey>,
}

impl From<ScanFailure> for ScanError {
    fn from(reason: ScanFailure) -> Self {
        Self {
            reason,
            rival: None,
        }
    }
}

impl World {
    /// Ask a controller to (re)start. A disabled controller starts scanning.
    pub fn request_enable(&mut self, pos: HexCoord) -> Result<()> {
        let key = self.controller_key(pos)?;
        if self.controller_by_key(key).map(Controller::state) == Some(ControllerState::Disabled) {
            info!(controller = %pos, "controller enabled");
            self.set_state(key, ControllerState::Scanning);
        }
        self.schedule_scan(key);
        Ok(())
    }

    /// Switch a controller off. Takes effect immediately.
    pub fn request_disable(&mut self, pos: HexCoord) -> Result<()> {
        let key = self.controller_key(pos)?;
        if let Some(controller) = self.controller_mut(key) {
            controller.scan_pending = false;
        }
        info!(controller = %pos, "controller disabled");
        self.set_state(key, ControllerState::Disabled);
        Ok(())
    }

    /// Advance one controller by a tick, independently of the rest of the grid.
    pub fn tick_controller(&mut self, pos: HexCoord) -> Result<TickReport> {
        let key = self.controller_key(pos)?;
        if !self.is_loaded(pos) {
            return Err(crate::error::Error::Unloaded(pos));
        }
        Ok(self.run_tick(key))
    }

    /// Positions of the casings owned by the controller at `pos`, sorted.
    pub fn cluster(&self, pos: HexCoord) -> Result<Vec<HexCoord>> {
        let key = self.controller_key(pos)?;
        let mut members: Vec<HexCoord> = self
            .controller_by_key(key)
            .map(|c| c.cluster.iter().filter_map(|k| self.pos_of(*k)).collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }

    /// Mark a rescan as pending. Repeated requests coalesce into one scan.
    pub(crate) fn schedule_scan(&mut self, key: NodeKey) {
        let Some(controller) = self.controller_mut(key) else {
            return;
        };
        let pos = controller.pos;
        match controller.state {
            ControllerState::Disabled => {
                trace!(controller = %pos, "disabled controller ignores scan request");
                return;
            }
            ControllerState::Scanning if controller.scan_pending => {
                debug!(controller = %pos, "scan already pending");
                return;
            }
            _ => {}
        }

        controller.scan_pending = true;
        self.set_state(key, ControllerState::Scanning);
        self.record(GridEvent::ScanScheduled { controller: pos });
    }

    pub(crate) fn run_tick(&mut self, key: NodeKey) -> TickReport {
        let mut report = TickReport::default();
        let Some(controller) = self.controller_by_key(key) else {
            return report;
        };
        if controller.state == ControllerState::Disabled {
            return report;
        }
        if controller.scan_pending {
            self.run_scan(key);
        }

        let Some(controller) = self.controller_by_key(key) else {
            return report;
        };
        if !controller.is_running() {
            return report;
        }
        let pos = controller.pos;
        let tick = controller.ticks;

        let mut members: Vec<(HexCoord, NodeKey)> = controller
            .cluster
            .iter()
            .filter_map(|k| self.pos_of(*k).map(|p| (p, *k)))
            .collect();
        members.sort_by_key(|(p, _)| *p);

        // All modules of the cluster finish before any value crosses a boundary.
        for (_, member) in &members {
            if let Some(casing) = self.casing_mut(*member) {
                report.faults.extend(casing.step_modules(tick));
            }
        }
        for (_, member) in &members {
            report.forwarded += self.step_pipes(*member);
        }

        for fault in &report.faults {
            self.record(GridEvent::ModuleFaulted {
                pos: fault.pos,
                face: fault.face,
                reason: fault.error.to_string(),
            });
        }
        if let Some(controller) = self.controller_mut(key) {
            controller.ticks += 1;
        }

        report.clusters = 1;
        report.casings = members.len();
        trace!(controller = %pos, tick, forwarded = report.forwarded, "cluster ticked");
        report
    }

    fn run_scan(&mut self, key: NodeKey) {
        let Some(controller) = self.controller_mut(key) else {
            return;
        };
        controller.scan_pending = false;
        controller.scans += 1;
        let pos = controller.pos;

        match self.scan_cluster(key) {
            Ok(members) => self.adopt(key, members),
            Err(ScanError { reason, rival }) => {
                warn!(controller = %pos, %reason, "cluster scan failed");
                self.record(GridEvent::ScanFailed {
                    controller: pos,
                    reason,
                });
                self.set_state(key, ControllerState::Error(reason));

                // The rival must learn about us too, unless it already has.
                if let Some(rival) = rival {
                    let settled = self.controller_by_key(rival).map(Controller::state)
                        == Some(ControllerState::Error(ScanFailure::MultipleControllers));
                    if !settled {
                        self.schedule_scan(rival);
                    }
                }
            }
        }
    }

    /// Breadth-first search for every casing reachable from a controller.
    ///
    /// The visited set and the size bound are separate checks: the bound
    /// counts casings only and stops the search as soon as it is exceeded.
    pub(crate) fn scan_cluster(&self, key: NodeKey) -> std::result::Result<Vec<NodeKey>, ScanError> {
        let Some(origin) = self.pos_of(key) else {
            return Ok(Vec::new());
        };
        let max = self.config().max_casings;

        let mut visited = HashSet::from([origin]);
        let mut queue = VecDeque::from([origin]);
        let mut casings = Vec::new();

        while let Some(pos) = queue.pop_front() {
            match self.slot(pos) {
                Slot::Controller(other) if other != key => {
                    return Err(ScanError {
                        reason: ScanFailure::MultipleControllers,
                        rival: Some(other),
                    });
                }
                Slot::Casing(casing) => {
                    if casings.len() + 1 > max {
                        return Err(ScanFailure::TooManyNodes.into());
                    }
                    casings.push(casing);
                }
                Slot::Controller(_) => {}
                Slot::Empty | Slot::Unloaded => continue,
            }

            if !self.enqueue_neighbors(pos, &mut visited, &mut queue) {
                return Err(ScanFailure::IncompleteRegion.into());
            }
        }

        Ok(casings)
    }

    /// Queue the unvisited occupied neighbors of `pos`.
    ///
    /// Returns false when a neighbor lies in an unloaded region, in which
    /// case the search cannot be completed.
    pub(crate) fn enqueue_neighbors(
        &self,
        pos: HexCoord,
        visited: &mut HashSet<HexCoord>,
        queue: &mut VecDeque<HexCoord>,
    ) -> bool {
        for (_, neighbor) in pos.neighbors() {
            if !visited.insert(neighbor) {
                continue;
            }
            match self.slot(neighbor) {
                Slot::Unloaded => return false,
                Slot::Empty => {}
                Slot::Casing(_) | Slot::Controller(_) => queue.push_back(neighbor),
            }
        }
        true
    }

    fn adopt(&mut self, key: NodeKey, members: Vec<NodeKey>) {
        let members: HashSet<NodeKey> = members.into_iter().collect();
        let Some(controller) = self.controller_mut(key) else {
            return;
        };
        let pos = controller.pos;
        let previous = std::mem::take(&mut controller.cluster);

        for &gone in previous.difference(&members) {
            if let Some(casing) = self.casing_mut(gone) {
                if casing.controller() == Some(key) {
                    casing.set_controller(None);
                    casing.set_enabled(false);
                }
            }
        }

        let mut displaced = Vec::new();
        for &member in &members {
            if let Some(casing) = self.casing_mut(member) {
                if let Some(owner) = casing.controller().filter(|owner| *owner != key) {
                    displaced.push((owner, member));
                }
                casing.set_controller(Some(key));
            }
        }

        let count = members.len();
        if let Some(controller) = self.controller_mut(key) {
            controller.cluster = members;
        }

        let mut owners = Vec::new();
        for (owner, member) in displaced {
            if let Some(controller) = self.controller_mut(owner) {
                controller.release(member);
            }
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        for owner in owners {
            self.schedule_scan(owner);
        }

        info!(controller = %pos, casings = count, "cluster adopted");
        self.record(GridEvent::ScanCompleted {
            controller: pos,
            casings: count,
        });
        self.set_state(key, ControllerState::Running);
        self.sync_enabled(key);
    }

    fn set_state(&mut self, key: NodeKey, state: ControllerState) {
        let Some(controller) = self.controller_mut(key) else {
            return;
        };
        let previous = controller.state;
        if previous == state {
            return;
        }
        let was_running = controller.is_running();
        controller.state = state;
        let now_running = controller.is_running();
        let pos = controller.pos;

        debug!(controller = %pos, from = %previous, to = %state, "controller state changed");
        if was_running != now_running {
            self.sync_enabled(key);
            self.notify_enabled(pos, now_running);
        }
    }

    /// Copy the controller's running flag into every casing it owns.
    fn sync_enabled(&mut self, key: NodeKey) {
        let Some(controller) = self.controller_by_key(key) else {
            return;
        };
        let running = controller.is_running();
        let members: Vec<NodeKey> = controller.cluster.iter().copied().collect();
        for member in members {
            if let Some(casing) = self.casing_mut(member) {
                if casing.controller() == Some(key) {
                    casing.set_enabled(running);
                }
            }
        }
    }
}
