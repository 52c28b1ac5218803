//! Reacting to adjacency changes.
//!
//! The notifier keeps the casing links consistent with the grid: it wires and
//! unwires forwarder pairs, evicts modules from faces that become linked or
//! obstructed, and asks the right controller to rescan. It never scans
//! itself; rescans are deferred to the controller's next tick, so a burst of
//! changes costs one scan.

use std::collections::{HashSet, VecDeque};

use lattice_topology::{Face, HexCoord};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::GridEvent;
use crate::world::{NodeKey, Slot, World};

impl World {
    /// Tell the grid that whatever is behind `face` of the casing at `pos`
    /// changed.
    ///
    /// `neighbor` names the cell now behind the face, or `None` when the link
    /// should be dropped. Notifying the same state twice changes nothing.
    pub fn notify_adjacency_changed(
        &mut self,
        pos: HexCoord,
        face: Face,
        neighbor: Option<HexCoord>,
    ) -> Result<()> {
        let key = self.casing_key(pos)?;
        let Some(neighbor) = neighbor else {
            self.set_neighbor(key, face, None);
            return Ok(());
        };

        if pos.step(face) != neighbor {
            return Err(Error::NotAdjacent {
                pos,
                face,
                neighbor,
            });
        }
        match self.slot(neighbor) {
            Slot::Casing(other) => {
                self.set_neighbor(key, face, Some(other));
                Ok(())
            }
            Slot::Controller(_) => {
                self.refresh_node(pos);
                Ok(())
            }
            Slot::Unloaded => Err(Error::Unloaded(neighbor)),
            Slot::Empty => Err(Error::NoCasing(neighbor)),
        }
    }

    /// Link (or unlink) a casing face.
    ///
    /// Does nothing when the face is already linked to `new` with a matching
    /// forwarder. Otherwise the old link is torn down on both sides, real
    /// modules on the two touching faces are dropped, the forwarder pair is
    /// installed, and a rescan is requested.
    pub(crate) fn set_neighbor(&mut self, key: NodeKey, face: Face, new: Option<NodeKey>) {
        let Some(casing) = self.casing_by_key(key) else {
            return;
        };
        let pos = casing.pos();
        let old = casing.neighbor(face);
        let wired = casing.forwarder(face).map(|f| f.sink());
        if old == new && wired == new {
            return;
        }

        let far = face.opposite();
        let mut touched = Vec::new();

        if let Some(old_key) = old.filter(|o| Some(*o) != new) {
            if let Some(other) = self.casing_mut(old_key) {
                if other.neighbor(far) == Some(key) {
                    other.set_neighbor_ref(far, None);
                    other.remove_forwarder(far);
                }
            }
            debug!(%pos, %face, "link severed");
            self.record(GridEvent::LinkSevered { pos, face });
            touched.push(old_key);
        }

        match new {
            Some(new_key) => {
                self.evict(key, face);
                self.evict(new_key, far);

                if let Some(casing) = self.casing_mut(key) {
                    casing.set_obstructed(face, false);
                    casing.set_neighbor_ref(face, Some(new_key));
                    casing.install_forwarder(face, new_key);
                }
                if let Some(other) = self.casing_mut(new_key) {
                    other.set_obstructed(far, false);
                    other.set_neighbor_ref(far, Some(key));
                    other.install_forwarder(far, key);
                }

                if old != new {
                    // The neighbor's owner must learn about the bridge too.
                    touched.push(new_key);
                    if let Some(neighbor) = self.pos_of(new_key) {
                        debug!(%pos, %face, %neighbor, "link established");
                        self.record(GridEvent::LinkEstablished {
                            pos,
                            face,
                            neighbor,
                        });
                    }
                }
            }
            None => {
                if let Some(casing) = self.casing_mut(key) {
                    casing.set_neighbor_ref(face, None);
                    casing.remove_forwarder(face);
                }
            }
        }

        self.schedule_scan_from(key);
        for other in touched {
            self.schedule_scan_from(other);
        }
    }

    /// Drop the real module on one face, if any.
    fn evict(&mut self, key: NodeKey, face: Face) {
        let Some(casing) = self.casing_mut(key) else {
            return;
        };
        let pos = casing.pos();
        if let Some(module) = casing.eject(face) {
            self.drop_module(pos, face, module);
        }
    }

    /// Ask the controller responsible for a casing to rescan.
    ///
    /// That is the casing's own controller, or failing that the nearest
    /// controller reachable through casings.
    pub(crate) fn schedule_scan_from(&mut self, key: NodeKey) {
        let owner = self
            .casing_by_key(key)
            .and_then(|c| c.controller())
            .filter(|owner| self.controller_by_key(*owner).is_some());

        let target = match owner {
            Some(owner) => Some(owner),
            None => self.pos_of(key).and_then(|pos| self.find_controller(pos)),
        };
        if let Some(controller) = target {
            self.schedule_scan(controller);
        }
    }

    /// Nearest controller reachable from `start` through casings.
    ///
    /// Gives up once more casings were visited than a controller could adopt,
    /// or when the search runs into an unloaded region; a scan would fail in
    /// either case.
    pub(crate) fn find_controller(&self, start: HexCoord) -> Option<NodeKey> {
        let max = self.config().max_casings;
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut casings = 0;

        while let Some(pos) = queue.pop_front() {
            match self.slot(pos) {
                Slot::Controller(controller) => return Some(controller),
                Slot::Casing(_) => {
                    casings += 1;
                    if casings > max {
                        return None;
                    }
                    if !self.enqueue_neighbors(pos, &mut visited, &mut queue) {
                        return None;
                    }
                }
                Slot::Empty | Slot::Unloaded => {}
            }
        }
        None
    }

    /// Re-derive every face of the node at `pos` from what surrounds it.
    pub(crate) fn refresh_node(&mut self, pos: HexCoord) {
        match self.slot(pos) {
            Slot::Casing(key) => self.refresh_casing(key, pos),
            Slot::Controller(key) => self.schedule_scan(key),
            Slot::Empty | Slot::Unloaded => {}
        }
    }

    fn refresh_casing(&mut self, key: NodeKey, pos: HexCoord) {
        let mut obstruction_changed = false;

        for (face, neighbor) in pos.neighbors() {
            let slot = self.slot(neighbor);
            let obstructed = matches!(slot, Slot::Controller(_));

            match slot {
                Slot::Casing(other) => self.set_neighbor(key, face, Some(other)),
                _ => self.set_neighbor(key, face, None),
            }

            let Some(casing) = self.casing_mut(key) else {
                return;
            };
            if casing.is_obstructed(face) != obstructed {
                casing.set_obstructed(face, obstructed);
                obstruction_changed = true;
            }
            if obstructed {
                self.evict(key, face);
            }

            // A second controller touching this cluster invalidates it.
            if let Slot::Controller(adjacent) = slot {
                let owner = self.casing_by_key(key).and_then(|c| c.controller());
                if let Some(owner) = owner.filter(|owner| *owner != adjacent) {
                    self.schedule_scan(owner);
                }
            }
        }

        if obstruction_changed {
            self.schedule_scan_from(key);
        }
    }
}
