//! Casings: the grid cells that host modules.
//!
//! A casing owns one module slot per face and the channels connecting those
//! slots. It does not tick by itself; the controller owning its cluster
//! drives it through [`Casing::step_modules`] and the grid's pipes phase.
//!
//! # Face invariant
//!
//! A face is in exactly one of three situations:
//! - **linked**: a neighboring casing sits behind it and the slot holds a forwarder
//! - **obstructed**: a controller sits behind it and the slot is empty
//! - **open**: the slot may hold a real module

use lattice_topology::{Face, HexCoord, FACE_COUNT};
use tracing::{trace, warn};

use crate::error::{Error, PortError, Result};
use crate::module::{ComputeModule, Forwarder, Module};
use crate::port::PipeGrid;
use crate::world::NodeKey;

/// A module step that failed with a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFault {
    pub pos: HexCoord,
    pub face: Face,
    pub error: PortError,
}

/// A grid cell hosting up to one module per face.
#[derive(Debug, Clone)]
pub struct Casing {
    pos: HexCoord,
    modules: [Option<Module>; FACE_COUNT],
    neighbors: [Option<NodeKey>; FACE_COUNT],
    obstructed: [bool; FACE_COUNT],
    controller: Option<NodeKey>,
    pipes: PipeGrid,
    enabled: bool,
}

impl Casing {
    pub fn new(pos: HexCoord) -> Self {
        Self {
            pos,
            modules: Default::default(),
            neighbors: [None; FACE_COUNT],
            obstructed: [false; FACE_COUNT],
            controller: None,
            pipes: PipeGrid::new(),
            enabled: false,
        }
    }

    pub fn pos(&self) -> HexCoord {
        self.pos
    }

    pub fn module(&self, face: Face) -> Option<&Module> {
        self.modules[face.index()].as_ref()
    }

    /// The real module on `face`, if any.
    pub fn compute(&self, face: Face) -> Option<&ComputeModule> {
        self.module(face).and_then(Module::as_compute)
    }

    pub fn forwarder(&self, face: Face) -> Option<&Forwarder> {
        self.module(face).and_then(Module::as_forwarder)
    }

    /// Faces currently holding a module, with the module.
    pub fn modules(&self) -> impl Iterator<Item = (Face, &Module)> {
        Face::ALL
            .into_iter()
            .filter_map(|face| self.module(face).map(|m| (face, m)))
    }

    pub fn neighbor(&self, face: Face) -> Option<NodeKey> {
        self.neighbors[face.index()]
    }

    pub fn is_linked(&self, face: Face) -> bool {
        self.neighbors[face.index()].is_some()
    }

    pub fn is_obstructed(&self, face: Face) -> bool {
        self.obstructed[face.index()]
    }

    /// Controller currently owning this casing.
    pub fn controller(&self) -> Option<NodeKey> {
        self.controller
    }

    /// Cached copy of the owning controller's running flag.
    ///
    /// Kept for observers without access to the controller; the grid's
    /// `is_enabled` is authoritative.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn pipes(&self) -> &PipeGrid {
        &self.pipes
    }

    /// Install a real module on `face`, or clear it with `None`.
    ///
    /// Returns the module previously installed there. Fails without changing
    /// anything when the face is linked or obstructed.
    pub fn set_module(
        &mut self,
        face: Face,
        module: Option<ComputeModule>,
    ) -> Result<Option<ComputeModule>> {
        if self.is_linked(face) {
            return Err(Error::SlotOccupiedByLink { pos: self.pos, face });
        }
        if self.is_obstructed(face) && module.is_some() {
            return Err(Error::FaceObstructed { pos: self.pos, face });
        }

        let previous = self.replace(face, module.map(Module::Compute));
        Ok(previous.and_then(|m| match m {
            Module::Compute(module) => Some(module),
            Module::Forwarder(_) => None,
        }))
    }

    /// Step every real module once, in face order.
    ///
    /// A module that suspends on a port simply ends its step. A module that
    /// violates the channel protocol is reported and skipped for the rest of
    /// the tick; the other modules still run.
    pub fn step_modules(&mut self, tick: u64) -> Vec<ModuleFault> {
        self.pipes.settle();

        let mut faults = Vec::new();
        for face in Face::ALL {
            let Some(Module::Compute(module)) = &mut self.modules[face.index()] else {
                continue;
            };
            match module.step(&mut self.pipes.ports(face, tick)) {
                Ok(()) => {}
                Err(PortError::WouldBlock) => {
                    trace!(pos = %self.pos, %face, "module suspended");
                }
                Err(error) => {
                    warn!(pos = %self.pos, %face, kind = module.kind(), %error, "module step faulted");
                    faults.push(ModuleFault {
                        pos: self.pos,
                        face,
                        error,
                    });
                }
            }
        }
        faults
    }

    /// Forwarders on this casing, with the face they sit on.
    pub fn forwarders(&self) -> impl Iterator<Item = (Face, Forwarder)> + '_ {
        Face::ALL
            .into_iter()
            .filter_map(|face| self.forwarder(face).map(|f| (face, *f)))
    }

    pub(crate) fn pipes_mut(&mut self) -> &mut PipeGrid {
        &mut self.pipes
    }

    fn replace(&mut self, face: Face, module: Option<Module>) -> Option<Module> {
        let previous = std::mem::replace(&mut self.modules[face.index()], module);
        if previous.is_some() || self.modules[face.index()].is_some() {
            self.pipes.reset_face(face);
        }
        previous
    }

    pub(crate) fn install_forwarder(&mut self, face: Face, sink: NodeKey) -> Option<Module> {
        self.replace(face, Some(Module::Forwarder(Forwarder::new(face, sink))))
    }

    /// Remove the forwarder on `face`. Real modules are left alone.
    pub(crate) fn remove_forwarder(&mut self, face: Face) -> bool {
        if self.forwarder(face).is_some() {
            self.replace(face, None);
            true
        } else {
            false
        }
    }

    /// Take the real module off `face`. Forwarders are left alone.
    pub(crate) fn eject(&mut self, face: Face) -> Option<ComputeModule> {
        if self.compute(face).is_none() {
            return None;
        }
        match self.replace(face, None) {
            Some(Module::Compute(module)) => Some(module),
            _ => None,
        }
    }

    /// Take every real module off the casing.
    pub(crate) fn eject_all(&mut self) -> Vec<(Face, ComputeModule)> {
        Face::ALL
            .into_iter()
            .filter_map(|face| self.eject(face).map(|m| (face, m)))
            .collect()
    }

    pub(crate) fn set_neighbor_ref(&mut self, face: Face, neighbor: Option<NodeKey>) {
        self.neighbors[face.index()] = neighbor;
    }

    pub(crate) fn set_obstructed(&mut self, face: Face, obstructed: bool) {
        self.obstructed[face.index()] = obstructed;
    }

    pub(crate) fn set_controller(&mut self, controller: Option<NodeKey>) {
        self.controller = controller;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
