//! Lattice Machine
//!
//! A grid of casings hosting compute modules, driven in lockstep by cluster
//! controllers.
//!
//! # Model
//!
//! - A **casing** has one module slot per face of its hexagonal prism. Modules
//!   on different faces of one casing talk through single-slot channels.
//! - Where two casings touch, the grid installs a **forwarder** on each side
//!   of the shared face. Forwarders carry values across the boundary.
//! - A **controller** discovers every casing reachable from it with a bounded
//!   breadth-first scan, adopts them as its cluster, and ticks them.
//!
//! # Ticks
//!
//! A cluster tick has two phases. First every real module of every casing
//! steps (`step_modules`), then every forwarder of every casing steps
//! (`step_pipes`). A value written next to a boundary therefore crosses it
//! exactly one tick later than a value delivered inside one casing.
//!
//! # Example
//!
//! ```
//! use lattice_machine::{Emitter, Face, HexCoord, Probe, World};
//!
//! let mut world = World::default();
//! world.place_controller(HexCoord::ORIGIN).unwrap();
//! let casing = HexCoord::new(1, 0, 0);
//! world.place_casing(casing).unwrap();
//! world.set_module(casing, Face::East, Some(Emitter::new(Face::Up).into())).unwrap();
//! world.set_module(casing, Face::Up, Some(Probe::new().into())).unwrap();
//!
//! world.tick();
//! let probe = world.casing(casing).unwrap().compute(Face::Up).unwrap();
//! assert_eq!(probe.as_probe().unwrap().values(), vec![0]);
//! ```

mod casing;
mod channel;
mod config;
mod controller;
mod error;
mod events;
mod module;
mod notifier;
mod persist;
mod port;
mod world;

pub use casing::{Casing, ModuleFault};
pub use channel::Channel;
pub use config::{GridConfig, CHUNK_SIZE, EVENT_CAPACITY, MAX_CASINGS};
pub use controller::{Controller, ControllerState};
pub use error::{ChannelBusy, Error, PortError, Result, ScanFailure};
pub use events::{GridEvent, NodeKind, Recorded, WorldObserver};
pub use module::{ComputeModule, Emitter, Forwarder, Module, Probe, Reading, Relay};
pub use persist::{SavedNode, WorldSnapshot};
pub use port::{PipeGrid, Ports};
pub use world::{Node, NodeKey, TickReport, World};

pub use lattice_topology::{ChunkCoord, Face, HexCoord};

/// A word carried by a channel.
pub type Value = i16;
