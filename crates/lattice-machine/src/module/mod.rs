//! Modules mounted on casing faces.
//!
//! The set of module kinds is closed. Real compute modules are stepped in the
//! modules phase of a tick; forwarders are stepped in the pipes phase.

mod emitter;
mod forwarder;
mod probe;
mod relay;

pub use emitter::Emitter;
pub use forwarder::Forwarder;
pub use probe::{Probe, Reading};
pub use relay::Relay;

use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::port::Ports;

/// Anything that can occupy a casing face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Module {
    Forwarder(Forwarder),
    Compute(ComputeModule),
}

impl Module {
    pub fn is_forwarder(&self) -> bool {
        matches!(self, Module::Forwarder(_))
    }

    pub fn as_forwarder(&self) -> Option<&Forwarder> {
        match self {
            Module::Forwarder(forwarder) => Some(forwarder),
            Module::Compute(_) => None,
        }
    }

    pub fn as_compute(&self) -> Option<&ComputeModule> {
        match self {
            Module::Compute(module) => Some(module),
            Module::Forwarder(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Module::Forwarder(_) => "forwarder",
            Module::Compute(module) => module.kind(),
        }
    }
}

impl From<ComputeModule> for Module {
    fn from(module: ComputeModule) -> Self {
        Module::Compute(module)
    }
}

/// A user-installable module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputeModule {
    Emitter(Emitter),
    Relay(Relay),
    Probe(Probe),
}

impl ComputeModule {
    /// Run one step against the ports of the face the module is mounted on.
    pub fn step(&mut self, ports: &mut Ports<'_>) -> Result<(), PortError> {
        match self {
            ComputeModule::Emitter(m) => m.step(ports),
            ComputeModule::Relay(m) => m.step(ports),
            ComputeModule::Probe(m) => m.step(ports),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ComputeModule::Emitter(_) => "emitter",
            ComputeModule::Relay(_) => "relay",
            ComputeModule::Probe(_) => "probe",
        }
    }

    pub fn as_probe(&self) -> Option<&Probe> {
        match self {
            ComputeModule::Probe(probe) => Some(probe),
            _ => None,
        }
    }
}

impl From<Emitter> for ComputeModule {
    fn from(m: Emitter) -> Self {
        ComputeModule::Emitter(m)
    }
}

impl From<Relay> for ComputeModule {
    fn from(m: Relay) -> Self {
        ComputeModule::Relay(m)
    }
}

impl From<Probe> for ComputeModule {
    fn from(m: Probe) -> Self {
        ComputeModule::Probe(m)
    }
}
