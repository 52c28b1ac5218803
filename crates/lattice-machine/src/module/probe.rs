//! Recording sink.

use lattice_topology::Face;
use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::port::Ports;
use crate::Value;

/// One value received by a [`Probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub tick: u64,
    pub port: Face,
    pub value: Value,
}

/// Drains every lateral port holding a value each step and records it.
///
/// Idle ports are left alone: the probe never marks itself as waiting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default)]
    pub readings: Vec<Reading>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, ports: &mut Ports<'_>) -> Result<(), PortError> {
        let tick = ports.tick();
        for port in ports.face().laterals() {
            // Only idle ports are skipped; a probe never waits on a channel.
            if ports.peek(port).is_none() {
                continue;
            }
            let value = ports.read(port)?;
            self.readings.push(Reading { tick, port, value });
        }
        Ok(())
    }

    /// Values received, in arrival order.
    pub fn values(&self) -> Vec<Value> {
        self.readings.iter().map(|r| r.value).collect()
    }
}
