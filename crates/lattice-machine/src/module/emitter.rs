//! Counter source.

use lattice_topology::Face;
use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::port::Ports;
use crate::Value;

/// Writes an arithmetic sequence on one port, one value per step.
///
/// A `burst` above 1 makes the emitter write several values per step into a
/// single-slot channel, which the channel rejects with `ChannelBusy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emitter {
    pub port: Face,
    #[serde(default)]
    pub next: Value,
    #[serde(default = "default_increment")]
    pub increment: Value,
    #[serde(default = "default_burst")]
    pub burst: u8,
}

fn default_increment() -> Value {
    1
}

fn default_burst() -> u8 {
    1
}

impl Emitter {
    pub fn new(port: Face) -> Self {
        Self {
            port,
            next: 0,
            increment: default_increment(),
            burst: default_burst(),
        }
    }

    pub fn starting_at(mut self, next: Value) -> Self {
        self.next = next;
        self
    }

    pub fn with_increment(mut self, increment: Value) -> Self {
        self.increment = increment;
        self
    }

    pub fn with_burst(mut self, burst: u8) -> Self {
        self.burst = burst;
        self
    }

    pub fn step(&mut self, ports: &mut Ports<'_>) -> Result<(), PortError> {
        if !ports.can_write(self.port) {
            let face = ports.face();
            if !face.is_lateral_to(self.port) {
                return Err(PortError::NotLateral { face, port: self.port });
            }
            return Err(PortError::WouldBlock);
        }

        for _ in 0..self.burst.max(1) {
            ports.write(self.port, self.next)?;
            self.next = self.next.wrapping_add(self.increment);
        }
        Ok(())
    }
}
