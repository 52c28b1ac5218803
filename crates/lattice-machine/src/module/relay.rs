//! Pass-through module.

use lattice_topology::Face;
use serde::{Deserialize, Serialize};

use crate::error::PortError;
use crate::port::Ports;
use crate::Value;

/// Blocking read from `input`, then write to `output`.
///
/// The value is held across steps until the output channel accepts it; no
/// new value is read while one is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub input: Face,
    pub output: Face,
    #[serde(default)]
    pub held: Option<Value>,
}

impl Relay {
    pub fn new(input: Face, output: Face) -> Self {
        Self {
            input,
            output,
            held: None,
        }
    }

    pub fn step(&mut self, ports: &mut Ports<'_>) -> Result<(), PortError> {
        let value = match self.held {
            Some(value) => value,
            None => {
                let value = ports.read(self.input)?;
                self.held = Some(value);
                value
            }
        };

        if !ports.can_write(self.output) {
            return Err(PortError::WouldBlock);
        }
        ports.write(self.output, value)?;
        self.held = None;
        Ok(())
    }
}
