//! Port endpoints inside a casing.
//!
//! Every casing owns one directed [`Channel`] per ordered pair of lateral
//! faces. A module on face `F` writes on port `T` into channel `F -> T` and
//! reads on port `S` from channel `S -> F`. Channels between a face and its
//! opposite do not exist.

use lattice_topology::{Face, FACE_COUNT};

use crate::channel::Channel;
use crate::error::PortError;
use crate::Value;

/// All channels of one casing, indexed `[from][to]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeGrid {
    channels: [[Channel; FACE_COUNT]; FACE_COUNT],
}

impl PipeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel carrying values from the module on `from` to the module on `to`.
    pub fn channel(&self, from: Face, to: Face) -> Option<&Channel> {
        from.is_lateral_to(to)
            .then(|| &self.channels[from.index()][to.index()])
    }

    pub fn channel_mut(&mut self, from: Face, to: Face) -> Option<&mut Channel> {
        if from.is_lateral_to(to) {
            Some(&mut self.channels[from.index()][to.index()])
        } else {
            None
        }
    }

    /// Clear freshness on every channel.
    pub fn settle(&mut self) {
        self.channels
            .iter_mut()
            .flatten()
            .for_each(Channel::settle);
    }

    /// Reset every channel into or out of `face`.
    pub fn reset_face(&mut self, face: Face) {
        for other in face.laterals() {
            self.channels[face.index()][other.index()].reset();
            self.channels[other.index()][face.index()].reset();
        }
    }

    /// Number of channels currently holding a value.
    pub fn pending(&self) -> usize {
        self.channels
            .iter()
            .flatten()
            .filter(|ch| !ch.is_empty())
            .count()
    }

    /// Ports view for the module mounted on `face`.
    pub fn ports(&mut self, face: Face, tick: u64) -> Ports<'_> {
        Ports {
            face,
            tick,
            pipes: self,
        }
    }
}

/// The port endpoints of one module, borrowed for the duration of its step.
#[derive(Debug)]
pub struct Ports<'a> {
    face: Face,
    tick: u64,
    pipes: &'a mut PipeGrid,
}

impl Ports<'_> {
    /// Face the module is mounted on.
    pub fn face(&self) -> Face {
        self.face
    }

    /// Logical tick of the owning cluster.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether a write on `port` would currently succeed.
    pub fn can_write(&self, port: Face) -> bool {
        self.pipes
            .channel(self.face, port)
            .is_some_and(Channel::is_empty)
    }

    /// Write `value` towards the module on face `port`.
    pub fn write(&mut self, port: Face, value: Value) -> Result<(), PortError> {
        let face = self.face;
        let channel = self
            .pipes
            .channel_mut(face, port)
            .ok_or(PortError::NotLateral { face, port })?;
        channel
            .write(value)
            .map_err(|_| PortError::ChannelBusy { from: face, to: port })
    }

    /// Read the value sent by the module on face `port`.
    ///
    /// Returns [`PortError::WouldBlock`] when nothing has arrived; the reader
    /// is then marked as waiting on that channel.
    pub fn read(&mut self, port: Face) -> Result<Value, PortError> {
        let face = self.face;
        let channel = self
            .pipes
            .channel_mut(port, face)
            .ok_or(PortError::NotLateral { face, port })?;
        channel.read().ok_or(PortError::WouldBlock)
    }

    /// The value waiting on `port`, without consuming it.
    pub fn peek(&self, port: Face) -> Option<Value> {
        self.pipes.channel(port, self.face).and_then(Channel::peek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_lands_in_readers_port() {
        let mut pipes = PipeGrid::new();
        pipes.ports(Face::East, 0).write(Face::Up, 11).unwrap();

        let mut reader = pipes.ports(Face::Up, 0);
        assert_eq!(reader.peek(Face::East), Some(11));
        assert_eq!(reader.read(Face::East), Ok(11));
        assert_eq!(reader.read(Face::East), Err(PortError::WouldBlock));
    }

    #[test]
    fn opposite_and_self_ports_do_not_exist() {
        let mut pipes = PipeGrid::new();
        let mut ports = pipes.ports(Face::East, 0);
        assert_eq!(
            ports.write(Face::West, 1),
            Err(PortError::NotLateral { face: Face::East, port: Face::West })
        );
        assert_eq!(
            ports.read(Face::East),
            Err(PortError::NotLateral { face: Face::East, port: Face::East })
        );
        assert!(!ports.can_write(Face::West));
    }

    #[test]
    fn double_write_reports_busy_channel() {
        let mut pipes = PipeGrid::new();
        let mut ports = pipes.ports(Face::Up, 0);
        ports.write(Face::East, 1).unwrap();
        assert!(!ports.can_write(Face::East));
        assert_eq!(
            ports.write(Face::East, 2),
            Err(PortError::ChannelBusy { from: Face::Up, to: Face::East })
        );
        assert_eq!(pipes.ports(Face::East, 0).read(Face::Up), Ok(1));
    }

    #[test]
    fn channels_are_directional() {
        let mut pipes = PipeGrid::new();
        pipes.ports(Face::East, 0).write(Face::Up, 1).unwrap();
        // East can still receive from Up independently.
        pipes.ports(Face::Up, 0).write(Face::East, 2).unwrap();
        assert_eq!(pipes.pending(), 2);
        assert_eq!(pipes.ports(Face::East, 0).read(Face::Up), Ok(2));
        assert_eq!(pipes.ports(Face::Up, 0).read(Face::East), Ok(1));
    }

    #[test]
    fn reset_face_only_touches_that_face() {
        let mut pipes = PipeGrid::new();
        pipes.ports(Face::East, 0).write(Face::Up, 1).unwrap();
        pipes.ports(Face::NorthEast, 0).write(Face::Down, 2).unwrap();
        pipes.reset_face(Face::Up);
        assert_eq!(pipes.pending(), 1);
        assert_eq!(pipes.ports(Face::Down, 0).peek(Face::NorthEast), Some(2));
    }
}
