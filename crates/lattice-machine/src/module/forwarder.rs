//! Virtual modules bridging two adjacent casings.
//!
//! Whenever two casings touch, the face between them holds a forwarder on
//! each side. The pair is created and destroyed by the grid itself, never by
//! users.
//!
//! # Lanes
//!
//! A forwarder on face `B` of casing `X` with sink casing `Y` carries one lane
//! for every face `A` lateral to `B`:
//!
//! ```text
//! X: module on A --(A -> B)--> [forwarder on B] ==> [forwarder on B'] --(B' -> A)--> Y: module on A
//! ```
//!
//! where `B'` is the opposite of `B`. Each forwarder moves its own direction;
//! the one on `B'` carries the traffic back.

use lattice_topology::Face;

use crate::port::PipeGrid;
use crate::world::NodeKey;

/// One side of a linked forwarder pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forwarder {
    face: Face,
    sink: NodeKey,
}

impl Forwarder {
    pub(crate) fn new(face: Face, sink: NodeKey) -> Self {
        Self { face, sink }
    }

    /// Face this forwarder is mounted on.
    pub fn face(&self) -> Face {
        self.face
    }

    /// Casing receiving the values this forwarder moves.
    pub fn sink(&self) -> NodeKey {
        self.sink
    }

    /// Move settled values from this casing's pipes into the sink's pipes.
    ///
    /// A value stays in its inbound channel while the outbound channel is
    /// occupied. Returns the number of values moved.
    pub fn step(&self, here: &mut PipeGrid, there: &mut PipeGrid) -> usize {
        let far_face = self.face.opposite();
        let mut moved = 0;

        for lane in self.face.laterals() {
            let Some(inbound) = here.channel_mut(lane, self.face) else {
                continue;
            };
            let Some(value) = inbound.peek_settled() else {
                continue;
            };
            let Some(outbound) = there.channel_mut(far_face, lane) else {
                continue;
            };
            if !outbound.is_empty() {
                continue;
            }

            inbound.take();
            if outbound.deliver(value).is_ok() {
                moved += 1;
            }
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Forwarder, Forwarder) {
        (
            Forwarder::new(Face::East, NodeKey::default()),
            Forwarder::new(Face::West, NodeKey::default()),
        )
    }

    #[test]
    fn moves_value_to_same_lane_on_far_side() {
        let (east, _) = pair();
        let mut x = PipeGrid::new();
        let mut y = PipeGrid::new();

        x.ports(Face::Up, 0).write(Face::East, 99).unwrap();
        assert_eq!(east.step(&mut x, &mut y), 1);

        assert_eq!(x.pending(), 0);
        assert_eq!(y.ports(Face::Up, 0).read(Face::West), Ok(99));
    }

    #[test]
    fn never_moves_a_fresh_value_twice_in_one_phase() {
        let (east, _) = pair();
        let mut x = PipeGrid::new();
        let mut y = PipeGrid::new();

        x.channel_mut(Face::Up, Face::East).unwrap().deliver(5).unwrap();
        assert_eq!(east.step(&mut x, &mut y), 0);

        x.settle();
        assert_eq!(east.step(&mut x, &mut y), 1);
    }

    #[test]
    fn back_pressure_keeps_value_in_place() {
        let (east, _) = pair();
        let mut x = PipeGrid::new();
        let mut y = PipeGrid::new();

        x.ports(Face::Up, 0).write(Face::East, 1).unwrap();
        y.channel_mut(Face::West, Face::Up).unwrap().write(0).unwrap();

        assert_eq!(east.step(&mut x, &mut y), 0);
        assert_eq!(x.ports(Face::East, 0).peek(Face::Up), Some(1));

        y.ports(Face::Up, 0).read(Face::West).unwrap();
        assert_eq!(east.step(&mut x, &mut y), 1);
        assert_eq!(y.ports(Face::Up, 0).read(Face::West), Ok(1));
    }

    #[test]
    fn pair_relays_both_directions() {
        let (east, west) = pair();
        let mut x = PipeGrid::new();
        let mut y = PipeGrid::new();

        x.ports(Face::NorthEast, 0).write(Face::East, 10).unwrap();
        y.ports(Face::Down, 0).write(Face::West, 20).unwrap();

        assert_eq!(east.step(&mut x, &mut y), 1);
        assert_eq!(west.step(&mut y, &mut x), 1);

        assert_eq!(y.ports(Face::NorthEast, 0).read(Face::West), Ok(10));
        assert_eq!(x.ports(Face::Down, 0).read(Face::East), Ok(20));
    }

    #[test]
    fn moves_every_lane_in_one_step() {
        let (east, _) = pair();
        let mut x = PipeGrid::new();
        let mut y = PipeGrid::new();

        for (i, lane) in Face::East.laterals().enumerate() {
            x.ports(lane, 0).write(Face::East, i as i16).unwrap();
        }
        assert_eq!(east.step(&mut x, &mut y), 6);
        for (i, lane) in Face::East.laterals().enumerate() {
            assert_eq!(y.ports(lane, 0).read(Face::West), Ok(i as i16));
        }
    }
}
