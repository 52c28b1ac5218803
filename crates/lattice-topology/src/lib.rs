//! Lattice Grid Topology
//!
//! Geometry of the casing grid: hexagonal prisms stacked in layers.
//!
//! # Layout
//!
//! Positions use axial hexagonal coordinates (q, r) plus a layer z.
//! Every cell is a hexagonal prism with 8 faces:
//! - 6 planar faces (hexagonal grid)
//! - 2 vertical faces (layers above/below)
//!
//! Two faces are *lateral* to each other when they are neither equal nor
//! opposite. Each face has exactly 6 lateral faces, and those are the faces a
//! module mounted on it can exchange data with inside its own casing.
//!
//! # Loading
//!
//! The grid is divided into vertical chunk columns. A chunk is either loaded
//! or not; positions in unloaded chunks cannot be resolved.

mod coord;
mod face;

pub use coord::{ChunkCoord, HexCoord};
pub use face::Face;

/// Number of faces per casing (invariant: always 8)
pub const FACE_COUNT: usize = 8;

/// Planar faces (hexagonal grid)
pub const PLANAR_FACES: usize = 6;

/// Vertical faces (up/down layers)
pub const VERTICAL_FACES: usize = 2;

/// Faces lateral to any given face: all faces except itself and its opposite
pub const LATERAL_FACES: usize = FACE_COUNT - 2;

const _: () = assert!(PLANAR_FACES + VERTICAL_FACES == FACE_COUNT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_invariant() {
        assert_eq!(Face::ALL.len(), FACE_COUNT);
        assert_eq!(PLANAR_FACES + VERTICAL_FACES, FACE_COUNT);
    }

    #[test]
    fn every_face_has_six_laterals() {
        for face in Face::ALL {
            assert_eq!(face.laterals().count(), LATERAL_FACES);
        }
    }
}
