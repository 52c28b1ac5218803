//! Grid positions.
//!
//! Axial hexagonal coordinates (q, r) with an implicit third axis
//! s = -q - r, extended with a layer coordinate z.

use std::ops::{Add, Neg, Sub};

use crate::{Face, FACE_COUNT};

/// A cell position in the layered hexagonal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HexCoord {
    /// First axial coordinate
    pub q: i64,
    /// Second axial coordinate
    pub r: i64,
    /// Layer (vertical position)
    pub z: i64,
}

impl HexCoord {
    /// Origin of the coordinate system.
    pub const ORIGIN: Self = Self { q: 0, r: 0, z: 0 };

    /// Create a new coordinate.
    pub const fn new(q: i64, r: i64, z: i64) -> Self {
        Self { q, r, z }
    }

    /// Create a coordinate on layer 0.
    pub const fn planar(q: i64, r: i64) -> Self {
        Self { q, r, z: 0 }
    }

    /// The implicit third axis.
    pub const fn s(&self) -> i64 {
        -self.q - self.r
    }

    /// The cell behind `face`.
    #[inline]
    pub fn step(self, face: Face) -> Self {
        self + face.offset()
    }

    /// The 8 adjacent cells, paired with the face that leads to each.
    pub fn neighbors(self) -> [(Face, HexCoord); FACE_COUNT] {
        Face::ALL.map(|face| (face, self.step(face)))
    }

    /// The face of `self` that touches `other`, if the two cells are adjacent.
    pub fn face_towards(self, other: HexCoord) -> Option<Face> {
        let diff = other - self;
        Face::ALL.into_iter().find(|face| face.offset() == diff)
    }

    /// Steps between two cells when moving across faces.
    ///
    /// Planar distance is the hexagonal distance max(|dq|, |dr|, |ds|);
    /// each layer adds one more step.
    pub fn distance(&self, other: &Self) -> u64 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        dq.max(dr).max(ds) + (self.z - other.z).unsigned_abs()
    }

    /// The loading chunk containing this cell.
    pub fn chunk(&self, chunk_size: u32) -> ChunkCoord {
        let size = i64::from(chunk_size.max(1));
        ChunkCoord {
            q: self.q.div_euclid(size),
            r: self.r.div_euclid(size),
        }
    }
}

impl Add for HexCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            q: self.q + other.q,
            r: self.r + other.r,
            z: self.z + other.z,
        }
    }
}

impl Sub for HexCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            q: self.q - other.q,
            r: self.r - other.r,
            z: self.z - other.z,
        }
    }
}

impl Neg for HexCoord {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            q: -self.q,
            r: -self.r,
            z: -self.z,
        }
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.q, self.r, self.z)
    }
}

/// A vertical column of cells that is loaded or unloaded as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkCoord {
    pub q: i64,
    pub r: i64,
}

impl ChunkCoord {
    pub const fn new(q: i64, r: i64) -> Self {
        Self { q, r }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.q, self.r)
    }
}
