//! The eight faces of a hexagonal prism casing.

use crate::{HexCoord, FACE_COUNT};

/// A face of a casing, and the direction it points in.
///
/// The declaration order is the canonical iteration order. Casings step the
/// modules on their faces in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Face {
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
    Up,
    Down,
}

impl Face {
    /// All faces in canonical order.
    pub const ALL: [Face; FACE_COUNT] = [
        Face::East,
        Face::NorthEast,
        Face::NorthWest,
        Face::West,
        Face::SouthWest,
        Face::SouthEast,
        Face::Up,
        Face::Down,
    ];

    /// Position of this face in [`Face::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Face at the given canonical index, if any.
    pub const fn from_index(index: usize) -> Option<Face> {
        if index < FACE_COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// The face pointing the other way.
    pub const fn opposite(self) -> Face {
        match self {
            Face::East => Face::West,
            Face::NorthEast => Face::SouthWest,
            Face::NorthWest => Face::SouthEast,
            Face::West => Face::East,
            Face::SouthWest => Face::NorthEast,
            Face::SouthEast => Face::NorthWest,
            Face::Up => Face::Down,
            Face::Down => Face::Up,
        }
    }

    /// Unit step from a casing to the cell behind this face.
    pub const fn offset(self) -> HexCoord {
        match self {
            Face::East => HexCoord::new(1, 0, 0),
            Face::NorthEast => HexCoord::new(1, -1, 0),
            Face::NorthWest => HexCoord::new(0, -1, 0),
            Face::West => HexCoord::new(-1, 0, 0),
            Face::SouthWest => HexCoord::new(-1, 1, 0),
            Face::SouthEast => HexCoord::new(0, 1, 0),
            Face::Up => HexCoord::new(0, 0, 1),
            Face::Down => HexCoord::new(0, 0, -1),
        }
    }

    /// True for the two layer-crossing faces.
    pub const fn is_vertical(self) -> bool {
        matches!(self, Face::Up | Face::Down)
    }

    /// True when `other` is neither this face nor its opposite.
    pub fn is_lateral_to(self, other: Face) -> bool {
        other != self && other != self.opposite()
    }

    /// The six faces lateral to this one, in canonical order.
    pub fn laterals(self) -> impl Iterator<Item = Face> {
        Self::ALL.into_iter().filter(move |&f| self.is_lateral_to(f))
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Face::East => "east",
            Face::NorthEast => "north-east",
            Face::NorthWest => "north-west",
            Face::West => "west",
            Face::SouthWest => "south-west",
            Face::SouthEast => "south-east",
            Face::Up => "up",
            Face::Down => "down",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for face in Face::ALL {
            assert_ne!(face, face.opposite());
            assert_eq!(face.opposite().opposite(), face);
        }
    }

    #[test]
    fn opposite_offsets_cancel() {
        for face in Face::ALL {
            assert_eq!(face.offset() + face.opposite().offset(), HexCoord::ORIGIN);
        }
    }

    #[test]
    fn index_round_trips() {
        for (i, face) in Face::ALL.iter().enumerate() {
            assert_eq!(face.index(), i);
            assert_eq!(Face::from_index(i), Some(*face));
        }
        assert_eq!(Face::from_index(FACE_COUNT), None);
    }

    #[test]
    fn laterals_exclude_self_and_opposite() {
        let laterals: Vec<_> = Face::East.laterals().collect();
        assert_eq!(
            laterals,
            vec![
                Face::NorthEast,
                Face::NorthWest,
                Face::SouthWest,
                Face::SouthEast,
                Face::Up,
                Face::Down,
            ]
        );
    }

    #[test]
    fn lateral_relation_symmetric() {
        for a in Face::ALL {
            for b in Face::ALL {
                assert_eq!(a.is_lateral_to(b), b.is_lateral_to(a));
            }
        }
    }

    #[test]
    fn lateral_survives_boundary_crossing() {
        // A lane lateral to a face is also lateral to the opposite face,
        // which is what lets forwarders map lanes one to one.
        for face in Face::ALL {
            for lane in face.laterals() {
                assert!(face.opposite().is_lateral_to(lane));
            }
        }
    }

    #[test]
    fn vertical_faces() {
        let vertical: Vec<_> = Face::ALL.into_iter().filter(|f| f.is_vertical()).collect();
        assert_eq!(vertical, vec![Face::Up, Face::Down]);
    }
}
