use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Serialize};

/// Direction in which all tiles slide.
///
/// The declaration order is the canonical order used for tie-breaking and as
/// the index of per-direction tables and network outputs.
///
/// # Example
///
/// ```
/// use arena2048_engine::Direction;
///
/// let dir: Direction = "Left".parse().unwrap();
/// assert_eq!(dir, Direction::Left);
/// assert_eq!(Direction::from_index(dir.index()), Some(dir));
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Distribution<Direction> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        Direction::ALL[rng.random_range(0..Direction::LEN)]
    }
}

impl Direction {
    /// Number of directions (4).
    pub const LEN: usize = 4;

    /// All directions in canonical order.
    pub const ALL: [Direction; Self::LEN] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::LEN {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Returns `true` if tiles travel along columns.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Returns `true` if tiles travel towards lower indices (top or left edge).
    #[must_use]
    pub const fn is_towards_origin(self) -> bool {
        matches!(self, Direction::Up | Direction::Left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for (i, dir) in Direction::ALL.into_iter().enumerate() {
            assert_eq!(dir.index(), i);
            assert_eq!(Direction::from_index(i), Some(dir));
        }
        assert_eq!(Direction::from_index(Direction::LEN), None);
    }

    #[test]
    fn test_parse_variant_names() {
        assert_eq!("Up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("Down".parse::<Direction>().unwrap(), Direction::Down);
        assert_eq!("Right".parse::<Direction>().unwrap(), Direction::Right);
        assert!("diagonal".parse::<Direction>().is_err());
    }

    #[test]
    fn test_serde_uses_variant_name() {
        let json = serde_json::to_string(&Direction::Left).unwrap();
        assert_eq!(json, "\"Left\"");
        let dir: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(dir, Direction::Left);
    }
}
