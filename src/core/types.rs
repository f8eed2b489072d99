//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Simulation turn counter
pub type Turn = u32;

/// Territory (map node) identifier
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "T{}", _0)]
pub struct TerritoryId(pub u32);

/// Faction (polity) identifier, owned by the diplomacy collaborator
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "F{}", _0)]
pub struct FactionId(pub u32);

/// Unique identifier for an army
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "A{}", _0)]
pub struct ArmyId(pub u32);

/// Unique identifier for a unit
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "U{}", _0)]
pub struct UnitId(pub u32);

/// Identifier of an archived battle record
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "B{}", _0)]
pub struct BattleId(pub u32);

/// Identifier of a siege
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "S{}", _0)]
pub struct SiegeId(pub u32);

/// Identifier of a war
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "W{}", _0)]
pub struct WarId(pub u32);

/// Person reference supplied by the roster collaborator (commanders)
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display(fmt = "P{}", _0)]
pub struct PersonId(pub u32);

/// Side of an engagement or war
///
/// War score uses the attacker-positive convention: a delta credited to the
/// attacker adds to the score, a delta credited to the defender subtracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }

    /// Sign applied to a score delta credited to this side
    pub fn sign(self) -> f32 {
        match self {
            Side::Attacker => 1.0,
            Side::Defender => -1.0,
        }
    }
}

/// Monotonic id source, one per id space
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_raw(&mut self) -> u32 {
        if self.next == 0 {
            self.next = 1;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    /// Make sure ids handed out later never collide with `used`
    pub fn reserve(&mut self, used: u32) {
        if used >= self.next {
            self.next = used + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        assert!(TerritoryId(1) < TerritoryId(2));
        assert!(ArmyId(3) > ArmyId(2));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(TerritoryId(7).to_string(), "T7");
        assert_eq!(WarId(2).to_string(), "W2");
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Attacker.sign(), 1.0);
        assert_eq!(Side::Defender.sign(), -1.0);
        assert_eq!(Side::Attacker.opposite(), Side::Defender);
    }

    #[test]
    fn test_allocator_starts_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_raw(), 1);
        assert_eq!(ids.next_raw(), 2);

        let mut defaulted = IdAllocator::default();
        assert_eq!(defaulted.next_raw(), 1);
    }

    #[test]
    fn test_allocator_reserve() {
        let mut ids = IdAllocator::new();
        ids.reserve(10);
        assert_eq!(ids.next_raw(), 11);
        ids.reserve(3);
        assert_eq!(ids.next_raw(), 12);
    }
}
