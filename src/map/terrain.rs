//! Terrain kinds and their effect on movement and combat

use serde::{Deserialize, Serialize};

use crate::military::unit::UnitKind;

/// Terrain of a territory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Plains,
    Hills,
    Mountains,
    Forest,
    Desert,
    Coastal,
    River,
    Swamp,
    Sea,
}

impl Terrain {
    /// Multiplier on the cost of entering this terrain, `None` if the unit
    /// kind cannot enter it at all
    pub fn movement_modifier(&self, kind: UnitKind) -> Option<f32> {
        use UnitKind::*;
        match (self, kind) {
            // Ships stay on water
            (Self::Sea, Naval) => Some(1.0),
            (Self::Sea, _) => None,
            (Self::Coastal | Self::River, Naval) => Some(1.2),
            (_, Naval) => None,

            (Self::Plains, _) => Some(1.0),
            (Self::Coastal, _) => Some(1.0),
            (Self::Desert, _) => Some(1.3),
            (Self::River, _) => Some(1.2),
            (Self::Hills, Siege) => Some(2.0),
            (Self::Hills, _) => Some(1.5),
            (Self::Forest, Cavalry) => Some(2.0),
            (Self::Forest, Siege) => Some(2.0),
            (Self::Forest, _) => Some(1.5),
            (Self::Mountains, Cavalry) => Some(3.0),
            (Self::Mountains, Siege) => Some(3.5),
            (Self::Mountains, _) => Some(2.5),
            (Self::Swamp, Infantry) => Some(2.0),
            (Self::Swamp, _) => Some(3.0),
        }
    }

    /// Multiplier on the attacking side's strength
    pub fn attacker_penalty(&self) -> f32 {
        match self {
            Self::Plains => 1.0,
            Self::Hills => 0.85,
            Self::Mountains => 0.7,
            Self::Forest => 0.85,
            Self::Desert => 1.0,
            Self::Coastal => 1.0,
            Self::River => 0.9, // Contested crossing
            Self::Swamp => 0.8,
            Self::Sea => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_is_naval_only() {
        assert_eq!(Terrain::Sea.movement_modifier(UnitKind::Naval), Some(1.0));
        for kind in [UnitKind::Infantry, UnitKind::Cavalry, UnitKind::Siege] {
            assert_eq!(Terrain::Sea.movement_modifier(kind), None);
        }
    }

    #[test]
    fn test_ships_cannot_go_inland() {
        assert_eq!(Terrain::Plains.movement_modifier(UnitKind::Naval), None);
        assert!(Terrain::Coastal.movement_modifier(UnitKind::Naval).is_some());
    }

    #[test]
    fn test_mountains_slower_than_plains() {
        for kind in [UnitKind::Infantry, UnitKind::Cavalry, UnitKind::Siege] {
            let plains = Terrain::Plains.movement_modifier(kind).unwrap();
            let mountains = Terrain::Mountains.movement_modifier(kind).unwrap();
            assert!(mountains > plains);
        }
    }

    #[test]
    fn test_defensible_terrain_penalizes_attacker() {
        assert_eq!(Terrain::Plains.attacker_penalty(), 1.0);
        assert!(Terrain::Hills.attacker_penalty() < 1.0);
        assert!(Terrain::Mountains.attacker_penalty() < Terrain::Hills.attacker_penalty());
    }
}
