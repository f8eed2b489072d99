//! Unit kinds and their stat records
//!
//! Every kind maps to one row of a static table; nothing else in the crate
//! branches on unit kind for raw stats.

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionId, UnitId};

/// Kind of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Infantry,
    Cavalry,
    Siege,
    Naval,
}

/// Base stats for a unit kind, per troop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub attack: f32,
    pub defense: f32,
    /// Movement cost paid per turn
    pub speed: f32,
    pub upkeep: f32,
    /// Contribution to siege progress
    pub siege_power: f32,
}

const UNIT_STATS: [UnitStats; 4] = [
    // Infantry
    UnitStats {
        attack: 1.0,
        defense: 1.0,
        speed: 1.0,
        upkeep: 1.0,
        siege_power: 1.0,
    },
    // Cavalry
    UnitStats {
        attack: 1.5,
        defense: 0.8,
        speed: 2.0,
        upkeep: 2.5,
        siege_power: 0.5,
    },
    // Siege engines and crews
    UnitStats {
        attack: 0.5,
        defense: 0.3,
        speed: 0.5,
        upkeep: 3.0,
        siege_power: 4.0,
    },
    // Naval
    UnitStats {
        attack: 1.0,
        defense: 1.0,
        speed: 1.5,
        upkeep: 2.0,
        siege_power: 0.0,
    },
];

impl UnitKind {
    pub fn stats(self) -> &'static UnitStats {
        &UNIT_STATS[self as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Infantry => "Infantry",
            UnitKind::Cavalry => "Cavalry",
            UnitKind::Siege => "Siege Train",
            UnitKind::Naval => "Flotilla",
        }
    }
}

/// Which stat a unit fights with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatRole {
    Attack,
    Defense,
}

/// A body of troops belonging to one faction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub faction: FactionId,
    pub name: String,
    pub kind: UnitKind,
    /// Troop count; 0 means the unit is disbanded
    pub size: u32,
    /// Multiplier >= 0
    pub quality: f32,
    /// 0.0 - 1.0, grows with survived battles
    pub experience: f32,
    /// 0.0 - 1.0, falls with losses and recovers out of combat
    pub morale: f32,
}

impl Unit {
    pub fn new(id: UnitId, faction: FactionId, kind: UnitKind, size: u32) -> Self {
        Self {
            id,
            faction,
            name: kind.label().to_string(),
            kind,
            size,
            quality: 1.0,
            experience: 0.0,
            morale: 1.0,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality.max(0.0);
        self
    }

    pub fn with_experience(mut self, experience: f32) -> Self {
        self.experience = experience.clamp(0.0, 1.0);
        self
    }

    pub fn with_morale(mut self, morale: f32) -> Self {
        self.morale = morale.clamp(0.0, 1.0);
        self
    }

    pub fn stats(&self) -> &'static UnitStats {
        self.kind.stats()
    }

    pub fn is_disbanded(&self) -> bool {
        self.size == 0
    }

    /// Troops-weighted multiplier shared by combat and siege power
    fn effectiveness(&self, experience_scale: f32) -> f32 {
        self.size as f32
            * self.quality
            * (1.0 + self.experience * experience_scale)
            * self.morale
    }

    /// `size × quality × (1 + experience bonus) × morale × base stat`
    pub fn combat_power(&self, role: CombatRole, experience_scale: f32) -> f32 {
        let base = match role {
            CombatRole::Attack => self.stats().attack,
            CombatRole::Defense => self.stats().defense,
        };
        self.effectiveness(experience_scale) * base
    }

    pub fn siege_power(&self, experience_scale: f32) -> f32 {
        self.effectiveness(experience_scale) * self.stats().siege_power
    }

    /// Remove up to `casualties` troops, returns how many were removed
    pub fn apply_casualties(&mut self, casualties: u32) -> u32 {
        let removed = casualties.min(self.size);
        self.size -= removed;
        removed
    }

    pub fn gain_experience(&mut self, amount: f32) {
        self.experience = (self.experience + amount).clamp(0.0, 1.0);
    }

    pub fn lose_morale(&mut self, amount: f32) {
        self.morale = (self.morale - amount.max(0.0)).max(0.0);
    }

    pub fn recover_morale(&mut self, amount: f32) {
        self.morale = (self.morale + amount.max(0.0)).min(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infantry(size: u32) -> Unit {
        Unit::new(UnitId(1), FactionId(1), UnitKind::Infantry, size)
    }

    #[test]
    fn test_stat_table_lookup() {
        assert_eq!(UnitKind::Infantry.stats().attack, 1.0);
        assert!(UnitKind::Cavalry.stats().speed > UnitKind::Infantry.stats().speed);
        assert!(UnitKind::Siege.stats().siege_power > UnitKind::Infantry.stats().siege_power);
        assert_eq!(UnitKind::Naval.stats().siege_power, 0.0);
    }

    #[test]
    fn test_combat_power_formula() {
        let unit = infantry(100)
            .with_quality(1.2)
            .with_experience(0.5)
            .with_morale(0.5);

        // 100 * 1.2 * (1 + 0.5 * 0.5) * 0.5 * 1.0
        let power = unit.combat_power(CombatRole::Attack, 0.5);
        assert!((power - 75.0).abs() < 1e-3);
    }

    #[test]
    fn test_casualties_floor_at_zero() {
        let mut unit = infantry(10);
        assert_eq!(unit.apply_casualties(4), 4);
        assert_eq!(unit.size, 6);
        assert_eq!(unit.apply_casualties(50), 6);
        assert!(unit.is_disbanded());
    }

    #[test]
    fn test_experience_and_morale_are_clamped() {
        let mut unit = infantry(10).with_experience(0.95).with_morale(0.1);
        unit.gain_experience(0.2);
        assert_eq!(unit.experience, 1.0);

        unit.lose_morale(0.5);
        assert_eq!(unit.morale, 0.0);

        unit.recover_morale(2.0);
        assert_eq!(unit.morale, 1.0);
    }

    #[test]
    fn test_negative_quality_clamped() {
        let unit = infantry(10).with_quality(-1.0);
        assert_eq!(unit.quality, 0.0);
        assert_eq!(unit.combat_power(CombatRole::Defense, 0.5), 0.0);
    }
}
