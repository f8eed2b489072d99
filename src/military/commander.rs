//! Commanders and their bonuses
//!
//! The roster collaborator owns people; the engine only sees a martial skill
//! and a trait list, so all bonuses are pure functions of those two inputs.

use serde::{Deserialize, Serialize};

use crate::core::types::PersonId;

/// Highest martial skill the roster hands out
pub const MAX_MARTIAL: u8 = 20;

/// Combat bonus per point of martial skill
pub const COMBAT_BONUS_PER_MARTIAL: f32 = 0.02;

/// Commander traits relevant to warfare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommanderTrait {
    Brave,
    Craven,
    Strategist,
    Reckless,
    Cautious,
    Logistician,
    Siegemaster,
}

/// Effects of one trait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitEffects {
    /// Additive combat bonus
    pub combat: f32,
    /// Additive movement multiplier
    pub movement: f32,
    /// Additive siege progress bonus
    pub siege: f32,
}

impl CommanderTrait {
    pub fn effects(self) -> TraitEffects {
        let (combat, movement, siege) = match self {
            CommanderTrait::Brave => (0.05, 0.0, 0.0),
            CommanderTrait::Craven => (-0.05, 0.0, 0.0),
            CommanderTrait::Strategist => (0.10, 0.0, 0.05),
            CommanderTrait::Reckless => (0.05, 0.10, 0.0),
            CommanderTrait::Cautious => (0.0, -0.10, 0.0),
            CommanderTrait::Logistician => (0.0, 0.25, 0.0),
            CommanderTrait::Siegemaster => (0.0, 0.0, 0.25),
        };
        TraitEffects {
            combat,
            movement,
            siege,
        }
    }
}

/// Additive combat bonus (fraction) from skill and traits
///
/// Clamped to [-0.5, 1.0] so a commander can at worst halve an army.
pub fn combat_bonus(martial: u8, traits: &[CommanderTrait]) -> f32 {
    let skill = martial.min(MAX_MARTIAL) as f32 * COMBAT_BONUS_PER_MARTIAL;
    let from_traits: f32 = traits.iter().map(|t| t.effects().combat).sum();
    (skill + from_traits).clamp(-0.5, 1.0)
}

/// Multiplier on army speed, never below 0.5
pub fn movement_multiplier(traits: &[CommanderTrait]) -> f32 {
    let from_traits: f32 = traits.iter().map(|t| t.effects().movement).sum();
    (1.0 + from_traits).max(0.5)
}

/// Additive siege progress bonus (fraction), never negative
pub fn siege_bonus(martial: u8, traits: &[CommanderTrait]) -> f32 {
    let skill = martial.min(MAX_MARTIAL) as f32 * 0.01;
    let from_traits: f32 = traits.iter().map(|t| t.effects().siege).sum();
    (skill + from_traits).max(0.0)
}

/// Snapshot of a person leading an army
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commander {
    pub person: PersonId,
    pub name: String,
    pub martial: u8,
    pub traits: Vec<CommanderTrait>,
}

impl Commander {
    pub fn new(person: PersonId, name: &str, martial: u8) -> Self {
        Self {
            person,
            name: name.to_string(),
            martial: martial.min(MAX_MARTIAL),
            traits: Vec::new(),
        }
    }

    pub fn with_trait(mut self, t: CommanderTrait) -> Self {
        if !self.traits.contains(&t) {
            self.traits.push(t);
        }
        self
    }

    pub fn combat_bonus(&self) -> f32 {
        combat_bonus(self.martial, &self.traits)
    }

    pub fn movement_multiplier(&self) -> f32 {
        movement_multiplier(&self.traits)
    }

    pub fn siege_bonus(&self) -> f32 {
        siege_bonus(self.martial, &self.traits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combat_bonus_from_skill() {
        assert_eq!(combat_bonus(0, &[]), 0.0);
        assert!((combat_bonus(10, &[]) - 0.2).abs() < 1e-6);
        // Skill is capped
        assert_eq!(combat_bonus(255, &[]), combat_bonus(MAX_MARTIAL, &[]));
    }

    #[test]
    fn test_combat_bonus_traits_are_additive() {
        let bonus = combat_bonus(5, &[CommanderTrait::Brave, CommanderTrait::Strategist]);
        assert!((bonus - 0.25).abs() < 1e-6);

        let craven = combat_bonus(0, &[CommanderTrait::Craven]);
        assert!(craven < 0.0);
    }

    #[test]
    fn test_movement_multiplier() {
        assert_eq!(movement_multiplier(&[]), 1.0);
        assert!((movement_multiplier(&[CommanderTrait::Logistician]) - 1.25).abs() < 1e-6);
        assert!(movement_multiplier(&[CommanderTrait::Cautious]) < 1.0);
    }

    #[test]
    fn test_commander_dedups_traits() {
        let commander = Commander::new(PersonId(1), "Aldric", 8)
            .with_trait(CommanderTrait::Siegemaster)
            .with_trait(CommanderTrait::Siegemaster);
        assert_eq!(commander.traits.len(), 1);
        assert!((commander.siege_bonus() - 0.33).abs() < 1e-6);
    }
}
