//! Warfare configuration with documented constants
//!
//! Every tunable number used by movement, battle, siege and war resolution
//! lives here. Values can be overridden from a TOML file; missing keys keep
//! their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Top-level configuration, one section per resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarfareConfig {
    pub movement: MovementConfig,
    pub battle: BattleConfig,
    pub siege: SiegeConfig,
    pub war: WarConfig,
}

impl WarfareConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Speed multiplier for armies marching without a commander
    ///
    /// Commanders replace this with their own movement multiplier.
    pub baseline_speed_multiplier: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            baseline_speed_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// A side routs when its effective strength drops below this fraction
    /// of its starting strength
    pub rout_strength_fraction: f32,

    /// Round limit; the higher remaining strength wins when it is reached
    pub max_rounds: u32,

    /// Casualty fraction suffered by the weaker side each round
    ///
    /// The stronger side takes this rate scaled by the strength ratio.
    pub base_casualty_rate: f32,

    /// Average morale below which a side flees regardless of strength
    pub flee_morale: f32,

    /// Morale lost per unit of casualty fraction taken in a round
    ///
    /// At 2.0, losing 10% of a unit's troops costs it 0.2 morale.
    pub morale_loss_per_casualty_fraction: f32,

    /// Strength bonus per point of experience: `1 + experience * scale`
    pub experience_bonus_scale: f32,

    /// Experience granted to the winner's surviving units
    pub winner_experience_gain: f32,

    /// Experience granted to the loser's surviving units
    pub loser_experience_gain: f32,

    /// Defender strength bonus per fortification level
    pub fortification_bonus_per_level: f32,

    /// War score per point of strength the loser lost
    pub score_per_strength_lost: f32,

    /// Upper bound on the war score a single battle can post
    pub max_battle_score: f32,

    /// Morale regained per turn by armies that did not fight
    pub morale_recovery_per_turn: f32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            rout_strength_fraction: 0.10,
            max_rounds: 5,
            base_casualty_rate: 0.10,
            flee_morale: 0.20,
            morale_loss_per_casualty_fraction: 2.0,
            experience_bonus_scale: 0.5,
            winner_experience_gain: 0.10,
            loser_experience_gain: 0.03,
            fortification_bonus_per_level: 0.10,
            score_per_strength_lost: 0.02,
            max_battle_score: 25.0,
            morale_recovery_per_turn: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiegeConfig {
    /// Progress per turn when besiegers exactly match the defence
    pub base_progress_rate: f32,

    /// Garrison-equivalent strength contributed by each fortification level (K)
    pub fortification_defense_per_level: f32,

    /// Besiegers weaker than this fraction of the garrison make no progress
    pub min_strength_ratio: f32,

    /// War score per point of territory development on capture
    pub score_per_development: f32,

    /// Progress lost when an assault fails
    pub assault_failure_progress_loss: f32,

    /// Progress lost when a garrison sortie succeeds
    pub sortie_disruption: f32,

    /// Quality of garrison troops when they fight
    pub garrison_quality: f32,
}

impl Default for SiegeConfig {
    fn default() -> Self {
        Self {
            base_progress_rate: 0.10,
            fortification_defense_per_level: 100.0,
            min_strength_ratio: 0.5,
            score_per_development: 2.0,
            assault_failure_progress_loss: 0.25,
            sortie_disruption: 0.15,
            garrison_quality: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarConfig {
    /// Score magnitude at which the losing side capitulates
    pub capitulation_threshold: f32,

    /// Score magnitude counted when gating peace terms
    pub score_cap: f32,

    /// Score required for each kind of peace term
    pub peace_terms: PeaceTermsTable,
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            capitulation_threshold: 100.0,
            score_cap: 100.0,
            peace_terms: PeaceTermsTable::default(),
        }
    }
}

/// Score thresholds for peace terms
///
/// This is a tuning table, not a rule of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeaceTermsTable {
    pub white_peace: f32,
    pub per_ceded_territory: f32,
    pub vassalize: f32,
    pub tribute: f32,
    pub humiliate: f32,
}

impl Default for PeaceTermsTable {
    fn default() -> Self {
        Self {
            white_peace: 0.0,
            per_ceded_territory: 20.0,
            vassalize: 75.0,
            tribute: 30.0,
            humiliate: 20.0,
        }
    }
}
