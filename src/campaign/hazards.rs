//! Seeded siege hazards
//!
//! Disease and desertion in the siege camps. The engine itself is
//! deterministic; hazards are an optional collaborator that feeds setbacks
//! through `disrupt`, and the same seed always produces the same setbacks.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::siege::disrupt;
use super::world::WorldState;
use crate::core::error::Result;
use crate::core::types::SiegeId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardConfig {
    /// Chance per active siege per turn of an outbreak
    pub outbreak_chance: f32,
    /// Largest progress setback an outbreak can cause
    pub max_setback: f32,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            outbreak_chance: 0.15,
            max_setback: 0.10,
        }
    }
}

/// A setback applied to one siege
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setback {
    pub siege: SiegeId,
    pub magnitude: f32,
    pub progress: f32,
}

pub struct SiegeHazards {
    rng: ChaCha8Rng,
    config: HazardConfig,
}

impl SiegeHazards {
    pub fn new(seed: u64, config: HazardConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    /// Roll for every active siege in ascending id order
    pub fn roll(&mut self, world: &WorldState) -> Vec<(SiegeId, f32)> {
        let mut rolled = Vec::new();
        for siege in world.sieges.values().filter(|s| s.is_active()) {
            if self.rng.gen::<f32>() < self.config.outbreak_chance {
                let magnitude = self.rng.gen::<f32>() * self.config.max_setback.max(0.0);
                rolled.push((siege.id, magnitude));
            }
        }
        rolled
    }

    /// Roll and apply setbacks to the world's sieges
    pub fn apply(&mut self, world: &mut WorldState) -> Result<Vec<Setback>> {
        let mut setbacks = Vec::new();
        for (siege, magnitude) in self.roll(world) {
            let progress = disrupt(world, siege, magnitude)?;
            debug!(%siege, magnitude, progress, "siege camp outbreak");
            setbacks.push(Setback {
                siege,
                magnitude,
                progress,
            });
        }
        Ok(setbacks)
    }
}
