//! Seasons and the modifiers the time collaborator hands to the engine

use serde::{Deserialize, Serialize};

/// Season of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Season for a turn when the calendar runs `turns_per_season` turns
    /// per season, starting in spring at turn 0
    pub fn from_turn(turn: u32, turns_per_season: u32) -> Self {
        let per = turns_per_season.max(1);
        match (turn / per) % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Default modifiers for this season
    pub fn modifiers(&self) -> SeasonalModifiers {
        match self {
            Season::Spring => SeasonalModifiers::new(1.2, 1.0), // Mud
            Season::Summer => SeasonalModifiers::new(1.0, 1.2),
            Season::Autumn => SeasonalModifiers::new(1.1, 1.1),
            Season::Winter => SeasonalModifiers::new(1.5, 0.6),
        }
    }
}

/// Snapshot of seasonal modifiers for one turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModifiers {
    /// Multiplier on every edge traversal cost
    pub movement_cost: f32,
    /// Multiplier on production (consumed by the economy, carried here
    /// so one snapshot serves every phase of the turn)
    pub production: f32,
}

impl SeasonalModifiers {
    pub fn new(movement_cost: f32, production: f32) -> Self {
        Self {
            movement_cost,
            production,
        }
    }

    /// No seasonal effect
    pub fn neutral() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Default for SeasonalModifiers {
    fn default() -> Self {
        Self::neutral()
    }
}
