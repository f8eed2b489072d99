//! Armies and their position state machine
//!
//! An army exclusively owns the units grouped into it. Position is either
//! stationed in a territory or in transit along a precomputed route.

use serde::{Deserialize, Serialize};

use super::commander::Commander;
use super::unit::{CombatRole, Unit};
use crate::core::config::MovementConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::types::{ArmyId, FactionId, SiegeId, TerritoryId, UnitId};
use crate::map::pathfinding::{MovementProfile, Route};

/// A march in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transit {
    pub origin: TerritoryId,
    pub destination: TerritoryId,
    pub route: Route,
    pub cost_remaining: f32,
}

/// Where an army is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmyPosition {
    Stationed(TerritoryId),
    InTransit(Transit),
}

/// Immutable combat snapshot of one side of an engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Force {
    pub faction: FactionId,
    pub units: Vec<Unit>,
    pub commander: Option<Commander>,
}

impl Force {
    pub fn new(faction: FactionId, units: Vec<Unit>, commander: Option<Commander>) -> Self {
        Self {
            faction,
            units,
            commander,
        }
    }

    pub fn total_size(&self) -> u32 {
        self.units.iter().map(|u| u.size).sum()
    }

    /// Raw strength before side modifiers
    pub fn raw_strength(&self, role: CombatRole, experience_scale: f32) -> f32 {
        self.units
            .iter()
            .map(|u| u.combat_power(role, experience_scale))
            .sum()
    }

    /// Size-weighted average morale, 0.0 for an empty force
    pub fn average_morale(&self) -> f32 {
        let total = self.total_size();
        if total == 0 {
            return 0.0;
        }
        let weighted: f32 = self.units.iter().map(|u| u.morale * u.size as f32).sum();
        weighted / total as f32
    }

    pub fn combat_bonus(&self) -> f32 {
        self.commander
            .as_ref()
            .map(Commander::combat_bonus)
            .unwrap_or(0.0)
    }
}

/// An army on the campaign map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub name: String,
    pub faction: FactionId,
    pub units: Vec<Unit>,
    pub commander: Option<Commander>,
    pub position: ArmyPosition,
    /// Start or join a siege when the current march ends
    pub besiege_on_arrival: bool,
    /// Siege this army is taking part in
    pub siege: Option<SiegeId>,
}

impl Army {
    pub fn new(id: ArmyId, name: String, faction: FactionId, location: TerritoryId) -> Self {
        Self {
            id,
            name,
            faction,
            units: Vec::new(),
            commander: None,
            position: ArmyPosition::Stationed(location),
            besiege_on_arrival: false,
            siege: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_commander(mut self, commander: Commander) -> Self {
        self.commander = Some(commander);
        self
    }

    pub fn total_size(&self) -> u32 {
        self.units.iter().map(|u| u.size).sum()
    }

    /// Zero troops left; such an army is disbanded by the world
    pub fn is_destroyed(&self) -> bool {
        self.total_size() == 0
    }

    /// Territory the army is stationed in, `None` while marching
    pub fn location(&self) -> Option<TerritoryId> {
        match self.position {
            ArmyPosition::Stationed(t) => Some(t),
            ArmyPosition::InTransit(_) => None,
        }
    }

    pub fn is_stationed_at(&self, territory: TerritoryId) -> bool {
        self.location() == Some(territory)
    }

    pub fn is_in_transit(&self) -> bool {
        matches!(self.position, ArmyPosition::InTransit(_))
    }

    /// Movement cost covered per turn: slowest unit × commander multiplier
    pub fn speed(&self, config: &MovementConfig) -> f32 {
        let slowest = self
            .units
            .iter()
            .filter(|u| !u.is_disbanded())
            .map(|u| u.stats().speed)
            .fold(f32::INFINITY, f32::min);
        if !slowest.is_finite() {
            return 0.0;
        }
        let multiplier = match &self.commander {
            Some(c) => c.movement_multiplier(),
            None => config.baseline_speed_multiplier,
        };
        slowest * multiplier
    }

    pub fn movement_profile(&self) -> MovementProfile {
        MovementProfile::from_kinds(
            self.units
                .iter()
                .filter(|u| !u.is_disbanded())
                .map(|u| u.kind),
        )
    }

    pub fn strength(&self, role: CombatRole, experience_scale: f32) -> f32 {
        self.units
            .iter()
            .map(|u| u.combat_power(role, experience_scale))
            .sum()
    }

    pub fn siege_strength(&self, experience_scale: f32) -> f32 {
        let raw: f32 = self
            .units
            .iter()
            .map(|u| u.siege_power(experience_scale))
            .sum();
        let bonus = self
            .commander
            .as_ref()
            .map(Commander::siege_bonus)
            .unwrap_or(0.0);
        raw * (1.0 + bonus)
    }

    /// Combat snapshot of this army
    pub fn force(&self) -> Force {
        Force::new(self.faction, self.units.clone(), self.commander.clone())
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Drop units with no troops left, returns their ids
    pub fn prune_disbanded(&mut self) -> Vec<UnitId> {
        let removed: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.is_disbanded())
            .map(|u| u.id)
            .collect();
        self.units.retain(|u| !u.is_disbanded());
        removed
    }

    /// Group a unit of the same faction into this army
    pub fn attach_unit(&mut self, unit: Unit) -> Result<()> {
        if unit.faction != self.faction {
            return Err(WarfareError::InvalidOrder(format!(
                "unit {} belongs to {} not {}",
                unit.id, unit.faction, self.faction
            )));
        }
        if self.unit(unit.id).is_some() {
            return Err(WarfareError::InvalidOrder(format!(
                "unit {} is already in army {}",
                unit.id, self.id
            )));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Release a unit back to its faction
    pub fn detach_unit(&mut self, id: UnitId) -> Option<Unit> {
        let idx = self.units.iter().position(|u| u.id == id)?;
        Some(self.units.remove(idx))
    }

    pub fn recover_morale(&mut self, amount: f32) {
        for unit in &mut self.units {
            unit.recover_morale(amount);
        }
    }
}
