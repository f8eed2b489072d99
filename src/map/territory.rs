//! Territory - a node on the campaign map
//!
//! Territories have a controller (faction that owns them), a terrain kind,
//! fortifications and a garrison, and an adjacency list of weighted edges.

use serde::{Deserialize, Serialize};

use super::terrain::Terrain;
use crate::core::types::{FactionId, TerritoryId};

/// Highest fortification level
pub const MAX_FORTIFICATION: u8 = 10;

/// Weighted edge to a neighbouring territory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    pub to: TerritoryId,
    pub base_cost: f32,
}

/// A territory on the campaign map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub terrain: Terrain,
    /// 0-10, raises siege resistance and battle defense
    pub fortification: u8,
    pub controller: Option<FactionId>,
    /// Garrison troop count defending the fortifications
    pub garrison: u32,
    /// Development / tax value, drives war score on capture
    pub development: f32,
    pub adjacency: Vec<Adjacency>,
}

impl Territory {
    pub fn new(id: TerritoryId, name: &str, terrain: Terrain) -> Self {
        Self {
            id,
            name: name.to_string(),
            terrain,
            fortification: 0,
            controller: None,
            garrison: 0,
            development: 1.0,
            adjacency: Vec::new(),
        }
    }

    pub fn with_controller(mut self, faction: FactionId) -> Self {
        self.controller = Some(faction);
        self
    }

    pub fn with_fortification(mut self, level: u8) -> Self {
        self.fortification = level.min(MAX_FORTIFICATION);
        self
    }

    pub fn with_garrison(mut self, troops: u32) -> Self {
        self.garrison = troops;
        self
    }

    pub fn with_development(mut self, development: f32) -> Self {
        self.development = development.max(0.0);
        self
    }

    pub fn is_fortified(&self) -> bool {
        self.fortification > 0
    }

    /// Transfer control to a new faction, returns the previous controller
    pub fn transfer_control(&mut self, new_controller: Option<FactionId>) -> Option<FactionId> {
        std::mem::replace(&mut self.controller, new_controller)
    }

    /// Check if controlled by a specific faction
    pub fn is_controlled_by(&self, faction: FactionId) -> bool {
        self.controller == Some(faction)
    }

    pub fn edge_to(&self, to: TerritoryId) -> Option<&Adjacency> {
        self.adjacency.iter().find(|a| a.to == to)
    }
}
