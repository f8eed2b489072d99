//! Scenario files
//!
//! A scenario describes a starting world in TOML: territories, edges,
//! armies, wars and the opening orders.
//!
//! ```toml
//! name = "Border war"
//!
//! [[territories]]
//! id = 1
//! name = "Ardent March"
//! terrain = "Plains"
//! controller = 1
//!
//! [[edges]]
//! from = 1
//! to = 2
//! cost = 1.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::movement::{order_besiege, order_move};
use super::war::WarGoal;
use super::world::WorldState;
use crate::core::config::WarfareConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::season::Season;
use crate::core::types::{ArmyId, FactionId, PersonId, TerritoryId};
use crate::map::graph::TerritoryGraph;
use crate::map::terrain::Terrain;
use crate::map::territory::Territory;
use crate::military::commander::{Commander, CommanderTrait};
use crate::military::unit::UnitKind;

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub territories: Vec<TerritorySpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub armies: Vec<ArmySpec>,
    #[serde(default)]
    pub wars: Vec<WarSpec>,
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritorySpec {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub fortification: u8,
    pub controller: Option<u32>,
    #[serde(default)]
    pub garrison: u32,
    #[serde(default = "one")]
    pub development: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: u32,
    pub to: u32,
    pub cost: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmySpec {
    pub name: String,
    pub faction: u32,
    pub location: u32,
    pub units: Vec<UnitSpec>,
    pub commander: Option<CommanderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    pub kind: UnitKind,
    pub size: u32,
    #[serde(default = "one")]
    pub quality: f32,
    #[serde(default)]
    pub experience: f32,
    #[serde(default = "one")]
    pub morale: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommanderSpec {
    pub person: u32,
    pub name: String,
    pub martial: u8,
    #[serde(default)]
    pub traits: Vec<CommanderTrait>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarSpec {
    pub attacker: u32,
    pub defender: u32,
    pub goal: WarGoal,
    #[serde(default)]
    pub claims: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Move,
    Besiege,
}

/// Opening order; `army` names an entry in `armies`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    pub army: String,
    pub order: OrderKind,
    pub target: u32,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build the starting world
    pub fn build(&self, config: WarfareConfig) -> Result<WorldState> {
        let mut graph = TerritoryGraph::new();
        for spec in &self.territories {
            let mut territory = Territory::new(TerritoryId(spec.id), &spec.name, spec.terrain)
                .with_fortification(spec.fortification)
                .with_garrison(spec.garrison)
                .with_development(spec.development);
            if let Some(owner) = spec.controller {
                territory = territory.with_controller(FactionId(owner));
            }
            graph.add_territory(territory)?;
        }
        for edge in &self.edges {
            graph.connect(TerritoryId(edge.from), TerritoryId(edge.to), edge.cost)?;
        }

        let mut world = WorldState::new(graph, config);
        if let Some(season) = self.season {
            world.set_season(season);
        }

        let mut spawned: Vec<(String, ArmyId)> = Vec::new();
        for spec in &self.armies {
            let faction = FactionId(spec.faction);
            let units = spec
                .units
                .iter()
                .map(|u| {
                    world
                        .raise_unit(faction, u.kind, u.size)
                        .with_quality(u.quality)
                        .with_experience(u.experience)
                        .with_morale(u.morale)
                })
                .collect();
            let commander = spec.commander.as_ref().map(|c| {
                c.traits.iter().fold(
                    Commander::new(PersonId(c.person), &c.name, c.martial),
                    |commander, t| commander.with_trait(*t),
                )
            });
            let id = world.spawn_army(&spec.name, faction, TerritoryId(spec.location), units, commander)?;
            spawned.push((spec.name.clone(), id));
        }

        for war in &self.wars {
            world.declare_war(
                FactionId(war.attacker),
                FactionId(war.defender),
                war.goal,
                war.claims.iter().copied().map(TerritoryId).collect(),
            )?;
        }

        for order in &self.orders {
            let army = spawned
                .iter()
                .find(|(name, _)| *name == order.army)
                .map(|(_, id)| *id)
                .ok_or_else(|| WarfareError::InvalidOrder(format!("no army named {}", order.army)))?;
            let target = TerritoryId(order.target);
            match order.order {
                OrderKind::Move => order_move(&mut world, army, target)?,
                OrderKind::Besiege => order_besiege(&mut world, army, target)?,
            };
        }

        info!(
            scenario = %self.name,
            territories = world.graph.len(),
            armies = world.armies.len(),
            "scenario loaded"
        );
        Ok(world)
    }
}
