//! World state owned by the warfare engine
//!
//! One `WorldState` holds the map, every army, siege, archived battle and
//! war. All collections are ordered maps keyed by id so any walk over them
//! is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::battle::{Battle, BattleReport};
use super::events::{CampaignEvent, ControlChangeCause};
use super::siege::{self, Siege};
use super::war::{PeaceSettlement, PeaceTerms, ScoreSource, WarGoal, WarLedger};
use crate::core::config::WarfareConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::season::{Season, SeasonalModifiers};
use crate::core::types::{
    ArmyId, BattleId, FactionId, IdAllocator, SiegeId, Side, TerritoryId, Turn, UnitId, WarId,
};
use crate::map::graph::TerritoryGraph;
use crate::map::pathfinding::leg_cost;
use crate::military::army::{Army, ArmyPosition, Force};
use crate::military::commander::Commander;
use crate::military::unit::{Unit, UnitKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldIds {
    army: IdAllocator,
    unit: IdAllocator,
    battle: IdAllocator,
    siege: IdAllocator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub turn: Turn,
    /// `None` until the calendar supplies one; modifiers stay neutral
    pub season: Option<Season>,
    pub modifiers: SeasonalModifiers,
    pub graph: TerritoryGraph,
    pub armies: BTreeMap<ArmyId, Army>,
    pub sieges: BTreeMap<SiegeId, Siege>,
    pub battles: BTreeMap<BattleId, Battle>,
    pub wars: WarLedger,
    pub config: WarfareConfig,
    ids: WorldIds,
    /// Events from orders issued between turns, drained by the next turn
    journal: Vec<CampaignEvent>,
}

impl WorldState {
    pub fn new(graph: TerritoryGraph, config: WarfareConfig) -> Self {
        Self {
            turn: 0,
            season: None,
            modifiers: SeasonalModifiers::neutral(),
            graph,
            armies: BTreeMap::new(),
            sieges: BTreeMap::new(),
            battles: BTreeMap::new(),
            wars: WarLedger::new(),
            config,
            ids: WorldIds::default(),
            journal: Vec::new(),
        }
    }

    pub fn set_season(&mut self, season: Season) {
        self.season = Some(season);
        self.modifiers = season.modifiers();
    }

    /// Override the modifiers supplied by the calendar
    pub fn set_modifiers(&mut self, modifiers: SeasonalModifiers) {
        self.modifiers = modifiers;
    }

    pub(crate) fn record(&mut self, event: CampaignEvent) {
        self.journal.push(event);
    }

    /// Drain events recorded by orders since the last turn
    pub fn take_events(&mut self) -> Vec<CampaignEvent> {
        std::mem::take(&mut self.journal)
    }

    // ------------------------------------------------------------------
    // Ids
    // ------------------------------------------------------------------

    /// Create a unit with a fresh id
    pub fn raise_unit(&mut self, faction: FactionId, kind: UnitKind, size: u32) -> Unit {
        Unit::new(UnitId(self.ids.unit.next_raw()), faction, kind, size)
    }

    pub(crate) fn next_battle_id(&mut self) -> BattleId {
        BattleId(self.ids.battle.next_raw())
    }

    pub(crate) fn next_siege_id(&mut self) -> SiegeId {
        SiegeId(self.ids.siege.next_raw())
    }

    // ------------------------------------------------------------------
    // Armies
    // ------------------------------------------------------------------

    /// Put a new army on the map
    pub fn spawn_army(
        &mut self,
        name: &str,
        faction: FactionId,
        location: TerritoryId,
        units: Vec<Unit>,
        commander: Option<Commander>,
    ) -> Result<ArmyId> {
        self.graph.territory(location)?;
        if units.iter().map(|u| u.size).sum::<u32>() == 0 {
            return Err(WarfareError::InvalidOrder(format!("army {} has no troops", name)));
        }
        for unit in &units {
            if unit.faction != faction {
                return Err(WarfareError::InvalidOrder(format!(
                    "unit {} belongs to {} not {}",
                    unit.id, unit.faction, faction
                )));
            }
            if self.unit_owner(unit.id).is_some() {
                return Err(WarfareError::InvalidOrder(format!("unit {} already serves", unit.id)));
            }
        }

        let id = ArmyId(self.ids.army.next_raw());
        let mut army = Army::new(id, name.to_string(), faction, location);
        for unit in units {
            self.ids.unit.reserve(unit.id.0);
            army.attach_unit(unit)?;
        }
        army.commander = commander;

        info!(army = %id, %faction, territory = %location, troops = army.total_size(), "army raised");
        self.armies.insert(id, army);
        Ok(id)
    }

    pub fn army(&self, id: ArmyId) -> Result<&Army> {
        self.armies.get(&id).ok_or(WarfareError::UnknownArmy(id))
    }

    pub fn army_mut(&mut self, id: ArmyId) -> Result<&mut Army> {
        self.armies.get_mut(&id).ok_or(WarfareError::UnknownArmy(id))
    }

    /// Armies stationed in a territory, ascending id
    pub fn armies_at(&self, territory: TerritoryId) -> impl Iterator<Item = &Army> {
        self.armies.values().filter(move |a| a.is_stationed_at(territory))
    }

    /// Stationed armies in `territory` whose faction is at war with `faction`
    pub fn hostile_armies_at(&self, territory: TerritoryId, faction: FactionId) -> Vec<ArmyId> {
        self.armies_at(territory)
            .filter(|a| self.are_hostile(a.faction, faction))
            .map(|a| a.id)
            .collect()
    }

    /// Two factions are hostile while an active war stands between them
    pub fn are_hostile(&self, a: FactionId, b: FactionId) -> bool {
        self.wars.at_war(a, b)
    }

    fn unit_owner(&self, unit: UnitId) -> Option<ArmyId> {
        self.armies
            .values()
            .find(|a| a.unit(unit).is_some())
            .map(|a| a.id)
    }

    /// Group a unit into a stationed army
    pub fn attach_unit(&mut self, army: ArmyId, unit: Unit) -> Result<()> {
        if let Some(owner) = self.unit_owner(unit.id) {
            return Err(WarfareError::InvalidOrder(format!(
                "unit {} already serves in {}",
                unit.id, owner
            )));
        }
        let unit_id = unit.id.0;
        let target = self.army_mut(army)?;
        if target.is_in_transit() {
            return Err(WarfareError::InvalidOrder(format!("{} is on the march", army)));
        }
        target.attach_unit(unit)?;
        self.ids.unit.reserve(unit_id);
        Ok(())
    }

    /// Take a unit out of an army; an army left without units is disbanded
    pub fn detach_unit(&mut self, army: ArmyId, unit: UnitId) -> Result<Unit> {
        let source = self.army_mut(army)?;
        if source.is_in_transit() {
            return Err(WarfareError::InvalidOrder(format!("{} is on the march", army)));
        }
        let detached = source.detach_unit(unit).ok_or_else(|| {
            WarfareError::InvalidOrder(format!("unit {} is not in {}", unit, army))
        })?;

        if source.units.is_empty() {
            let mut events = Vec::new();
            self.disband_army(army, &mut events);
            self.journal.extend(events);
        }
        Ok(detached)
    }

    /// Write post-battle unit state back into the armies that fought
    ///
    /// Units are matched by id; units absent from `force` are untouched.
    pub(crate) fn apply_force(&mut self, armies: &[ArmyId], force: &Force, events: &mut Vec<CampaignEvent>) {
        for &id in armies {
            let Some(army) = self.armies.get_mut(&id) else {
                continue;
            };
            for unit in army.units.iter_mut() {
                let Some(after) = force.units.iter().find(|u| u.id == unit.id) else {
                    continue;
                };
                let casualties = unit.size.saturating_sub(after.size);
                if casualties > 0 {
                    events.push(CampaignEvent::CasualtiesApplied {
                        army: id,
                        unit: unit.id,
                        casualties,
                        remaining: after.size,
                    });
                }
                *unit = after.clone();
            }
            for unit in army.prune_disbanded() {
                events.push(CampaignEvent::UnitDisbanded { army: id, unit });
            }
        }
    }

    /// Remove every army with no troops left
    pub(crate) fn disband_destroyed(&mut self, events: &mut Vec<CampaignEvent>) {
        let destroyed: Vec<ArmyId> = self
            .armies
            .values()
            .filter(|a| a.is_destroyed())
            .map(|a| a.id)
            .collect();
        for id in destroyed {
            self.disband_army(id, events);
        }
    }

    fn disband_army(&mut self, id: ArmyId, events: &mut Vec<CampaignEvent>) {
        siege::leave_siege(self, id, events);
        if self.armies.remove(&id).is_some() {
            info!(army = %id, "army disbanded");
            events.push(CampaignEvent::ArmyDisbanded { army: id });
        }
    }

    /// Move a beaten army to a neighbouring territory free of enemies
    ///
    /// Friendly territory is preferred; ties go to the lowest id. An army
    /// with nowhere to go holds its ground.
    pub(crate) fn retreat(&mut self, id: ArmyId, events: &mut Vec<CampaignEvent>) {
        let Some(army) = self.armies.get(&id) else {
            return;
        };
        let Some(from) = army.location() else {
            return;
        };
        if army.is_destroyed() {
            return;
        }

        let profile = army.movement_profile();
        let faction = army.faction;
        let passable: Vec<TerritoryId> = self
            .graph
            .neighbors(from)
            .iter()
            .map(|e| e.to)
            .filter(|&to| leg_cost(&self.graph, from, to, &profile, &self.modifiers).is_some())
            .filter(|&to| self.hostile_armies_at(to, faction).is_empty())
            .collect();

        let friendly = passable.iter().copied().find(|&to| {
            self.graph
                .get(to)
                .map(|t| t.is_controlled_by(faction))
                .unwrap_or(false)
        });
        let Some(to) = friendly.or_else(|| passable.first().copied()) else {
            debug!(army = %id, territory = %from, "no line of retreat");
            return;
        };

        siege::leave_siege(self, id, events);
        if let Some(army) = self.armies.get_mut(&id) {
            army.position = ArmyPosition::Stationed(to);
            army.besiege_on_arrival = false;
            debug!(army = %id, %from, %to, "army retreated");
            events.push(CampaignEvent::ArmyRetreated { army: id, from, to });
        }
    }

    /// A siege whose last besieger is beaten by the territory's owner fails
    pub(crate) fn relieve_sieges(
        &mut self,
        territory: TerritoryId,
        winner: FactionId,
        loser: ArmyId,
        events: &mut Vec<CampaignEvent>,
    ) {
        let Some(siege_id) = self.armies.get(&loser).and_then(|a| a.siege) else {
            return;
        };
        let relieved = self
            .sieges
            .get(&siege_id)
            .map(|s| {
                let others_hold = s.besiegers.iter().any(|&id| {
                    id != loser
                        && self
                            .armies
                            .get(&id)
                            .map(|a| a.is_stationed_at(territory) && !a.is_destroyed())
                            .unwrap_or(false)
                });
                s.is_active() && s.territory == territory && !others_hold
            })
            .unwrap_or(false);
        let owner = self.graph.get(territory).and_then(|t| t.controller);
        if relieved && owner == Some(winner) {
            if let Err(err) = siege::fail_siege(self, siege_id, events) {
                warn!(siege = %siege_id, error = %err, "could not lift relieved siege");
            }
        }
    }

    pub(crate) fn archive_battle(&mut self, battle: Battle) {
        self.battles.insert(battle.id, battle);
    }

    pub fn battle(&self, id: BattleId) -> Option<&Battle> {
        self.battles.get(&id)
    }

    // ------------------------------------------------------------------
    // Territories and wars
    // ------------------------------------------------------------------

    pub fn active_siege_at(&self, territory: TerritoryId) -> Option<SiegeId> {
        self.sieges
            .values()
            .find(|s| s.is_active() && s.territory == territory)
            .map(|s| s.id)
    }

    pub(crate) fn transfer_control(
        &mut self,
        territory: TerritoryId,
        new: Option<FactionId>,
        cause: ControlChangeCause,
        events: &mut Vec<CampaignEvent>,
    ) -> Result<()> {
        let old = self.graph.set_controller(territory, new)?;
        info!(%territory, ?old, ?new, ?cause, "control changed");
        events.push(CampaignEvent::ControlChanged {
            territory,
            old,
            new,
            cause,
        });
        Ok(())
    }

    /// Declare a war between two factions
    pub fn declare_war(
        &mut self,
        attacker: FactionId,
        defender: FactionId,
        goal: WarGoal,
        claims: Vec<TerritoryId>,
    ) -> Result<WarId> {
        for &claim in &claims {
            self.graph.territory(claim)?;
        }
        self.wars.set_turn(self.turn);
        let war = self.wars.declare_with_claims(attacker, defender, goal, claims)?;
        self.record(CampaignEvent::WarDeclared {
            war,
            attacker,
            defender,
            goal,
        });
        Ok(war)
    }

    /// Propose peace and apply the terms if the ledger accepts them
    pub fn negotiate_peace(&mut self, war_id: WarId, proposer: Side, terms: PeaceTerms) -> Result<PeaceSettlement> {
        let war = self.wars.war(war_id)?;
        if let PeaceTerms::Cede(territories) = &terms {
            let loser = war.faction_of(proposer.opposite());
            for &t in territories {
                if !self.graph.territory(t)?.is_controlled_by(loser) {
                    return Err(WarfareError::InvalidOrder(format!(
                        "{} is not held by {}",
                        t, loser
                    )));
                }
            }
        }

        self.wars.set_turn(self.turn);
        let settlement = self.wars.negotiate_peace(war_id, proposer, terms, &self.config.war)?;
        let mut events = Vec::new();
        self.apply_settlement(war_id, &settlement, &mut events);
        self.journal.extend(events);
        Ok(settlement)
    }

    /// Conclude a war whose score has reached the capitulation threshold
    ///
    /// Returns `None` while the score is short of it. The settlement's
    /// terms are carried out like a negotiated peace.
    pub fn force_capitulation(&mut self, war_id: WarId) -> Result<Option<PeaceSettlement>> {
        self.wars.set_turn(self.turn);
        let Some(settlement) = self.wars.force_capitulation(war_id, &self.config.war)? else {
            return Ok(None);
        };
        let mut events = Vec::new();
        self.apply_settlement(war_id, &settlement, &mut events);
        self.journal.extend(events);
        Ok(Some(settlement))
    }

    /// Post a score change and carry out a capitulation it triggers
    pub fn post_war_score(
        &mut self,
        war_id: WarId,
        side: Side,
        delta: f32,
        source: ScoreSource,
        events: &mut Vec<CampaignEvent>,
    ) -> Result<f32> {
        self.wars.set_turn(self.turn);
        let update = self
            .wars
            .post_score_from(war_id, side, delta, source, &self.config.war)?;
        events.push(CampaignEvent::WarScoreChanged {
            war: war_id,
            delta: delta * side.sign(),
            score: update.score,
        });
        if let Some(settlement) = update.capitulation {
            self.apply_settlement(war_id, &settlement, events);
        }
        Ok(delta * side.sign())
    }

    /// Credit a battle's score to the winner's side of the war
    ///
    /// Returns the attacker-positive delta that was posted.
    pub(crate) fn post_battle_score(
        &mut self,
        war: Option<WarId>,
        report: &BattleReport,
        (attacker, defender): (FactionId, FactionId),
        source: ScoreSource,
        events: &mut Vec<CampaignEvent>,
    ) -> f32 {
        let (Some(war_id), Some(winner)) = (war, report.outcome.winner()) else {
            return 0.0;
        };
        let value = report.score_value(&self.config.battle);
        if value <= 0.0 {
            return 0.0;
        }
        let winner_faction = match winner {
            Side::Attacker => attacker,
            Side::Defender => defender,
        };
        let Some(side) = self.wars.get(war_id).and_then(|w| w.side_of(winner_faction)) else {
            return 0.0;
        };
        match self.post_war_score(war_id, side, value, source, events) {
            Ok(delta) => delta,
            Err(err) => {
                warn!(war = %war_id, error = %err, "battle score not posted");
                0.0
            }
        }
    }

    /// Carry out a concluded war's terms
    ///
    /// Ceded territories change hands only if the loser still holds them.
    /// Sieges fought under the war are lifted.
    pub(crate) fn apply_settlement(&mut self, war_id: WarId, settlement: &PeaceSettlement, events: &mut Vec<CampaignEvent>) {
        events.push(CampaignEvent::WarConcluded {
            war: war_id,
            settlement: settlement.clone(),
        });

        if let (Some(victor), PeaceTerms::Cede(territories)) = (settlement.victor, &settlement.terms) {
            let sides = self
                .wars
                .get(war_id)
                .map(|w| (w.faction_of(victor), w.faction_of(victor.opposite())));
            if let Some((winner, loser)) = sides {
                for &territory in territories {
                    let held = self
                        .graph
                        .get(territory)
                        .map(|t| t.is_controlled_by(loser))
                        .unwrap_or(false);
                    if held {
                        if let Err(err) = self.transfer_control(
                            territory,
                            Some(winner),
                            ControlChangeCause::PeaceTreaty(war_id),
                            events,
                        ) {
                            warn!(%territory, error = %err, "ceded territory not transferred");
                        }
                    }
                }
            }
        }

        let lifted: Vec<SiegeId> = self
            .sieges
            .values()
            .filter(|s| s.is_active() && s.war == Some(war_id))
            .map(|s| s.id)
            .collect();
        for siege_id in lifted {
            if let Err(err) = siege::withdraw(self, siege_id, events) {
                warn!(siege = %siege_id, error = %err, "siege not lifted at peace");
            }
        }
    }
}
