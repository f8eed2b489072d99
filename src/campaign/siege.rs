//! Siege resolution
//!
//! A siege is a multi-turn process against a fortified territory. Each turn
//! progress grows with besieger strength over garrison strength plus the
//! fortification's defence. Progress reaching 1.0 captures the territory.
//!
//! ```text
//! Initiated -> Ongoing -> Successful
//!                      -> Failed     (relief army beat the besiegers)
//!                      -> Abandoned  (no besieger left, or withdrawn)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::battle::{simulate_battle, Battle, BattleInput, BattleOutcome, Battlefield, Combatant};
use super::events::{CampaignEvent, ControlChangeCause};
use super::war::ScoreSource;
use super::world::WorldState;
use crate::core::config::SiegeConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::types::{ArmyId, BattleId, FactionId, SiegeId, TerritoryId, Turn, UnitId, WarId};
use crate::map::territory::Territory;
use crate::military::army::Force;
use crate::military::commander::Commander;
use crate::military::unit::{Unit, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiegeState {
    Initiated,
    Ongoing,
    Successful,
    Failed,
    Abandoned,
}

impl SiegeState {
    pub fn is_active(self) -> bool {
        matches!(self, SiegeState::Initiated | SiegeState::Ongoing)
    }
}

/// One turn of siege work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiegeTurn {
    pub turn: Turn,
    pub besieger_strength: f32,
    pub garrison_strength: f32,
    pub delta: f32,
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Siege {
    pub id: SiegeId,
    pub territory: TerritoryId,
    pub besieging_faction: FactionId,
    pub defending_faction: FactionId,
    /// Armies taking part, in the order they joined
    pub besiegers: Vec<ArmyId>,
    pub war: Option<WarId>,
    /// 0.0 - 1.0
    pub progress: f32,
    pub state: SiegeState,
    pub started_turn: Turn,
    pub ended_turn: Option<Turn>,
    pub history: Vec<SiegeTurn>,
}

impl Siege {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// Defensive strength of a territory's garrison troops
pub fn garrison_strength(territory: &Territory, config: &SiegeConfig) -> f32 {
    territory.garrison as f32 * config.garrison_quality * UnitKind::Infantry.stats().defense
}

/// Progress gained in one turn
///
/// `base_rate × besiegers / (garrison + fortification × K)`. Nothing is
/// gained without besieger strength or when the besiegers are outmatched by
/// the garrison. An undefended, unfortified territory falls at once.
pub fn progress_delta(besiegers: f32, garrison: f32, fortification: u8, config: &SiegeConfig) -> f32 {
    if besiegers <= 0.0 || besiegers < config.min_strength_ratio * garrison {
        return 0.0;
    }
    let defence = garrison + fortification as f32 * config.fortification_defense_per_level;
    if defence <= 0.0 {
        return 1.0;
    }
    config.base_progress_rate * besiegers / defence
}

fn active_siege(world: &WorldState, id: SiegeId) -> Result<&Siege> {
    let siege = world.sieges.get(&id).ok_or(WarfareError::UnknownSiege(id))?;
    if !siege.is_active() {
        return Err(WarfareError::InvalidEngagement(format!(
            "siege {} has ended ({:?})",
            id, siege.state
        )));
    }
    Ok(siege)
}

/// Begin a siege with an army stationed in an enemy territory
pub fn start_siege(world: &mut WorldState, army_id: ArmyId) -> Result<(SiegeId, Vec<CampaignEvent>)> {
    let army = world.army(army_id)?;
    let territory_id = army.location().ok_or_else(|| {
        WarfareError::InvalidEngagement(format!("{} is on the march", army_id))
    })?;
    if let Some(existing) = army.siege {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} is already besieging under {}",
            army_id, existing
        )));
    }
    if world.active_siege_at(territory_id).is_some() {
        return Err(WarfareError::SiegeAlreadyActive(territory_id));
    }

    let territory = world.graph.territory(territory_id)?;
    let faction = army.faction;
    let defender = match territory.controller {
        Some(owner) if owner != faction && world.are_hostile(owner, faction) => owner,
        _ => {
            return Err(WarfareError::InvalidEngagement(format!(
                "{} does not belong to an enemy of {}",
                territory_id, faction
            )))
        }
    };
    if !world.hostile_armies_at(territory_id, faction).is_empty() {
        return Err(WarfareError::InvalidEngagement(format!(
            "enemy armies still hold the field at {}",
            territory_id
        )));
    }

    let war = world.wars.active_war_between(faction, defender);
    let id = world.next_siege_id();
    world.sieges.insert(
        id,
        Siege {
            id,
            territory: territory_id,
            besieging_faction: faction,
            defending_faction: defender,
            besiegers: vec![army_id],
            war,
            progress: 0.0,
            state: SiegeState::Initiated,
            started_turn: world.turn,
            ended_turn: None,
            history: Vec::new(),
        },
    );
    let army = world.army_mut(army_id)?;
    army.siege = Some(id);
    army.besiege_on_arrival = false;

    info!(siege = %id, territory = %territory_id, army = %army_id, "siege started");
    Ok((
        id,
        vec![CampaignEvent::SiegeStarted {
            siege: id,
            territory: territory_id,
            army: army_id,
        }],
    ))
}

/// Add a same-faction army already at the walls to a running siege
pub fn join_siege(world: &mut WorldState, siege_id: SiegeId, army_id: ArmyId) -> Result<Vec<CampaignEvent>> {
    let siege = active_siege(world, siege_id)?;
    let army = world.army(army_id)?;
    if army.faction != siege.besieging_faction {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} fights for {}, siege {} for {}",
            army_id, army.faction, siege_id, siege.besieging_faction
        )));
    }
    if !army.is_stationed_at(siege.territory) {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} is not at {}",
            army_id, siege.territory
        )));
    }
    if army.siege.is_some() {
        return Err(WarfareError::InvalidEngagement(format!("{} is already besieging", army_id)));
    }

    if let Some(siege) = world.sieges.get_mut(&siege_id) {
        siege.besiegers.push(army_id);
    }
    let army = world.army_mut(army_id)?;
    army.siege = Some(siege_id);
    army.besiege_on_arrival = false;

    debug!(siege = %siege_id, army = %army_id, "army joined siege");
    Ok(vec![CampaignEvent::SiegeJoined {
        siege: siege_id,
        army: army_id,
    }])
}

/// Besieging armies still at the walls
fn present_besiegers(world: &WorldState, siege: &Siege) -> Vec<ArmyId> {
    siege
        .besiegers
        .iter()
        .copied()
        .filter(|id| {
            world
                .armies
                .get(id)
                .map(|a| a.is_stationed_at(siege.territory) && a.siege == Some(siege.id) && !a.is_destroyed())
                .unwrap_or(false)
        })
        .collect()
}

/// Advance a siege by one turn
pub fn advance_siege(world: &mut WorldState, siege_id: SiegeId) -> Result<Vec<CampaignEvent>> {
    let siege = active_siege(world, siege_id)?;
    let present = present_besiegers(world, siege);
    let territory = world.graph.territory(siege.territory)?;

    let scale = world.config.battle.experience_bonus_scale;
    let besieging: f32 = present
        .iter()
        .filter_map(|id| world.armies.get(id))
        .map(|a| a.siege_strength(scale))
        .sum();
    let garrison = garrison_strength(territory, &world.config.siege);
    let delta = progress_delta(besieging, garrison, territory.fortification, &world.config.siege);

    let mut events = Vec::new();
    let turn = world.turn;
    let Some(siege) = world.sieges.get_mut(&siege_id) else {
        return Err(WarfareError::UnknownSiege(siege_id));
    };
    siege.besiegers.retain(|id| present.contains(id));
    if present.is_empty() {
        finish(world, siege_id, SiegeState::Abandoned, &mut events);
        return Ok(events);
    }

    siege.progress = (siege.progress + delta).clamp(0.0, 1.0);
    siege.state = SiegeState::Ongoing;
    siege.history.push(SiegeTurn {
        turn,
        besieger_strength: besieging,
        garrison_strength: garrison,
        delta,
        progress: siege.progress,
    });
    let progress = siege.progress;
    debug!(siege = %siege_id, besieging, garrison, delta, progress, "siege advanced");
    events.push(CampaignEvent::SiegeProgressed {
        siege: siege_id,
        progress,
    });

    if progress >= 1.0 {
        capture(world, siege_id, &mut events)?;
    }
    Ok(events)
}

/// Knock progress back by an external setback; returns the new progress
pub fn disrupt(world: &mut WorldState, siege_id: SiegeId, magnitude: f32) -> Result<f32> {
    active_siege(world, siege_id)?;
    let siege = world
        .sieges
        .get_mut(&siege_id)
        .ok_or(WarfareError::UnknownSiege(siege_id))?;
    siege.progress = (siege.progress - magnitude.clamp(0.0, 1.0)).max(0.0);
    debug!(siege = %siege_id, magnitude, progress = siege.progress, "siege disrupted");
    Ok(siege.progress)
}

/// Lift a siege voluntarily
pub fn withdraw(world: &mut WorldState, siege_id: SiegeId, events: &mut Vec<CampaignEvent>) -> Result<()> {
    active_siege(world, siege_id)?;
    finish(world, siege_id, SiegeState::Abandoned, events);
    Ok(())
}

/// End a siege as failed; used when a relieving army beats the besiegers
pub fn fail_siege(world: &mut WorldState, siege_id: SiegeId, events: &mut Vec<CampaignEvent>) -> Result<()> {
    active_siege(world, siege_id)?;
    finish(world, siege_id, SiegeState::Failed, events);
    Ok(())
}

/// Take an army out of whatever siege it is part of
///
/// A siege that loses its last besieger is abandoned.
pub(crate) fn leave_siege(world: &mut WorldState, army_id: ArmyId, events: &mut Vec<CampaignEvent>) {
    let Some(siege_id) = world.armies.get_mut(&army_id).and_then(|a| a.siege.take()) else {
        return;
    };
    let Some(siege) = world.sieges.get_mut(&siege_id) else {
        return;
    };
    siege.besiegers.retain(|&id| id != army_id);
    if siege.is_active() && siege.besiegers.is_empty() {
        finish(world, siege_id, SiegeState::Abandoned, events);
    }
}

fn finish(world: &mut WorldState, siege_id: SiegeId, state: SiegeState, events: &mut Vec<CampaignEvent>) {
    let turn = world.turn;
    let Some(siege) = world.sieges.get_mut(&siege_id) else {
        return;
    };
    siege.state = state;
    siege.ended_turn = Some(turn);
    if state != SiegeState::Successful {
        siege.progress = 0.0;
    }
    let territory = siege.territory;
    let besiegers = siege.besiegers.clone();

    for id in besiegers {
        if let Some(army) = world.armies.get_mut(&id) {
            if army.siege == Some(siege_id) {
                army.siege = None;
            }
        }
    }

    info!(siege = %siege_id, %territory, ?state, "siege ended");
    events.push(CampaignEvent::SiegeEnded {
        siege: siege_id,
        territory,
        state,
    });
}

/// The besiegers take the territory
fn capture(world: &mut WorldState, siege_id: SiegeId, events: &mut Vec<CampaignEvent>) -> Result<()> {
    let siege = world
        .sieges
        .get_mut(&siege_id)
        .ok_or(WarfareError::UnknownSiege(siege_id))?;
    siege.progress = 1.0;
    let territory_id = siege.territory;
    let faction = siege.besieging_faction;
    let war = siege.war;

    world.transfer_control(
        territory_id,
        Some(faction),
        ControlChangeCause::SiegeCaptured(siege_id),
        events,
    )?;

    let territory = world
        .graph
        .get_mut(territory_id)
        .ok_or(WarfareError::UnknownTerritory(territory_id))?;
    let fallen = std::mem::take(&mut territory.garrison);
    let development = territory.development;
    if fallen > 0 {
        events.push(CampaignEvent::GarrisonLosses {
            territory: territory_id,
            casualties: fallen,
            remaining: 0,
        });
    }

    finish(world, siege_id, SiegeState::Successful, events);

    if let Some(war_id) = war {
        let side = world
            .wars
            .get(war_id)
            .filter(|w| w.is_active())
            .and_then(|w| w.side_of(faction));
        if let Some(side) = side {
            let score = development * world.config.siege.score_per_development;
            world.post_war_score(war_id, side, score, ScoreSource::Siege(siege_id), events)?;
        }
    }
    Ok(())
}

/// Result of fighting at the walls
#[derive(Debug, Clone, PartialEq)]
pub struct SiegeBattle {
    pub battle: BattleId,
    pub outcome: BattleOutcome,
    /// The territory fell as a result
    pub captured: bool,
    pub events: Vec<CampaignEvent>,
}

/// Combined force of every besieger at the walls, led by the ablest commander
fn besieger_force(world: &WorldState, faction: FactionId, armies: &[ArmyId]) -> Force {
    let mut units = Vec::new();
    let mut commander: Option<&Commander> = None;
    for army in armies.iter().filter_map(|id| world.armies.get(id)) {
        units.extend(army.units.iter().cloned());
        if let Some(c) = &army.commander {
            if commander.map(|best| c.combat_bonus() > best.combat_bonus()).unwrap_or(true) {
                commander = Some(c);
            }
        }
    }
    Force::new(faction, units, commander.cloned())
}

/// Garrison troops as a single infantry unit
fn garrison_force(territory: &Territory, faction: FactionId, config: &SiegeConfig) -> Force {
    let unit = Unit::new(UnitId(0), faction, UnitKind::Infantry, territory.garrison)
        .with_name("Garrison")
        .with_quality(config.garrison_quality);
    Force::new(faction, vec![unit], None)
}

/// Storm the walls instead of waiting
///
/// The garrison fights behind its fortifications. Victory captures the
/// territory at once; defeat costs progress.
pub fn assault(world: &mut WorldState, siege_id: SiegeId) -> Result<SiegeBattle> {
    siege_battle(world, siege_id, true)
}

/// The garrison strikes at the besiegers
///
/// A successful sortie sets the siege back; it never ends it.
pub fn sortie(world: &mut WorldState, siege_id: SiegeId) -> Result<SiegeBattle> {
    siege_battle(world, siege_id, false)
}

fn siege_battle(world: &mut WorldState, siege_id: SiegeId, storming: bool) -> Result<SiegeBattle> {
    let siege = active_siege(world, siege_id)?;
    let present = present_besiegers(world, siege);
    if present.is_empty() {
        return Err(WarfareError::InvalidEngagement(format!(
            "no besiegers at the walls of {}",
            siege.territory
        )));
    }
    let territory = world.graph.territory(siege.territory)?;
    if !storming && territory.garrison == 0 {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} has no garrison to sortie",
            territory.id
        )));
    }

    let besiegers = besieger_force(world, siege.besieging_faction, &present);
    let garrison = garrison_force(territory, siege.defending_faction, &world.config.siege);
    let input = if storming {
        BattleInput {
            attacker: besiegers,
            defender: garrison,
            field: Battlefield {
                terrain: territory.terrain,
                fortification: territory.fortification,
                defender_initiated: false,
                defender_holds_territory: true,
            },
        }
    } else {
        BattleInput {
            attacker: garrison,
            defender: besiegers,
            field: Battlefield::open(territory.terrain),
        }
    };
    let territory_id = siege.territory;
    let war = siege.war;
    let (besieging_faction, defending_faction) = (siege.besieging_faction, siege.defending_faction);
    let garrison_before = territory.garrison;

    let report = simulate_battle(&input, &world.config.battle);
    let battle_id = world.next_battle_id();
    info!(battle = %battle_id, siege = %siege_id, storming, outcome = ?report.outcome, "fighting at the walls");

    let mut events = vec![CampaignEvent::BattleFought {
        battle: battle_id,
        territory: territory_id,
        outcome: report.outcome,
    }];

    let (besieger_after, garrison_after) = if storming {
        (&report.attacker, &report.defender)
    } else {
        (&report.defender, &report.attacker)
    };
    world.apply_force(&present, besieger_after, &mut events);
    let garrison_left = garrison_after.total_size();
    if let Some(territory) = world.graph.get_mut(territory_id) {
        territory.garrison = garrison_left;
    }
    if garrison_left < garrison_before {
        events.push(CampaignEvent::GarrisonLosses {
            territory: territory_id,
            casualties: garrison_before - garrison_left,
            remaining: garrison_left,
        });
    }

    let factions = if storming {
        (besieging_faction, defending_faction)
    } else {
        (defending_faction, besieging_faction)
    };
    let score_delta = world.post_battle_score(war, &report, factions, ScoreSource::Battle(battle_id), &mut events);

    let (attacker, defender) = if storming {
        (Combatant::Besiegers(siege_id), Combatant::Garrison(territory_id))
    } else {
        (Combatant::Garrison(territory_id), Combatant::Besiegers(siege_id))
    };
    world.archive_battle(Battle {
        id: battle_id,
        turn: world.turn,
        territory: territory_id,
        attacker,
        defender,
        attacker_faction: factions.0,
        defender_faction: factions.1,
        war,
        outcome: report.outcome,
        termination: report.termination,
        rounds: report.rounds.clone(),
        attacker_casualties: report.attacker_casualties,
        defender_casualties: report.defender_casualties,
        attacker_starting_strength: report.attacker_starting_strength,
        defender_starting_strength: report.defender_starting_strength,
        score_delta,
    });

    let besiegers_won = match report.outcome {
        BattleOutcome::AttackerVictory => storming,
        BattleOutcome::DefenderVictory => !storming,
        BattleOutcome::Draw => false,
    };
    let garrison_won = report.outcome != BattleOutcome::Draw && !besiegers_won;

    let still_active = world.sieges.get(&siege_id).map(|s| s.is_active()).unwrap_or(false);
    let mut captured = false;
    if still_active {
        if storming && besiegers_won {
            capture(world, siege_id, &mut events)?;
            captured = true;
        } else if garrison_won && besiegers_wiped_out(world, siege_id) {
            // Beaten at the walls rather than marched away
            fail_siege(world, siege_id, &mut events)?;
        } else if garrison_won {
            let setback = if storming {
                world.config.siege.assault_failure_progress_loss
            } else {
                world.config.siege.sortie_disruption
            };
            disrupt(world, siege_id, setback)?;
        }
    }

    world.disband_destroyed(&mut events);

    Ok(SiegeBattle {
        battle: battle_id,
        outcome: report.outcome,
        captured,
        events,
    })
}

fn besiegers_wiped_out(world: &WorldState, siege_id: SiegeId) -> bool {
    world
        .sieges
        .get(&siege_id)
        .map(|siege| {
            siege
                .besiegers
                .iter()
                .all(|id| world.armies.get(id).map(|a| a.is_destroyed()).unwrap_or(true))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_delta_formula() {
        let config = SiegeConfig::default();
        // 0.1 × 300 / (100 + 2 × 100)
        let delta = progress_delta(300.0, 100.0, 2, &config);
        assert!((delta - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_fortification_slows_progress() {
        let config = SiegeConfig::default();
        let open = progress_delta(500.0, 200.0, 0, &config);
        let walled = progress_delta(500.0, 200.0, 3, &config);
        assert!(open > walled);
    }

    #[test]
    fn test_outmatched_besiegers_stall() {
        let config = SiegeConfig::default();
        assert_eq!(progress_delta(40.0, 100.0, 0, &config), 0.0);
        assert_eq!(progress_delta(0.0, 0.0, 0, &config), 0.0);
    }

    #[test]
    fn test_undefended_territory_falls_at_once() {
        let config = SiegeConfig::default();
        assert_eq!(progress_delta(10.0, 0.0, 0, &config), 1.0);
    }

    #[test]
    fn test_state_activity() {
        assert!(SiegeState::Initiated.is_active());
        assert!(SiegeState::Ongoing.is_active());
        assert!(!SiegeState::Successful.is_active());
        assert!(!SiegeState::Failed.is_active());
        assert!(!SiegeState::Abandoned.is_active());
    }
}
