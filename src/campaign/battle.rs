//! Battle resolution for the campaign layer
//!
//! A battle is a bounded series of rounds between two forces. Each round the
//! weaker side loses the base casualty fraction and the stronger side a
//! fraction scaled down by the strength ratio. A side breaks when its
//! strength or morale collapses; if nobody breaks, the round limit decides.
//!
//! `simulate_battle` is pure. `resolve_battle` runs it against two armies in
//! a world and commits the result in one step.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::events::CampaignEvent;
use super::war::ScoreSource;
use super::world::WorldState;
use crate::core::config::BattleConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::types::{ArmyId, BattleId, FactionId, SiegeId, Side, TerritoryId, Turn, WarId};
use crate::map::terrain::Terrain;
use crate::military::army::Force;
use crate::military::unit::CombatRole;

/// Outcome of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    AttackerVictory,
    DefenderVictory,
    Draw,
}

impl BattleOutcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            BattleOutcome::AttackerVictory => Some(Side::Attacker),
            BattleOutcome::DefenderVictory => Some(Side::Defender),
            BattleOutcome::Draw => None,
        }
    }

    fn for_winner(winner: Option<Side>) -> Self {
        match winner {
            Some(Side::Attacker) => BattleOutcome::AttackerVictory,
            Some(Side::Defender) => BattleOutcome::DefenderVictory,
            None => BattleOutcome::Draw,
        }
    }
}

/// Why the fighting stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// One side fell below the rout strength fraction or was wiped out
    Rout(Side),
    /// One side's morale fell below the flee threshold
    Fled(Side),
    /// Both sides broke in the same round
    MutualRout,
    RoundLimit,
    /// A side brought no strength to the field
    NoContest,
}

/// Who fought on one side of a recorded battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combatant {
    Army(ArmyId),
    /// Every army besieging under this siege
    Besiegers(SiegeId),
    Garrison(TerritoryId),
}

/// State after one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: u32,
    /// Effective strengths going into the round
    pub attacker_strength: f32,
    pub defender_strength: f32,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
    pub attacker_remaining: u32,
    pub defender_remaining: u32,
    pub attacker_morale: f32,
    pub defender_morale: f32,
}

/// Where a battle is fought
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    pub terrain: Terrain,
    pub fortification: u8,
    /// The defending side started this fight
    pub defender_initiated: bool,
    /// The defending side controls the territory
    pub defender_holds_territory: bool,
}

impl Battlefield {
    pub fn open(terrain: Terrain) -> Self {
        Self {
            terrain,
            fortification: 0,
            defender_initiated: false,
            defender_holds_territory: false,
        }
    }

    /// Defender multiplier from the territory's fortifications
    pub fn fortification_modifier(&self, config: &BattleConfig) -> f32 {
        if self.fortification > 0 && !self.defender_initiated && self.defender_holds_territory {
            1.0 + self.fortification as f32 * config.fortification_bonus_per_level
        } else {
            1.0
        }
    }
}

/// Everything a battle needs, snapshotted from the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleInput {
    pub attacker: Force,
    pub defender: Force,
    pub field: Battlefield,
}

/// Result of a simulated battle; both forces carry their post-battle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub outcome: BattleOutcome,
    pub termination: Termination,
    pub rounds: Vec<RoundSnapshot>,
    pub attacker: Force,
    pub defender: Force,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
    pub attacker_starting_strength: f32,
    pub defender_starting_strength: f32,
    pub attacker_final_strength: f32,
    pub defender_final_strength: f32,
}

impl BattleReport {
    /// War score earned by the winner, zero on a draw
    pub fn score_value(&self, config: &BattleConfig) -> f32 {
        let lost = match self.outcome {
            BattleOutcome::AttackerVictory => self.defender_starting_strength - self.defender_final_strength,
            BattleOutcome::DefenderVictory => self.attacker_starting_strength - self.attacker_final_strength,
            BattleOutcome::Draw => return 0.0,
        };
        (lost.max(0.0) * config.score_per_strength_lost).min(config.max_battle_score)
    }
}

/// Archived battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub turn: Turn,
    pub territory: TerritoryId,
    pub attacker: Combatant,
    pub defender: Combatant,
    pub attacker_faction: FactionId,
    pub defender_faction: FactionId,
    pub war: Option<WarId>,
    pub outcome: BattleOutcome,
    pub termination: Termination,
    pub rounds: Vec<RoundSnapshot>,
    pub attacker_casualties: u32,
    pub defender_casualties: u32,
    pub attacker_starting_strength: f32,
    pub defender_starting_strength: f32,
    /// Score posted to the war, attacker-positive from the war's view
    pub score_delta: f32,
}

#[derive(Debug, Clone, Copy)]
struct SideModifier {
    role: CombatRole,
    multiplier: f32,
}

impl SideModifier {
    fn strength(&self, force: &Force, config: &BattleConfig) -> f32 {
        force.raw_strength(self.role, config.experience_bonus_scale) * self.multiplier
    }
}

/// Casualty fractions `(attacker, defender)` for strengths `a` and `d`
///
/// The weaker side takes the base rate. The stronger side takes the base
/// rate scaled by `weaker / stronger`, so never more than the weaker side.
pub fn casualty_rates(a: f32, d: f32, base: f32) -> (f32, f32) {
    let base = base.clamp(0.0, 1.0);
    if a <= 0.0 || d <= 0.0 || a == d {
        return (base, base);
    }
    if a > d {
        ((base * d / a).min(base), base)
    } else {
        (base, (base * a / d).min(base))
    }
}

/// Absorbs f32 noise before casualty counts are rounded to whole troops
const ROUNDING_SLACK: f64 = 1e-4;

/// Troops lost by the weaker side: the rate rounded up, at least one
fn weaker_losses(total: u32, rate: f32) -> u32 {
    if total == 0 || rate <= 0.0 {
        return 0;
    }
    let exact = total as f64 * rate as f64;
    ((exact - ROUNDING_SLACK).ceil().max(1.0) as u32).min(total)
}

/// Troops lost by the stronger side: the rate rounded down, at least one,
/// and never a larger fraction of its troops than the weaker side lost
fn stronger_losses(total: u32, rate: f32, weaker_lost: u32, weaker_total: u32) -> u32 {
    if total == 0 || rate <= 0.0 || weaker_total == 0 {
        return 0;
    }
    let exact = total as f64 * rate as f64;
    let target = ((exact + ROUNDING_SLACK).floor() as u32).max(1);
    let cap = (total as u64 * weaker_lost as u64 / weaker_total as u64) as u32;
    target.min(cap).min(total)
}

/// Spread `casualties` across units pro rata by size
///
/// Largest remainder method; remainders are handed out in unit order when
/// tied. Morale falls with each unit's own casualty fraction.
fn distribute_casualties(force: &mut Force, casualties: u32, morale_per_fraction: f32) {
    let total = force.total_size() as u64;
    if total == 0 || casualties == 0 {
        return;
    }

    let mut shares: Vec<(usize, u64, u64)> = force
        .units
        .iter()
        .enumerate()
        .map(|(i, u)| {
            let numerator = casualties as u64 * u.size as u64;
            (i, numerator / total, numerator % total)
        })
        .collect();

    let allocated: u64 = shares.iter().map(|(_, whole, _)| whole).sum();
    let mut leftover = (casualties as u64).saturating_sub(allocated);

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&x, &y| shares[y].2.cmp(&shares[x].2).then(x.cmp(&y)));
    for idx in order {
        if leftover == 0 {
            break;
        }
        if shares[idx].2 > 0 {
            shares[idx].1 += 1;
            leftover -= 1;
        }
    }

    for (i, lost, _) in shares {
        let unit = &mut force.units[i];
        let before = unit.size;
        let removed = unit.apply_casualties(lost as u32);
        if before > 0 && removed > 0 {
            unit.lose_morale(removed as f32 / before as f32 * morale_per_fraction);
        }
    }
}

/// Decide a winner by remaining strength; exact equality is a draw
fn compare(a: f32, d: f32) -> Option<Side> {
    if a > d {
        Some(Side::Attacker)
    } else if d > a {
        Some(Side::Defender)
    } else {
        None
    }
}

/// Run a battle to completion without touching any world state
pub fn simulate_battle(input: &BattleInput, config: &BattleConfig) -> BattleReport {
    let mut attacker = input.attacker.clone();
    let mut defender = input.defender.clone();

    let attack = SideModifier {
        role: CombatRole::Attack,
        multiplier: input.field.terrain.attacker_penalty() * (1.0 + attacker.combat_bonus()).max(0.0),
    };
    let defend = SideModifier {
        role: CombatRole::Defense,
        multiplier: input.field.fortification_modifier(config) * (1.0 + defender.combat_bonus()).max(0.0),
    };

    let a_start = attack.strength(&attacker, config);
    let d_start = defend.strength(&defender, config);
    let a_size = attacker.total_size();
    let d_size = defender.total_size();

    let mut rounds = Vec::new();
    let (winner, termination) = if a_start <= 0.0 || d_start <= 0.0 {
        let winner = match (a_start > 0.0, d_start > 0.0) {
            (true, false) => Some(Side::Attacker),
            (false, true) => Some(Side::Defender),
            _ => None,
        };
        (winner, Termination::NoContest)
    } else {
        fight(
            &mut attacker,
            &mut defender,
            attack,
            defend,
            (a_start, d_start),
            config,
            &mut rounds,
        )
    };

    // Final strengths exclude the experience awarded below
    let a_final = attack.strength(&attacker, config);
    let d_final = defend.strength(&defender, config);

    let outcome = BattleOutcome::for_winner(winner);
    if termination != Termination::NoContest {
        let (a_gain, d_gain) = match outcome {
            BattleOutcome::AttackerVictory => (config.winner_experience_gain, config.loser_experience_gain),
            BattleOutcome::DefenderVictory => (config.loser_experience_gain, config.winner_experience_gain),
            BattleOutcome::Draw => (config.loser_experience_gain, config.loser_experience_gain),
        };
        for unit in attacker.units.iter_mut().filter(|u| !u.is_disbanded()) {
            unit.gain_experience(a_gain);
        }
        for unit in defender.units.iter_mut().filter(|u| !u.is_disbanded()) {
            unit.gain_experience(d_gain);
        }
    }

    debug!(?outcome, ?termination, rounds = rounds.len(), a_start, d_start, "battle simulated");

    BattleReport {
        outcome,
        termination,
        rounds,
        attacker_casualties: a_size - attacker.total_size(),
        defender_casualties: d_size - defender.total_size(),
        attacker,
        defender,
        attacker_starting_strength: a_start,
        defender_starting_strength: d_start,
        attacker_final_strength: a_final,
        defender_final_strength: d_final,
    }
}

fn fight(
    attacker: &mut Force,
    defender: &mut Force,
    attack: SideModifier,
    defend: SideModifier,
    (a_start, d_start): (f32, f32),
    config: &BattleConfig,
    rounds: &mut Vec<RoundSnapshot>,
) -> (Option<Side>, Termination) {
    let max_rounds = config.max_rounds.max(1);

    for round in 1..=max_rounds {
        let a = attack.strength(attacker, config);
        let d = defend.strength(defender, config);
        let a_total = attacker.total_size();
        let d_total = defender.total_size();

        let (a_rate, d_rate) = casualty_rates(a, d, config.base_casualty_rate);
        let (a_lost, d_lost) = if a > d {
            let d_lost = weaker_losses(d_total, d_rate);
            (stronger_losses(a_total, a_rate, d_lost, d_total), d_lost)
        } else if d > a {
            let a_lost = weaker_losses(a_total, a_rate);
            (a_lost, stronger_losses(d_total, d_rate, a_lost, a_total))
        } else {
            (weaker_losses(a_total, a_rate), weaker_losses(d_total, d_rate))
        };

        distribute_casualties(attacker, a_lost, config.morale_loss_per_casualty_fraction);
        distribute_casualties(defender, d_lost, config.morale_loss_per_casualty_fraction);

        rounds.push(RoundSnapshot {
            round,
            attacker_strength: a,
            defender_strength: d,
            attacker_casualties: a_lost,
            defender_casualties: d_lost,
            attacker_remaining: attacker.total_size(),
            defender_remaining: defender.total_size(),
            attacker_morale: attacker.average_morale(),
            defender_morale: defender.average_morale(),
        });

        let a_after = attack.strength(attacker, config);
        let d_after = defend.strength(defender, config);
        let a_broken = breaking(attacker, a_after, a_start, config);
        let d_broken = breaking(defender, d_after, d_start, config);

        match (a_broken, d_broken) {
            (Some(_), Some(_)) => {
                // Whoever kept the larger share of its starting strength holds the field
                return (compare(a_after / a_start, d_after / d_start), Termination::MutualRout);
            }
            (Some(how), None) => return (Some(Side::Defender), how.apply(Side::Attacker)),
            (None, Some(how)) => return (Some(Side::Attacker), how.apply(Side::Defender)),
            (None, None) => {}
        }

        if round == max_rounds {
            return (compare(a_after, d_after), Termination::RoundLimit);
        }
    }

    (None, Termination::RoundLimit)
}

#[derive(Debug, Clone, Copy)]
enum Breaking {
    Routed,
    Fled,
}

impl Breaking {
    fn apply(self, side: Side) -> Termination {
        match self {
            Breaking::Routed => Termination::Rout(side),
            Breaking::Fled => Termination::Fled(side),
        }
    }
}

fn breaking(force: &Force, strength: f32, starting: f32, config: &BattleConfig) -> Option<Breaking> {
    if force.total_size() == 0 || strength < config.rout_strength_fraction * starting {
        Some(Breaking::Routed)
    } else if force.average_morale() < config.flee_morale {
        Some(Breaking::Fled)
    } else {
        None
    }
}

/// Result of a committed battle
#[derive(Debug, Clone, PartialEq)]
pub struct BattleResolution {
    pub battle: BattleId,
    pub outcome: BattleOutcome,
    pub events: Vec<CampaignEvent>,
}

/// Fight a battle between two co-located hostile armies and commit it
///
/// Nothing is written to the world unless the engagement is valid.
pub fn resolve_battle(world: &mut WorldState, attacker_id: ArmyId, defender_id: ArmyId) -> Result<BattleResolution> {
    if attacker_id == defender_id {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} cannot fight itself",
            attacker_id
        )));
    }
    let attacker = world.army(attacker_id)?;
    let defender = world.army(defender_id)?;

    let territory_id = match (attacker.location(), defender.location()) {
        (Some(a), Some(d)) if a == d => a,
        _ => {
            return Err(WarfareError::InvalidEngagement(format!(
                "{} and {} are not in the same territory",
                attacker_id, defender_id
            )))
        }
    };
    let war = world.wars.active_war_between(attacker.faction, defender.faction);
    if war.is_none() {
        return Err(WarfareError::InvalidEngagement(format!(
            "{} and {} are not at war",
            attacker.faction, defender.faction
        )));
    }

    let territory = world.graph.territory(territory_id)?;
    let field = Battlefield {
        terrain: territory.terrain,
        fortification: territory.fortification,
        defender_initiated: false,
        defender_holds_territory: territory.is_controlled_by(defender.faction),
    };
    let input = BattleInput {
        attacker: attacker.force(),
        defender: defender.force(),
        field,
    };
    let attacker_faction = attacker.faction;
    let defender_faction = defender.faction;

    let report = simulate_battle(&input, &world.config.battle);
    let battle_id = world.next_battle_id();
    info!(
        battle = %battle_id,
        territory = %territory_id,
        attacker = %attacker_id,
        defender = %defender_id,
        outcome = ?report.outcome,
        "battle resolved"
    );

    let mut events = vec![CampaignEvent::BattleFought {
        battle: battle_id,
        territory: territory_id,
        outcome: report.outcome,
    }];

    world.apply_force(&[attacker_id], &report.attacker, &mut events);
    world.apply_force(&[defender_id], &report.defender, &mut events);

    let score_delta = world.post_battle_score(
        war,
        &report,
        (attacker_faction, defender_faction),
        ScoreSource::Battle(battle_id),
        &mut events,
    );

    world.archive_battle(Battle {
        id: battle_id,
        turn: world.turn,
        territory: territory_id,
        attacker: Combatant::Army(attacker_id),
        defender: Combatant::Army(defender_id),
        attacker_faction,
        defender_faction,
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

    if let Some(winner) = report.outcome.winner() {
        let (winner_faction, loser_army) = match winner {
            Side::Attacker => (attacker_faction, defender_id),
            Side::Defender => (defender_faction, attacker_id),
        };
        world.relieve_sieges(territory_id, winner_faction, loser_army, &mut events);
        world.retreat(loser_army, &mut events);
    }

    world.disband_destroyed(&mut events);

    Ok(BattleResolution {
        battle: battle_id,
        outcome: report.outcome,
        events,
    })
}
