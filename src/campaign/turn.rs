//! Turn orchestration
//!
//! Phases run in a fixed order:
//! 1. Marching armies advance (ascending army id)
//! 2. Arrivals meeting hostile armies fight (ascending territory, then arrival)
//! 3. Hostile armies left sharing a territory fight (ascending territory)
//! 4. Besieging arrivals start or join sieges (ascending territory, then arrival)
//! 5. Sieges begun on earlier turns advance (ascending territory, then siege id)
//! 6. Armies that did not fight recover morale
//!
//! A failed engagement is recorded in the report and never aborts the turn.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{info, warn};

use super::battle::resolve_battle;
use super::events::CampaignEvent;
use super::movement::{advance_armies, Arrival};
use super::siege::{advance_siege, join_siege, start_siege};
use super::world::WorldState;
use crate::core::error::WarfareError;
use crate::core::types::{ArmyId, BattleId, FactionId, SiegeId, TerritoryId, Turn};

/// An engagement the turn tried to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Battle {
        territory: TerritoryId,
        attacker: ArmyId,
        defender: ArmyId,
    },
    SiegeStart {
        territory: TerritoryId,
        army: ArmyId,
    },
    SiegeTurn {
        siege: SiegeId,
    },
}

#[derive(Debug)]
pub struct EngagementFailure {
    pub engagement: Engagement,
    pub error: WarfareError,
}

/// Everything that happened in one turn
#[derive(Debug, Default)]
pub struct TurnReport {
    /// Turn that was resolved
    pub turn: Turn,
    pub events: Vec<CampaignEvent>,
    pub battles: Vec<BattleId>,
    pub failures: Vec<EngagementFailure>,
}

/// Resolve one full turn
pub fn run_turn(world: &mut WorldState) -> TurnReport {
    let turn = world.turn;
    world.wars.set_turn(turn);

    let mut report = TurnReport {
        turn,
        events: world.take_events(),
        ..TurnReport::default()
    };
    let mut engaged: BTreeSet<ArmyId> = BTreeSet::new();

    let mut arrivals = advance_armies(world, &mut report.events);
    arrivals.sort_by_key(|a| (a.territory, a.army));

    for arrival in &arrivals {
        fight_on_arrival(world, arrival, &mut engaged, &mut report);
    }
    fight_standoffs(world, &mut engaged, &mut report);
    for arrival in arrivals.iter().filter(|a| a.besiege) {
        besiege_on_arrival(world, arrival, &mut report);
    }

    let mut due: Vec<(TerritoryId, SiegeId)> = world
        .sieges
        .values()
        .filter(|s| s.is_active() && s.started_turn < turn)
        .map(|s| (s.territory, s.id))
        .collect();
    due.sort();
    for (_, siege) in due {
        // A peace earlier this turn may already have lifted it
        if !world.sieges.get(&siege).map(|s| s.is_active()).unwrap_or(false) {
            continue;
        }
        match advance_siege(world, siege) {
            Ok(events) => report.events.extend(events),
            Err(error) => {
                warn!(%siege, %error, "siege turn failed");
                report.failures.push(EngagementFailure {
                    engagement: Engagement::SiegeTurn { siege },
                    error,
                });
            }
        }
    }

    let recovery = world.config.battle.morale_recovery_per_turn;
    for army in world.armies.values_mut().filter(|a| !engaged.contains(&a.id)) {
        army.recover_morale(recovery);
    }

    world.turn += 1;
    world.wars.set_turn(world.turn);
    info!(
        turn,
        events = report.events.len(),
        battles = report.battles.len(),
        failures = report.failures.len(),
        "turn resolved"
    );
    report
}

fn fight_on_arrival(
    world: &mut WorldState,
    arrival: &Arrival,
    engaged: &mut BTreeSet<ArmyId>,
    report: &mut TurnReport,
) {
    // Gone or driven off by an earlier battle this turn
    let Ok(army) = world.army(arrival.army) else {
        return;
    };
    if !army.is_stationed_at(arrival.territory) {
        return;
    }
    let Some(&defender) = world.hostile_armies_at(arrival.territory, army.faction).first() else {
        return;
    };

    report.events.push(CampaignEvent::Intercepted {
        army: arrival.army,
        hostile: defender,
        territory: arrival.territory,
    });
    engage(world, arrival.territory, arrival.army, defender, engaged, report);
}

/// Battles between hostile armies already sharing a territory
///
/// Recalled marches, fresh declarations of war and newly raised armies can
/// leave enemies side by side without anyone arriving. Each army fights at
/// most once per turn.
fn fight_standoffs(world: &mut WorldState, engaged: &mut BTreeSet<ArmyId>, report: &mut TurnReport) {
    let territories: Vec<TerritoryId> = world.graph.territories().map(|t| t.id).collect();
    for territory in territories {
        while let Some((attacker, defender)) = next_standoff(world, territory, engaged) {
            engage(world, territory, attacker, defender, engaged, report);
        }
    }
}

/// Lowest-id unengaged army facing an unengaged enemy, paired with the
/// lowest-id such enemy. The territory's holder defends.
fn next_standoff(
    world: &WorldState,
    territory: TerritoryId,
    engaged: &BTreeSet<ArmyId>,
) -> Option<(ArmyId, ArmyId)> {
    let present: Vec<(ArmyId, FactionId)> = world
        .armies_at(territory)
        .filter(|a| !engaged.contains(&a.id) && !a.is_destroyed())
        .map(|a| (a.id, a.faction))
        .collect();
    let holder = world.graph.get(territory).and_then(|t| t.controller);

    present.iter().find_map(|&(first, faction)| {
        let (second, _) = present
            .iter()
            .find(|(_, other)| world.are_hostile(*other, faction))?;
        Some(if holder == Some(faction) {
            (*second, first)
        } else {
            (first, *second)
        })
    })
}

fn engage(
    world: &mut WorldState,
    territory: TerritoryId,
    attacker: ArmyId,
    defender: ArmyId,
    engaged: &mut BTreeSet<ArmyId>,
    report: &mut TurnReport,
) {
    engaged.insert(attacker);
    engaged.insert(defender);

    match resolve_battle(world, attacker, defender) {
        Ok(resolution) => {
            report.battles.push(resolution.battle);
            report.events.extend(resolution.events);
        }
        Err(error) => {
            warn!(%attacker, %defender, %error, "battle failed");
            report.failures.push(EngagementFailure {
                engagement: Engagement::Battle {
                    territory,
                    attacker,
                    defender,
                },
                error,
            });
        }
    }
}

fn besiege_on_arrival(world: &mut WorldState, arrival: &Arrival, report: &mut TurnReport) {
    let Ok(army) = world.army(arrival.army) else {
        return;
    };
    if !army.is_stationed_at(arrival.territory) || army.siege.is_some() {
        return;
    }
    let faction = army.faction;

    let joinable = world
        .active_siege_at(arrival.territory)
        .filter(|id| {
            world
                .sieges
                .get(id)
                .map(|s| s.besieging_faction == faction)
                .unwrap_or(false)
        });
    let result = match joinable {
        Some(siege) => join_siege(world, siege, arrival.army),
        None => start_siege(world, arrival.army).map(|(_, events)| events),
    };

    if let Ok(army) = world.army_mut(arrival.army) {
        army.besiege_on_arrival = false;
    }
    match result {
        Ok(events) => report.events.extend(events),
        Err(error) => {
            warn!(army = %arrival.army, territory = %arrival.territory, %error, "siege not started");
            report.failures.push(EngagementFailure {
                engagement: Engagement::SiegeStart {
                    territory: arrival.territory,
                    army: arrival.army,
                },
                error,
            });
        }
    }
}

/// Resolve `turns` turns in a row
pub fn run_turns(world: &mut WorldState, turns: u32) -> Vec<TurnReport> {
    (0..turns).map(|_| run_turn(world)).collect()
}

/// Resolve one turn in each of several independent worlds
///
/// Worlds share nothing, so each runs on its own rayon worker. Results come
/// back in input order and match what sequential runs would produce.
pub fn run_worlds_parallel(worlds: &mut [WorldState]) -> Vec<TurnReport> {
    worlds.par_iter_mut().map(run_turn).collect()
}
