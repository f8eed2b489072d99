//! Army movement scheduling
//!
//! Orders compute a route once, up front. Each turn a marching army pays its
//! speed against the remaining route cost and arrives when nothing is left.
//! Armies advance in ascending id order.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::events::CampaignEvent;
use super::world::WorldState;
use crate::core::error::{Result, WarfareError};
use crate::core::types::{ArmyId, TerritoryId};
use crate::map::pathfinding::{find_path, Route};
use crate::military::army::{ArmyPosition, Transit};

/// An army reaching the end of its march this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    pub army: ArmyId,
    pub territory: TerritoryId,
    /// Start or join a siege on arrival
    pub besiege: bool,
}

/// Order a stationed army to march to `destination`
pub fn order_move(world: &mut WorldState, army: ArmyId, destination: TerritoryId) -> Result<Route> {
    dispatch(world, army, destination, false)
}

/// Order a stationed army to march on `target` and besiege it on arrival
pub fn order_besiege(world: &mut WorldState, army: ArmyId, target: TerritoryId) -> Result<Route> {
    dispatch(world, army, target, true)
}

fn dispatch(world: &mut WorldState, army_id: ArmyId, destination: TerritoryId, besiege: bool) -> Result<Route> {
    let army = world.army(army_id)?;
    let origin = army.location().ok_or_else(|| {
        WarfareError::InvalidOrder(format!("{} is already on the march", army_id))
    })?;
    if origin == destination {
        return Err(WarfareError::InvalidOrder(format!(
            "{} is already at {}",
            army_id, destination
        )));
    }
    if let Some(siege) = army.siege {
        return Err(WarfareError::InvalidOrder(format!(
            "{} is besieging under {}; withdraw first",
            army_id, siege
        )));
    }

    let route = find_path(
        &world.graph,
        origin,
        destination,
        &army.movement_profile(),
        &world.modifiers,
    )?;

    let army = world.army_mut(army_id)?;
    army.position = ArmyPosition::InTransit(Transit {
        origin,
        destination,
        route: route.clone(),
        cost_remaining: route.total_cost,
    });
    army.besiege_on_arrival = besiege;

    info!(army = %army_id, %origin, %destination, cost = route.total_cost, besiege, "army marching");
    world.record(CampaignEvent::ArmyDeparted {
        army: army_id,
        origin,
        destination,
        cost: route.total_cost,
    });
    Ok(route)
}

/// Turn a marching army back to where it set out from
pub fn recall(world: &mut WorldState, army_id: ArmyId) -> Result<TerritoryId> {
    let army = world.army_mut(army_id)?;
    let origin = match &army.position {
        ArmyPosition::InTransit(transit) => transit.origin,
        ArmyPosition::Stationed(_) => {
            return Err(WarfareError::InvalidOrder(format!("{} is not marching", army_id)))
        }
    };
    army.position = ArmyPosition::Stationed(origin);
    army.besiege_on_arrival = false;

    debug!(army = %army_id, territory = %origin, "army recalled");
    world.record(CampaignEvent::ArmyRecalled {
        army: army_id,
        territory: origin,
    });
    Ok(origin)
}

/// Move every marching army one turn along its route
pub fn advance_armies(world: &mut WorldState, events: &mut Vec<CampaignEvent>) -> Vec<Arrival> {
    let movement = world.config.movement.clone();
    let mut arrivals = Vec::new();

    for army in world.armies.values_mut() {
        let speed = army.speed(&movement);
        let ArmyPosition::InTransit(transit) = &mut army.position else {
            continue;
        };
        transit.cost_remaining -= speed;
        if transit.cost_remaining > 0.0 {
            continue;
        }

        let territory = transit.destination;
        army.position = ArmyPosition::Stationed(territory);
        debug!(army = %army.id, %territory, "army arrived");
        events.push(CampaignEvent::ArmyArrived {
            army: army.id,
            territory,
        });
        arrivals.push(Arrival {
            army: army.id,
            territory,
            besiege: army.besiege_on_arrival,
        });
    }
    arrivals
}
