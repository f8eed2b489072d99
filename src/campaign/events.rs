//! Events emitted for collaborators
//!
//! The history log, economy and diplomacy layers consume these; nothing in
//! the engine reads them back.

use serde::{Deserialize, Serialize};

use super::battle::BattleOutcome;
use super::siege::SiegeState;
use super::war::{PeaceSettlement, WarGoal};
use crate::core::types::{ArmyId, BattleId, FactionId, SiegeId, TerritoryId, UnitId, WarId};

/// Why a territory changed hands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlChangeCause {
    SiegeCaptured(SiegeId),
    PeaceTreaty(WarId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CampaignEvent {
    ArmyDeparted {
        army: ArmyId,
        origin: TerritoryId,
        destination: TerritoryId,
        cost: f32,
    },
    ArmyArrived {
        army: ArmyId,
        territory: TerritoryId,
    },
    ArmyRecalled {
        army: ArmyId,
        territory: TerritoryId,
    },
    Intercepted {
        army: ArmyId,
        hostile: ArmyId,
        territory: TerritoryId,
    },
    ArmyRetreated {
        army: ArmyId,
        from: TerritoryId,
        to: TerritoryId,
    },
    BattleFought {
        battle: BattleId,
        territory: TerritoryId,
        outcome: BattleOutcome,
    },
    CasualtiesApplied {
        army: ArmyId,
        unit: UnitId,
        casualties: u32,
        remaining: u32,
    },
    UnitDisbanded {
        army: ArmyId,
        unit: UnitId,
    },
    ArmyDisbanded {
        army: ArmyId,
    },
    GarrisonLosses {
        territory: TerritoryId,
        casualties: u32,
        remaining: u32,
    },
    SiegeStarted {
        siege: SiegeId,
        territory: TerritoryId,
        army: ArmyId,
    },
    SiegeJoined {
        siege: SiegeId,
        army: ArmyId,
    },
    SiegeProgressed {
        siege: SiegeId,
        progress: f32,
    },
    SiegeEnded {
        siege: SiegeId,
        territory: TerritoryId,
        state: SiegeState,
    },
    ControlChanged {
        territory: TerritoryId,
        old: Option<FactionId>,
        new: Option<FactionId>,
        cause: ControlChangeCause,
    },
    WarDeclared {
        war: WarId,
        attacker: FactionId,
        defender: FactionId,
        goal: WarGoal,
    },
    WarScoreChanged {
        war: WarId,
        delta: f32,
        score: f32,
    },
    WarConcluded {
        war: WarId,
        settlement: PeaceSettlement,
    },
}
