//! Campaign layer: the warfare engine's world and its resolvers
//!
//! Armies march across the territory graph, fight when they meet enemies,
//! besiege enemy territories and feed war score into the war ledger.

pub mod battle;
pub mod events;
pub mod hazards;
pub mod movement;
pub mod scenario;
pub mod siege;
pub mod turn;
pub mod war;
pub mod world;

pub use battle::{
    resolve_battle, simulate_battle, Battle, BattleInput, BattleOutcome, BattleReport, BattleResolution,
    Battlefield, Combatant, RoundSnapshot, Termination,
};
pub use events::{CampaignEvent, ControlChangeCause};
pub use hazards::{HazardConfig, SiegeHazards};
pub use movement::{advance_armies, order_besiege, order_move, recall, Arrival};
pub use scenario::Scenario;
pub use siege::{
    advance_siege, assault, disrupt, fail_siege, join_siege, sortie, start_siege, withdraw, Siege, SiegeBattle,
    SiegeState,
};
pub use turn::{run_turn, run_turns, run_worlds_parallel, Engagement, EngagementFailure, TurnReport};
pub use war::{PeaceSettlement, PeaceTerms, ScoreSource, War, WarGoal, WarLedger, WarStatus};
pub use world::WorldState;
