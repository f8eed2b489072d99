//! Arc Warfare - military conflict resolution for a strategy simulation
//!
//! Territory graph and pathfinding, army movement, battles, sieges and the
//! war score ledger. Everything runs turn by turn and is deterministic for a
//! given world state.

pub mod campaign;
pub mod core;
pub mod map;
pub mod military;
