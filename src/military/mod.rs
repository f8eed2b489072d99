//! Units, commanders and armies

pub mod army;
pub mod commander;
pub mod unit;

pub use army::{Army, ArmyPosition, Force, Transit};
pub use commander::{Commander, CommanderTrait};
pub use unit::{CombatRole, Unit, UnitKind, UnitStats};
