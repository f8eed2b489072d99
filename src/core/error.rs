use thiserror::Error;

use crate::core::types::{ArmyId, FactionId, SiegeId, TerritoryId, WarId};

#[derive(Error, Debug)]
pub enum WarfareError {
    #[error("No route from {from} to {to}")]
    NoRouteFound { from: TerritoryId, to: TerritoryId },

    #[error("Territory {0} already has an active siege")]
    SiegeAlreadyActive(TerritoryId),

    #[error("Factions {attacker} and {defender} are already at war")]
    AlreadyAtWar {
        attacker: FactionId,
        defender: FactionId,
    },

    #[error("Invalid engagement: {0}")]
    InvalidEngagement(String),

    #[error("Insufficient war score: have {have:.1}, need {need:.1}")]
    InsufficientScore { have: f32, need: f32 },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid map: {0}")]
    InvalidMap(String),

    #[error("Territory not found: {0}")]
    UnknownTerritory(TerritoryId),

    #[error("Army not found: {0}")]
    UnknownArmy(ArmyId),

    #[error("Siege not found: {0}")]
    UnknownSiege(SiegeId),

    #[error("War not found: {0}")]
    UnknownWar(WarId),

    #[error("War {0} has already concluded")]
    WarConcluded(WarId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WarfareError>;
