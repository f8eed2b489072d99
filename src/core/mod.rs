pub mod config;
pub mod error;
pub mod season;
pub mod types;

pub use config::WarfareConfig;
pub use error::{Result, WarfareError};
pub use season::{Season, SeasonalModifiers};
