//! Campaign map: territories, terrain and routing

pub mod graph;
pub mod pathfinding;
pub mod terrain;
pub mod territory;

pub use graph::TerritoryGraph;
pub use pathfinding::{find_path, MovementProfile, Route};
pub use terrain::Terrain;
pub use territory::{Adjacency, Territory};
