//! Territory graph - the strategic map armies move across
//!
//! Territories are kept in an ordered map so every walk over the graph
//! visits them in ascending id order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::territory::{Adjacency, Territory};
use crate::core::error::{Result, WarfareError};
use crate::core::types::{FactionId, TerritoryId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerritoryGraph {
    territories: BTreeMap<TerritoryId, Territory>,
}

impl TerritoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a territory, rejecting duplicate ids
    pub fn add_territory(&mut self, territory: Territory) -> Result<()> {
        if self.territories.contains_key(&territory.id) {
            return Err(WarfareError::InvalidMap(format!(
                "duplicate territory {}",
                territory.id
            )));
        }
        self.territories.insert(territory.id, territory);
        Ok(())
    }

    /// Connect two territories in both directions with the same base cost
    ///
    /// Re-connecting an existing pair replaces its cost.
    pub fn connect(&mut self, a: TerritoryId, b: TerritoryId, base_cost: f32) -> Result<()> {
        if a == b {
            return Err(WarfareError::InvalidMap(format!("self-loop on {}", a)));
        }
        if !base_cost.is_finite() || base_cost <= 0.0 {
            return Err(WarfareError::InvalidMap(format!(
                "edge {}-{} has non-positive cost {}",
                a, b, base_cost
            )));
        }
        if !self.contains(a) {
            return Err(WarfareError::UnknownTerritory(a));
        }
        if !self.contains(b) {
            return Err(WarfareError::UnknownTerritory(b));
        }

        for (from, to) in [(a, b), (b, a)] {
            if let Some(territory) = self.territories.get_mut(&from) {
                match territory.adjacency.iter_mut().find(|e| e.to == to) {
                    Some(edge) => edge.base_cost = base_cost,
                    None => territory.adjacency.push(Adjacency { to, base_cost }),
                }
                territory.adjacency.sort_by_key(|e| e.to);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    pub fn get_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(&id)
    }

    /// Lookup that fails with `UnknownTerritory`
    pub fn territory(&self, id: TerritoryId) -> Result<&Territory> {
        self.get(id).ok_or(WarfareError::UnknownTerritory(id))
    }

    pub fn contains(&self, id: TerritoryId) -> bool {
        self.territories.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    /// Territories in ascending id order
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    /// Neighbours in ascending id order
    pub fn neighbors(&self, id: TerritoryId) -> &[Adjacency] {
        self.territories
            .get(&id)
            .map(|t| t.adjacency.as_slice())
            .unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.neighbors(a).iter().any(|e| e.to == b)
    }

    /// Change a territory's controller, returns the previous one
    pub fn set_controller(
        &mut self,
        id: TerritoryId,
        controller: Option<FactionId>,
    ) -> Result<Option<FactionId>> {
        let territory = self
            .territories
            .get_mut(&id)
            .ok_or(WarfareError::UnknownTerritory(id))?;
        Ok(territory.transfer_control(controller))
    }

    pub fn controlled_by(&self, faction: FactionId) -> Vec<TerritoryId> {
        self.territories
            .values()
            .filter(|t| t.is_controlled_by(faction))
            .map(|t| t.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::terrain::Terrain;

    fn three_node_graph() -> TerritoryGraph {
        let mut graph = TerritoryGraph::new();
        for i in 1..=3 {
            graph
                .add_territory(Territory::new(TerritoryId(i), &format!("T{i}"), Terrain::Plains))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_connect_is_bidirectional() {
        let mut graph = three_node_graph();
        graph.connect(TerritoryId(1), TerritoryId(2), 2.0).unwrap();

        assert!(graph.are_adjacent(TerritoryId(1), TerritoryId(2)));
        assert!(graph.are_adjacent(TerritoryId(2), TerritoryId(1)));
        assert!(!graph.are_adjacent(TerritoryId(1), TerritoryId(3)));
    }

    #[test]
    fn test_reconnect_replaces_cost() {
        let mut graph = three_node_graph();
        graph.connect(TerritoryId(1), TerritoryId(2), 2.0).unwrap();
        graph.connect(TerritoryId(2), TerritoryId(1), 5.0).unwrap();

        assert_eq!(graph.neighbors(TerritoryId(1)).len(), 1);
        assert_eq!(graph.neighbors(TerritoryId(1))[0].base_cost, 5.0);
    }

    #[test]
    fn test_neighbors_sorted() {
        let mut graph = three_node_graph();
        graph.connect(TerritoryId(2), TerritoryId(3), 1.0).unwrap();
        graph.connect(TerritoryId(2), TerritoryId(1), 1.0).unwrap();

        let ids: Vec<_> = graph.neighbors(TerritoryId(2)).iter().map(|e| e.to).collect();
        assert_eq!(ids, vec![TerritoryId(1), TerritoryId(3)]);
    }

    #[test]
    fn test_invalid_edges_rejected() {
        let mut graph = three_node_graph();
        assert!(graph.connect(TerritoryId(1), TerritoryId(1), 1.0).is_err());
        assert!(graph.connect(TerritoryId(1), TerritoryId(2), 0.0).is_err());
        assert!(graph.connect(TerritoryId(1), TerritoryId(2), f32::NAN).is_err());
        assert!(matches!(
            graph.connect(TerritoryId(1), TerritoryId(9), 1.0),
            Err(WarfareError::UnknownTerritory(TerritoryId(9)))
        ));
    }

    #[test]
    fn test_duplicate_territory_rejected() {
        let mut graph = three_node_graph();
        let result = graph.add_territory(Territory::new(TerritoryId(1), "Again", Terrain::Hills));
        assert!(result.is_err());
    }

    #[test]
    fn test_set_controller() {
        let mut graph = three_node_graph();
        let old = graph.set_controller(TerritoryId(2), Some(FactionId(4))).unwrap();
        assert_eq!(old, None);
        assert_eq!(graph.controlled_by(FactionId(4)), vec![TerritoryId(2)]);
        assert!(graph.set_controller(TerritoryId(9), None).is_err());
    }
}
