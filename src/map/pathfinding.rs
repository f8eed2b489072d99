//! Lowest-cost routing over the territory graph
//!
//! Dijkstra over a compound key `(cost, hops, path)`. Ties on cost go to the
//! route with fewer hops, then to the lexicographically smaller sequence of
//! territory ids. The key order survives extension by a common edge, so the
//! first time the destination is settled its label is the unique best one.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::graph::TerritoryGraph;
use super::terrain::Terrain;
use crate::core::error::{Result, WarfareError};
use crate::core::season::SeasonalModifiers;
use crate::core::types::TerritoryId;
use crate::military::unit::UnitKind;

/// Which unit kinds have to make the march
///
/// A mixed army moves at the pace of its slowest kind and only enters
/// terrain every kind can enter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementProfile {
    kinds: Vec<UnitKind>,
}

impl MovementProfile {
    pub fn new(kind: UnitKind) -> Self {
        Self { kinds: vec![kind] }
    }

    /// Profile for a set of kinds; an empty set marches as infantry
    pub fn from_kinds(kinds: impl IntoIterator<Item = UnitKind>) -> Self {
        let mut kinds: Vec<UnitKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        if kinds.is_empty() {
            kinds.push(UnitKind::Infantry);
        }
        Self { kinds }
    }

    pub fn kinds(&self) -> &[UnitKind] {
        &self.kinds
    }

    /// Worst terrain modifier across kinds, `None` if any kind is blocked
    pub fn terrain_factor(&self, terrain: Terrain) -> Option<f32> {
        let mut worst: f32 = 0.0;
        for kind in &self.kinds {
            worst = worst.max(terrain.movement_modifier(*kind)?);
        }
        Some(worst)
    }
}

/// A computed route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Territories from origin to destination inclusive
    pub path: Vec<TerritoryId>,
    /// Cost of each traversed edge, in order
    pub leg_costs: Vec<f32>,
    pub total_cost: f32,
}

impl Route {
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn origin(&self) -> Option<TerritoryId> {
        self.path.first().copied()
    }

    pub fn destination(&self) -> Option<TerritoryId> {
        self.path.last().copied()
    }
}

/// Cost of stepping from `from` into the neighbour `to`
///
/// `base edge cost × terrain modifier of the entered territory × season`.
/// `None` when the edge does not exist or the profile cannot enter `to`.
pub fn leg_cost(
    graph: &TerritoryGraph,
    from: TerritoryId,
    to: TerritoryId,
    profile: &MovementProfile,
    season: &SeasonalModifiers,
) -> Option<f32> {
    let edge = graph.get(from)?.edge_to(to)?;
    let target = graph.get(to)?;
    let terrain = profile.terrain_factor(target.terrain)?;
    Some(edge.base_cost * terrain * season.movement_cost.max(0.0))
}

type Label = (OrderedFloat<f32>, u32, Vec<TerritoryId>);

/// Find the lowest-cost route from `origin` to `destination`
///
/// Fails with `NoRouteFound` when the destination cannot be reached with
/// this profile. That is an ordinary outcome; callers pick another target.
pub fn find_path(
    graph: &TerritoryGraph,
    origin: TerritoryId,
    destination: TerritoryId,
    profile: &MovementProfile,
    season: &SeasonalModifiers,
) -> Result<Route> {
    graph.territory(origin)?;
    graph.territory(destination)?;

    if origin == destination {
        return Ok(Route {
            path: vec![origin],
            leg_costs: Vec::new(),
            total_cost: 0.0,
        });
    }

    let mut open: BinaryHeap<Reverse<Label>> = BinaryHeap::new();
    let mut best: AHashMap<TerritoryId, Label> = AHashMap::new();
    let mut settled: AHashSet<TerritoryId> = AHashSet::new();

    let start: Label = (OrderedFloat(0.0), 0, vec![origin]);
    best.insert(origin, start.clone());
    open.push(Reverse(start));

    while let Some(Reverse((cost, hops, path))) = open.pop() {
        let Some(&current) = path.last() else {
            continue;
        };
        if !settled.insert(current) {
            continue;
        }

        if current == destination {
            return Ok(build_route(graph, path, profile, season, cost.into_inner()));
        }

        for edge in graph.neighbors(current) {
            if settled.contains(&edge.to) {
                continue;
            }
            let Some(step) = leg_cost(graph, current, edge.to, profile, season) else {
                continue;
            };

            let mut next_path = path.clone();
            next_path.push(edge.to);
            let candidate: Label = (OrderedFloat(cost.into_inner() + step), hops + 1, next_path);

            let improves = match best.get(&edge.to) {
                Some(existing) => candidate < *existing,
                None => true,
            };
            if improves {
                best.insert(edge.to, candidate.clone());
                open.push(Reverse(candidate));
            }
        }
    }

    Err(WarfareError::NoRouteFound {
        from: origin,
        to: destination,
    })
}

fn build_route(
    graph: &TerritoryGraph,
    path: Vec<TerritoryId>,
    profile: &MovementProfile,
    season: &SeasonalModifiers,
    total_cost: f32,
) -> Route {
    let leg_costs = path
        .windows(2)
        .filter_map(|w| leg_cost(graph, w[0], w[1], profile, season))
        .collect();
    Route {
        path,
        leg_costs,
        total_cost,
    }
}
