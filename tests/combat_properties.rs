//! Property tests for battle casualties, siege progress, routing and war score

use arc_warfare::campaign::{
    advance_siege, simulate_battle, start_siege, BattleInput, Battlefield, SiegeState, WarGoal, WarLedger,
    WorldState,
};
use arc_warfare::core::config::{BattleConfig, WarConfig};
use arc_warfare::core::types::{FactionId, Side, TerritoryId, UnitId};
use arc_warfare::core::{SeasonalModifiers, WarfareConfig};
use arc_warfare::map::{find_path, MovementProfile, Terrain, Territory, TerritoryGraph};
use arc_warfare::military::{Force, Unit, UnitKind};
use proptest::prelude::*;

const KINDS: [UnitKind; 3] = [UnitKind::Infantry, UnitKind::Cavalry, UnitKind::Siege];

fn force_strategy(faction: u32) -> impl Strategy<Value = Force> {
    prop::collection::vec((0..3usize, 1..3000u32, 0.5..2.0f32), 1..4).prop_map(move |specs| {
        let units = specs
            .into_iter()
            .enumerate()
            .map(|(i, (kind, size, quality))| {
                Unit::new(UnitId(i as u32 + 1), FactionId(faction), KINDS[kind], size).with_quality(quality)
            })
            .collect();
        Force::new(FactionId(faction), units, None)
    })
}

fn terrain_strategy() -> impl Strategy<Value = Terrain> {
    prop::sample::select(vec![
        Terrain::Plains,
        Terrain::Hills,
        Terrain::Forest,
        Terrain::Mountains,
        Terrain::River,
        Terrain::Swamp,
    ])
}

fn battle_input() -> impl Strategy<Value = BattleInput> {
    (force_strategy(1), force_strategy(2), terrain_strategy(), 0..=10u8).prop_map(
        |(attacker, defender, terrain, fortification)| BattleInput {
            attacker,
            defender,
            field: Battlefield {
                terrain,
                fortification,
                defender_initiated: false,
                defender_holds_territory: true,
            },
        },
    )
}

proptest! {
    #[test]
    fn stronger_side_never_loses_larger_fraction(input in battle_input()) {
        let report = simulate_battle(&input, &BattleConfig::default());
        for round in &report.rounds {
            let a_total = (round.attacker_remaining + round.attacker_casualties) as u64;
            let d_total = (round.defender_remaining + round.defender_casualties) as u64;
            let a_lost = round.attacker_casualties as u64;
            let d_lost = round.defender_casualties as u64;
            if round.attacker_strength > round.defender_strength {
                prop_assert!(a_lost * d_total <= d_lost * a_total, "round {:?}", round);
            } else if round.defender_strength > round.attacker_strength {
                prop_assert!(d_lost * a_total <= a_lost * d_total, "round {:?}", round);
            }
        }
    }

    #[test]
    fn battles_end_within_round_limit(input in battle_input(), max_rounds in 1..12u32) {
        let config = BattleConfig { max_rounds, ..BattleConfig::default() };
        let report = simulate_battle(&input, &config);
        prop_assert!(report.rounds.len() as u32 <= max_rounds);
        prop_assert!(report.attacker_casualties <= input.attacker.total_size());
        prop_assert!(report.defender_casualties <= input.defender.total_size());
        prop_assert_eq!(
            report.attacker.total_size() + report.attacker_casualties,
            input.attacker.total_size()
        );
    }

    #[test]
    fn each_round_removes_exactly_its_casualties(input in battle_input()) {
        let report = simulate_battle(&input, &BattleConfig::default());
        let mut attacker = input.attacker.total_size();
        let mut defender = input.defender.total_size();
        for round in &report.rounds {
            prop_assert_eq!(round.attacker_remaining + round.attacker_casualties, attacker, "round {:?}", round);
            prop_assert_eq!(round.defender_remaining + round.defender_casualties, defender, "round {:?}", round);
            attacker = round.attacker_remaining;
            defender = round.defender_remaining;
        }
        prop_assert_eq!(report.attacker.total_size(), attacker);
        prop_assert_eq!(report.defender.total_size(), defender);
    }

    #[test]
    fn battle_simulation_is_deterministic(input in battle_input()) {
        let config = BattleConfig::default();
        prop_assert_eq!(simulate_battle(&input, &config), simulate_battle(&input, &config));
    }

    #[test]
    fn siege_progress_stays_in_bounds(
        garrison in 0..1500u32,
        fortification in 0..=10u8,
        besiegers in 1..3000u32,
    ) {
        let mut graph = TerritoryGraph::new();
        graph
            .add_territory(Territory::new(TerritoryId(1), "Keep", Terrain::Hills)
                .with_controller(FactionId(2))
                .with_fortification(fortification)
                .with_garrison(garrison))
            .unwrap();
        let mut world = WorldState::new(graph, WarfareConfig::default());
        world.declare_war(FactionId(1), FactionId(2), WarGoal::Conquest, Vec::new()).unwrap();
        let unit = world.raise_unit(FactionId(1), UnitKind::Infantry, besiegers);
        let army = world.spawn_army("Besiegers", FactionId(1), TerritoryId(1), vec![unit], None).unwrap();
        let (siege, _) = start_siege(&mut world, army).unwrap();

        let mut last = 0.0f32;
        for _ in 0..15 {
            advance_siege(&mut world, siege).unwrap();
            let s = &world.sieges[&siege];
            prop_assert!((0.0..=1.0).contains(&s.progress));
            prop_assert!(s.progress >= last);
            last = s.progress;
            if s.state == SiegeState::Successful {
                prop_assert!(world.graph.territory(TerritoryId(1)).unwrap().is_controlled_by(FactionId(1)));
                break;
            }
        }
    }

    #[test]
    fn routes_are_optimal_and_repeatable(
        chain in prop::collection::vec(0.5..5.0f32, 1..8),
        extra in prop::collection::vec((0..9u32, 0..9u32, 0.5..5.0f32), 0..10),
    ) {
        let n = chain.len() as u32 + 1;
        let mut graph = TerritoryGraph::new();
        for i in 1..=n {
            graph.add_territory(Territory::new(TerritoryId(i), "T", Terrain::Plains)).unwrap();
        }
        for (i, &cost) in chain.iter().enumerate() {
            graph.connect(TerritoryId(i as u32 + 1), TerritoryId(i as u32 + 2), cost).unwrap();
        }
        let chain_total: f32 = chain.iter().sum();
        for (a, b, cost) in extra {
            let (a, b) = (a % n + 1, b % n + 1);
            if a != b && b != a + 1 && a != b + 1 {
                graph.connect(TerritoryId(a), TerritoryId(b), cost).unwrap();
            }
        }

        let profile = MovementProfile::new(UnitKind::Infantry);
        let season = SeasonalModifiers::neutral();
        let route = find_path(&graph, TerritoryId(1), TerritoryId(n), &profile, &season).unwrap();
        let again = find_path(&graph, TerritoryId(1), TerritoryId(n), &profile, &season).unwrap();

        prop_assert_eq!(&route, &again);
        prop_assert_eq!(route.origin(), Some(TerritoryId(1)));
        prop_assert_eq!(route.destination(), Some(TerritoryId(n)));
        prop_assert_eq!(route.leg_costs.len(), route.hops());
        prop_assert!(route.total_cost <= chain_total + 1e-3);
        let legs: f32 = route.leg_costs.iter().sum();
        prop_assert!((legs - route.total_cost).abs() < 1e-3);
    }

    #[test]
    fn war_score_is_zero_sum(posts in prop::collection::vec((any::<bool>(), 0.0..20.0f32), 0..20)) {
        let config = WarConfig {
            capitulation_threshold: f32::MAX,
            ..WarConfig::default()
        };
        let mut ledger = WarLedger::new();
        let war = ledger.declare(FactionId(1), FactionId(2), WarGoal::Tribute).unwrap();

        let mut expected = 0.0f32;
        for (attacker, delta) in posts {
            let side = if attacker { Side::Attacker } else { Side::Defender };
            ledger.post_score(war, side, delta, &config).unwrap();
            expected += delta * side.sign();
        }

        let war = ledger.war(war).unwrap();
        prop_assert!((war.score - expected).abs() < 1e-2);
        prop_assert_eq!(war.score_for(Side::Attacker), -war.score_for(Side::Defender));
    }
}
