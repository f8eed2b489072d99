//! Campaign integration tests: movement, battles, sieges and wars together

use arc_warfare::campaign::{
    assault, disrupt, order_besiege, resolve_battle, run_turn, run_turns, run_worlds_parallel, sortie,
    start_siege, withdraw, BattleOutcome, CampaignEvent, Combatant, HazardConfig, PeaceTerms, Scenario,
    SiegeHazards, SiegeState, WarGoal, WarStatus, WorldState,
};
use arc_warfare::core::error::WarfareError;
use arc_warfare::core::types::{ArmyId, FactionId, Side, SiegeId, TerritoryId};
use arc_warfare::core::WarfareConfig;
use arc_warfare::map::{Terrain, Territory, TerritoryGraph};
use arc_warfare::military::UnitKind;

const CROWN: FactionId = FactionId(1);
const LEAGUE: FactionId = FactionId(2);

/// T1 (Crown) - T2 (League, walled) - T3 (League), at war over T2 and T3
fn border_world(fortification: u8, garrison: u32, config: WarfareConfig) -> WorldState {
    let mut graph = TerritoryGraph::new();
    graph
        .add_territory(Territory::new(TerritoryId(1), "Ardenhold", Terrain::Plains).with_controller(CROWN))
        .unwrap();
    graph
        .add_territory(
            Territory::new(TerritoryId(2), "Varn Gate", Terrain::Plains)
                .with_controller(LEAGUE)
                .with_fortification(fortification)
                .with_garrison(garrison),
        )
        .unwrap();
    graph
        .add_territory(Territory::new(TerritoryId(3), "Saltmarsh", Terrain::Plains).with_controller(LEAGUE))
        .unwrap();
    graph.connect(TerritoryId(1), TerritoryId(2), 1.0).unwrap();
    graph.connect(TerritoryId(2), TerritoryId(3), 1.0).unwrap();

    let mut world = WorldState::new(graph, config);
    world
        .declare_war(CROWN, LEAGUE, WarGoal::Conquest, vec![TerritoryId(2), TerritoryId(3)])
        .unwrap();
    world
}

fn army(world: &mut WorldState, faction: FactionId, at: u32, size: u32, quality: f32) -> ArmyId {
    let unit = world
        .raise_unit(faction, UnitKind::Infantry, size)
        .with_quality(quality);
    world
        .spawn_army("Host", faction, TerritoryId(at), vec![unit], None)
        .unwrap()
}

fn siege_state(world: &WorldState, id: SiegeId) -> SiegeState {
    world.sieges[&id].state
}

#[test]
fn test_larger_army_wins_field_battle() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let attacker = army(&mut world, CROWN, 3, 500, 1.0);
    let defender = army(&mut world, LEAGUE, 3, 300, 1.2);

    let resolution = resolve_battle(&mut world, attacker, defender).unwrap();
    assert_eq!(resolution.outcome, BattleOutcome::AttackerVictory);

    let battle = world.battle(resolution.battle).unwrap();
    assert!(battle.rounds.len() <= 5);
    assert!(battle.attacker_casualties > 0);
    assert!(battle.defender_casualties > 0);
    assert_eq!(battle.attacker, Combatant::Army(attacker));

    let war = world.wars.wars().next().unwrap();
    assert!(war.score > 0.0 && war.score <= 25.0);
    assert_eq!(war.status, WarStatus::Active);

    // The beaten League army falls back into League territory
    assert!(world.army(defender).unwrap().is_stationed_at(TerritoryId(2)));
    assert!(resolution
        .events
        .iter()
        .any(|e| matches!(e, CampaignEvent::CasualtiesApplied { army, .. } if *army == defender)));
}

#[test]
fn test_battle_requires_colocated_enemies() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let a = army(&mut world, CROWN, 1, 500, 1.0);
    let b = army(&mut world, LEAGUE, 3, 300, 1.0);
    assert!(matches!(
        resolve_battle(&mut world, a, b),
        Err(WarfareError::InvalidEngagement(_))
    ));

    let friend = army(&mut world, CROWN, 1, 100, 1.0);
    assert!(matches!(
        resolve_battle(&mut world, a, friend),
        Err(WarfareError::InvalidEngagement(_))
    ));
    assert!(world.battles.is_empty());
    assert_eq!(world.army(a).unwrap().total_size(), 500);
}

#[test]
fn test_no_battle_after_peace() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let a = army(&mut world, CROWN, 3, 500, 1.0);
    let b = army(&mut world, LEAGUE, 3, 300, 1.0);
    let war = world.wars.wars().next().unwrap().id;

    world.negotiate_peace(war, Side::Attacker, PeaceTerms::WhitePeace).unwrap();
    assert!(matches!(
        resolve_battle(&mut world, a, b),
        Err(WarfareError::InvalidEngagement(_))
    ));

    let report = run_turn(&mut world);
    assert!(report.battles.is_empty());
    assert!(world.army(b).unwrap().is_stationed_at(TerritoryId(3)));
}

#[test]
fn test_fortification_slows_sieges() {
    let mut progress = Vec::new();
    for fortification in [0, 3] {
        let mut world = border_world(fortification, 200, WarfareConfig::default());
        let besieger = army(&mut world, CROWN, 2, 500, 1.0);
        let (siege, _) = start_siege(&mut world, besieger).unwrap();
        for _ in 0..3 {
            arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();
        }
        progress.push(world.sieges[&siege].progress);
    }
    // 0.1 × 500 / 200 per turn against 0.1 × 500 / 500
    assert!((progress[0] - 0.75).abs() < 1e-4);
    assert!((progress[1] - 0.30).abs() < 1e-4);
    assert!(progress[0] > progress[1]);
}

#[test]
fn test_second_siege_rejected() {
    let mut world = border_world(2, 100, WarfareConfig::default());
    let first = army(&mut world, CROWN, 2, 400, 1.0);
    let second = army(&mut world, CROWN, 2, 400, 1.0);

    start_siege(&mut world, first).unwrap();
    assert!(matches!(
        start_siege(&mut world, second),
        Err(WarfareError::SiegeAlreadyActive(TerritoryId(2)))
    ));
}

#[test]
fn test_march_besiege_and_capture() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 1, 300, 1.0);
    order_besiege(&mut world, besieger, TerritoryId(2)).unwrap();

    let first = run_turn(&mut world);
    assert!(first
        .events
        .iter()
        .any(|e| matches!(e, CampaignEvent::SiegeStarted { territory: TerritoryId(2), .. })));
    let siege = world.active_siege_at(TerritoryId(2)).unwrap();
    assert_eq!(siege_state(&world, siege), SiegeState::Initiated);

    // Undefended and unwalled: falls on its first siege turn
    let second = run_turn(&mut world);
    assert!(second.events.iter().any(|e| matches!(
        e,
        CampaignEvent::ControlChanged { territory: TerritoryId(2), new: Some(CROWN), .. }
    )));
    assert_eq!(siege_state(&world, siege), SiegeState::Successful);
    assert!(world.graph.territory(TerritoryId(2)).unwrap().is_controlled_by(CROWN));
    assert_eq!(world.army(besieger).unwrap().siege, None);

    let war = world.wars.wars().next().unwrap();
    assert!((war.score - 2.0).abs() < 1e-6);
}

#[test]
fn test_relief_army_breaks_siege() {
    let mut world = border_world(2, 100, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 400, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();
    arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();
    assert!(world.sieges[&siege].progress > 0.0);

    let relief = army(&mut world, LEAGUE, 2, 2000, 1.0);
    let resolution = resolve_battle(&mut world, relief, besieger).unwrap();
    assert_eq!(resolution.outcome, BattleOutcome::AttackerVictory);

    assert_eq!(siege_state(&world, siege), SiegeState::Failed);
    assert_eq!(world.sieges[&siege].progress, 0.0);
    assert!(world.graph.territory(TerritoryId(2)).unwrap().is_controlled_by(LEAGUE));
}

#[test]
fn test_capture_can_force_capitulation() {
    let mut config = WarfareConfig::default();
    config.war.capitulation_threshold = 10.0;
    let mut world = border_world(0, 0, config);
    world.graph.get_mut(TerritoryId(2)).unwrap().development = 10.0;

    let besieger = army(&mut world, CROWN, 2, 300, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();
    let events = arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();

    assert!(events.iter().any(|e| matches!(e, CampaignEvent::WarConcluded { .. })));
    let war = world.wars.wars().next().unwrap();
    assert_eq!(war.status, WarStatus::Concluded);
    // The remaining claim is ceded with the capitulation
    assert!(world.graph.territory(TerritoryId(3)).unwrap().is_controlled_by(CROWN));
    assert!(!world.are_hostile(CROWN, LEAGUE));
}

#[test]
fn test_assault_takes_weak_garrison() {
    let mut world = border_world(1, 50, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 1000, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();

    let result = assault(&mut world, siege).unwrap();
    assert!(result.captured);
    assert_eq!(result.outcome, BattleOutcome::AttackerVictory);

    let territory = world.graph.territory(TerritoryId(2)).unwrap();
    assert!(territory.is_controlled_by(CROWN));
    assert_eq!(territory.garrison, 0);
    assert_eq!(siege_state(&world, siege), SiegeState::Successful);
    assert_eq!(world.battle(result.battle).unwrap().defender, Combatant::Garrison(TerritoryId(2)));
}

#[test]
fn test_sortie_sets_siege_back() {
    let mut world = border_world(0, 1000, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 600, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();
    arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();
    arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();
    assert!((world.sieges[&siege].progress - 0.12).abs() < 1e-4);

    let result = sortie(&mut world, siege).unwrap();
    assert_eq!(result.outcome, BattleOutcome::AttackerVictory);
    assert!(!result.captured);
    assert_eq!(world.sieges[&siege].progress, 0.0);
    assert!(world.sieges[&siege].state.is_active());
}

#[test]
fn test_sortie_that_destroys_besiegers_fails_siege() {
    let mut world = border_world(0, 1000, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 1, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();

    let result = sortie(&mut world, siege).unwrap();
    assert_eq!(result.outcome, BattleOutcome::AttackerVictory);
    assert!(world.army(besieger).is_err());
    assert_eq!(siege_state(&world, siege), SiegeState::Failed);
    assert!(result.events.iter().any(|e| matches!(
        e,
        CampaignEvent::SiegeEnded { state: SiegeState::Failed, .. }
    )));
    assert!(!result.events.iter().any(|e| matches!(
        e,
        CampaignEvent::SiegeEnded { state: SiegeState::Abandoned, .. }
    )));
}

#[test]
fn test_disrupt_and_withdraw() {
    let mut world = border_world(0, 200, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 500, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();
    arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();

    assert!((disrupt(&mut world, siege, 0.1).unwrap() - 0.15).abs() < 1e-4);
    assert_eq!(disrupt(&mut world, siege, 5.0).unwrap(), 0.0);

    let mut events = Vec::new();
    withdraw(&mut world, siege, &mut events).unwrap();
    assert_eq!(siege_state(&world, siege), SiegeState::Abandoned);
    assert!(disrupt(&mut world, siege, 0.1).is_err());
    assert_eq!(world.army(besieger).unwrap().siege, None);
}

#[test]
fn test_siege_abandoned_when_besiegers_leave() {
    let mut world = border_world(2, 100, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 400, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();

    // Knocked out of the siege without a battle
    world.army_mut(besieger).unwrap().siege = None;
    let events = arc_warfare::campaign::advance_siege(&mut world, siege).unwrap();
    assert_eq!(siege_state(&world, siege), SiegeState::Abandoned);
    assert!(events.iter().any(|e| matches!(
        e,
        CampaignEvent::SiegeEnded { state: SiegeState::Abandoned, .. }
    )));
}

#[test]
fn test_arrival_triggers_interception() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let marching = army(&mut world, CROWN, 1, 800, 1.0);
    let holding = army(&mut world, LEAGUE, 2, 200, 1.0);
    arc_warfare::campaign::order_move(&mut world, marching, TerritoryId(2)).unwrap();

    let report = run_turn(&mut world);
    assert!(report.events.iter().any(|e| matches!(
        e,
        CampaignEvent::Intercepted { army, hostile, .. } if *army == marching && *hostile == holding
    )));
    assert_eq!(report.battles.len(), 1);
    assert!(report.failures.is_empty());
    assert_eq!(world.turn, 1);
}

#[test]
fn test_recalled_army_fights_enemy_at_home() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let home = army(&mut world, CROWN, 1, 800, 1.0);
    arc_warfare::campaign::order_move(&mut world, home, TerritoryId(3)).unwrap();
    let raider = army(&mut world, LEAGUE, 1, 300, 1.0);
    arc_warfare::campaign::recall(&mut world, home).unwrap();
    assert!(world.army(home).unwrap().is_stationed_at(TerritoryId(1)));

    let report = run_turn(&mut world);
    assert_eq!(report.battles.len(), 1);
    assert!(report.failures.is_empty());
    assert!(!report
        .events
        .iter()
        .any(|e| matches!(e, CampaignEvent::Intercepted { .. })));

    // Ardenhold is Crown land, so the League raider is the one attacking
    let battle = world.battle(report.battles[0]).unwrap();
    assert_eq!(battle.territory, TerritoryId(1));
    assert_eq!(battle.attacker, Combatant::Army(raider));
    assert_eq!(battle.defender, Combatant::Army(home));
}

#[test]
fn test_new_war_between_neighbours_fights_next_turn() {
    const MARCHES: FactionId = FactionId(3);
    let mut world = border_world(0, 0, WarfareConfig::default());
    let crown = army(&mut world, CROWN, 1, 500, 1.0);
    let marches = army(&mut world, MARCHES, 1, 500, 1.0);

    let quiet = run_turn(&mut world);
    assert!(quiet.battles.is_empty());

    world
        .declare_war(MARCHES, CROWN, WarGoal::Conquest, vec![TerritoryId(1)])
        .unwrap();
    let report = run_turn(&mut world);
    assert_eq!(report.battles.len(), 1);
    let battle = world.battle(report.battles[0]).unwrap();
    assert_eq!(battle.attacker, Combatant::Army(marches));
    assert_eq!(battle.defender, Combatant::Army(crown));
}

#[test]
fn test_each_army_fights_once_per_turn() {
    let mut world = border_world(0, 0, WarfareConfig::default());
    let first = army(&mut world, LEAGUE, 3, 300, 1.0);
    let second = army(&mut world, LEAGUE, 3, 300, 1.0);
    let raider = army(&mut world, CROWN, 3, 200, 1.0);

    let report = run_turn(&mut world);
    assert_eq!(report.battles.len(), 1);
    let battle = world.battle(report.battles[0]).unwrap();
    assert_eq!(battle.attacker, Combatant::Army(raider));
    assert_eq!(battle.defender, Combatant::Army(first));
    assert_eq!(world.army(second).unwrap().total_size(), 300);
}

#[test]
fn test_demo_scenario_is_deterministic() {
    let source = include_str!("../data/scenarios/border_war.toml");
    let scenario = Scenario::from_toml_str(source).unwrap();

    let mut first = scenario.build(WarfareConfig::default()).unwrap();
    let mut second = scenario.build(WarfareConfig::default()).unwrap();
    let a = run_turns(&mut first, 15);
    let b = run_turns(&mut second, 15);

    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.events, y.events);
    }
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_parallel_worlds_match_sequential() {
    let source = include_str!("../data/scenarios/border_war.toml");
    let world = Scenario::from_toml_str(source)
        .unwrap()
        .build(WarfareConfig::default())
        .unwrap();

    let mut sequential = world.clone();
    let mut parallel = vec![world.clone(), world.clone(), world];
    for _ in 0..5 {
        let expected = run_turn(&mut sequential);
        let reports = run_worlds_parallel(&mut parallel);
        for report in reports {
            assert_eq!(report.events, expected.events);
        }
    }
    let expected = serde_json::to_string(&sequential).unwrap();
    for world in &parallel {
        assert_eq!(serde_json::to_string(world).unwrap(), expected);
    }
}

#[test]
fn test_hazards_are_seeded() {
    let mut world = border_world(2, 100, WarfareConfig::default());
    let besieger = army(&mut world, CROWN, 2, 400, 1.0);
    let (siege, _) = start_siege(&mut world, besieger).unwrap();
    world.sieges.get_mut(&siege).unwrap().progress = 0.5;

    let config = HazardConfig {
        outbreak_chance: 1.0,
        max_setback: 0.1,
    };
    let first = SiegeHazards::new(99, config).roll(&world);
    let second = SiegeHazards::new(99, config).roll(&world);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert!(first[0].1 >= 0.0 && first[0].1 < 0.1);

    let setbacks = SiegeHazards::new(99, config).apply(&mut world).unwrap();
    assert!((setbacks[0].progress - (0.5 - first[0].1)).abs() < 1e-6);
}
