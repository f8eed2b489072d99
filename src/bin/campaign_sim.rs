//! Campaign simulation runner
//! Loads a scenario, runs it turn by turn and prints what happened

use std::path::PathBuf;

use arc_warfare::campaign::{
    run_turn, CampaignEvent, HazardConfig, Scenario, SiegeHazards, TurnReport, WorldState,
};
use arc_warfare::core::error::Result;
use arc_warfare::core::season::Season;
use arc_warfare::core::WarfareConfig;
use clap::Parser;
use serde::Serialize;

const DEMO_SCENARIO: &str = include_str!("../../data/scenarios/border_war.toml");

/// Campaign simulation - resolve movement, battles, sieges and wars
#[derive(Parser, Debug)]
#[command(name = "campaign_sim")]
#[command(about = "Run a warfare scenario turn by turn")]
struct Args {
    /// Scenario file (TOML); the built-in border war when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Warfare tuning file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of turns to run
    #[arg(long, default_value_t = 30)]
    turns: u32,

    /// Turns per season; 0 keeps the scenario's season fixed
    #[arg(long, default_value_t = 0)]
    season_length: u32,

    /// Seed for siege camp hazards; hazards are off when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Print a JSON summary instead of the turn log
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    turns: u32,
    world: &'a WorldState,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WarfareConfig::load(path)?,
        None => WarfareConfig::default(),
    };
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::from_toml_str(DEMO_SCENARIO)?,
    };
    let mut world = scenario.build(config)?;
    let mut hazards = args
        .seed
        .map(|seed| SiegeHazards::new(seed, HazardConfig::default()));

    if !args.json {
        println!("=== {} ===", scenario.name);
        println!(
            "{} territories, {} armies, {} wars\n",
            world.graph.len(),
            world.armies.len(),
            world.wars.wars().count()
        );
    }

    for _ in 0..args.turns {
        if args.season_length > 0 {
            world.set_season(Season::from_turn(world.turn, args.season_length));
        }
        if let Some(hazards) = hazards.as_mut() {
            for setback in hazards.apply(&mut world)? {
                if !args.json {
                    println!(
                        "  [camp] outbreak at siege {} costs {:.2} progress",
                        setback.siege, setback.magnitude
                    );
                }
            }
        }

        let report = run_turn(&mut world);
        if !args.json {
            print_turn(&world, &report);
        }
        if world.wars.active_wars().count() == 0 {
            break;
        }
    }

    if args.json {
        let summary = Summary {
            turns: world.turn,
            world: &world,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&world);
    }
    Ok(())
}

fn print_turn(world: &WorldState, report: &TurnReport) {
    let notable: Vec<String> = report.events.iter().filter_map(|e| describe(world, e)).collect();
    if notable.is_empty() && report.failures.is_empty() {
        return;
    }
    println!("Turn {}", report.turn);
    for line in notable {
        println!("  {}", line);
    }
    for failure in &report.failures {
        println!("  ! {:?}: {}", failure.engagement, failure.error);
    }
}

fn army_name(world: &WorldState, id: arc_warfare::core::types::ArmyId) -> String {
    world
        .armies
        .get(&id)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn territory_name(world: &WorldState, id: arc_warfare::core::types::TerritoryId) -> String {
    world
        .graph
        .get(id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn describe(world: &WorldState, event: &CampaignEvent) -> Option<String> {
    let line = match event {
        CampaignEvent::ArmyDeparted { army, destination, cost, .. } => format!(
            "{} marches on {} (cost {:.1})",
            army_name(world, *army),
            territory_name(world, *destination),
            cost
        ),
        CampaignEvent::ArmyArrived { army, territory } => format!(
            "{} arrives at {}",
            army_name(world, *army),
            territory_name(world, *territory)
        ),
        CampaignEvent::Intercepted { army, hostile, territory } => format!(
            "{} meets {} at {}",
            army_name(world, *army),
            army_name(world, *hostile),
            territory_name(world, *territory)
        ),
        CampaignEvent::BattleFought { battle, territory, outcome } => {
            let rounds = world.battle(*battle).map(|b| b.rounds.len()).unwrap_or(0);
            format!(
                "Battle of {}: {:?} after {} rounds",
                territory_name(world, *territory),
                outcome,
                rounds
            )
        }
        CampaignEvent::ArmyRetreated { army, to, .. } => format!(
            "{} falls back to {}",
            army_name(world, *army),
            territory_name(world, *to)
        ),
        CampaignEvent::ArmyDisbanded { army } => format!("{} is destroyed", army),
        CampaignEvent::SiegeStarted { territory, army, .. } => format!(
            "{} lays siege to {}",
            army_name(world, *army),
            territory_name(world, *territory)
        ),
        CampaignEvent::SiegeProgressed { siege, progress } => {
            format!("Siege {} at {:.0}%", siege, progress * 100.0)
        }
        CampaignEvent::SiegeEnded { territory, state, .. } => format!(
            "Siege of {} ends: {:?}",
            territory_name(world, *territory),
            state
        ),
        CampaignEvent::ControlChanged { territory, new, .. } => format!(
            "{} now held by {}",
            territory_name(world, *territory),
            new.map(|f| f.to_string()).unwrap_or_else(|| "nobody".into())
        ),
        CampaignEvent::WarScoreChanged { war, delta, score } => {
            format!("War {} score {:+.1} -> {:.1}", war, delta, score)
        }
        CampaignEvent::WarConcluded { war, settlement } => format!(
            "War {} ends: {:?} ({:?})",
            war, settlement.terms, settlement.victor
        ),
        _ => return None,
    };
    Some(line)
}

fn print_summary(world: &WorldState) {
    println!("\n=== After {} turns ===", world.turn);
    for territory in world.graph.territories() {
        println!(
            "  {:<16} {:<10} fort {} garrison {:>4}  held by {}",
            territory.name,
            format!("{:?}", territory.terrain),
            territory.fortification,
            territory.garrison,
            territory
                .controller
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".into())
        );
    }
    println!();
    for army in world.armies.values() {
        let place = match army.location() {
            Some(t) => territory_name(world, t),
            None => "on the march".into(),
        };
        println!(
            "  {:<16} {} troops, {}",
            army.name,
            army.total_size(),
            place
        );
    }
    println!();
    for war in world.wars.wars() {
        println!(
            "  War {} ({} vs {}, {:?}): score {:.1}, {:?}",
            war.id, war.attacker, war.defender, war.goal, war.score, war.status
        );
    }
    println!("  {} battles fought", world.battles.len());
}
