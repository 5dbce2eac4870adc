//! Agent Simulation Runner
//!
//! Seeds a population of agents, scatters conversations between them across
//! virtual time, and steps the engine tick by tick so runs are replayable.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use agent_core::events::EventJournal;
use agent_core::setup::{generate_profiles, schedule_conversations};
use agent_core::{KeywordOracle, SimConfig, SimulationEngine};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "agent_sim")]
#[command(about = "Generative agent simulation on a discrete-event clock")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of agents to generate
    #[arg(long, default_value_t = 10)]
    agents: usize,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Wall milliseconds each tick represents (overrides engine.tick_interval_ms)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Virtual ms per wall ms (overrides the config file)
    #[arg(long)]
    scale: Option<f64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Conversations to schedule across the run
    #[arg(long, default_value_t = 50)]
    conversations: usize,

    /// Write the final engine snapshot here
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Write a JSONL journal of fired events here
    #[arg(long)]
    events_out: Option<PathBuf>,
}

// One thread keeps background oracle work in a replayable order
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: could not load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };
    if let Some(scale) = args.scale {
        config.clock.scale = scale;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.engine.tick_interval_ms = tick_ms;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Agent Simulation");
    println!("================");
    println!("Seed: {}", args.seed);
    println!("Agents: {}", args.agents);
    let tick_ms = config.engine.tick_interval_ms;
    println!("Ticks: {} x {} ms (scale {})", args.ticks, tick_ms, config.clock.scale);
    println!("Conversations: {}", args.conversations);
    println!();

    let scale = config.clock.scale;
    let mut engine = match SimulationEngine::new(config, Arc::new(KeywordOracle::new())) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = &args.events_out {
        match EventJournal::new(path) {
            Ok(journal) => engine = engine.with_journal(journal),
            Err(e) => eprintln!("Warning: could not open event journal {}: {}", path.display(), e),
        }
    }
    let engine = Arc::new(engine);
    let mut rng = SmallRng::seed_from_u64(args.seed);

    // Population
    println!("Generating agents...");
    let mut plan_count = 0;
    for profile in generate_profiles(args.agents, &mut rng) {
        let goals = profile.goals.clone();
        let agent = match engine.register(profile) {
            Ok(agent) => agent,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        for goal in goals {
            match agent.create_plan(&goal).await {
                Ok(_) => plan_count += 1,
                Err(e) => eprintln!("  Warning: could not plan {:?} for {}: {}", goal, agent.id(), e),
            }
        }
    }
    println!("  Registered {} agents with {} plans", engine.agent_count(), plan_count);

    // Conversations spread over the whole run, in virtual time
    let horizon_ms = (args.ticks.saturating_mul(tick_ms) as f64 * scale) as u64;
    let scheduled = match schedule_conversations(&engine, args.conversations, horizon_ms, &mut rng) {
        Ok(ids) => ids.len(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for agent in engine.all_agents() {
        if let Err(e) = engine.schedule_reprioritize(agent.id(), (horizon_ms / 2) as i64) {
            eprintln!("  Warning: {}", e);
        }
    }
    println!("  Scheduled {} conversations", scheduled);
    println!();
    println!("Starting simulation...");
    println!();

    let mut fired_total = 0;
    let mut failed_total = 0;
    let progress_every = (args.ticks / 10).max(1);
    for tick in 1..=args.ticks {
        let report = engine.tick(tick_ms).await;
        fired_total += report.drained.fired.len();
        failed_total += report.drained.failures();
        // Each tick's oracle work finishes before the next tick fires
        let settled = engine.settle().await;
        failed_total += report.settled.failed + settled.failed;

        if !report.drained.is_empty() && tick % 10 == 0 {
            println!(
                "[Tick {:>4}] {} - {} events fired",
                tick,
                report.time,
                report.drained.fired.len()
            );
        }
        if tick % progress_every == 0 {
            println!(
                "Tick {} / {} ({}, {} pending)",
                tick,
                args.ticks,
                report.time,
                engine.pending_events()
            );
        }
    }

    if let Err(e) = engine.flush_journal() {
        eprintln!("Warning: could not flush event journal: {}", e);
    }

    let snapshot = match &args.snapshot_out {
        Some(path) => match engine.write_snapshot(path).await {
            Ok(snapshot) => {
                println!("Wrote snapshot to {}", path.display());
                snapshot
            }
            Err(e) => {
                eprintln!("Warning: could not write snapshot: {}", e);
                engine.snapshot().await
            }
        },
        None => engine.snapshot().await,
    };

    let totals = snapshot.memory_totals();
    println!();
    println!(
        "Simulation complete. Ran {} ticks (ending at {}).",
        args.ticks, snapshot.time
    );
    println!("Fired {} events ({} failed).", fired_total, failed_total);
    println!(
        "Memories: {} episodic, {} semantic, {} procedural",
        totals.episodic, totals.semantic, totals.procedural
    );
    let reflected = snapshot
        .agents
        .iter()
        .filter(|a| a.reflection_count > 0)
        .count();
    println!("Agents that reflected: {}", reflected);

    let ties = snapshot.positive_ties_by_target();
    if let Some((target, count)) = ties.iter().max_by_key(|(_, count)| **count) {
        println!("Most liked: {} ({} positive ties)", target, count);
    }

    ExitCode::SUCCESS
}
