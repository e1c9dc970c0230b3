//! Headless skirmish battle runner.
//!
//! This binary runs battles without graphics, controlled via JSON on
//! stdin/stdout. Designed for balance sweeps, CI testing, and replay
//! verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p skirmish_headless
//!
//! # Play a scenario script to completion
//! cargo run -p skirmish_headless -- run --scenario scenarios/defense.ron
//!
//! # Run a batch balance sweep
//! cargo run -p skirmish_headless -- batch --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --runs 5
//!
//! # Verify a recorded replay
//! cargo run -p skirmish_headless -- replay --file battle.replay --verify
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skirmish_core::commands::BattleMode;
use skirmish_core::factions::Faction;
use skirmish_core::replay::BattleReplay;

use skirmish_headless::{
    batch::{run_batch, BatchConfig},
    runner::{run_scenario, HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless battle runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario's command script to completion
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Save the run as a replay file
        #[arg(short, long)]
        record: Option<PathBuf>,
    },

    /// Drive a battle interactively over the JSON protocol
    Interactive {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Output a full state line after every tick command
        #[arg(long)]
        auto_state: bool,

        /// Write the session replay here on quit
        #[arg(short, long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of battles for balance testing
    Batch {
        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Battle objective (attack or defense)
        #[arg(short, long, default_value = "attack")]
        mode: String,

        /// Battle clock in seconds
        #[arg(long, default_value = "120")]
        time_limit: u32,

        /// Lowest deck tier in the sweep
        #[arg(long, default_value = "1")]
        min_tier: u8,

        /// Highest deck tier in the sweep
        #[arg(long, default_value = "3")]
        max_tier: u8,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same scenario multiple times
    Verify {
        /// Scenario file to verify
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Play back or verify a recorded battle
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify the replay reproduces its recorded hash
        #[arg(long)]
        verify: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run { scenario, record }) => {
            cmd_run(scenario, record);
        }
        Some(Commands::Interactive {
            scenario,
            auto_state,
            record,
        }) => {
            cmd_interactive(scenario, auto_state, record);
        }
        Some(Commands::Batch {
            count,
            parallel,
            mode,
            time_limit,
            min_tier,
            max_tier,
            output,
        }) => {
            cmd_batch(count, parallel, &mode, time_limit, min_tier, max_tier, output);
        }
        Some(Commands::Verify { scenario, runs }) => {
            cmd_verify(scenario, runs);
        }
        Some(Commands::Replay { file, verify }) => {
            cmd_replay(&file, verify);
        }
        None => {
            // Default: interactive mode
            cmd_interactive(None, false, None);
        }
    }
}

/// Load the named scenario, or the default one.
fn load_scenario(path: Option<PathBuf>) -> Scenario {
    match path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Failed to load scenario: {}", e);
                std::process::exit(1);
            }
        },
        None => Scenario::default(),
    }
}

fn parse_mode(mode: &str) -> BattleMode {
    match mode {
        "attack" => BattleMode::Attack,
        "defense" | "defend" => BattleMode::Defense,
        other => {
            eprintln!("Unknown mode '{}' (expected attack or defense)", other);
            std::process::exit(1);
        }
    }
}

/// Play a scenario script to completion
fn cmd_run(scenario: Option<PathBuf>, record: Option<PathBuf>) {
    let scenario = load_scenario(scenario);
    tracing::info!("Running scenario: {}", scenario.name);

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let run = match run_scenario(&scenario, &mut lock) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Scenario run failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = record {
        if let Err(e) = run.replay.save(&path) {
            eprintln!("Failed to save replay: {}", e);
            std::process::exit(1);
        }
        eprintln!("Replay saved to: {}", path.display());
    }

    eprintln!(
        "{:?} in {}s with {} survivors (hash {:016x})",
        run.result.outcome, run.result.elapsed_secs, run.result.survivors, run.final_hash
    );
}

/// Run a single interactive session
fn cmd_interactive(scenario: Option<PathBuf>, auto_state: bool, record: Option<PathBuf>) {
    tracing::info!("Starting interactive session");

    let config = HeadlessConfig {
        scenario_path: scenario,
        auto_state,
        record_path: record,
    };

    let runner = match HeadlessRunner::with_config(config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to start runner: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = runner.run() {
        eprintln!("Runner failed: {}", e);
        std::process::exit(1);
    }
}

/// Run a batch of battles for balance testing
fn cmd_batch(
    count: u32,
    parallel: u32,
    mode: &str,
    time_limit: u32,
    min_tier: u8,
    max_tier: u8,
    output: PathBuf,
) {
    let mode = parse_mode(mode);

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        count = count,
        parallel = parallel,
        mode = ?mode,
        time_limit_secs = time_limit,
        tiers = ?(min_tier, max_tier),
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig {
        battle_count: count,
        parallel,
        mode,
        time_limit_secs: time_limit,
        min_tier,
        max_tier,
        output_dir: output.clone(),
    };

    let results = run_batch(config);

    // Save results
    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    // Print summary
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles played: {}", results.records.len());
    if !results.errors.is_empty() {
        eprintln!("Battles FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} battles/sec",
        results.records.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("\nWin rate: {:.1}%", results.summary.win_rate * 100.0);
    for (tier, rate) in &results.summary.win_rate_by_tier {
        eprintln!("  tier {}: {:.1}%", tier, rate * 100.0);
    }
    eprintln!(
        "Average duration: {:.1}s ({:.1} survivors)",
        results.summary.avg_duration_secs, results.summary.avg_survivors
    );

    // Report errors if any
    if !results.errors.is_empty() {
        eprintln!("\nBATTLE FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!("  Battle {}: {}", error.index, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, runs: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        "Verifying determinism: {} ({} runs)",
        scenario.name,
        runs
    );

    let mut outcomes = Vec::new();
    for _ in 0..runs {
        let mut sink = std::io::sink();
        match run_scenario(&scenario, &mut sink) {
            Ok(run) => outcomes.push((run.final_tick, run.final_hash)),
            Err(e) => {
                eprintln!("FAIL: Scenario run error: {}", e);
                std::process::exit(1);
            }
        }
    }

    let deterministic = outcomes.windows(2).all(|pair| pair[0] == pair[1]);
    if deterministic {
        eprintln!("PASS: All {} runs produced identical results", runs);
        eprintln!(
            "  Final tick: {} hash: {:016x}",
            outcomes[0].0, outcomes[0].1
        );
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, (tick, hash)) in outcomes.iter().enumerate() {
            eprintln!("  Run {}: tick {} hash {:016x}", i + 1, tick, hash);
        }
        std::process::exit(1);
    }
}

/// Play back or verify a recorded battle
fn cmd_replay(file: &PathBuf, verify: bool) {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    let replay = match BattleReplay::load(file) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("Failed to load replay: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario);
    eprintln!("  Commands: {}", replay.command_count());
    eprintln!("  Duration: {} ticks", replay.duration());

    let battle = match replay.play() {
        Ok(battle) => battle,
        Err(e) => {
            eprintln!("Failed to play replay: {}", e);
            std::process::exit(1);
        }
    };

    if verify {
        let actual = battle.state_hash();
        if actual == replay.final_hash {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Expected hash: {:016x}", replay.final_hash);
            eprintln!("  Actual hash:   {:016x}", actual);
        } else {
            eprintln!("FAIL: Replay produced different hash!");
            eprintln!("  Expected: {:016x}", replay.final_hash);
            eprintln!("  Actual:   {:016x}", actual);
            std::process::exit(1);
        }
    } else {
        eprintln!("\nFinal state at tick {}:", battle.get_tick());
        eprintln!(
            "  Player units alive: {}",
            battle.living_count(Faction::Player)
        );
        eprintln!(
            "  Enemy units alive:  {}",
            battle.living_count(Faction::Enemy)
        );
        if let Some(result) = battle.result() {
            eprintln!(
                "  Result: {:?} in {}s ({} resource, {} fame)",
                result.outcome, result.elapsed_secs, result.resource_reward, result.fame_reward
            );
        }
        eprintln!("  State hash: {:016x}", battle.state_hash());
    }
}
