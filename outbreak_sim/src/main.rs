//! Phone Outbreak simulator CLI
//!
//! Runs a live headless outbreak or replays scripted scenarios.

use clap::Parser;
use outbreak_core::{Simulation, SimulationConfig};
use outbreak_sim::live::{parse_run_duration, spawn_stdin_commands};
use outbreak_sim::{
    finish_live, run_live, LiveOptions, ScenarioId, ScenarioResult, ScenarioRunner, SeededContext,
    SimExport,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Phone outbreak simulator
#[derive(Parser, Debug)]
#[command(name = "outbreak-sim")]
#[command(
    about = "Simulate phones spreading an infection and queueing for one repair shop",
    long_about = None
)]
struct Args {
    /// Master seed (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of phones at start (overrides the config file)
    #[arg(short, long)]
    phones: Option<usize>,

    /// Phones infected at start
    #[arg(short, long, default_value = "1")]
    infect: usize,

    /// Run time in seconds (0 = until quit or Ctrl-C)
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// JSON file with simulation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Frame interval for export, in milliseconds
    #[arg(long, default_value = "100")]
    frame_ms: u64,

    /// Read control commands from stdin (spawn [n], infect, pause, status, quit)
    #[arg(long)]
    interactive: bool,

    /// Replay scripted scenarios instead of a live run (name or "all")
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(1)
}

async fn run_scenarios(args: &Args, name: &str, seed: u64, duration: Option<Duration>) -> i32 {
    let scenarios: Vec<ScenarioId> = if name == "all" {
        ScenarioId::all()
    } else {
        match name.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<_> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                return 2;
            }
        }
    };

    let mut runner = ScenarioRunner::new(seed);
    if let Some(phones) = args.phones {
        runner = runner.with_phones(phones);
    }
    if let Some(duration) = duration {
        runner = runner.with_duration(duration);
    }

    let mut results: Vec<ScenarioResult> = Vec::new();
    for scenario in scenarios {
        let result = runner.run(scenario).await;
        if !args.json {
            if result.passed {
                info!("✓ {} (seed={}) PASSED in {}ms", scenario, seed, result.elapsed_ms);
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario,
                    seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "failed to serialize summary"),
        }
    } else if failed == 0 {
        info!("✅ All {} scenarios passed", results.len());
    } else {
        error!("❌ {}/{} scenarios failed", failed, results.len());
    }

    i32::from(failed > 0)
}

async fn run_live_mode(args: &Args, seed: u64, duration: Option<Duration>) -> i32 {
    let mut config = match &args.config {
        Some(path) => match SimulationConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "could not load configuration");
                return 2;
            }
        },
        None => SimulationConfig::default(),
    };
    if let Some(phones) = args.phones {
        config.initial_phones = phones;
    }

    let sim = match Simulation::start(config, SeededContext::shared(seed)) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "simulation failed to start");
            return 2;
        }
    };

    let (tx, mut rx) = mpsc::channel(32);
    if args.interactive {
        info!("Commands: spawn [n], infect, pause, status, quit");
        if let Err(e) = spawn_stdin_commands(tx) {
            warn!(error = %e, "stdin control unavailable");
        }
    } else {
        drop(tx);
    }

    let options = LiveOptions {
        infect: args.infect,
        duration,
        frame_interval: Duration::from_millis(args.frame_ms.max(1)),
        record_frames: args.export.is_some(),
    };
    let mut export = SimExport::new("live", seed);
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let reason = run_live(&sim, &options, &mut rx, &mut export, interrupt).await;
    let summary = finish_live(&sim, reason, &mut export).await;

    let mut code = 0;
    if let Some(path) = &args.export {
        match export.write_to_file(path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path.display()),
            Err(e) => {
                error!(error = %e, "export failed");
                code = 1;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "failed to serialize summary"),
        }
    } else {
        let stats = summary.statistics;
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "Stopped ({:?}) after {:.1}s: {} phones, {} healthy, {} infected, \
             {} seeking repair, {} repaired",
            summary.stop_reason,
            summary.elapsed_ms as f64 / 1000.0,
            stats.total,
            stats.healthy,
            stats.infected,
            stats.seeking_repair,
            stats.repaired
        );
        info!(
            "Infection rate {:.1}%, peak {} sick, {} repairs, {} tasks aborted, {} panicked",
            summary.infection_rate,
            summary.peak_sick,
            summary.repairs,
            summary.shutdown.aborted,
            summary.shutdown.panicked
        );
    }
    code
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let duration = match parse_run_duration(args.duration) {
        Ok(duration) => duration,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    let seed = resolve_seed(args.seed);
    if !args.json {
        info!("Phone Outbreak Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let code = match args.scenario.as_deref() {
        Some(name) => run_scenarios(&args, name, seed, duration).await,
        None => run_live_mode(&args, seed, duration).await,
    };

    // A pending stdin read would otherwise hold the runtime open
    std::process::exit(code);
}
