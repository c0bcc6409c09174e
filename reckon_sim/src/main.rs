//! Reckon simulator CLI
//!
//! Runs the conformance scenarios against the verifier, or replays a
//! recorded capture through it.

use clap::{Parser, Subcommand};
use reckon_core::{TestParams, TracingDiagnostics, Verdict};
use reckon_sim::capture::{load_capture, replay, save_capture};
use reckon_sim::scenarios::ScenarioId;
use reckon_sim::{ScenarioResult, ScenarioRunner, SimError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Dead-reckoning verifier simulator
#[derive(Parser, Debug)]
#[command(name = "reckon-sim")]
#[command(about = "Deterministic conformance runs for the dead-reckoning verifier", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run simulated scenarios
    Run {
        /// Scenario to run, or "all"
        #[arg(short = 'S', long, default_value = "all")]
        scenario: String,

        /// Master seed for determinism (0 = random from time)
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of consecutive seeds to run
        #[arg(long, default_value = "1")]
        seeds: usize,

        /// Write the scenario's updates to a capture file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Replay a capture file through the verifier
    Replay {
        /// JSON-lines capture
        #[arg(long)]
        capture: PathBuf,

        /// Test parameter document
        #[arg(long)]
        params: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {err}");
    }
}

fn parse_scenarios(name: &str) -> Result<Vec<ScenarioId>, SimError> {
    if name == "all" {
        Ok(ScenarioId::all())
    } else {
        Ok(vec![name.parse()?])
    }
}

async fn run_scenarios(
    scenario: &str,
    seed: u64,
    seeds: usize,
    export: Option<PathBuf>,
    json: bool,
) -> Result<ExitCode, SimError> {
    let scenarios = parse_scenarios(scenario)?;

    let base_seed = if seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    } else {
        seed
    };

    if let Some(path) = &export {
        let [scenario] = scenarios.as_slice() else {
            error!("--export only supports a single scenario, not 'all'");
            return Ok(ExitCode::FAILURE);
        };
        let plan = ScenarioRunner::new(base_seed).plan(*scenario)?;
        let records = plan.capture();
        save_capture(path, &records)?;
        info!("Exported {} updates to {}", records.len(), path.display());
    }

    let mut results: Vec<ScenarioResult> = Vec::new();
    for offset in 0..seeds {
        let runner = ScenarioRunner::new(base_seed.wrapping_add(offset as u64));
        for scenario in &scenarios {
            let result = runner.run(*scenario).await;
            if !json {
                if result.passed {
                    info!("✓ {} (seed={}) {}", scenario.name(), result.seed, result.verdict);
                } else {
                    error!(
                        "✗ {} (seed={}): {}",
                        scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            results.push(result);
        }
    }

    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if failed == 0 {
        info!("All {} scenario runs reached the expected verdict", total);
    } else {
        error!("{}/{} scenario runs failed", failed, total);
    }

    Ok(if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

async fn replay_capture(capture: PathBuf, params: PathBuf, json: bool) -> Result<ExitCode, SimError> {
    let params = TestParams::from_path(&params)?;
    let records = load_capture(&capture)?;
    info!("Replaying {} updates from {}", records.len(), capture.display());

    let report = replay(&records, &params, TracingDiagnostics).await;
    let verdict = report.verdict();

    if json {
        let outcome = match &report.result {
            Ok(outcome) => Some(outcome),
            Err(err) => err.outcome(),
        };
        let summary = serde_json::json!({
            "verdict": verdict,
            "ingest": report.ingest,
            "outcome": outcome,
            "error": report.result.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        match &report.result {
            Ok(_) => info!("Verdict: {}", verdict),
            Err(err) => error!("Verdict: {} ({})", verdict, err),
        }
    }

    Ok(match verdict {
        Verdict::Pass => ExitCode::SUCCESS,
        Verdict::Fail => ExitCode::from(1),
        Verdict::Inconclusive => ExitCode::from(2),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let outcome = match args.command {
        Command::Run {
            scenario,
            seed,
            seeds,
            export,
        } => run_scenarios(&scenario, seed, seeds, export, args.json).await,
        Command::Replay { capture, params } => replay_capture(capture, params, args.json).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            if matches!(err, SimError::UnknownScenario(_)) {
                let names: Vec<_> = ScenarioId::all().iter().map(ScenarioId::name).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
            }
            ExitCode::FAILURE
        }
    }
}
