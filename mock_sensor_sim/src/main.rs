//! Mock Sensor Simulator CLI
//!
//! Run deterministic sensor scenarios, or drive the real tokio-backed sensor
//! with a polling monitor attached.

use clap::Parser;
use mock_sensor_core::{MockSensor, SensorConfig, SensorError};
use mock_sensor_env::{EnvError, SensorContext, TokioContext, UniformNoise};
use mock_sensor_sim::monitor::{Monitor, MonitorStats, POLL_INTERVAL};
use mock_sensor_sim::scenarios::ScenarioId;
use mock_sensor_sim::{ScenarioResult, ScenarioRunner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Mock distance sensor simulator
#[derive(Parser, Debug)]
#[command(name = "mock-sensor-sim")]
#[command(about = "Run deterministic simulation tests for the mock distance sensor", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (bounce, trip_wire, injection_staleness, contention, shutdown, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Ticks per scenario
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// Reader threads for the contention scenario
    #[arg(long, default_value = "4")]
    readers: usize,

    /// Injector threads for the contention scenario
    #[arg(long, default_value = "2")]
    injectors: usize,

    /// Sensor configuration file (JSON; missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the per-tick trace of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Run the live sensor with a polling monitor for this many seconds
    #[arg(long)]
    live: Option<f64>,

    /// Fault-inject this distance (mm) halfway through a live run
    #[arg(long, requires = "live", allow_hyphen_values = true)]
    inject: Option<i32>,
}

/// Drives the real sensor on the tokio timer with the monitor attached.
fn run_live(seed: u64, config: SensorConfig, total: Duration, inject: Option<i32>) -> Result<MonitorStats, SensorError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| EnvError::ContextError(format!("failed to build runtime: {e}")))?;

    runtime.block_on(async {
        let context = TokioContext::shared();
        let noise = Arc::new(UniformNoise::seeded(seed));
        let mut sensor = MockSensor::new(Arc::clone(&context), noise, config);

        sensor.start()?;
        let device = sensor.device()?;
        let monitor = Monitor::spawn(Arc::clone(&context), device.clone(), POLL_INTERVAL);

        match inject {
            Some(distance_mm) => {
                let half = total / 2;
                tokio::time::sleep(half).await;
                info!("Injecting {}mm", distance_mm);
                device.set_mock_distance(distance_mm);
                tokio::time::sleep(total - half).await;
            }
            None => tokio::time::sleep(total).await,
        }

        let monitored = monitor.stop().await;
        finish_live(&mut sensor, monitored).await
    })
}

/// Stops the sensor whatever the monitor's outcome, then reports the first
/// failure.
async fn finish_live<Ctx: SensorContext>(
    sensor: &mut MockSensor<Ctx>,
    monitored: Result<MonitorStats, EnvError>,
) -> Result<MonitorStats, SensorError> {
    let stopped = sensor.stop().await;
    let stats = monitored?;
    stopped?;
    Ok(stats)
}

/// Converts the `--live` argument into a run length.
fn live_duration(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs.max(0.0))
        .map_err(|e| format!("invalid --live duration {secs}: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<SensorConfig, String> {
    let Some(path) = path else {
        return Ok(SensorConfig::default());
    };

    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    SensorConfig::from_json(&json).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the verbosity flag
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = load_config(args.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Handle --live mode
    if let Some(secs) = args.live {
        let total = live_duration(secs).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

        info!("Mock sensor live run for {:.1}s (seed={})", secs, base_seed);
        match run_live(base_seed, config, total, args.inject) {
            Ok(stats) => {
                info!(
                    "Monitor: {} polls, {} proximity warnings, {} failures",
                    stats.polls, stats.warnings, stats.failures
                );
                if let Some(last) = stats.last {
                    info!("Last sample: t={} dist={}mm st={}", last.t, last.dist, last.st);
                }
            }
            Err(e) => {
                error!("Live run failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if !args.json {
        info!("Mock Sensor Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: bounce, trip_wire, injection_staleness, contention, shutdown, all");
            std::process::exit(1);
        })]
    };

    let runner = ScenarioRunner::new(base_seed)
        .with_ticks(args.ticks)
        .with_threads(args.readers, args.injectors)
        .with_config(config);

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 || !scenarios[0].is_traced() {
            eprintln!("Error: --export needs a single traced scenario (bounce, trip_wire, injection_staleness)");
            std::process::exit(1);
        }

        let result = runner.run(scenarios[0]);
        let export = result.to_export(runner.config().clone());

        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {:?}", e);
            std::process::exit(1);
        }
        info!("Exported {} frames to {}", export.frames.len(), export_path);

        if !result.passed {
            error!("✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        info!("✓ {} (seed={}) PASSED", scenarios[0].name(), base_seed);
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for scenario in &scenarios {
        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                info!("✓ {} (seed={}) PASSED - {}", scenario.name(), base_seed, scenario.description());
            } else {
                error!("✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    base_seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }

        all_results.push(result);
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "reversals": r.metrics.reversals,
                    "trips": r.metrics.trips,
                    "reads_checked": r.metrics.reads_checked,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
