//! Jar-Test DST Simulator CLI
//!
//! Run deterministic jar-test scenarios against a simulated gang stirrer.

use clap::Parser;
use jartest_core::JarConfig;
use jartest_sim::scenarios::ScenarioId;
use jartest_sim::{load_jar_config, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Jar-Test Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "jartest-sim")]
#[command(about = "Run deterministic jar-test simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of jars on the stirrer
    #[arg(short, long, default_value = "6")]
    jars: usize,

    /// Scenario to run (reach_rapid_mix, gated_growth, settling_clears,
    /// insufficient_dose, standard_protocol, dose_ladder, ph_sweep,
    /// reset_mid_run, basic, protocols, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Settling observation window in seconds
    #[arg(short, long, default_value = "300")]
    duration: f64,

    /// Tick rate in Hz
    #[arg(long, default_value = "20")]
    tick_rate: u32,

    /// Simulated seconds per tick-second
    #[arg(long, default_value = "1.0")]
    time_scale: f64,

    /// Pipette jitter standard deviation in mL
    #[arg(long, default_value = "0.0")]
    jitter: f64,

    /// Jar configuration JSON file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frame-by-frame data for a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn parse_scenarios(name: &str) -> Result<Vec<ScenarioId>, String> {
    match name {
        "all" => Ok(ScenarioId::all()),
        "basic" => Ok(ScenarioId::basic()),
        "protocols" => Ok(ScenarioId::protocols()),
        other => other.parse().map(|s| vec![s]),
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Jar-Test DST Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios = parse_scenarios(&args.scenario).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
        eprintln!("Available scenarios: {}, basic, protocols, all", names.join(", "));
        std::process::exit(1);
    });

    let jar_config = match &args.config {
        Some(path) => load_jar_config(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => JarConfig::default(),
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        ScenarioRunner::new(seed, args.jars)
            .with_tick_rate(args.tick_rate)
            .with_duration(args.duration)
            .with_time_scale(args.time_scale)
            .with_dose_jitter(args.jitter)
            .with_jar_config(jar_config.clone())
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not a group");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);

        // One frame per simulated second
        let every = (args.tick_rate as f64 / args.time_scale).round().max(1.0) as u64;
        let result = runner_for(base_seed)
            .with_recording(every)
            .run(scenarios[0]);

        match &result.export {
            Some(export) => match export.write_to_file(export_path) {
                Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path),
                Err(e) => error!("Failed to write export: {}", e),
            },
            None => error!("Scenario produced no frames"),
        }

        if result.passed {
            info!("✓ {} (seed={}) PASSED - exported to {}",
                scenarios[0].name(), base_seed, export_path);
        } else {
            error!("✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    // Run simulations
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!("✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
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
                    "time_secs": r.final_time_secs,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            // List failed seeds
            for result in &all_results {
                if !result.passed {
                    error!("  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
