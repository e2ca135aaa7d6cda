//! Converter Simulator
//!
//! Drives a rates session against a simulated rate source, either through a
//! scripted scenario or with random user activity.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod metrics;
mod scenario;
mod sink;
mod source;

use controller::SimulationController;
use converter_session::SessionConfig;
use scenario::Scenario;
use source::SimulatedSource;

/// Converter Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "converter-sim")]
#[command(about = "Currency converter session simulator")]
struct Args {
    /// Built-in scenario to run (typing, rebase, offline)
    #[arg(short, long)]
    scenario: Option<String>,

    /// Scenario described in a JSON file
    #[arg(long, conflicts_with = "scenario")]
    scenario_file: Option<PathBuf>,

    /// Initial base currency
    #[arg(short, long)]
    base: Option<String>,

    /// Initial base amount
    #[arg(long)]
    amount: Option<Decimal>,

    /// Simulated fetch latency in milliseconds
    #[arg(long, default_value = "250")]
    latency_ms: u64,

    /// Random extra latency of up to this many milliseconds
    #[arg(long, default_value = "100")]
    jitter_ms: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Run duration in seconds without a scenario (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration: u64,

    /// Milliseconds between random events without a scenario
    #[arg(long, default_value = "700")]
    pace_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = SessionConfig::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(args.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let scenario = match (&args.scenario, &args.scenario_file) {
        (Some(name), _) => Some(Scenario::load(name)?),
        (None, Some(path)) => Some(Scenario::from_file(path)?),
        (None, None) => None,
    };

    if let Some(base) = &args.base {
        config.initial_base = base.to_uppercase();
    }
    if let Some(amount) = args.amount {
        config.initial_amount = amount;
    }
    if let Some(secs) = scenario.as_ref().and_then(|s| s.cache_ttl_secs) {
        config.cache.ttl = Some(chrono::Duration::seconds(secs as i64));
    }
    config.validate().map_err(anyhow::Error::msg)?;

    info!("Starting Converter Simulator");
    info!("Base: {} {}", config.initial_amount, config.initial_base);
    info!("Latency: {}ms (+{}ms jitter)", args.latency_ms, args.jitter_ms);

    let source = Arc::new(SimulatedSource::new(
        Duration::from_millis(args.latency_ms),
        Duration::from_millis(args.jitter_ms),
        args.seed,
    ));
    let controller = SimulationController::new(config, source, args.seed);

    controller.initialize().await?;

    match scenario {
        Some(scenario) => {
            controller.run_scenario(scenario).await?;
        }
        None => {
            info!("Running in interactive mode");
            info!("Available scenarios: {}", Scenario::builtin_names().join(", "));
            info!("Press Ctrl+C to stop");

            let duration = (args.duration > 0).then(|| Duration::from_secs(args.duration));
            controller
                .run(duration, Duration::from_millis(args.pace_ms))
                .await?;
        }
    }

    // Print metrics
    let metrics = controller.get_metrics().await;
    let session = controller.session_metrics();
    info!("Simulation complete");
    info!("Events: {}", metrics.total_events);
    info!("Rendered: {}", metrics.rendered);
    info!(
        "Superseded: {} ({:.1}%)",
        metrics.superseded,
        metrics.superseded_rate() * 100.0
    );
    info!("Ignored inputs: {}", metrics.ignored);
    info!("Failed: {}", metrics.failed);
    info!("Local rebases: {}", session.local_rebases);
    info!("Rows changed: {}", session.rows_changed);
    info!(
        "Latency avg/p50/p99: {}/{}/{}ms",
        metrics.average_latency_ms(),
        metrics.p50_latency_ms(),
        metrics.p99_latency_ms()
    );
    info!("Replay divergences: {}", controller.sink().divergences());
    info!("\n{}", controller.prometheus());

    Ok(())
}
