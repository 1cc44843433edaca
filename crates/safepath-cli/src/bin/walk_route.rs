//! CLI tool to walk a simulated user along a planned route.
//!
//! Plans on a blocking worker, then drives the guidance loop at a fixed tick
//! rate until the destination is reached or the time runs out.

use anyhow::anyhow;
use clap::Parser;
use safepath_cli::sim::{scenario_by_name, SimulatedWalker, SCENARIO_NAMES};
use safepath_cli::{guidance_tick, plan_on_worker, CliConfig};
use safepath_core::{resolve_endpoints, SafePathPlanner, TrackingStatus, WaypointSource};
use std::time::Duration;
use tokio::time;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Walk a simulated user along a planned route (live guidance loop)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario name (hallway, lobby, maze, landmarks)
    #[arg(long, default_value = "lobby")]
    scenario: String,

    /// Guidance ticks per second (overrides SAFEPATH_TICK_HZ)
    #[arg(long)]
    rate: Option<f64>,

    /// Walking speed in m/s
    #[arg(long, default_value_t = 1.2)]
    speed: f64,

    /// Lateral sway per tick in meters
    #[arg(long, default_value_t = 0.1)]
    jitter: f64,

    /// Simulated seconds per real second
    #[arg(long, default_value_t = 1.0)]
    speedup: f64,

    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Segments scanned for turns and obstacles
    #[arg(long, default_value_t = 3)]
    lookahead: usize,

    /// Random seed for the walker's sway
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safepath_cli=info".parse()?)
                .add_directive("safepath_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = CliConfig::from_env();
    let rate = args.rate.filter(|r| *r > 0.0).unwrap_or(config.tick_hz);

    let scenario = scenario_by_name(&args.scenario).ok_or_else(|| {
        anyhow!(
            "unknown scenario '{}', expected one of {:?}",
            args.scenario,
            SCENARIO_NAMES
        )
    })?;
    let waypoints = scenario.snapshot();
    let (start, _) = resolve_endpoints(&waypoints)?;

    let planner = SafePathPlanner::new(config.planner_config())?;
    let (mut planner, summary) = plan_on_worker(planner, waypoints).await?;
    tracing::info!(
        "Planned '{}': {} points, {:.1}m",
        scenario.name,
        summary.point_count,
        summary.metrics.total_length
    );

    println!("Starting guidance for '{}'", scenario.name);
    println!("  Speed: {}m/s, Update rate: {}Hz", args.speed, rate);
    println!();

    let mut walker = SimulatedWalker::new(start, args.speed, args.jitter, args.seed);
    let dt = args.speedup / rate;
    let mut interval = time::interval(Duration::from_secs_f64(1.0 / rate));
    let mut tick = 0u64;
    let mut last_message = String::new();

    loop {
        interval.tick().await;
        tick += 1;

        let simulated = tick as f64 * dt;
        if simulated > args.timeout as f64 {
            tracing::warn!("Timed out after {:.0}s of walking", simulated);
            break;
        }

        let event = guidance_tick(&mut planner, tick, walker.position(), args.lookahead);

        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else if event.message != last_message
            || matches!(
                event.status,
                TrackingStatus::Reached { .. } | TrackingStatus::Skipped { .. }
            )
        {
            println!(
                "[{:4}] ({:6.2}, {:6.2}) {:?} -> {}",
                tick, event.position.x, event.position.z, event.status, event.message
            );
        }
        last_message = event.message;

        if event.status == TrackingStatus::Complete {
            break;
        }
        let Some(target) = planner.next_target() else {
            break;
        };
        walker.step_toward(target, dt);
    }

    println!(
        "\nGuidance finished after {} ticks. Complete: {}",
        tick,
        planner.is_complete()
    );
    Ok(())
}
