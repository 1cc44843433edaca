//! CLI tool to plan a route through a built-in indoor scenario.

use anyhow::{anyhow, Context};
use clap::Parser;
use safepath_cli::sim::{scenario_by_name, SCENARIO_NAMES};
use safepath_cli::CliConfig;
use safepath_core::{PlanSummary, SafePathPlanner, Vec3};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Plan a safe walking route for a scenario and print it
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario name (hallway, lobby, maze, landmarks)
    #[arg(long, default_value = "lobby")]
    scenario: String,

    /// Grid cell size in meters (overrides SAFEPATH_CELL_SIZE)
    #[arg(long)]
    cell_size: Option<f64>,

    /// Expansion budget (overrides SAFEPATH_MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Use Jump Point Search
    #[arg(long)]
    jps: bool,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    scenario: &'a str,
    summary: &'a PlanSummary,
    route: &'a [Vec3],
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safepath_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = CliConfig::from_env();
    if let Some(cell_size) = args.cell_size {
        config.cell_size = cell_size;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    config.use_jps |= args.jps;

    let scenario = scenario_by_name(&args.scenario).ok_or_else(|| {
        anyhow!(
            "unknown scenario '{}', expected one of {:?}",
            args.scenario,
            SCENARIO_NAMES
        )
    })?;

    let mut planner =
        SafePathPlanner::new(config.planner_config()).context("invalid planner configuration")?;
    let summary = planner
        .plan_from_source(&scenario)
        .with_context(|| format!("planning '{}' failed", scenario.name))?;

    if args.json {
        let report = PlanReport {
            scenario: &scenario.name,
            summary: &summary,
            route: planner.route().points(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Scenario: {}", scenario.name);
    println!(
        "  Search: {:?}, {} expansions on {} cells ({} blocked)",
        summary.algorithm, summary.expanded, summary.grid_cells, summary.blocked_cells
    );
    println!(
        "  Route: {} points, {:.2}m, {} turns",
        summary.point_count, summary.metrics.total_length, summary.metrics.turn_count
    );
    match summary.metrics.average_obstacle_clearance {
        Some(clearance) => println!("  Average obstacle clearance: {:.2}m", clearance),
        None => println!("  No obstacles mapped"),
    }
    println!();

    for (i, point) in planner.route().points().iter().enumerate() {
        let guidance = planner.describe_from(i, 3);
        println!(
            "[{:3}] ({:6.2}, {:6.2})  {}",
            i, point.x, point.z, guidance
        );
    }

    Ok(())
}
