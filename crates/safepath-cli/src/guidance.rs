//! Guidance loop glue between a navigation host and the planner.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use safepath_core::spatial::heading_deg;
use safepath_core::{PlanSummary, SafePathPlanner, TrackingStatus, Vec3, Waypoint};

/// One guidance tick, as the speech/audio layer would receive it.
#[derive(Debug, Clone, Serialize)]
pub struct GuidanceEvent {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub position: Vec3,
    pub status: TrackingStatus,
    pub message: String,
    /// Compass bearing from the user to the next target, for the audio beacon
    pub beacon_deg: Option<f64>,
    pub complexity: f64,
    pub remaining_m: Option<f64>,
}

/// Plan on a blocking worker so the caller's runtime keeps ticking.
///
/// The planner moves into the worker and comes back with the result.
pub async fn plan_on_worker(
    planner: SafePathPlanner,
    waypoints: Vec<Waypoint>,
) -> anyhow::Result<(SafePathPlanner, PlanSummary)> {
    let (planner, result) = tokio::task::spawn_blocking(move || {
        let mut planner = planner;
        let result = planner.plan_route(&waypoints);
        (planner, result)
    })
    .await
    .context("planning worker panicked")?;

    let summary = result.context("route planning failed")?;
    Ok((planner, summary))
}

/// Advance the tracker with the user's position and describe what's next.
pub fn guidance_tick(
    planner: &mut SafePathPlanner,
    tick: u64,
    position: Vec3,
    lookahead: usize,
) -> GuidanceEvent {
    let status = planner.advance(position);
    let message = match status {
        TrackingStatus::Complete => "You have arrived".to_string(),
        TrackingStatus::NoRoute => "No route available".to_string(),
        _ => planner.describe_upcoming(lookahead).to_string(),
    };

    GuidanceEvent {
        tick,
        timestamp: Utc::now(),
        position,
        status,
        message,
        beacon_deg: planner
            .next_target()
            .filter(|_| !planner.is_complete())
            .map(|target| heading_deg(&position, &target)),
        complexity: planner.measure_complexity(lookahead),
        remaining_m: planner.progress(position).map(|p| p.remaining_distance),
    }
}
