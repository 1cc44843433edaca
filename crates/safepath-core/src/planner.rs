//! Planner facade used by the navigation host.
//!
//! Wires grid construction, search, refinement and tracking together. The
//! grid lives only for the duration of one `plan_*` call; the tracker keeps
//! the resulting route until the next plan.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::error::{ConfigError, PlanningError, Result};
use crate::grid::SpatialGrid;
use crate::models::{Route, RouteMetrics, Waypoint, WaypointKind, WaypointSource};
use crate::probe::{EnvironmentProbe, OpenFloor};
use crate::refine::{compute_metrics, PathRefiner};
use crate::search::{PathSearch, SearchAlgorithm, SearchOutcome};
use crate::spatial::Vec3;
use crate::tracker::{PathTracker, ProgressReport, TrackingStatus, UpcomingGuidance};

/// What a successful planning pass produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub point_count: usize,
    pub expanded: usize,
    pub algorithm: SearchAlgorithm,
    pub grid_cells: usize,
    pub blocked_cells: usize,
    pub metrics: RouteMetrics,
}

pub struct SafePathPlanner {
    config: PlannerConfig,
    probe: Arc<dyn EnvironmentProbe>,
    tracker: PathTracker,
}

impl SafePathPlanner {
    /// Planner on open floor, without an environment probe.
    pub fn new(config: PlannerConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_probe(config, Arc::new(OpenFloor))
    }

    pub fn with_probe(
        config: PlannerConfig,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let tracker = PathTracker::new(config.clone(), Arc::clone(&probe));
        Ok(Self {
            config,
            probe,
            tracker,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan from the Start waypoint to the End waypoint of a snapshot.
    ///
    /// Without explicit Start/End kinds the first and last non-obstacle
    /// waypoints are used.
    pub fn plan_route(&mut self, waypoints: &[Waypoint]) -> Result<PlanSummary> {
        let (start, end) = resolve_endpoints(waypoints)?;
        self.plan_between(waypoints, start, end)
    }

    /// Take a snapshot from the host's waypoint store and plan on it.
    pub fn plan_from_source<S>(&mut self, source: &S) -> Result<PlanSummary>
    where
        S: WaypointSource + ?Sized,
    {
        let snapshot = source.snapshot();
        self.plan_route(&snapshot)
    }

    /// Plan between two explicit points, avoiding the snapshot's obstacles.
    ///
    /// On failure the previous route is dropped so the host never keeps
    /// guiding along a stale path.
    pub fn plan_between(
        &mut self,
        waypoints: &[Waypoint],
        start: Vec3,
        end: Vec3,
    ) -> Result<PlanSummary> {
        match self.build_route(waypoints, start, end) {
            Ok((route, summary)) => {
                tracing::info!(
                    points = summary.point_count,
                    expanded = summary.expanded,
                    length = summary.metrics.total_length,
                    turns = summary.metrics.turn_count,
                    "Planned route with {:?}",
                    summary.algorithm
                );
                self.tracker.reset(route, waypoints, summary.metrics);
                Ok(summary)
            }
            Err(err) => {
                tracing::warn!("Planning failed: {}", err);
                self.tracker.clear();
                Err(err)
            }
        }
    }

    fn build_route(
        &self,
        waypoints: &[Waypoint],
        start: Vec3,
        end: Vec3,
    ) -> Result<(Route, PlanSummary)> {
        let config = &self.config;

        let mut bounds = waypoints.to_vec();
        bounds.push(Waypoint::start(start));
        bounds.push(Waypoint::end(end));
        let mut grid = SpatialGrid::build(&bounds, config.cell_size, config.grid_margin)?;

        grid.mark_obstacles(waypoints, config.obstacle_avoidance_radius);
        if config.use_terrain_cost {
            grid.apply_terrain_cost(self.probe.as_ref(), config.max_slope_deg, config.slope_weight);
        }
        grid.apply_cost_gradient(config.cost_padding_cells);

        let (outcome, algorithm) = self.search(&grid, start, end)?;

        let refiner = PathRefiner::new(&grid, self.probe.as_ref(), config);
        let route = refiner.refine(&outcome.cells, start, end, waypoints);
        let metrics = compute_metrics(route.points(), waypoints, config.metrics_turn_deg);

        let summary = PlanSummary {
            point_count: route.len(),
            expanded: outcome.expanded,
            algorithm,
            grid_cells: grid.cell_count(),
            blocked_cells: grid.cell_count() - grid.walkable_count(),
            metrics,
        };
        Ok((route, summary))
    }

    /// Run the configured search; a JPS dead end is retried with A*.
    fn search(
        &self,
        grid: &SpatialGrid,
        start: Vec3,
        end: Vec3,
    ) -> Result<(SearchOutcome, SearchAlgorithm)> {
        let search = PathSearch::new(grid, self.config.max_pathfinding_iterations);
        let start_cell = grid.world_to_cell(start);
        let goal_cell = grid.world_to_cell(end);

        if !self.config.use_jump_point_search {
            let outcome = search.find_path(start_cell, goal_cell)?;
            return Ok((outcome, SearchAlgorithm::AStar));
        }

        match search.find_path_jps(start_cell, goal_cell) {
            Ok(outcome) => Ok((outcome, SearchAlgorithm::JumpPoint)),
            Err(PlanningError::NoPath { expanded }) => {
                tracing::warn!(expanded, "JPS found no path, retrying with A*");
                let outcome = search.find_path(start_cell, goal_cell)?;
                Ok((outcome, SearchAlgorithm::AStar))
            }
            Err(err) => Err(err),
        }
    }

    pub fn route(&self) -> &Route {
        self.tracker.route()
    }

    pub fn tracker(&self) -> &PathTracker {
        &self.tracker
    }

    pub fn next_target(&self) -> Option<Vec3> {
        self.tracker.next_target()
    }

    pub fn advance(&mut self, user: Vec3) -> TrackingStatus {
        self.tracker.advance(user)
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    /// Upcoming turn and obstacle from the user's current position on the route.
    pub fn describe_upcoming(&self, lookahead_count: usize) -> UpcomingGuidance {
        self.tracker
            .describe_upcoming(self.tracker.current_index(), lookahead_count)
    }

    pub fn describe_from(&self, from_index: usize, lookahead_count: usize) -> UpcomingGuidance {
        self.tracker.describe_upcoming(from_index, lookahead_count)
    }

    pub fn measure_complexity(&self, lookahead_count: usize) -> f64 {
        self.tracker
            .measure_complexity(self.tracker.current_index(), lookahead_count)
    }

    pub fn metrics(&self) -> Option<RouteMetrics> {
        self.tracker.metrics()
    }

    pub fn progress(&self, user: Vec3) -> Option<ProgressReport> {
        self.tracker.progress(user)
    }
}

/// Start and end of a waypoint snapshot.
pub fn resolve_endpoints(waypoints: &[Waypoint]) -> Result<(Vec3, Vec3)> {
    let usable: Vec<&Waypoint> = waypoints.iter().filter(|w| !w.is_obstacle()).collect();
    if usable.len() < 2 {
        return Err(PlanningError::NotEnoughWaypoints(usable.len()));
    }

    let start = usable
        .iter()
        .copied()
        .find(|w| w.kind == WaypointKind::Start)
        .unwrap_or(usable[0]);
    let end = usable
        .iter()
        .copied()
        .find(|w| w.kind == WaypointKind::End)
        .or_else(|| {
            usable
                .iter()
                .rev()
                .copied()
                .find(|w| !std::ptr::eq(*w, start))
        })
        .unwrap_or(usable[usable.len() - 1]);

    Ok((start.position, end.position))
}
