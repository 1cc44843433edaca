//! Tunable planner parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for grid construction, search, refinement and tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Edge length of a grid cell in meters
    pub cell_size: f64,
    /// Margin added around the waypoint bounding box in meters
    pub grid_margin: f64,
    /// Clearance for obstacles that carry no width of their own
    pub obstacle_avoidance_radius: f64,
    /// Window (in cells) for the obstacle proximity penalty
    pub cost_padding_cells: usize,
    /// Maximum node expansions before a search gives up
    pub max_pathfinding_iterations: usize,
    /// Use Jump Point Search instead of plain A*
    pub use_jump_point_search: bool,
    /// Ask the environment probe for slopes while building the grid
    pub use_terrain_cost: bool,
    /// Steeper surfaces are not walkable (degrees)
    pub max_slope_deg: f64,
    /// Cost added at the slope limit
    pub slope_weight: f64,
    /// Longest allowed segment after subdivision
    pub subdivision_spacing: f64,
    pub smoothing_passes: usize,
    /// Blend factor towards the neighbour midpoint, 0..=1
    pub smoothing_strength: f64,
    /// Direction changes above this are announced and never simplified away
    pub significant_turn_deg: f64,
    /// Spacing kept between filler points during simplification
    pub min_point_spacing: f64,
    /// Catmull-Rom samples inserted per segment after simplification, 0 disables
    pub spline_samples: usize,
    /// PathPoint waypoints closer than this to the route are inserted into it
    pub waypoint_snap_distance: f64,
    /// Inserted waypoints must be at least this far from existing points
    pub waypoint_min_separation: f64,
    /// Turn threshold used for the route's turn count
    pub metrics_turn_deg: f64,
    /// Horizontal distance at which a route point counts as reached
    pub reached_threshold: f64,
    /// Points beyond the next target considered for shortcuts
    pub lookahead_points: usize,
    /// Obstacles this close to an upcoming segment are announced
    pub obstacle_warning_distance: f64,
}

/// Upper bound for `lookahead_points`; shortcuts further ahead than this are
/// never worth the visibility checks.
pub const MAX_LOOKAHEAD_POINTS: usize = 16;

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.5,
            grid_margin: 5.0,
            obstacle_avoidance_radius: 1.0,
            cost_padding_cells: 3,
            max_pathfinding_iterations: 1000,
            use_jump_point_search: false,
            use_terrain_cost: false,
            max_slope_deg: 30.0,
            slope_weight: 1.0,
            subdivision_spacing: 2.0,
            smoothing_passes: 3,
            smoothing_strength: 0.5,
            significant_turn_deg: 15.0,
            min_point_spacing: 2.0,
            spline_samples: 0,
            waypoint_snap_distance: 2.0,
            waypoint_min_separation: 0.5,
            metrics_turn_deg: 30.0,
            reached_threshold: 1.0,
            lookahead_points: 2,
            obstacle_warning_distance: 2.0,
        }
    }
}

impl PlannerConfig {
    /// Reject settings the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::CellSize(self.cell_size));
        }
        if !(self.grid_margin.is_finite() && self.grid_margin >= 0.0) {
            return Err(ConfigError::Negative {
                field: "grid_margin",
                value: self.grid_margin,
            });
        }
        if self.max_pathfinding_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if !(0.0..=1.0).contains(&self.smoothing_strength) {
            return Err(ConfigError::SmoothingStrength(self.smoothing_strength));
        }
        if !(self.subdivision_spacing.is_finite() && self.subdivision_spacing > 0.0) {
            return Err(ConfigError::Negative {
                field: "subdivision_spacing",
                value: self.subdivision_spacing,
            });
        }
        if !(self.max_slope_deg.is_finite() && self.max_slope_deg > 0.0) {
            return Err(ConfigError::Negative {
                field: "max_slope_deg",
                value: self.max_slope_deg,
            });
        }
        if self.lookahead_points > MAX_LOOKAHEAD_POINTS {
            return Err(ConfigError::Lookahead(self.lookahead_points));
        }
        for (field, value) in [
            ("obstacle_avoidance_radius", self.obstacle_avoidance_radius),
            ("min_point_spacing", self.min_point_spacing),
            ("waypoint_snap_distance", self.waypoint_snap_distance),
            ("waypoint_min_separation", self.waypoint_min_separation),
            ("reached_threshold", self.reached_threshold),
            ("obstacle_warning_distance", self.obstacle_warning_distance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }
}
