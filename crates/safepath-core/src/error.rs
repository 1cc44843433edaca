//! Error types for planning and configuration.

use thiserror::Error;

use crate::grid::CellCoord;

/// Recoverable planning failures. The host decides what to tell the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("need at least 2 usable waypoints, got {0}")]
    NotEnoughWaypoints(usize),

    #[error("grid has no cells (empty waypoint snapshot)")]
    EmptyGrid,

    #[error("grid too large: {cells} cells")]
    GridTooLarge { cells: usize },

    #[error("no walkable cell reachable near cell {cell}")]
    UnreachableTarget { cell: CellCoord },

    #[error("no path found after {expanded} expansions")]
    NoPath { expanded: usize },

    #[error("search gave up after {limit} expansions")]
    IterationLimit { limit: usize },
}

/// Invalid planner configuration. These are programming errors and surface
/// when the planner is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("cell size must be positive, got {0}")]
    CellSize(f64),

    #[error("max pathfinding iterations must be at least 1")]
    ZeroIterations,

    #[error("smoothing strength must be within 0..=1, got {0}")]
    SmoothingStrength(f64),

    #[error("lookahead points must be at most {max}, got {0}", max = crate::config::MAX_LOOKAHEAD_POINTS)]
    Lookahead(usize),

    #[error("{field} must be a non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, PlanningError>;
