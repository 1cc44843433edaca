pub mod config;
pub mod error;
pub mod grid;
pub mod models;
pub mod planner;
pub mod probe;
pub mod refine;
pub mod search;
pub mod spatial;
pub mod tracker;

pub use config::PlannerConfig;
pub use error::{ConfigError, PlanningError};
pub use grid::{CellCoord, SpatialGrid};
pub use models::{Route, RouteMetrics, Waypoint, WaypointKind, WaypointSource};
pub use planner::{resolve_endpoints, PlanSummary, SafePathPlanner};
pub use probe::{EnvironmentProbe, FnProbe, OpenFloor};
pub use refine::{compute_metrics, simplify_with, subdivide, PathRefiner};
pub use search::{PathSearch, SearchAlgorithm, SearchOutcome};
pub use spatial::Vec3;
pub use tracker::{
    ObstacleCue, PathTracker, ProgressReport, RelativeDirection, TrackingStatus, TurnCue,
    UpcomingGuidance,
};
