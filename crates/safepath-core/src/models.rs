//! Core data models shared by the mapping host and the planner.

use serde::{Deserialize, Serialize};

use crate::spatial::Vec3;

/// Role of a waypoint in the mapped space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    /// Where the walk begins
    Start,
    /// Destination
    End,
    /// Named intermediate point, e.g. a landmark
    PathPoint,
    /// Something the route must keep clear of
    Obstacle,
}

/// A point of interest produced by the mapping host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    /// Orientation about the vertical axis (degrees, 0 = north)
    #[serde(default)]
    pub heading_deg: f64,
    pub kind: WaypointKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Clearance radius for obstacles; falls back to the configured avoidance radius
    #[serde(default)]
    pub obstacle_width: Option<f64>,
    #[serde(default)]
    pub obstacle_severity: Option<f64>,
}

impl Waypoint {
    /// Create a waypoint with only required fields.
    pub fn new(kind: WaypointKind, position: Vec3) -> Self {
        Self {
            position,
            heading_deg: 0.0,
            kind,
            description: None,
            obstacle_width: None,
            obstacle_severity: None,
        }
    }

    pub fn start(position: Vec3) -> Self {
        Self::new(WaypointKind::Start, position)
    }

    pub fn end(position: Vec3) -> Self {
        Self::new(WaypointKind::End, position)
    }

    pub fn path_point(position: Vec3) -> Self {
        Self::new(WaypointKind::PathPoint, position)
    }

    /// Obstacle with an explicit clearance radius.
    pub fn obstacle(position: Vec3, width: f64) -> Self {
        Self {
            obstacle_width: Some(width),
            ..Self::new(WaypointKind::Obstacle, position)
        }
    }

    /// Set the free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_obstacle(&self) -> bool {
        self.kind == WaypointKind::Obstacle
    }

    /// Clearance radius for an obstacle, or `default_radius` when unset.
    pub fn clearance_radius(&self, default_radius: f64) -> f64 {
        match self.obstacle_width {
            Some(width) if width > 0.0 => width,
            _ => default_radius,
        }
    }
}

/// Source of waypoint snapshots, implemented by the mapping host.
///
/// The planner only ever sees the returned snapshot, so edits the host makes
/// while a plan is running cannot leak into it.
pub trait WaypointSource {
    fn snapshot(&self) -> Vec<Waypoint>;
}

impl WaypointSource for Vec<Waypoint> {
    fn snapshot(&self) -> Vec<Waypoint> {
        self.clone()
    }
}

impl WaypointSource for [Waypoint] {
    fn snapshot(&self) -> Vec<Waypoint> {
        self.to_vec()
    }
}

/// Ordered world-space polyline from start to destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<Vec3>,
}

impl Route {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A route needs at least two points to guide anyone anywhere.
    pub fn is_navigable(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn first(&self) -> Option<&Vec3> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Vec3> {
        self.points.last()
    }

    pub fn get(&self, index: usize) -> Option<&Vec3> {
        self.points.get(index)
    }

    pub fn total_length(&self) -> f64 {
        crate::spatial::polyline_length(&self.points)
    }

    pub fn into_points(self) -> Vec<Vec3> {
        self.points
    }
}

/// Summary figures computed once after refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub total_length: f64,
    pub turn_count: usize,
    /// Mean distance from route points to their nearest obstacle; `None` when
    /// the snapshot holds no obstacles
    pub average_obstacle_clearance: Option<f64>,
}
