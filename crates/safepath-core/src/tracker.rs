//! Live progress along a planned route.
//!
//! `current_index` is the route point the user reached most recently; the
//! user is walking toward `current_index + 1`. The index only moves forward
//! until the next `reset`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::models::{Route, RouteMetrics, Waypoint};
use crate::probe::EnvironmentProbe;
use crate::spatial::{heading_deg, normalize_deg, point_segment_distance, signed_turn_deg, Vec3};

/// Obstacles within this bearing of the walking direction are "ahead".
const AHEAD_CONE_DEG: f64 = 30.0;
/// Turn angle worth one complexity point.
const COMPLEXITY_TURN_UNIT_DEG: f64 = 90.0;
const INSIDE_RADIUS_PENALTY: f64 = 2.0;
const NEAR_RADIUS_PENALTY: f64 = 1.0;

/// Outcome of one `advance` tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackingStatus {
    /// No route with at least two points is loaded
    NoRoute,
    /// Still walking toward `index`
    Approaching { index: usize, distance: f64 },
    /// Point `index` was reached this tick
    Reached { index: usize },
    /// A shortcut made `to` the next target
    Skipped { from: usize, to: usize },
    /// The final point has been reached
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeDirection {
    Left,
    Right,
    Ahead,
}

impl fmt::Display for RelativeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeDirection::Left => write!(f, "left"),
            RelativeDirection::Right => write!(f, "right"),
            RelativeDirection::Ahead => write!(f, "ahead"),
        }
    }
}

/// Next significant turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnCue {
    /// Route index of the turning point
    pub index: usize,
    /// Distance along the route to the turning point
    pub distance: f64,
    pub direction: RelativeDirection,
    pub angle_deg: f64,
}

/// Nearest obstacle close to the upcoming segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleCue {
    pub distance: f64,
    pub direction: RelativeDirection,
    /// Closest approach between the route and the obstacle
    pub clearance: f64,
    pub description: Option<String>,
}

/// What lies ahead. Both fields empty means the path is clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpcomingGuidance {
    pub turn: Option<TurnCue>,
    pub obstacle: Option<ObstacleCue>,
}

impl UpcomingGuidance {
    pub fn is_clear(&self) -> bool {
        self.turn.is_none() && self.obstacle.is_none()
    }
}

impl fmt::Display for UpcomingGuidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clear() {
            return write!(f, "Path is clear");
        }
        if let Some(turn) = &self.turn {
            let slight = if turn.angle_deg.abs() < 45.0 { "slightly " } else { "" };
            write!(
                f,
                "Turn {}{} in {:.0} meters",
                slight, turn.direction, turn.distance
            )?;
            if self.obstacle.is_some() {
                write!(f, ". ")?;
            }
        }
        if let Some(obstacle) = &self.obstacle {
            let what = obstacle.description.as_deref().unwrap_or("Obstacle");
            match obstacle.direction {
                RelativeDirection::Ahead => {
                    write!(f, "{} ahead in {:.0} meters", what, obstacle.distance)?
                }
                side => write!(
                    f,
                    "{} on your {} in {:.0} meters",
                    what, side, obstacle.distance
                )?,
            }
        }
        Ok(())
    }
}

/// Distance bookkeeping for the host's progress announcements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub next_index: usize,
    pub distance_to_next: f64,
    pub remaining_distance: f64,
    /// 0 at the start, 1 at the destination
    pub completed_fraction: f64,
}

/// Tracks one user along one route.
pub struct PathTracker {
    config: PlannerConfig,
    probe: Arc<dyn EnvironmentProbe>,
    route: Route,
    obstacles: Vec<Waypoint>,
    metrics: Option<RouteMetrics>,
    current_index: usize,
}

impl PathTracker {
    pub fn new(config: PlannerConfig, probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            config,
            probe,
            route: Route::default(),
            obstacles: Vec::new(),
            metrics: None,
            current_index: 0,
        }
    }

    /// Load a freshly planned route and start over at its first point.
    pub fn reset(&mut self, route: Route, waypoints: &[Waypoint], metrics: RouteMetrics) {
        self.route = route;
        self.obstacles = waypoints.iter().filter(|w| w.is_obstacle()).cloned().collect();
        self.metrics = Some(metrics);
        self.current_index = 0;
    }

    /// Forget the route, e.g. after a failed re-plan.
    pub fn clear(&mut self) {
        self.route = Route::default();
        self.obstacles.clear();
        self.metrics = None;
        self.current_index = 0;
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn metrics(&self) -> Option<RouteMetrics> {
        self.metrics
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn count(&self) -> usize {
        self.route.len()
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.route.get(index).copied()
    }

    /// Route point at `index`; out of range yields the last point and an
    /// empty route yields the origin.
    pub fn point_at(&self, index: usize) -> Vec3 {
        self.route
            .get(index)
            .or_else(|| self.route.last())
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    pub fn is_complete(&self) -> bool {
        self.route.is_navigable() && self.current_index + 1 >= self.route.len()
    }

    /// Index the user is walking toward.
    fn next_index(&self) -> usize {
        (self.current_index + 1).min(self.route.len().saturating_sub(1))
    }

    /// Point the user should walk toward, or `None` without a route.
    pub fn next_target(&self) -> Option<Vec3> {
        if !self.route.is_navigable() {
            return None;
        }
        self.get(self.next_index())
    }

    /// Update progress from the user's position.
    pub fn advance(&mut self, user: Vec3) -> TrackingStatus {
        if !self.route.is_navigable() {
            return TrackingStatus::NoRoute;
        }
        if self.is_complete() {
            return TrackingStatus::Complete;
        }

        let last = self.route.len() - 1;
        let next = self.current_index + 1;
        let distance = user.horizontal_distance(&self.point_at(next));

        if distance <= self.config.reached_threshold {
            self.current_index = next;
            tracing::debug!(index = next, "Reached route point");
            if next == last {
                tracing::info!("Destination reached");
                return TrackingStatus::Complete;
            }
            return TrackingStatus::Reached { index: next };
        }

        let horizon = next.saturating_add(self.config.lookahead_points).min(last);
        for candidate in (next + 1..=horizon).rev() {
            let point = self.point_at(candidate);
            if user.horizontal_distance(&point) < distance && self.visible_from(user, point) {
                let from = self.current_index;
                self.current_index = candidate - 1;
                tracing::debug!(from, to = candidate, "Skipping ahead on the route");
                return TrackingStatus::Skipped {
                    from,
                    to: candidate,
                };
            }
        }

        TrackingStatus::Approaching {
            index: next,
            distance,
        }
    }

    /// Next turn and nearest obstacle within `lookahead_count` segments of
    /// `from_index`.
    pub fn describe_upcoming(&self, from_index: usize, lookahead_count: usize) -> UpcomingGuidance {
        let Some((from, to)) = self.scan_window(from_index, lookahead_count) else {
            return UpcomingGuidance::default();
        };
        let points = self.route.points();

        let mut turn = None;
        let mut travelled = 0.0;
        for k in from..to {
            travelled += points[k].horizontal_distance(&points[k + 1]);
            if k + 2 >= points.len() {
                break;
            }
            let Some(angle) = signed_turn_deg(&points[k], &points[k + 1], &points[k + 2]) else {
                continue;
            };
            if angle.abs() > self.config.significant_turn_deg {
                turn = Some(TurnCue {
                    index: k + 1,
                    distance: travelled,
                    direction: if angle > 0.0 {
                        RelativeDirection::Right
                    } else {
                        RelativeDirection::Left
                    },
                    angle_deg: angle,
                });
                break;
            }
        }

        let origin = points[from];
        let walking = heading_deg(&origin, &points[from + 1]);
        let obstacle = self
            .obstacles
            .iter()
            .filter_map(|o| {
                let clearance = self.segment_clearance(o.position, from, to);
                (clearance < self.config.obstacle_warning_distance).then(|| ObstacleCue {
                    distance: origin.horizontal_distance(&o.position),
                    direction: relative_direction(walking, heading_deg(&origin, &o.position)),
                    clearance,
                    description: o.description.clone(),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        UpcomingGuidance { turn, obstacle }
    }

    /// Scalar difficulty of the next `lookahead_count` segments.
    pub fn measure_complexity(&self, from_index: usize, lookahead_count: usize) -> f64 {
        let Some((from, to)) = self.scan_window(from_index, lookahead_count) else {
            return 0.0;
        };
        let points = self.route.points();

        let turns: f64 = (from..to)
            .filter(|k| k + 2 < points.len())
            .filter_map(|k| signed_turn_deg(&points[k], &points[k + 1], &points[k + 2]))
            .map(|angle| angle.abs() / COMPLEXITY_TURN_UNIT_DEG)
            .sum();

        let radius_default = self.config.obstacle_avoidance_radius;
        let obstacles: f64 = self
            .obstacles
            .iter()
            .map(|o| {
                let radius = o.clearance_radius(radius_default);
                let clearance = self.segment_clearance(o.position, from, to);
                if clearance < radius {
                    INSIDE_RADIUS_PENALTY
                } else if clearance < 2.0 * radius {
                    NEAR_RADIUS_PENALTY
                } else {
                    0.0
                }
            })
            .sum();

        turns + obstacles
    }

    /// Distances toward the destination.
    pub fn progress(&self, user: Vec3) -> Option<ProgressReport> {
        if !self.route.is_navigable() {
            return None;
        }
        let points = self.route.points();
        let next_index = self.next_index();
        let distance_to_next = if self.is_complete() {
            0.0
        } else {
            user.horizontal_distance(&points[next_index])
        };
        let beyond: f64 = points[next_index..]
            .windows(2)
            .map(|w| w[0].horizontal_distance(&w[1]))
            .sum();
        let remaining_distance = distance_to_next + beyond;
        let total: f64 = points
            .windows(2)
            .map(|w| w[0].horizontal_distance(&w[1]))
            .sum();
        let completed_fraction = if total > 0.0 {
            (1.0 - remaining_distance / total).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Some(ProgressReport {
            next_index,
            distance_to_next,
            remaining_distance,
            completed_fraction,
        })
    }

    /// Segment range `[from, to)` to scan, `None` when there is nothing to scan.
    fn scan_window(&self, from_index: usize, lookahead_count: usize) -> Option<(usize, usize)> {
        let len = self.route.len();
        if len < 2 || from_index >= len - 1 || lookahead_count == 0 {
            return None;
        }
        Some((
            from_index,
            from_index.saturating_add(lookahead_count).min(len - 1),
        ))
    }

    /// Closest approach of `position` to segments `from..to`.
    fn segment_clearance(&self, position: Vec3, from: usize, to: usize) -> f64 {
        let points = self.route.points();
        (from..to)
            .map(|k| point_segment_distance(&position, &points[k], &points[k + 1]))
            .fold(f64::INFINITY, f64::min)
    }

    /// Straight walk from the user to `target` keeps clear of every obstacle.
    fn visible_from(&self, user: Vec3, target: Vec3) -> bool {
        let radius_default = self.config.obstacle_avoidance_radius;
        self.obstacles.iter().all(|o| {
            point_segment_distance(&o.position, &user, &target) > o.clearance_radius(radius_default)
        }) && self.probe.segment_clear(user, target)
    }
}

fn relative_direction(walking_deg: f64, bearing_deg: f64) -> RelativeDirection {
    let relative = normalize_deg(bearing_deg - walking_deg);
    if relative.abs() < AHEAD_CONE_DEG {
        RelativeDirection::Ahead
    } else if relative > 0.0 {
        RelativeDirection::Right
    } else {
        RelativeDirection::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FnProbe, OpenFloor};
    use crate::refine::compute_metrics;

    fn tracker_with(points: Vec<Vec3>, waypoints: &[Waypoint]) -> PathTracker {
        let config = PlannerConfig::default();
        let mut tracker = PathTracker::new(config, Arc::new(OpenFloor));
        let metrics = compute_metrics(&points, waypoints, 30.0);
        tracker.reset(Route::new(points), waypoints, metrics);
        tracker
    }

    fn corridor() -> Vec<Vec3> {
        (0..=5).map(|i| Vec3::new(0.0, 0.0, i as f64 * 3.0)).collect()
    }

    /// North 6m, then east 6m.
    fn right_turn() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::new(0.0, 0.0, 6.0),
            Vec3::new(3.0, 0.0, 6.0),
            Vec3::new(6.0, 0.0, 6.0),
        ]
    }

    #[test]
    fn reaching_a_point_moves_the_index_once() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 4.0),
        ];
        let mut tracker = tracker_with(points.clone(), &[]);

        assert_eq!(tracker.advance(points[1]), TrackingStatus::Reached { index: 1 });
        assert_eq!(tracker.current_index(), 1);

        let status = tracker.advance(points[1]);
        assert!(matches!(status, TrackingStatus::Approaching { index: 2, .. }));
        assert_eq!(tracker.current_index(), 1);
    }

    #[test]
    fn walking_the_whole_route_completes() {
        let mut tracker = tracker_with(corridor(), &[]);
        for point in corridor().iter().skip(1) {
            tracker.advance(*point);
        }
        assert!(tracker.is_complete());
        assert_eq!(tracker.advance(Vec3::new(0.0, 0.0, 15.0)), TrackingStatus::Complete);
        assert_eq!(tracker.next_target(), Some(Vec3::new(0.0, 0.0, 15.0)));
    }

    #[test]
    fn shortcut_skips_intermediate_points() {
        let mut tracker = tracker_with(corridor(), &[]);
        let status = tracker.advance(Vec3::new(0.5, 0.0, 5.5));
        assert_eq!(status, TrackingStatus::Skipped { from: 0, to: 2 });
        assert_eq!(tracker.current_index(), 1);
        assert_eq!(tracker.next_target(), Some(Vec3::new(0.0, 0.0, 6.0)));
    }

    #[test]
    fn shortcut_is_refused_through_an_obstacle() {
        let points = right_turn();
        let obstacle = Waypoint::obstacle(Vec3::new(1.5, 0.0, 4.5), 1.0);
        let mut tracker = tracker_with(points, &[obstacle]);
        tracker.advance(Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(tracker.current_index(), 1);

        // index 3 is closer than index 2, but the obstacle sits in between
        let status = tracker.advance(Vec3::new(2.0, 0.0, 4.0));
        assert!(matches!(status, TrackingStatus::Approaching { index: 2, .. }));
        assert_eq!(tracker.current_index(), 1);
    }

    #[test]
    fn shortcut_is_refused_when_probe_sees_a_wall() {
        let mut tracker = PathTracker::new(
            PlannerConfig::default(),
            Arc::new(FnProbe::new(|_| None, |_, _| false)),
        );
        let metrics = compute_metrics(&corridor(), &[], 30.0);
        tracker.reset(Route::new(corridor()), &[], metrics);
        let status = tracker.advance(Vec3::new(0.5, 0.0, 5.5));
        assert!(matches!(status, TrackingStatus::Approaching { index: 1, .. }));
    }

    #[test]
    fn index_never_moves_backwards() {
        let mut tracker = tracker_with(corridor(), &[]);
        tracker.advance(Vec3::new(0.0, 0.0, 9.0));
        let reached = tracker.current_index();
        tracker.advance(Vec3::new(0.0, 0.0, 0.0));
        assert!(tracker.current_index() >= reached);
    }

    #[test]
    fn empty_route_is_a_no_op() {
        let mut tracker = PathTracker::new(PlannerConfig::default(), Arc::new(OpenFloor));
        assert_eq!(tracker.advance(Vec3::ZERO), TrackingStatus::NoRoute);
        assert_eq!(tracker.next_target(), None);
        assert_eq!(tracker.point_at(3), Vec3::ZERO);
        assert_eq!(tracker.get(0), None);
        assert!(tracker.describe_upcoming(0, 3).is_clear());
        assert_eq!(tracker.measure_complexity(0, 3), 0.0);
        assert!(tracker.progress(Vec3::ZERO).is_none());
        assert!(!tracker.is_complete());
    }

    #[test]
    fn point_at_clamps_to_last_point() {
        let tracker = tracker_with(corridor(), &[]);
        assert_eq!(tracker.point_at(99), Vec3::new(0.0, 0.0, 15.0));
        assert_eq!(tracker.count(), 6);
    }

    #[test]
    fn upcoming_turn_reports_side_and_distance() {
        let tracker = tracker_with(right_turn(), &[]);
        let guidance = tracker.describe_upcoming(0, 4);
        let turn = guidance.turn.unwrap();
        assert_eq!(turn.index, 2);
        assert_eq!(turn.direction, RelativeDirection::Right);
        assert!((turn.distance - 6.0).abs() < 1e-9);
        assert_eq!(guidance.to_string(), "Turn right in 6 meters");

        let mirrored: Vec<Vec3> = right_turn().iter().map(|p| Vec3::new(-p.x, p.y, p.z)).collect();
        let tracker = tracker_with(mirrored, &[]);
        let turn = tracker.describe_upcoming(0, 4).turn.unwrap();
        assert_eq!(turn.direction, RelativeDirection::Left);
    }

    #[test]
    fn turn_beyond_lookahead_is_not_reported() {
        let tracker = tracker_with(right_turn(), &[]);
        assert!(tracker.describe_upcoming(0, 1).turn.is_none());
    }

    #[test]
    fn nearby_obstacle_is_announced() {
        let chair = Waypoint::obstacle(Vec3::new(-1.0, 0.0, 4.0), 0.5).with_description("Chair");
        let far = Waypoint::obstacle(Vec3::new(10.0, 0.0, 0.0), 0.5);
        let tracker = tracker_with(corridor(), &[chair, far]);
        let guidance = tracker.describe_upcoming(0, 3);
        let cue = guidance.obstacle.clone().unwrap();
        assert_eq!(cue.description.as_deref(), Some("Chair"));
        assert_eq!(cue.direction, RelativeDirection::Ahead);
        assert!((cue.clearance - 1.0).abs() < 1e-9);
        assert_eq!(guidance.to_string(), "Chair ahead in 4 meters");

        let beside = Waypoint::obstacle(Vec3::new(-1.5, 0.0, 0.5), 0.5);
        let tracker = tracker_with(corridor(), &[beside]);
        let cue = tracker.describe_upcoming(0, 3).obstacle.unwrap();
        assert_eq!(cue.direction, RelativeDirection::Left);
    }

    #[test]
    fn clear_path_reads_clear() {
        let tracker = tracker_with(corridor(), &[]);
        let guidance = tracker.describe_upcoming(0, 5);
        assert!(guidance.is_clear());
        assert_eq!(guidance.to_string(), "Path is clear");
    }

    #[test]
    fn out_of_range_queries_are_neutral() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 4.0),
        ];
        let tracker = tracker_with(points, &[]);

        assert!(tracker.describe_upcoming(usize::MAX, 3).is_clear());
        assert!(tracker.describe_upcoming(2, 3).is_clear());
        assert!(tracker.describe_upcoming(1, usize::MAX).is_clear());
        assert_eq!(tracker.measure_complexity(usize::MAX, 3), 0.0);
        assert_eq!(tracker.measure_complexity(0, 0), 0.0);
        assert!(tracker.measure_complexity(0, usize::MAX) > 0.0);
    }

    #[test]
    fn huge_lookahead_does_not_overflow_advance() {
        let config = PlannerConfig {
            lookahead_points: usize::MAX,
            ..Default::default()
        };
        let mut tracker = PathTracker::new(config, Arc::new(OpenFloor));
        let points = corridor();
        tracker.reset(Route::new(points.clone()), &[], compute_metrics(&points, &[], 30.0));

        let status = tracker.advance(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(status, TrackingStatus::Skipped { from: 0, to: 5 });
        assert_eq!(tracker.current_index(), 4);
    }

    #[test]
    fn complexity_weighs_turns_and_obstacles() {
        let straight = tracker_with(corridor(), &[]);
        assert_eq!(straight.measure_complexity(0, 5), 0.0);

        let turning = tracker_with(right_turn(), &[]);
        assert!((turning.measure_complexity(0, 4) - 1.0).abs() < 1e-9);

        let inside = Waypoint::obstacle(Vec3::new(0.5, 0.0, 2.0), 1.0);
        let near = Waypoint::obstacle(Vec3::new(1.5, 0.0, 8.0), 1.0);
        let cluttered = tracker_with(corridor(), &[inside, near]);
        assert!((cluttered.measure_complexity(0, 5) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn progress_tracks_remaining_distance() {
        let mut tracker = tracker_with(corridor(), &[]);
        let report = tracker.progress(Vec3::ZERO).unwrap();
        assert_eq!(report.next_index, 1);
        assert!((report.remaining_distance - 15.0).abs() < 1e-9);
        assert!(report.completed_fraction.abs() < 1e-9);

        tracker.advance(Vec3::new(0.0, 0.0, 3.0));
        let report = tracker.progress(Vec3::new(0.0, 0.0, 4.5)).unwrap();
        assert_eq!(report.next_index, 2);
        assert!((report.distance_to_next - 1.5).abs() < 1e-9);
        assert!((report.completed_fraction - 0.3).abs() < 1e-9);
    }

    #[test]
    fn reset_starts_over() {
        let mut tracker = tracker_with(corridor(), &[]);
        tracker.advance(Vec3::new(0.0, 0.0, 3.0));
        let metrics = compute_metrics(&right_turn(), &[], 30.0);
        tracker.reset(Route::new(right_turn()), &[], metrics);
        assert_eq!(tracker.current_index(), 0);
        assert_eq!(tracker.metrics().unwrap().turn_count, 1);
    }
}
