//! Turns a raw cell chain into a world-space route.
//!
//! Phases run in order: reconstruction, subdivision, smoothing,
//! simplification, optional spline refinement, known-waypoint insertion.
//! No phase can fail; a change that would break visibility is rejected and
//! the previous points are kept.

use crate::config::PlannerConfig;
use crate::grid::{CellCoord, SpatialGrid};
use crate::models::{Route, RouteMetrics, Waypoint, WaypointKind};
use crate::probe::EnvironmentProbe;
use crate::spatial::{point_segment_distance, polyline_length, turn_angle_deg, Vec3};

/// Post-processor bound to the grid and probe of one planning pass.
pub struct PathRefiner<'a> {
    grid: &'a SpatialGrid,
    probe: &'a dyn EnvironmentProbe,
    config: &'a PlannerConfig,
}

impl<'a> PathRefiner<'a> {
    pub fn new(
        grid: &'a SpatialGrid,
        probe: &'a dyn EnvironmentProbe,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            grid,
            probe,
            config,
        }
    }

    /// Run every phase and return the final route.
    pub fn refine(
        &self,
        cells: &[CellCoord],
        start: Vec3,
        end: Vec3,
        waypoints: &[Waypoint],
    ) -> Route {
        let raw = self.reconstruct(cells, start, end);
        let raw_len = raw.len();

        let subdivided = subdivide(&raw, self.config.subdivision_spacing);
        let smoothed = self.smooth(subdivided);
        let simplified = self.simplify(&smoothed);
        let splined = self.spline(&simplified);
        let points = self.insert_known_waypoints(splined, waypoints);

        tracing::debug!(
            raw = raw_len,
            smoothed = smoothed.len(),
            simplified = simplified.len(),
            final_points = points.len(),
            "Refined route"
        );
        Route::new(points)
    }

    /// Cell centres with the first and last replaced by the exact endpoints.
    pub fn reconstruct(&self, cells: &[CellCoord], start: Vec3, end: Vec3) -> Vec<Vec3> {
        if cells.len() < 2 {
            return vec![start, end];
        }
        let mut points: Vec<Vec3> = cells.iter().map(|c| self.grid.cell_to_world(*c)).collect();
        let last = points.len() - 1;
        points[0] = start;
        points[last] = end;
        points
    }

    /// Blend interior points toward their neighbours' midpoint.
    ///
    /// A blended point is only accepted when both adjacent segments stay
    /// visible; endpoints never move.
    pub fn smooth(&self, mut points: Vec<Vec3>) -> Vec<Vec3> {
        if points.len() < 3 {
            return points;
        }
        let strength = self.config.smoothing_strength;

        for _ in 0..self.config.smoothing_passes {
            let previous = points.clone();
            let mut moved = 0usize;
            for i in 1..points.len() - 1 {
                let target = points[i - 1].midpoint(&previous[i + 1]);
                let blended = previous[i].lerp(&target, strength);
                if self.visible(&points[i - 1], &blended) && self.visible(&blended, &previous[i + 1])
                {
                    if blended != previous[i] {
                        moved += 1;
                    }
                    points[i] = blended;
                }
            }
            if moved == 0 {
                break;
            }
        }
        points
    }

    /// Drop filler points until no more can go.
    pub fn simplify(&self, points: &[Vec3]) -> Vec<Vec3> {
        simplify_with(
            points,
            self.config.significant_turn_deg,
            self.config.min_point_spacing,
            |a, b| self.visible(a, b),
        )
    }

    /// Catmull-Rom resampling between retained points.
    ///
    /// Disabled when `spline_samples` is 0. A segment keeps its straight line
    /// whenever any curved piece would lose visibility.
    pub fn spline(&self, points: &[Vec3]) -> Vec<Vec3> {
        let samples = self.config.spline_samples;
        if samples == 0 || points.len() < 3 {
            return points.to_vec();
        }

        let last = points.len() - 1;
        let mut out = Vec::with_capacity(points.len() * (samples + 1));
        out.push(points[0]);

        for i in 0..last {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = points[(i + 2).min(last)];

            let mut curve = Vec::with_capacity(samples + 1);
            for k in 1..=samples {
                let t = k as f64 / (samples + 1) as f64;
                curve.push(catmull_rom(p0, p1, p2, p3, t));
            }
            curve.push(p2);

            let mut from = p1;
            let accepted = curve.iter().all(|p| {
                let ok = self.visible(&from, p);
                from = *p;
                ok
            });
            if accepted {
                out.extend(curve);
            } else {
                out.push(p2);
            }
        }
        out
    }

    /// Splice nearby PathPoint waypoints into the route.
    ///
    /// A waypoint goes in after the start of its nearest segment when it is
    /// close to that segment, not already represented by a route point, and
    /// visible from both segment ends.
    pub fn insert_known_waypoints(
        &self,
        mut points: Vec<Vec3>,
        waypoints: &[Waypoint],
    ) -> Vec<Vec3> {
        for waypoint in waypoints.iter().filter(|w| w.kind == WaypointKind::PathPoint) {
            if points.len() < 2 {
                break;
            }
            let position = waypoint.position;

            let mut nearest = 0usize;
            let mut nearest_distance = f64::INFINITY;
            for (i, pair) in points.windows(2).enumerate() {
                let d = point_segment_distance(&position, &pair[0], &pair[1]);
                if d < nearest_distance {
                    nearest = i;
                    nearest_distance = d;
                }
            }

            if nearest_distance >= self.config.waypoint_snap_distance {
                continue;
            }
            if points
                .iter()
                .any(|p| p.horizontal_distance(&position) <= self.config.waypoint_min_separation)
            {
                continue;
            }
            if !self.visible(&points[nearest], &position)
                || !self.visible(&position, &points[nearest + 1])
            {
                tracing::debug!(
                    "Skipping waypoint {:?}: not visible from route",
                    waypoint.description
                );
                continue;
            }

            points.insert(nearest + 1, position);
        }
        points
    }

    fn visible(&self, a: &Vec3, b: &Vec3) -> bool {
        self.grid.line_of_sight(*a, *b) && self.probe.segment_clear(*a, *b)
    }
}

/// Split segments so none is longer than `spacing`.
///
/// A non-positive or non-finite spacing leaves the points as they are.
pub fn subdivide(points: &[Vec3], spacing: f64) -> Vec<Vec3> {
    if !(spacing.is_finite() && spacing > 0.0) {
        return points.to_vec();
    }
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![first];
    for pair in points.windows(2) {
        let length = pair[0].distance(&pair[1]);
        let pieces = ((length / spacing).ceil() as usize).max(1);
        for k in 1..=pieces {
            out.push(pair[0].lerp(&pair[1], k as f64 / pieces as f64));
        }
    }
    out
}

/// Repeated simplification pass with an injected visibility test.
///
/// An interior point survives when it is a turn above `turn_threshold_deg`,
/// lies farther than `min_spacing` from the last kept point, or when dropping
/// it would leave the bridging segment without visibility. Passes repeat
/// until nothing changes, so the result is a fixpoint.
pub fn simplify_with<F>(
    points: &[Vec3],
    turn_threshold_deg: f64,
    min_spacing: f64,
    visible: F,
) -> Vec<Vec3>
where
    F: Fn(&Vec3, &Vec3) -> bool,
{
    let mut current = points.to_vec();
    loop {
        let next = simplify_pass(&current, turn_threshold_deg, min_spacing, &visible);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn simplify_pass<F>(points: &[Vec3], turn_threshold_deg: f64, min_spacing: f64, visible: &F) -> Vec<Vec3>
where
    F: Fn(&Vec3, &Vec3) -> bool,
{
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);

    for i in 1..points.len() - 1 {
        let last = kept[kept.len() - 1];
        let point = points[i];
        let next = points[i + 1];

        let turning = turn_angle_deg(&last, &point, &next) > turn_threshold_deg;
        let spaced = last.horizontal_distance(&point) > min_spacing;
        if turning || spaced || !visible(&last, &next) {
            kept.push(point);
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Length, turn count and obstacle clearance of a finished route.
pub fn compute_metrics(points: &[Vec3], waypoints: &[Waypoint], turn_threshold_deg: f64) -> RouteMetrics {
    let turn_count = points
        .windows(3)
        .filter(|w| turn_angle_deg(&w[0], &w[1], &w[2]) > turn_threshold_deg)
        .count();

    let obstacles: Vec<Vec3> = waypoints
        .iter()
        .filter(|w| w.is_obstacle())
        .map(|w| w.position)
        .collect();

    let average_obstacle_clearance = if obstacles.is_empty() || points.is_empty() {
        None
    } else {
        let total: f64 = points
            .iter()
            .map(|p| {
                obstacles
                    .iter()
                    .map(|o| p.horizontal_distance(o))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum();
        Some(total / points.len() as f64)
    };

    RouteMetrics {
        total_length: polyline_length(points),
        turn_count,
        average_obstacle_clearance,
    }
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f64) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}
