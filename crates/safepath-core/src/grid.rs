//! Walkability grid over the horizontal plane.
//!
//! The grid is rebuilt from the waypoint snapshot on every planning pass:
//! bounds come from the waypoint bounding box plus a margin, obstacles are
//! stamped in as blocked discs, and a proximity penalty biases search towards
//! the middle of open space.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::error::{PlanningError, Result};
use crate::models::Waypoint;
use crate::probe::EnvironmentProbe;
use crate::spatial::Vec3;

/// Traversal cost of an untouched cell.
pub const BASE_COST: f64 = 1.0;
/// Penalty added right next to a blocked cell; fades to 0 at the padding edge.
pub const PROXIMITY_PENALTY: f64 = 2.0;
/// Refuse to allocate grids beyond this many cells.
pub const MAX_GRID_CELLS: usize = 4_000_000;

/// Integer cell address; `x` runs east, `z` runs north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Euclidean distance in cells.
    pub fn distance(&self, other: &CellCoord) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dz = (other.z - self.z) as f64;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn manhattan(&self, other: &CellCoord) -> f64 {
        ((other.x - self.x).abs() + (other.z - self.z).abs()) as f64
    }

    /// True when `other` is one of the eight surrounding cells.
    pub fn is_adjacent(&self, other: &CellCoord) -> bool {
        let dx = (other.x - self.x).abs();
        let dz = (other.z - self.z).abs();
        dx <= 1 && dz <= 1 && (dx + dz) > 0
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Eight-connected neighbour offsets, cardinals first.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Discretized walkability and cost map.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    origin: Vec3,
    cell_size: f64,
    width: usize,
    height: usize,
    /// Height assigned to every cell centre (mean waypoint height)
    floor_y: f64,
    walkable: Vec<bool>,
    costs: Vec<f64>,
}

impl SpatialGrid {
    /// Build an all-walkable grid covering every waypoint plus `margin`.
    ///
    /// # Panics
    /// Panics when `cell_size` is not a positive number; configurations are
    /// validated before they reach the grid.
    pub fn build(waypoints: &[Waypoint], cell_size: f64, margin: f64) -> Result<Self> {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell size must be positive, got {cell_size}"
        );
        if waypoints.is_empty() {
            return Err(PlanningError::EmptyGrid);
        }

        let mut min = Vec3::new(f64::INFINITY, 0.0, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY);
        let mut y_sum = 0.0;
        for waypoint in waypoints {
            let p = waypoint.position;
            min.x = min.x.min(p.x);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.z = max.z.max(p.z);
            y_sum += p.y;
        }
        let floor_y = y_sum / waypoints.len() as f64;
        let margin = margin.max(0.0);

        let origin = Vec3::new(min.x - margin, floor_y, min.z - margin);
        let size_x = (max.x - min.x) + 2.0 * margin;
        let size_z = (max.z - min.z) + 2.0 * margin;
        let width = ((size_x / cell_size).ceil() as usize).max(1);
        let height = ((size_z / cell_size).ceil() as usize).max(1);

        let cells = width.saturating_mul(height);
        if cells > MAX_GRID_CELLS {
            return Err(PlanningError::GridTooLarge { cells });
        }

        tracing::debug!(
            width,
            height,
            cell_size,
            "Built grid at ({:.2}, {:.2})",
            origin.x,
            origin.z
        );

        Ok(Self {
            origin,
            cell_size,
            width,
            height,
            floor_y,
            walkable: vec![true; cells],
            costs: vec![BASE_COST; cells],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn floor_y(&self) -> f64 {
        self.floor_y
    }

    pub fn cell_count(&self) -> usize {
        self.walkable.len()
    }

    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|&&w| w).count()
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as usize) < self.width && (cell.z as usize) < self.height
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.z as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    /// Out-of-bounds cells are never walkable.
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell).map(|i| self.walkable[i]).unwrap_or(false)
    }

    /// Traversal cost of a cell; infinite outside the grid.
    pub fn cost(&self, cell: CellCoord) -> f64 {
        self.index(cell).map(|i| self.costs[i]).unwrap_or(f64::INFINITY)
    }

    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) {
        if let Some(i) = self.index(cell) {
            self.walkable[i] = walkable;
        }
    }

    pub fn add_cost(&mut self, cell: CellCoord, extra: f64) {
        if let Some(i) = self.index(cell) {
            self.costs[i] += extra;
        }
    }

    /// Cell containing `position` (may lie outside the grid).
    pub fn world_to_cell(&self, position: Vec3) -> CellCoord {
        CellCoord::new(
            ((position.x - self.origin.x) / self.cell_size).floor() as i32,
            ((position.z - self.origin.z) / self.cell_size).floor() as i32,
        )
    }

    /// Centre of `cell` at floor height.
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec3 {
        Vec3::new(
            self.origin.x + (cell.x as f64 + 0.5) * self.cell_size,
            self.floor_y,
            self.origin.z + (cell.z as f64 + 0.5) * self.cell_size,
        )
    }

    pub fn clamp_cell(&self, cell: CellCoord) -> CellCoord {
        CellCoord::new(
            cell.x.clamp(0, self.width as i32 - 1),
            cell.z.clamp(0, self.height as i32 - 1),
        )
    }

    /// Block every cell whose centre lies within `radius` of `position`.
    ///
    /// The cell containing the obstacle is always blocked. Returns how many
    /// cells changed from walkable to blocked.
    pub fn mark_obstacle(&mut self, position: Vec3, radius: f64) -> usize {
        let radius = radius.max(0.0);
        let reach = Vec3::new(radius, 0.0, radius);
        let lo = self.clamp_cell(self.world_to_cell(position - reach));
        let hi = self.clamp_cell(self.world_to_cell(position + reach));

        let mut blocked = 0;
        for z in lo.z..=hi.z {
            for x in lo.x..=hi.x {
                let cell = CellCoord::new(x, z);
                if self.cell_to_world(cell).horizontal_distance(&position) <= radius
                    && self.block(cell)
                {
                    blocked += 1;
                }
            }
        }

        let home = self.world_to_cell(position);
        if self.contains(home) && self.block(home) {
            blocked += 1;
        }
        blocked
    }

    fn block(&mut self, cell: CellCoord) -> bool {
        match self.index(cell) {
            Some(i) if self.walkable[i] => {
                self.walkable[i] = false;
                true
            }
            _ => false,
        }
    }

    /// Stamp every Obstacle waypoint into the grid.
    pub fn mark_obstacles(&mut self, waypoints: &[Waypoint], default_radius: f64) -> usize {
        waypoints
            .iter()
            .filter(|wp| wp.is_obstacle())
            .map(|wp| self.mark_obstacle(wp.position, wp.clearance_radius(default_radius)))
            .sum()
    }

    /// Penalize walkable cells near blocked ones.
    ///
    /// Each walkable cell looks for the nearest blocked cell inside a square
    /// window of `padding` cells; at distance `d < padding` it gains
    /// `(1 - d / padding) * PROXIMITY_PENALTY`.
    pub fn apply_cost_gradient(&mut self, padding: usize) {
        if padding == 0 {
            return;
        }
        let p = padding as i32;
        let padding_f = padding as f64;
        let mut penalized = 0usize;

        for z in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let cell = CellCoord::new(x, z);
                if !self.is_walkable(cell) {
                    continue;
                }
                let mut nearest = f64::INFINITY;
                for dz in -p..=p {
                    for dx in -p..=p {
                        let other = cell.offset(dx, dz);
                        if self.contains(other) && !self.is_walkable(other) {
                            nearest = nearest.min(cell.distance(&other));
                        }
                    }
                }
                if nearest < padding_f {
                    self.add_cost(cell, (1.0 - nearest / padding_f) * PROXIMITY_PENALTY);
                    penalized += 1;
                }
            }
        }
        tracing::debug!(padding, penalized, "Applied obstacle cost gradient");
    }

    /// Fold probed surface slopes into walkability and cost.
    ///
    /// Returns the number of cells blocked for being too steep.
    pub fn apply_terrain_cost(
        &mut self,
        probe: &dyn EnvironmentProbe,
        max_slope_deg: f64,
        slope_weight: f64,
    ) -> usize {
        if max_slope_deg <= 0.0 {
            return 0;
        }
        let mut too_steep = 0;
        for z in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let cell = CellCoord::new(x, z);
                if !self.is_walkable(cell) {
                    continue;
                }
                let Some(slope) = probe.slope_at(self.cell_to_world(cell)) else {
                    continue;
                };
                let slope = slope.abs();
                if slope > max_slope_deg {
                    self.set_walkable(cell, false);
                    too_steep += 1;
                } else {
                    self.add_cost(cell, slope / max_slope_deg * slope_weight);
                }
            }
        }
        if too_steep > 0 {
            tracing::debug!(too_steep, max_slope_deg, "Blocked steep cells");
        }
        too_steep
    }

    /// Closest walkable cell to `cell` by 8-connected breadth-first search.
    ///
    /// Falls back to the (clamped) input cell when the grid has no walkable
    /// cell at all; callers must re-check walkability.
    pub fn nearest_walkable(&self, cell: CellCoord) -> CellCoord {
        let start = self.clamp_cell(cell);
        if self.is_walkable(start) {
            return start;
        }

        let mut visited = vec![false; self.cell_count()];
        let mut queue = VecDeque::new();
        if let Some(i) = self.index(start) {
            visited[i] = true;
        }
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for (dx, dz) in NEIGHBOR_OFFSETS {
                let next = current.offset(dx, dz);
                let Some(i) = self.index(next) else {
                    continue;
                };
                if visited[i] {
                    continue;
                }
                if self.walkable[i] {
                    return next;
                }
                visited[i] = true;
                queue.push_back(next);
            }
        }

        tracing::warn!("No walkable cell found near {}, keeping it", start);
        start
    }

    /// True when the straight segment stays on walkable cells.
    ///
    /// Samples every quarter cell, endpoints included.
    pub fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let step = self.cell_size * 0.25;
        let distance = from.horizontal_distance(&to);
        let samples = ((distance / step).ceil() as usize).max(1);
        (0..=samples).all(|i| {
            let t = i as f64 / samples as f64;
            self.is_walkable(self.world_to_cell(from.lerp(&to, t)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::FnProbe;

    fn two_point_grid() -> SpatialGrid {
        let waypoints = vec![
            Waypoint::start(Vec3::new(0.0, 0.0, 0.0)),
            Waypoint::end(Vec3::new(10.0, 0.0, 0.0)),
        ];
        SpatialGrid::build(&waypoints, 0.5, 5.0).unwrap()
    }

    #[test]
    fn build_covers_bounding_box_plus_margin() {
        let grid = two_point_grid();
        assert_eq!(grid.width(), 40);
        assert_eq!(grid.height(), 20);
        assert_eq!(grid.origin().x, -5.0);
        assert_eq!(grid.origin().z, -5.0);
        assert_eq!(grid.walkable_count(), 800);
        assert_eq!(grid.cost(CellCoord::new(3, 3)), BASE_COST);
    }

    #[test]
    fn build_rejects_empty_snapshot() {
        assert_eq!(
            SpatialGrid::build(&[], 0.5, 5.0).unwrap_err(),
            PlanningError::EmptyGrid
        );
    }

    #[test]
    fn floor_height_is_mean_waypoint_height() {
        let waypoints = vec![
            Waypoint::start(Vec3::new(0.0, 1.0, 0.0)),
            Waypoint::end(Vec3::new(4.0, 3.0, 4.0)),
        ];
        let grid = SpatialGrid::build(&waypoints, 1.0, 5.0).unwrap();
        assert_eq!(grid.floor_y(), 2.0);
        assert_eq!(grid.cell_to_world(CellCoord::new(0, 0)).y, 2.0);
    }

    #[test]
    fn cell_centre_maps_back_to_its_cell() {
        let grid = two_point_grid();
        let cell = CellCoord::new(12, 7);
        assert_eq!(grid.world_to_cell(grid.cell_to_world(cell)), cell);
        assert_eq!(grid.world_to_cell(Vec3::new(0.0, 0.0, 0.0)), CellCoord::new(10, 10));
    }

    #[test]
    fn mark_obstacle_blocks_disc_only() {
        let mut grid = two_point_grid();
        let centre = Vec3::new(5.0, 0.0, 0.0);
        let blocked = grid.mark_obstacle(centre, 1.0);
        assert!(blocked > 0);

        for z in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                let cell = CellCoord::new(x, z);
                let d = grid.cell_to_world(cell).horizontal_distance(&centre);
                if d <= 1.0 {
                    assert!(!grid.is_walkable(cell), "{cell} at {d} should be blocked");
                } else if d > 1.5 {
                    assert!(grid.is_walkable(cell), "{cell} at {d} should be open");
                }
            }
        }
    }

    #[test]
    fn zero_radius_obstacle_still_blocks_its_own_cell() {
        let mut grid = two_point_grid();
        let spot = Vec3::new(2.1, 0.0, 0.3);
        assert_eq!(grid.mark_obstacle(spot, 0.0), 1);
        assert!(!grid.is_walkable(grid.world_to_cell(spot)));
    }

    #[test]
    fn obstacle_waypoint_width_overrides_default_radius() {
        let waypoints = vec![
            Waypoint::start(Vec3::new(0.0, 0.0, 0.0)),
            Waypoint::end(Vec3::new(10.0, 0.0, 0.0)),
            Waypoint::obstacle(Vec3::new(5.0, 0.0, 0.0), 2.0),
        ];
        let mut grid = SpatialGrid::build(&waypoints, 0.5, 5.0).unwrap();
        grid.mark_obstacles(&waypoints, 0.5);
        let probe = grid.world_to_cell(Vec3::new(6.6, 0.0, 0.0));
        assert!(!grid.is_walkable(probe));
    }

    #[test]
    fn cost_gradient_fades_with_distance() {
        let mut grid = two_point_grid();
        let centre = grid.cell_to_world(CellCoord::new(20, 10));
        grid.mark_obstacle(centre, 0.0);
        grid.apply_cost_gradient(3);

        let next = grid.cost(CellCoord::new(21, 10));
        let two_away = grid.cost(CellCoord::new(22, 10));
        let far = grid.cost(CellCoord::new(30, 10));
        assert!((next - (BASE_COST + (1.0 - 1.0 / 3.0) * PROXIMITY_PENALTY)).abs() < 1e-9);
        assert!(two_away < next && two_away > BASE_COST);
        assert_eq!(far, BASE_COST);
        assert_eq!(grid.cost(CellCoord::new(23, 10)), BASE_COST);
    }

    #[test]
    fn steep_cells_become_unwalkable() {
        let mut grid = two_point_grid();
        let probe = FnProbe::new(
            |p: Vec3| if p.x > 8.0 { Some(45.0) } else { Some(15.0) },
            |_, _| true,
        );
        let blocked = grid.apply_terrain_cost(&probe, 30.0, 1.0);
        assert!(blocked > 0);
        assert!(!grid.is_walkable(grid.world_to_cell(Vec3::new(9.0, 0.0, 0.0))));
        let gentle = grid.world_to_cell(Vec3::new(2.0, 0.0, 0.0));
        assert!(grid.is_walkable(gentle));
        assert!((grid.cost(gentle) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn nearest_walkable_steps_out_of_obstacle() {
        let mut grid = two_point_grid();
        let centre = Vec3::new(5.0, 0.0, 0.0);
        grid.mark_obstacle(centre, 1.0);
        let inside = grid.world_to_cell(centre);
        let found = grid.nearest_walkable(inside);
        assert!(grid.is_walkable(found));
        assert!(found.distance(&inside) <= 3.0);
    }

    #[test]
    fn nearest_walkable_falls_back_when_everything_is_blocked() {
        let waypoints = vec![Waypoint::start(Vec3::ZERO)];
        let mut grid = SpatialGrid::build(&waypoints, 1.0, 1.0).unwrap();
        grid.mark_obstacle(Vec3::ZERO, 10.0);
        assert_eq!(grid.walkable_count(), 0);
        let cell = CellCoord::new(1, 1);
        assert_eq!(grid.nearest_walkable(cell), cell);
    }

    #[test]
    fn line_of_sight_is_cut_by_obstacles() {
        let mut grid = two_point_grid();
        grid.mark_obstacle(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(!grid.line_of_sight(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)));
        assert!(grid.line_of_sight(Vec3::new(0.0, 0.0, 3.0), Vec3::new(10.0, 0.0, 3.0)));
    }
}
