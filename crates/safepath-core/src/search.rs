//! Grid search: weighted A* and Jump Point Search.
//!
//! Every search run is self-contained; open set, closed set and parent map
//! live on the stack of the call. Expansions are capped so a search on a
//! pathological map ends in `PlanningError::IterationLimit` instead of
//! stalling the guidance loop.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::SQRT_2;

use crate::error::{PlanningError, Result};
use crate::grid::{CellCoord, SpatialGrid, NEIGHBOR_OFFSETS};

/// Which search variant produced a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    AStar,
    JumpPoint,
}

/// Successful search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Start to goal, every consecutive pair 8-adjacent
    pub cells: Vec<CellCoord>,
    /// Nodes taken off the open set and expanded
    pub expanded: usize,
    /// Accumulated traversal cost
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    cell: CellCoord,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

/// Search engine bound to one grid.
pub struct PathSearch<'a> {
    grid: &'a SpatialGrid,
    max_iterations: usize,
}

impl<'a> PathSearch<'a> {
    pub fn new(grid: &'a SpatialGrid, max_iterations: usize) -> Self {
        Self {
            grid,
            max_iterations,
        }
    }

    /// Dispatch to the selected variant.
    pub fn run(
        &self,
        algorithm: SearchAlgorithm,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<SearchOutcome> {
        match algorithm {
            SearchAlgorithm::AStar => self.find_path(start, goal),
            SearchAlgorithm::JumpPoint => self.find_path_jps(start, goal),
        }
    }

    /// Weighted A* over the 8-connected grid.
    ///
    /// `F = G + H` with `H` the Euclidean cell distance and `G` accumulating
    /// `step_length * destination_cost`. Since every cost is at least 1 the
    /// heuristic is admissible and the returned path is cost-optimal.
    pub fn find_path(&self, start: CellCoord, goal: CellCoord) -> Result<SearchOutcome> {
        let (start, goal) = self.resolve_endpoints(start, goal)?;
        if start == goal {
            return Ok(SearchOutcome {
                cells: vec![start],
                expanded: 0,
                cost: 0.0,
            });
        }

        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        let mut closed_set: HashSet<CellCoord> = HashSet::new();
        let mut g_score: HashMap<CellCoord, f64> = HashMap::new();
        let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();

        g_score.insert(start, 0.0);
        open_set.push(Reverse(OpenNode {
            cell: start,
            g_score: FloatOrd(0.0),
            f_score: FloatOrd(start.distance(&goal)),
        }));

        let mut expanded = 0usize;

        while let Some(Reverse(current)) = open_set.pop() {
            if closed_set.contains(&current.cell) {
                continue;
            }
            let best_g = g_score
                .get(&current.cell)
                .copied()
                .unwrap_or(f64::INFINITY);
            if current.g_score.0 > best_g + 1e-9 {
                continue;
            }

            if current.cell == goal {
                let cells = reconstruct_steps(&came_from, goal);
                tracing::debug!(expanded, cost = best_g, len = cells.len(), "A* reached goal");
                return Ok(SearchOutcome {
                    cells,
                    expanded,
                    cost: best_g,
                });
            }

            if expanded >= self.max_iterations {
                tracing::warn!(limit = self.max_iterations, "A* iteration budget exhausted");
                return Err(PlanningError::IterationLimit {
                    limit: self.max_iterations,
                });
            }
            expanded += 1;
            closed_set.insert(current.cell);

            for (dx, dz) in NEIGHBOR_OFFSETS {
                if !self.can_step(current.cell, dx, dz) {
                    continue;
                }
                let next = current.cell.offset(dx, dz);
                if closed_set.contains(&next) {
                    continue;
                }
                let tentative_g = best_g + self.step_cost(next, dx, dz);
                if tentative_g < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(next, current.cell);
                    g_score.insert(next, tentative_g);
                    open_set.push(Reverse(OpenNode {
                        cell: next,
                        g_score: FloatOrd(tentative_g),
                        f_score: FloatOrd(tentative_g + next.distance(&goal)),
                    }));
                }
            }
        }

        tracing::warn!(expanded, "A* exhausted the open set");
        Err(PlanningError::NoPath { expanded })
    }

    /// Jump Point Search with a Manhattan heuristic.
    ///
    /// Each expansion jumps along every direction (except straight back)
    /// until the goal, a forced neighbour, or a wall. The returned cell chain
    /// is interpolated between jump points so it is step-by-step like A*.
    ///
    /// Not cost-optimal, even on uniform grids: Manhattan distance
    /// overestimates diagonal steps, so the route can be longer than the
    /// A* one. It finds a path whenever A* does.
    pub fn find_path_jps(&self, start: CellCoord, goal: CellCoord) -> Result<SearchOutcome> {
        let (start, goal) = self.resolve_endpoints(start, goal)?;
        if start == goal {
            return Ok(SearchOutcome {
                cells: vec![start],
                expanded: 0,
                cost: 0.0,
            });
        }

        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        let mut closed_set: HashSet<CellCoord> = HashSet::new();
        let mut g_score: HashMap<CellCoord, f64> = HashMap::new();
        let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
        let mut arrived_by: HashMap<CellCoord, (i32, i32)> = HashMap::new();

        g_score.insert(start, 0.0);
        open_set.push(Reverse(OpenNode {
            cell: start,
            g_score: FloatOrd(0.0),
            f_score: FloatOrd(start.manhattan(&goal)),
        }));

        let mut expanded = 0usize;

        while let Some(Reverse(current)) = open_set.pop() {
            if closed_set.contains(&current.cell) {
                continue;
            }
            let best_g = g_score
                .get(&current.cell)
                .copied()
                .unwrap_or(f64::INFINITY);
            if current.g_score.0 > best_g + 1e-9 {
                continue;
            }

            if current.cell == goal {
                let cells = interpolate_jumps(&came_from, goal);
                tracing::debug!(expanded, cost = best_g, len = cells.len(), "JPS reached goal");
                return Ok(SearchOutcome {
                    cells,
                    expanded,
                    cost: best_g,
                });
            }

            if expanded >= self.max_iterations {
                tracing::warn!(limit = self.max_iterations, "JPS iteration budget exhausted");
                return Err(PlanningError::IterationLimit {
                    limit: self.max_iterations,
                });
            }
            expanded += 1;
            closed_set.insert(current.cell);

            let reverse = arrived_by.get(&current.cell).map(|&(dx, dz)| (-dx, -dz));
            for (dx, dz) in NEIGHBOR_OFFSETS {
                if reverse == Some((dx, dz)) {
                    continue;
                }
                let Some((jump_point, jump_cost)) = self.jump(current.cell, dx, dz, goal) else {
                    continue;
                };
                if closed_set.contains(&jump_point) {
                    continue;
                }
                let tentative_g = best_g + jump_cost;
                if tentative_g < g_score.get(&jump_point).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(jump_point, current.cell);
                    arrived_by.insert(jump_point, (dx, dz));
                    g_score.insert(jump_point, tentative_g);
                    open_set.push(Reverse(OpenNode {
                        cell: jump_point,
                        g_score: FloatOrd(tentative_g),
                        f_score: FloatOrd(tentative_g + jump_point.manhattan(&goal)),
                    }));
                }
            }
        }

        tracing::warn!(expanded, "JPS exhausted the open set");
        Err(PlanningError::NoPath { expanded })
    }

    /// Snap unwalkable endpoints to the nearest walkable cell.
    fn resolve_endpoints(
        &self,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<(CellCoord, CellCoord)> {
        let resolve = |cell: CellCoord| {
            if self.grid.is_walkable(cell) {
                return Ok(cell);
            }
            let snapped = self.grid.nearest_walkable(cell);
            if self.grid.is_walkable(snapped) {
                tracing::debug!("Snapped {} to walkable {}", cell, snapped);
                Ok(snapped)
            } else {
                Err(PlanningError::UnreachableTarget { cell })
            }
        };
        Ok((resolve(start)?, resolve(goal)?))
    }

    /// One step from `from` by `(dx, dz)` lands on a walkable cell, and a
    /// diagonal step does not squeeze between two blocked cells.
    fn can_step(&self, from: CellCoord, dx: i32, dz: i32) -> bool {
        if !self.grid.is_walkable(from.offset(dx, dz)) {
            return false;
        }
        if dx != 0 && dz != 0 {
            return self.grid.is_walkable(from.offset(dx, 0))
                || self.grid.is_walkable(from.offset(0, dz));
        }
        true
    }

    fn step_cost(&self, to: CellCoord, dx: i32, dz: i32) -> f64 {
        let length = if dx != 0 && dz != 0 { SQRT_2 } else { 1.0 };
        length * self.grid.cost(to)
    }

    /// Walk from `from` in a fixed direction until a jump point.
    ///
    /// Returns the jump point and the cost accumulated on the way. The walk
    /// is a plain loop; it moves one cell per iteration in a fixed direction
    /// and stops at the grid edge, so it always terminates.
    fn jump(&self, from: CellCoord, dx: i32, dz: i32, goal: CellCoord) -> Option<(CellCoord, f64)> {
        let diagonal = dx != 0 && dz != 0;
        let mut current = from;
        let mut cost = 0.0;

        loop {
            if !self.can_step(current, dx, dz) {
                return None;
            }
            let next = current.offset(dx, dz);
            cost += self.step_cost(next, dx, dz);

            if next == goal || self.has_forced_neighbor(next, dx, dz) {
                return Some((next, cost));
            }
            if diagonal
                && (self.jump(next, dx, 0, goal).is_some() || self.jump(next, 0, dz, goal).is_some())
            {
                return Some((next, cost));
            }
            current = next;
        }
    }

    /// A neighbour of `cell` that only becomes reachable (or optimal) through
    /// `cell` because an adjacent cell is blocked.
    fn has_forced_neighbor(&self, cell: CellCoord, dx: i32, dz: i32) -> bool {
        let open = |ox: i32, oz: i32| self.grid.is_walkable(cell.offset(ox, oz));

        if dx != 0 && dz != 0 {
            (!open(-dx, 0) && open(-dx, dz)) || (!open(0, -dz) && open(dx, -dz))
        } else if dx != 0 {
            [1, -1].into_iter().any(|side| {
                (!open(-dx, side) && open(0, side)) || (!open(0, side) && open(dx, side))
            })
        } else {
            [1, -1].into_iter().any(|side| {
                (!open(side, -dz) && open(side, 0)) || (!open(side, 0) && open(side, dz))
            })
        }
    }
}

fn reconstruct_steps(came_from: &HashMap<CellCoord, CellCoord>, goal: CellCoord) -> Vec<CellCoord> {
    let mut cells = vec![goal];
    let mut current = goal;
    while let Some(&parent) = came_from.get(&current) {
        cells.push(parent);
        current = parent;
    }
    cells.reverse();
    cells
}

/// Expand a chain of jump points into single steps.
fn interpolate_jumps(came_from: &HashMap<CellCoord, CellCoord>, goal: CellCoord) -> Vec<CellCoord> {
    let jump_points = reconstruct_steps(came_from, goal);
    let mut cells = Vec::with_capacity(jump_points.len() * 4);
    let Some(&first) = jump_points.first() else {
        return cells;
    };
    cells.push(first);

    for pair in jump_points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let step_x = (to.x - from.x).signum();
        let step_z = (to.z - from.z).signum();
        let mut current = from;
        while current != to {
            let dx = if current.x != to.x { step_x } else { 0 };
            let dz = if current.z != to.z { step_z } else { 0 };
            current = current.offset(dx, dz);
            cells.push(current);
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Waypoint;
    use crate::spatial::Vec3;

    /// `n` x `n` grid of 1m cells with origin at (0, 0).
    fn open_grid(n: usize) -> SpatialGrid {
        let far = n as f64;
        let waypoints = vec![
            Waypoint::start(Vec3::new(0.0, 0.0, 0.0)),
            Waypoint::end(Vec3::new(far, 0.0, far)),
        ];
        SpatialGrid::build(&waypoints, 1.0, 0.0).unwrap()
    }

    /// Vertical wall at `x` with a gap in the top two rows.
    fn walled_grid() -> SpatialGrid {
        let mut grid = open_grid(20);
        for z in 0..18 {
            grid.set_walkable(CellCoord::new(10, z), false);
        }
        grid
    }

    fn assert_valid(grid: &SpatialGrid, outcome: &SearchOutcome, start: CellCoord, goal: CellCoord) {
        assert_eq!(outcome.cells.first(), Some(&start));
        assert_eq!(outcome.cells.last(), Some(&goal));
        for cell in &outcome.cells {
            assert!(grid.is_walkable(*cell), "stepped on blocked {cell}");
        }
        for pair in outcome.cells.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]), "{} -> {} is not a step", pair[0], pair[1]);
        }
    }

    #[test]
    fn straight_corridor_costs_its_length() {
        let grid = open_grid(20);
        let search = PathSearch::new(&grid, 1000);
        let start = CellCoord::new(0, 5);
        let goal = CellCoord::new(15, 5);
        let outcome = search.find_path(start, goal).unwrap();
        assert_valid(&grid, &outcome, start, goal);
        assert_eq!(outcome.cells.len(), 16);
        assert!((outcome.cost - 15.0).abs() < 1e-9);
    }

    #[test]
    fn astar_cost_is_octile_optimal_on_open_floor() {
        let grid = open_grid(20);
        let search = PathSearch::new(&grid, 1000);
        let outcome = search
            .find_path(CellCoord::new(2, 2), CellCoord::new(5, 6))
            .unwrap();
        assert!((outcome.cost - (3.0 * SQRT_2 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn astar_prefers_cheaper_cells() {
        let mut grid = open_grid(20);
        for x in 3..8 {
            grid.add_cost(CellCoord::new(x, 5), 10.0);
        }
        let search = PathSearch::new(&grid, 1000);
        let outcome = search
            .find_path(CellCoord::new(2, 5), CellCoord::new(8, 5))
            .unwrap();
        assert!(outcome.cells[1..outcome.cells.len() - 1]
            .iter()
            .all(|c| c.z != 5));
        assert!(outcome.cost < 6.0 + 10.0);
    }

    #[test]
    fn astar_detours_through_gap() {
        let grid = walled_grid();
        let search = PathSearch::new(&grid, 5000);
        let start = CellCoord::new(2, 2);
        let goal = CellCoord::new(17, 2);
        let outcome = search.find_path(start, goal).unwrap();
        assert_valid(&grid, &outcome, start, goal);
        assert!(outcome.cells.iter().any(|c| c.x == 10 && c.z >= 18));
    }

    #[test]
    fn blocked_endpoints_are_snapped() {
        let mut grid = open_grid(20);
        let start = CellCoord::new(4, 4);
        grid.set_walkable(start, false);
        let search = PathSearch::new(&grid, 1000);
        let outcome = search.find_path(start, CellCoord::new(12, 4)).unwrap();
        let first = outcome.cells[0];
        assert_ne!(first, start);
        assert!(first.is_adjacent(&start));
    }

    #[test]
    fn sealed_wall_means_no_path() {
        let mut grid = open_grid(20);
        for z in 0..20 {
            grid.set_walkable(CellCoord::new(10, z), false);
        }
        let search = PathSearch::new(&grid, 100_000);
        let err = search
            .find_path(CellCoord::new(2, 2), CellCoord::new(17, 2))
            .unwrap_err();
        assert!(matches!(err, PlanningError::NoPath { .. }));

        let err = search
            .find_path_jps(CellCoord::new(2, 2), CellCoord::new(17, 2))
            .unwrap_err();
        assert!(matches!(err, PlanningError::NoPath { .. }));
    }

    #[test]
    fn fully_blocked_grid_is_unreachable() {
        let mut grid = open_grid(4);
        for z in 0..4 {
            for x in 0..4 {
                grid.set_walkable(CellCoord::new(x, z), false);
            }
        }
        let search = PathSearch::new(&grid, 1000);
        let err = search
            .find_path(CellCoord::new(0, 0), CellCoord::new(3, 3))
            .unwrap_err();
        assert!(matches!(err, PlanningError::UnreachableTarget { .. }));
    }

    #[test]
    fn iteration_budget_is_a_failure_not_a_partial_path() {
        let grid = walled_grid();
        let search = PathSearch::new(&grid, 5);
        let err = search
            .find_path(CellCoord::new(2, 2), CellCoord::new(17, 2))
            .unwrap_err();
        assert_eq!(err, PlanningError::IterationLimit { limit: 5 });
    }

    #[test]
    fn start_equal_goal_is_trivial() {
        let grid = open_grid(5);
        let search = PathSearch::new(&grid, 10);
        let cell = CellCoord::new(2, 2);
        let outcome = search.find_path_jps(cell, cell).unwrap();
        assert_eq!(outcome.cells, vec![cell]);
        assert_eq!(outcome.expanded, 0);
    }

    #[test]
    fn jps_detours_through_gap() {
        let grid = walled_grid();
        let search = PathSearch::new(&grid, 5000);
        let start = CellCoord::new(2, 2);
        let goal = CellCoord::new(17, 2);
        let outcome = search.find_path_jps(start, goal).unwrap();
        assert_valid(&grid, &outcome, start, goal);
    }

    #[test]
    fn jps_expands_fewer_nodes_on_open_floor() {
        let grid = open_grid(20);
        let search = PathSearch::new(&grid, 5000);
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(19, 19);
        let astar = search.find_path(start, goal).unwrap();
        let jps = search.find_path_jps(start, goal).unwrap();
        assert_valid(&grid, &jps, start, goal);
        assert!(jps.expanded < astar.expanded);
        assert!(jps.cost >= astar.cost - 1e-9);
    }

    #[test]
    fn run_dispatches_by_algorithm() {
        let grid = open_grid(10);
        let search = PathSearch::new(&grid, 1000);
        let start = CellCoord::new(1, 1);
        let goal = CellCoord::new(8, 3);
        let a = search.run(SearchAlgorithm::AStar, start, goal).unwrap();
        let j = search.run(SearchAlgorithm::JumpPoint, start, goal).unwrap();
        assert_valid(&grid, &a, start, goal);
        assert_valid(&grid, &j, start, goal);
    }
}
