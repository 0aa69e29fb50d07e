//! Grid-backed walkable surface.
//!
//! `GridSurface` rasterises the room floor into square cells, carves the
//! footprints of solid furniture out of it, and plans paths with a BFS over
//! the walkable cells (8-connected, no corner cutting). Paths stay pending
//! for a configurable number of ticks to model asynchronous planning.

use std::collections::{HashMap, VecDeque};

use crate::config::SurfaceConfig;
use crate::error::{BuildError, NavError};
use crate::geometry::{Rect, Vec2};
use crate::surface::{NavSurface, PathHandle, RebuildableSurface};

const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[derive(Debug, Clone)]
struct PlannedPath {
    waypoints: Vec<Vec2>,
    next: usize,
    pending_ticks: u32,
    position: Vec2,
}

impl PlannedPath {
    fn remaining(&self) -> f32 {
        let mut total = 0.0;
        let mut from = self.position;
        for point in &self.waypoints[self.next.min(self.waypoints.len())..] {
            total += from.distance(point);
            from = *point;
        }
        total
    }
}

/// Walkable floor rasterised into cells.
#[derive(Debug, Clone)]
pub struct GridSurface {
    bounds: Rect,
    cell_size: f32,
    cols: usize,
    rows: usize,
    blocked: Vec<bool>,
    stopping_distance: f32,
    planning_delay_ticks: u32,
    paths: HashMap<u64, PlannedPath>,
    next_handle: u64,
    generation: u64,
    injected_failures: u32,
}

impl GridSurface {
    /// Build an open surface (no obstacles) from config.
    pub fn new(config: &SurfaceConfig) -> Result<Self, BuildError> {
        let bounds = Rect::new(Vec2::ZERO, Vec2::new(config.width, config.depth));
        Self::with_bounds(
            bounds,
            config.cell_size,
            config.stopping_distance,
            config.planning_delay_ticks,
        )
    }

    pub fn with_bounds(
        bounds: Rect,
        cell_size: f32,
        stopping_distance: f32,
        planning_delay_ticks: u32,
    ) -> Result<Self, BuildError> {
        if bounds.is_empty() {
            return Err(BuildError::EmptySurface);
        }
        if cell_size.is_nan() || cell_size <= 0.0 {
            return Err(BuildError::InvalidCellSize(cell_size));
        }
        let cols = (bounds.width() / cell_size).ceil().max(1.0) as usize;
        let rows = (bounds.depth() / cell_size).ceil().max(1.0) as usize;
        Ok(Self {
            bounds,
            cell_size,
            cols,
            rows,
            blocked: vec![false; cols * rows],
            stopping_distance,
            planning_delay_ticks,
            paths: HashMap::new(),
            next_handle: 1,
            generation: 0,
            injected_failures: 0,
        })
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of completed rebuilds.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of carved cells.
    pub fn blocked_cells(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }

    /// Number of live path handles.
    pub fn active_paths(&self) -> usize {
        self.paths.len()
    }

    /// Make the next `count` rebuilds fail.
    pub fn inject_build_failures(&mut self, count: u32) {
        self.injected_failures = count;
    }

    /// Whether the cell containing `point` is carved.
    pub fn is_blocked(&self, point: Vec2) -> bool {
        match self.cell_of(point) {
            Some(cell) => self.blocked[cell],
            None => true,
        }
    }

    fn cell_of(&self, point: Vec2) -> Option<usize> {
        if !self.bounds.contains(&point) {
            return None;
        }
        let col = (((point.x - self.bounds.min.x) / self.cell_size) as usize).min(self.cols - 1);
        let row = (((point.y - self.bounds.min.y) / self.cell_size) as usize).min(self.rows - 1);
        Some(row * self.cols + col)
    }

    fn cell_center(&self, cell: usize) -> Vec2 {
        let col = cell % self.cols;
        let row = cell / self.cols;
        Vec2::new(
            self.bounds.min.x + (col as f32 + 0.5) * self.cell_size,
            self.bounds.min.y + (row as f32 + 0.5) * self.cell_size,
        )
    }

    fn cell_rect(&self, cell: usize) -> Rect {
        Rect::centered(self.cell_center(cell), self.cell_size, self.cell_size)
    }

    fn walkable(&self, col: i32, row: i32) -> bool {
        col >= 0
            && row >= 0
            && (col as usize) < self.cols
            && (row as usize) < self.rows
            && !self.blocked[row as usize * self.cols + col as usize]
    }

    /// Nearest walkable cell to `point` within `max_distance`.
    fn nearest_walkable_cell(&self, point: Vec2, max_distance: f32) -> Option<usize> {
        let clamped = self.bounds.clamp(point);
        let origin = self.cell_of(clamped)?;
        if !self.blocked[origin] && point.distance(&clamped) <= max_distance {
            return Some(origin);
        }

        let max_ring = ((max_distance / self.cell_size).ceil() as usize + 1).min(self.cols.max(self.rows));
        let ocol = (origin % self.cols) as i32;
        let orow = (origin / self.cols) as i32;
        let mut best: Option<(usize, f32)> = None;

        for ring in 1..=max_ring as i32 {
            for dr in -ring..=ring {
                for dc in -ring..=ring {
                    if dr.abs() != ring && dc.abs() != ring {
                        continue;
                    }
                    let (col, row) = (ocol + dc, orow + dr);
                    if !self.walkable(col, row) {
                        continue;
                    }
                    let cell = row as usize * self.cols + col as usize;
                    let distance = self.cell_center(cell).distance(&point);
                    if distance <= max_distance && best.map_or(true, |(_, d)| distance < d) {
                        best = Some((cell, distance));
                    }
                }
            }
            // Outer rings are at least this far away
            if best.is_some() && ring as f32 * self.cell_size > best.map_or(0.0, |(_, d)| d) {
                break;
            }
        }

        best.map(|(cell, _)| cell)
    }

    fn bfs(&self, start: usize, goal: usize) -> Option<Vec<usize>> {
        if start == goal {
            return Some(vec![goal]);
        }
        let mut came_from: Vec<Option<usize>> = vec![None; self.blocked.len()];
        let mut visited = vec![false; self.blocked.len()];
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let col = (current % self.cols) as i32;
            let row = (current / self.cols) as i32;
            for &(dc, dr) in &NEIGHBORS {
                let (ncol, nrow) = (col + dc, row + dr);
                if !self.walkable(ncol, nrow) {
                    continue;
                }
                // No squeezing diagonally between two carved cells
                if dc != 0 && dr != 0 && (!self.walkable(col + dc, row) || !self.walkable(col, row + dr)) {
                    continue;
                }
                let next = nrow as usize * self.cols + ncol as usize;
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                came_from[next] = Some(current);
                if next == goal {
                    let mut path = vec![goal];
                    let mut node = goal;
                    while let Some(prev) = came_from[node] {
                        if prev == start {
                            break;
                        }
                        path.push(prev);
                        node = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Drop intermediate cells that continue in the same direction.
    fn simplify(&self, cells: &[usize]) -> Vec<Vec2> {
        let points: Vec<Vec2> = cells.iter().map(|c| self.cell_center(*c)).collect();
        if points.len() <= 2 {
            return points;
        }
        let mut result = vec![points[0]];
        for window in points.windows(3) {
            let a = (window[1] - window[0]).normalize();
            let b = (window[2] - window[1]).normalize();
            if (a - b).length() > 1e-3 {
                result.push(window[1]);
            }
        }
        result.push(points[points.len() - 1]);
        result
    }
}

impl NavSurface for GridSurface {
    fn plan_path(&mut self, from: Vec2, to: Vec2) -> Result<PathHandle, NavError> {
        if !self.is_on_surface(from) {
            return Err(NavError::NotOnSurface);
        }
        let start = self
            .nearest_walkable_cell(from, self.cell_size * 2.0)
            .ok_or(NavError::NotOnSurface)?;
        let search = self.bounds.width().max(self.bounds.depth());
        let goal = self
            .nearest_walkable_cell(to, search)
            .ok_or(NavError::Unreachable { x: to.x, y: to.y })?;
        let cells = self
            .bfs(start, goal)
            .ok_or(NavError::Unreachable { x: to.x, y: to.y })?;

        let mut waypoints = self.simplify(&cells);
        // Finish on the requested point when it is itself walkable
        let end = if self.blocked[goal] || self.cell_of(to) != Some(goal) {
            self.cell_center(goal)
        } else {
            to
        };
        if let Some(last) = waypoints.last_mut() {
            *last = end;
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.paths.insert(
            handle,
            PlannedPath {
                waypoints,
                next: 0,
                pending_ticks: self.planning_delay_ticks,
                position: from,
            },
        );
        Ok(PathHandle(handle))
    }

    fn is_pending(&self, handle: PathHandle) -> bool {
        self.paths
            .get(&handle.0)
            .map_or(false, |p| p.pending_ticks > 0)
    }

    fn remaining_distance(&self, handle: PathHandle) -> f32 {
        self.paths
            .get(&handle.0)
            .map_or(f32::INFINITY, PlannedPath::remaining)
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn steer(&mut self, handle: PathHandle, position: Vec2, speed: f32, dt: f32) -> Vec2 {
        let Some(path) = self.paths.get_mut(&handle.0) else {
            return position;
        };
        if path.pending_ticks > 0 {
            path.pending_ticks -= 1;
            path.position = position;
            return position;
        }

        let mut budget = (speed * dt).max(0.0);
        let mut current = position;
        while budget > 0.0 && path.next < path.waypoints.len() {
            let target = path.waypoints[path.next];
            let distance = current.distance(&target);
            if distance <= budget {
                current = target;
                budget -= distance;
                path.next += 1;
            } else {
                current = current.move_towards(target, budget);
                budget = 0.0;
            }
        }
        path.position = current;
        current
    }

    fn release(&mut self, handle: PathHandle) {
        self.paths.remove(&handle.0);
    }

    fn is_on_surface(&self, position: Vec2) -> bool {
        self.bounds.contains(&position)
            && self
                .nearest_walkable_cell(position, self.cell_size * 2.0)
                .is_some()
    }

    fn sample_position(&self, near: Vec2, max_distance: f32) -> Option<Vec2> {
        let cell = self.nearest_walkable_cell(near, max_distance)?;
        if self.cell_of(near) == Some(cell) {
            Some(near)
        } else {
            Some(self.cell_center(cell))
        }
    }
}

impl RebuildableSurface for GridSurface {
    fn rebuild(&mut self, carved: &[Rect]) -> Result<(), BuildError> {
        if self.injected_failures > 0 {
            self.injected_failures -= 1;
            return Err(BuildError::Injected("surface builder rejected the scene".to_string()));
        }

        let mut blocked = vec![false; self.cols * self.rows];
        for (cell, slot) in blocked.iter_mut().enumerate() {
            let rect = self.cell_rect(cell);
            *slot = carved.iter().any(|hole| hole.intersects(&rect));
        }
        if blocked.iter().all(|b| *b) {
            return Err(BuildError::FullyBlocked);
        }

        self.blocked = blocked;
        self.paths.clear();
        self.generation += 1;
        Ok(())
    }
}
