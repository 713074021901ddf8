#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first path search over the toroidal occupancy grid.

use std::collections::VecDeque;

use outbreak_core::{CellCoord, OccupancyView, Step};
use rand::{seq::SliceRandom, Rng};

/// Reusable breadth-first searcher that yields the first step of a shortest path.
///
/// Only obstacles block the search; cells holding humans or zombies are
/// traversable because those agents may have moved by the time the path is
/// walked. Neighbour order is shuffled for every expanded cell so equal-length
/// paths are chosen without directional bias.
#[derive(Debug, Default)]
pub struct PathFinder {
    queue: VecDeque<CellCoord>,
    visited: Vec<bool>,
    parents: Vec<Option<CellCoord>>,
}

impl PathFinder {
    /// Creates a path finder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the neighbour of `start` that begins a shortest path to `goal`.
    ///
    /// Yields `None` when `start == goal`, when the goal is an obstacle or when
    /// no path exists. The search expands at most `width × height` cells.
    pub fn shortest_first_step<R>(
        &mut self,
        occupancy: &OccupancyView<'_>,
        start: CellCoord,
        goal: CellCoord,
        rng: &mut R,
    ) -> Option<CellCoord>
    where
        R: Rng + ?Sized,
    {
        let size = occupancy.size();
        let start = size.wrap_cell(start);
        let goal = size.wrap_cell(goal);
        if start == goal {
            return None;
        }

        self.reset(size.cell_count());
        self.visited[size.index(start)] = true;
        self.queue.push_back(start);

        let budget = size.cell_count();
        let mut expanded = 0;
        let mut directions = Step::CARDINAL;

        while let Some(cell) = self.queue.pop_front() {
            if cell == goal {
                return self.first_step(occupancy, start, goal);
            }

            expanded += 1;
            if expanded > budget {
                break;
            }

            directions.shuffle(rng);
            for step in directions {
                let next = size.offset(cell, step);
                let index = size.index(next);
                if self.visited[index] || occupancy.is_obstacle(next) {
                    continue;
                }

                self.visited[index] = true;
                self.parents[index] = Some(cell);
                self.queue.push_back(next);
            }
        }

        None
    }

    fn reset(&mut self, cell_count: usize) {
        self.queue.clear();
        if self.visited.len() != cell_count {
            self.visited = vec![false; cell_count];
            self.parents = vec![None; cell_count];
        } else {
            self.visited.fill(false);
            self.parents.fill(None);
        }
    }

    fn first_step(
        &self,
        occupancy: &OccupancyView<'_>,
        start: CellCoord,
        goal: CellCoord,
    ) -> Option<CellCoord> {
        let size = occupancy.size();
        let mut cursor = goal;
        while let Some(parent) = self.parents[size.index(cursor)] {
            if parent == start {
                return Some(cursor);
            }
            cursor = parent;
        }
        None
    }
}
