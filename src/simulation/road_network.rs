//! Road network graph for pathfinding
//!
//! Adjacency graph over the driveable cells of a `SimGrid`. Every road cell
//! costs the same to traverse, so routes are found with a breadth-first
//! search bounded by an expansion budget.

use log::debug;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, VecDeque};

use super::grid::SimGrid;
use super::types::{CellCoord, Heading};

/// Node expansions allowed for one path query before giving up
pub const PATH_EXPANSION_BUDGET: usize = 600;

/// Road graph over grid cells, rebuilt in full on every layout change
#[derive(Default)]
pub struct SimRoadNetwork {
    /// Undirected graph: one node per driveable cell, one edge per pair of
    /// orthogonally adjacent driveable cells
    graph: UnGraph<CellCoord, ()>,

    /// Maps cells to their node indices in the graph
    cell_to_node: HashMap<CellCoord, NodeIndex>,

    /// Cached path results, including misses
    path_cache: HashMap<(CellCoord, CellCoord), Option<Vec<CellCoord>>>,
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grid(grid: &SimGrid) -> Self {
        let mut network = Self::new();
        network.rebuild(grid);
        network
    }

    /// Replace the whole graph with the adjacency of `grid`
    pub fn rebuild(&mut self, grid: &SimGrid) {
        self.graph.clear();
        self.cell_to_node.clear();
        self.path_cache.clear();

        for cell in grid.driveable_cells() {
            let node = self.graph.add_node(cell);
            self.cell_to_node.insert(cell, node);
        }

        // East and south neighbors are enough to visit every adjacent pair once
        for cell in grid.driveable_cells() {
            let node = self.cell_to_node[&cell];
            for heading in [Heading::East, Heading::South] {
                if let Some(&other) = self.cell_to_node.get(&cell.step(heading)) {
                    self.graph.add_edge(node, other, ());
                }
            }
        }

        debug!(
            "Road network rebuilt: {} cells, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cell_to_node.contains_key(&cell)
    }

    /// Driveable cells joined to `cell` by an edge
    pub fn neighbors(&self, cell: CellCoord) -> Vec<CellCoord> {
        self.cell_to_node
            .get(&cell)
            .map(|node| {
                self.graph
                    .neighbors(*node)
                    .map(|n| self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_edge(&self, a: CellCoord, b: CellCoord) -> bool {
        match (self.cell_to_node.get(&a), self.cell_to_node.get(&b)) {
            (Some(na), Some(nb)) => self.graph.find_edge(*na, *nb).is_some(),
            _ => false,
        }
    }

    /// Finds a route from `start` to `goal` (both included) with the default
    /// expansion budget
    pub fn find_path(&mut self, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
        if let Some(cached) = self.path_cache.get(&(start, goal)) {
            return cached.clone();
        }

        let result = self.find_path_with_budget(start, goal, PATH_EXPANSION_BUDGET);
        self.path_cache.insert((start, goal), result.clone());
        result
    }

    /// Breadth-first search that gives up after `budget` node expansions
    pub fn find_path_with_budget(
        &self,
        start: CellCoord,
        goal: CellCoord,
        budget: usize,
    ) -> Option<Vec<CellCoord>> {
        let start_node = *self.cell_to_node.get(&start)?;
        let goal_node = *self.cell_to_node.get(&goal)?;

        if start_node == goal_node {
            return Some(vec![start]);
        }

        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start_node]);
        let mut expansions = 0;

        while let Some(node) = queue.pop_front() {
            expansions += 1;
            if expansions > budget {
                debug!("Path search {:?} -> {:?} exceeded budget", start, goal);
                return None;
            }

            for next in self.graph.neighbors(node) {
                if next == start_node || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, node);

                if next == goal_node {
                    let mut path = vec![self.graph[goal_node]];
                    let mut current = goal_node;
                    while let Some(&previous) = came_from.get(&current) {
                        path.push(self.graph[previous]);
                        current = previous;
                    }
                    path.reverse();
                    return Some(path);
                }

                queue.push_back(next);
            }
        }

        None
    }

    /// Get number of driveable cells
    pub fn cell_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of adjacency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
