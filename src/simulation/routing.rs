//! Tile-level route planning
//!
//! Strategic routing is the AI's job, not the tick engine's; this helper
//! exists for demo brains and tests that need a legal tile route. It builds
//! a directed graph over drivable tiles and runs A* with a Manhattan
//! heuristic.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::map::GameMap;
use super::types::{Direction, TilePoint};

pub struct RouteGraph {
    graph: DiGraph<TilePoint, u32>,
    node_of: HashMap<TilePoint, NodeIndex>,
}

impl RouteGraph {
    /// Build the routing graph for a map: one node per drivable tile, one
    /// edge per open side.
    pub fn build(map: &GameMap) -> Self {
        let mut graph = DiGraph::new();
        let mut node_of = HashMap::new();

        for tile in map.tiles() {
            if map.is_drivable(tile) {
                let idx = graph.add_node(tile);
                node_of.insert(tile, idx);
            }
        }

        for (&tile, &idx) in &node_of {
            let Some(sq) = map.square(tile) else { continue };
            for dir in Direction::ALL {
                if !sq.open.contains(dir) {
                    continue;
                }
                if let Some(&next) = node_of.get(&tile.neighbor(dir)) {
                    graph.add_edge(idx, next, 1);
                }
            }
        }

        Self { graph, node_of }
    }

    /// A tile-by-tile route from `from` to `to`, both inclusive.
    pub fn find_route(&self, from: TilePoint, to: TilePoint) -> Option<Vec<TilePoint>> {
        let start = *self.node_of.get(&from)?;
        let goal = *self.node_of.get(&to)?;
        let (_, path) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| *e.weight(),
            |n| {
                let t = self.graph[n];
                ((t.x - to.x).abs() + (t.y - to.y).abs()) as u32
            },
        )?;
        Some(path.into_iter().map(|n| self.graph[n]).collect())
    }
}
