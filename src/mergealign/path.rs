use log::{debug, trace};

use super::{
    graph::{ConsensusGraph, Edge, NodeId},
    Coordinates,
};
use crate::error::{ConsensusError, Result};

/// The best-supported way of reaching a node, as chosen by [`score_nodes`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathState {
    /// Number of edges from the origin.
    pub length: usize,
    /// Sum of the edge counts from the origin.
    pub score: usize,
    pub predecessor: Option<Edge>,
}

impl PathState {
    pub fn average(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            self.score as f64 / self.length as f64
        }
    }
}

/// The chosen path without the origin, with the support of each of its transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusPath {
    pub columns: Vec<Coordinates>,
    /// Edge count of the transition into each column divided by the number of alignments.
    pub confidences: Vec<f64>,
}

/// Computes a [`PathState`] for every node, indexed by node id.
///
/// Nodes are visited in lexicographic order of their coordinates.
/// Each node greedily takes the predecessor maximising `edge count + predecessor average`,
/// the first discovered predecessor wins ties.
/// This is a local rule and does not necessarily find the path with the best overall average.
pub fn score_nodes(graph: &ConsensusGraph) -> Vec<PathState> {
    let mut states = vec![PathState::default(); graph.len()];
    let order = graph.topological_order();
    debug_assert!(graph.node(order[0]).coordinates.is_origin());

    for id in order {
        let node = graph.node(id);

        let mut best: Option<(Edge, f64)> = None;
        for edge in &node.predecessors {
            let support = edge.count as f64 + states[edge.predecessor].average();
            if best.map_or(true, |(_, best_support)| support > best_support) {
                best = Some((*edge, support));
            }
        }

        let Some((edge, _)) = best else {
            continue;
        };
        let predecessor = states[edge.predecessor];
        states[id] = PathState {
            length: predecessor.length + 1,
            score: predecessor.score + edge.count,
            predecessor: Some(edge),
        };
        trace!(
            "Node {} takes {} with average {:.3}",
            node.coordinates,
            edge,
            states[id].average()
        );
    }

    states
}

/// Follows the chosen predecessors from the lexicographically greatest node back to the origin.
pub fn backtrack(graph: &ConsensusGraph, states: &[PathState]) -> Result<ConsensusPath> {
    let terminal = (0..graph.len())
        .max_by(|a, b| graph.node(*a).coordinates.cmp(&graph.node(*b).coordinates))
        .unwrap_or(ConsensusGraph::ORIGIN);
    let broken = || ConsensusError::BrokenBacktrack {
        terminal: graph.node(terminal).coordinates.to_string(),
    };

    let mut columns = Vec::new();
    let mut confidences = Vec::new();
    let mut current: NodeId = terminal;

    while current != ConsensusGraph::ORIGIN {
        if columns.len() >= graph.len() {
            return Err(broken());
        }

        let edge = states[current].predecessor.ok_or_else(broken)?;
        columns.push(graph.node(current).coordinates.clone());
        confidences.push(edge.count as f64 / graph.alignment_amount() as f64);
        current = edge.predecessor;
    }

    columns.reverse();
    confidences.reverse();
    debug!("Best path has {} columns", columns.len());

    Ok(ConsensusPath {
        columns,
        confidences,
    })
}

pub fn best_path(graph: &ConsensusGraph) -> Result<ConsensusPath> {
    let states = score_nodes(graph);
    backtrack(graph, &states)
}
