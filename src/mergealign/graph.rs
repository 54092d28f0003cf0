use log::debug;
use rustc_hash::FxHashMap as HashMap;

use super::Coordinates;
use crate::error::{ConsensusError, Result};

pub type NodeId = usize;

/// An edge into a node, counting the alignments that contain the transition.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Edge {
    pub predecessor: NodeId,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub coordinates: Coordinates,
    /// Ordered by first discovery.
    pub predecessors: Vec<Edge>,
}

/// The union of the column sequences of all alignments.
///
/// Nodes are stored in an arena indexed by the order they were first seen, the origin is always node zero.
#[derive(Debug)]
pub struct ConsensusGraph {
    dimensions: usize,
    alignment_amount: usize,
    nodes: Vec<Node>,
    index: HashMap<Coordinates, NodeId>,
}

impl ConsensusGraph {
    pub const ORIGIN: NodeId = 0;

    pub fn new(dimensions: usize, alignment_amount: usize) -> Self {
        let origin = Coordinates::origin(dimensions);
        let mut index = HashMap::default();
        index.insert(origin.clone(), Self::ORIGIN);

        Self {
            dimensions,
            alignment_amount,
            nodes: vec![Node {
                coordinates: origin,
                predecessors: Vec::new(),
            }],
            index,
        }
    }

    /// Adds the column sequence of one alignment, starting from the origin.
    ///
    /// Columns that do not advance any sequence are skipped.
    pub fn add_alignment(&mut self, name: &str, columns: &[Coordinates]) -> Result<()> {
        let mut previous = Self::ORIGIN;
        let mut added_columns = 0;

        for coordinates in columns {
            if coordinates.dimensions() != self.dimensions {
                return Err(ConsensusError::DimensionMismatch {
                    coordinates: coordinates.to_string(),
                    expected: self.dimensions,
                    found: coordinates.dimensions(),
                });
            }

            let previous_coordinates = &self.nodes[previous].coordinates;
            if previous_coordinates == coordinates {
                debug!("Skipping gap-only column after {coordinates} in alignment {name}");
                continue;
            }
            if !previous_coordinates.precedes(coordinates) {
                return Err(ConsensusError::NonMonotoneStep {
                    from: previous_coordinates.to_string(),
                    to: coordinates.to_string(),
                });
            }

            let current = self.insert_node(coordinates);
            self.add_edge(previous, current);
            previous = current;
            added_columns += 1;
        }

        if added_columns == 0 {
            return Err(ConsensusError::EmptyAlignment {
                alignment: name.to_string(),
            });
        }

        Ok(())
    }

    fn insert_node(&mut self, coordinates: &Coordinates) -> NodeId {
        if let Some(id) = self.node_id(coordinates) {
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            coordinates: coordinates.clone(),
            predecessors: Vec::new(),
        });
        self.index.insert(coordinates.clone(), id);
        id
    }

    fn add_edge(&mut self, predecessor: NodeId, node: NodeId) {
        let predecessors = &mut self.nodes[node].predecessors;

        if let Some(edge) = predecessors
            .iter_mut()
            .find(|edge| edge.predecessor == predecessor)
        {
            edge.count += 1;
        } else {
            predecessors.push(Edge {
                predecessor,
                count: 1,
            });
        }
    }

    pub fn alignment_amount(&self) -> usize {
        self.alignment_amount
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_amount(&self) -> usize {
        self.nodes.iter().map(|node| node.predecessors.len()).sum()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_id(&self, coordinates: &Coordinates) -> Option<NodeId> {
        self.index.get(coordinates).copied()
    }

    /// Node ids sorted lexicographically by their coordinates, which is a topological order.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut order: Vec<_> = (0..self.nodes.len()).collect();
        order.sort_unstable_by(|a, b| self.nodes[*a].coordinates.cmp(&self.nodes[*b].coordinates));
        order
    }
}
