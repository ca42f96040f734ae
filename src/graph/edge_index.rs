//! Directed edge list
//!
//! Edges are stored in caller order as `(source, destination)` pairs.
//! Messages flow from source to destination.

use serde::{Deserialize, Serialize};

use super::IncomingEdges;
use crate::error::{GatError, Result};

/// Directed edge list over implicit nodes `0..N`
///
/// Self-loops and duplicate edges are allowed; a duplicate edge is a
/// separate message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeIndex {
    edges: Vec<(usize, usize)>,
}

impl EdgeIndex {
    /// Create an empty edge list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from `(source, destination)` pairs
    pub fn from_pairs(edges: &[(usize, usize)]) -> Self {
        Self {
            edges: edges.to_vec(),
        }
    }

    /// Create from parallel source and target arrays (COO layout)
    pub fn from_coo(sources: &[usize], targets: &[usize]) -> Result<Self> {
        if sources.len() != targets.len() {
            return Err(GatError::EdgeCount {
                sources: sources.len(),
                targets: targets.len(),
            });
        }

        Ok(Self {
            edges: sources.iter().copied().zip(targets.iter().copied()).collect(),
        })
    }

    /// Append an edge
    pub fn push(&mut self, source: usize, destination: usize) {
        self.edges.push((source, destination));
    }

    /// Number of edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Check if the list has no edges
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge pairs in caller order
    pub fn as_slice(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Iterate over `(source, destination)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Check every endpoint against the node count
    pub fn validate(&self, num_nodes: usize) -> Result<()> {
        for (edge, &(src, dst)) in self.edges.iter().enumerate() {
            for node in [src, dst] {
                if node >= num_nodes {
                    return Err(GatError::GraphIndex {
                        edge,
                        node,
                        num_nodes,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of incoming edges per node
    pub fn in_degrees(&self, num_nodes: usize) -> Result<Vec<usize>> {
        self.validate(num_nodes)?;

        let mut degrees = vec![0usize; num_nodes];
        for &(_, dst) in &self.edges {
            degrees[dst] += 1;
        }
        Ok(degrees)
    }

    /// Replace existing self-loops with exactly one self-loop per node
    ///
    /// Non-loop edges keep their relative order; the new loops are
    /// appended in node order.
    pub fn with_self_loops(&self, num_nodes: usize) -> Result<Self> {
        self.validate(num_nodes)?;

        let mut edges: Vec<(usize, usize)> = self
            .edges
            .iter()
            .copied()
            .filter(|&(src, dst)| src != dst)
            .collect();
        edges.extend((0..num_nodes).map(|i| (i, i)));

        Ok(Self { edges })
    }

    /// Relabel nodes: node `i` becomes `permutation[i]`
    pub fn relabel(&self, permutation: &[usize]) -> Result<Self> {
        self.validate(permutation.len())?;

        Ok(Self {
            edges: self
                .edges
                .iter()
                .map(|&(src, dst)| (permutation[src], permutation[dst]))
                .collect(),
        })
    }

    /// Group edges by destination for `num_nodes` nodes
    pub fn incoming(&self, num_nodes: usize) -> Result<IncomingEdges> {
        IncomingEdges::build(self, num_nodes)
    }
}

impl From<Vec<(usize, usize)>> for EdgeIndex {
    fn from(edges: Vec<(usize, usize)>) -> Self {
        Self { edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coo() {
        let edges = EdgeIndex::from_coo(&[0, 1, 2], &[1, 2, 0]).unwrap();
        assert_eq!(edges.num_edges(), 3);
        assert_eq!(edges.as_slice(), &[(0, 1), (1, 2), (2, 0)]);

        let err = EdgeIndex::from_coo(&[0, 1], &[1]).unwrap_err();
        assert!(matches!(
            err,
            GatError::EdgeCount {
                sources: 2,
                targets: 1
            }
        ));
    }

    #[test]
    fn test_validate_out_of_range() {
        let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 3)]);
        assert!(edges.validate(4).is_ok());

        match edges.validate(3) {
            Err(GatError::GraphIndex {
                edge,
                node,
                num_nodes,
            }) => {
                assert_eq!(edge, 1);
                assert_eq!(node, 3);
                assert_eq!(num_nodes, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_in_degrees_counts_duplicates() {
        let edges = EdgeIndex::from_pairs(&[(0, 1), (0, 1), (2, 1), (1, 1)]);
        assert_eq!(edges.in_degrees(3).unwrap(), vec![0, 4, 0]);
    }

    #[test]
    fn test_with_self_loops() {
        let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 1), (1, 1), (2, 0)]);
        let looped = edges.with_self_loops(3).unwrap();

        assert_eq!(looped.as_slice(), &[(0, 1), (2, 0), (0, 0), (1, 1), (2, 2)]);
        assert_eq!(looped.in_degrees(3).unwrap(), vec![2, 2, 1]);
    }

    #[test]
    fn test_relabel() {
        let edges = EdgeIndex::from_pairs(&[(0, 1), (2, 1)]);
        let relabeled = edges.relabel(&[2, 0, 1]).unwrap();
        assert_eq!(relabeled.as_slice(), &[(2, 0), (1, 0)]);
    }
}
