//! Destination-grouped edge view in CSR format
//!
//! Attention is normalized per destination node, so every head walks the
//! incoming edges of one node at a time.

use super::EdgeIndex;
use crate::error::Result;

/// Compressed Sparse Row view of an [`EdgeIndex`], keyed by destination
///
/// Slots `indptr[d]..indptr[d + 1]` hold the incoming edges of node `d`,
/// in the order they appear in the edge list.
#[derive(Debug, Clone)]
pub struct IncomingEdges {
    /// Number of nodes
    n_nodes: usize,
    /// Row pointers: indptr[d] to indptr[d+1] gives the slot range for node d
    indptr: Vec<usize>,
    /// Source node for each slot
    sources: Vec<usize>,
    /// Position of each slot's edge in the original edge list
    edge_ids: Vec<usize>,
}

impl IncomingEdges {
    /// Group a validated edge list by destination
    pub fn build(edges: &EdgeIndex, n_nodes: usize) -> Result<Self> {
        edges.validate(n_nodes)?;

        let mut indptr = vec![0usize; n_nodes + 1];
        for (_, dst) in edges.iter() {
            indptr[dst + 1] += 1;
        }
        for i in 0..n_nodes {
            indptr[i + 1] += indptr[i];
        }

        // Counting sort keeps edges stable within each destination
        let mut cursor = indptr.clone();
        let mut sources = vec![0usize; edges.num_edges()];
        let mut edge_ids = vec![0usize; edges.num_edges()];
        for (edge_id, (src, dst)) in edges.iter().enumerate() {
            let slot = cursor[dst];
            sources[slot] = src;
            edge_ids[slot] = edge_id;
            cursor[dst] += 1;
        }

        Ok(Self {
            n_nodes,
            indptr,
            sources,
            edge_ids,
        })
    }

    /// Get number of nodes
    pub fn num_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Get number of edges
    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    /// Slot range of a node's incoming edges
    pub fn slots(&self, node: usize) -> std::ops::Range<usize> {
        self.indptr[node]..self.indptr[node + 1]
    }

    /// Source nodes of a node's incoming edges
    pub fn sources_of(&self, node: usize) -> &[usize] {
        &self.sources[self.slots(node)]
    }

    /// Get in-degree for a node
    pub fn in_degree(&self, node: usize) -> usize {
        self.indptr[node + 1] - self.indptr[node]
    }

    /// Scatter per-slot values back into original edge order
    pub fn to_edge_order(&self, slot_values: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; slot_values.len()];
        for (slot, &edge_id) in self.edge_ids.iter().enumerate() {
            values[edge_id] = slot_values[slot];
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatError;

    #[test]
    fn test_grouping_by_destination() {
        let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 1), (2, 1), (0, 0), (1, 1), (2, 2)]);
        let incoming = IncomingEdges::build(&edges, 3).unwrap();

        assert_eq!(incoming.num_nodes(), 3);
        assert_eq!(incoming.num_edges(), 6);
        assert_eq!(incoming.sources_of(0), &[0]);
        assert_eq!(incoming.sources_of(1), &[0, 1, 2, 1]);
        assert_eq!(incoming.sources_of(2), &[2]);

        // Slot i holds edge 3, then edges 0, 1, 2, 4, then edge 5
        let slots: Vec<f64> = (0..6).map(|i| i as f64).collect();
        assert_eq!(incoming.to_edge_order(&slots), vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0]);
    }

    #[test]
    fn test_isolated_node() {
        let edges = EdgeIndex::from_pairs(&[(0, 1)]);
        let incoming = IncomingEdges::build(&edges, 3).unwrap();

        assert_eq!(incoming.in_degree(0), 0);
        assert_eq!(incoming.in_degree(2), 0);
        assert!(incoming.sources_of(2).is_empty());
    }

    #[test]
    fn test_to_edge_order() {
        let edges = EdgeIndex::from_pairs(&[(0, 2), (1, 0), (2, 2)]);
        let incoming = IncomingEdges::build(&edges, 3).unwrap();

        // Slots: node 0 <- edge 1, node 2 <- edges 0 and 2
        let restored = incoming.to_edge_order(&[10.0, 20.0, 30.0]);
        assert_eq!(restored, vec![20.0, 10.0, 30.0]);
    }

    #[test]
    fn test_rejects_bad_index() {
        let edges = EdgeIndex::from_pairs(&[(0, 5)]);
        assert!(matches!(
            IncomingEdges::build(&edges, 3),
            Err(GatError::GraphIndex { node: 5, .. })
        ));
    }
}
