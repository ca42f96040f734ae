//! Error types for the graph attention stack

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, GatError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum GatError {
    /// Invalid configuration, raised at construction time
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An edge endpoint is not a valid node index
    #[error("Edge {edge} references node {node}, but the graph has {num_nodes} nodes")]
    GraphIndex {
        edge: usize,
        node: usize,
        num_nodes: usize,
    },

    /// Input feature width does not match the configured width
    #[error("Feature width mismatch: expected {expected}, got {got}")]
    Shape { expected: usize, got: usize },

    /// A collaborator changed the number of nodes
    #[error("Node count mismatch: expected {expected}, got {got}")]
    NodeCount { expected: usize, got: usize },

    /// Source and target arrays of an edge list differ in length
    #[error("Edge list has {sources} sources but {targets} targets")]
    EdgeCount { sources: usize, targets: usize },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        GatError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GatError::GraphIndex {
            edge: 3,
            node: 7,
            num_nodes: 5,
        };
        assert_eq!(
            err.to_string(),
            "Edge 3 references node 7, but the graph has 5 nodes"
        );

        let err = GatError::Shape {
            expected: 4,
            got: 6,
        };
        assert!(err.to_string().contains("expected 4"));
    }
}
