//! Multi-head Graph Attention Stack
//!
//! This crate provides the message-passing core of a Graph Attention
//! Network (GAT): node features produced by an encoder pass through a stack
//! of multi-head attention layers and are handed to a decoder.
//!
//! # Features
//!
//! - **Attention Heads**: LeakyReLU edge scoring with a softmax normalized per destination node
//! - **Multi-Head Layers**: Concatenated heads for hidden layers, averaged heads for the output layer
//! - **Layer Stack**: Optional batch-statistics normalization and ReLU between layers
//! - **Model**: Pluggable encoder and decoder through the [`NodeTransform`] trait
//!
//! # Example
//!
//! ```rust
//! use gat_stack::{EdgeIndex, GatConfig, GraphAttentionModel, Identity};
//! use ndarray::Array2;
//!
//! fn main() -> gat_stack::Result<()> {
//!     let config = GatConfig::new(4, 2)
//!         .with_hidden_layers(1)
//!         .with_hidden_dim(3)
//!         .with_heads(2)
//!         .with_seed(7);
//!     let model = GraphAttentionModel::new(config, Identity::new(4), Identity::new(2))?;
//!
//!     let x = Array2::ones((3, 4));
//!     let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 1), (2, 1), (0, 0), (2, 2)]);
//!     let output = model.forward(&x, &edges)?;
//!
//!     assert_eq!(output.dim(), (3, 2));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod gat;
pub mod graph;
pub mod model;

// Re-export commonly used types
pub use error::{GatError, Result};
pub use gat::{GatConfig, GraphAttentionLayer, HeadCombine, LayerStack};
pub use graph::EdgeIndex;
pub use model::{GraphAttentionModel, Identity, Linear, Mlp, NodeTransform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
