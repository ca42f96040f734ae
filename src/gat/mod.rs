//! Graph Attention Network implementation
//!
//! Provides attention heads, multi-head layers and the layer stack that
//! sits between an encoder and a decoder.

mod config;
mod head;
mod init;
mod layer;
mod norm;
mod stack;

pub use config::GatConfig;
pub use head::{AttentionHead, HeadParams};
pub use layer::{GraphAttentionLayer, HeadCombine};
pub use norm::FeatureNorm;
pub use stack::{LayerStack, StackAttention};

pub(crate) use init::{glorot_matrix, init_rng};
