//! Graph Attention Layer implementation
//!
//! Runs several independent attention heads over the same graph and
//! combines their outputs.

use ndarray::{s, Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::head::AttentionHead;
use crate::error::{GatError, Result};
use crate::graph::{EdgeIndex, IncomingEdges};

/// How head outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadCombine {
    /// Concatenate head outputs along the feature axis
    Concat,
    /// Elementwise mean of head outputs
    Average,
}

/// Graph Attention Layer
///
/// Applies multi-head attention to aggregate neighbor information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAttentionLayer {
    /// Input dimension
    in_features: usize,
    /// Output dimension (per head)
    out_features: usize,
    /// Attention heads, each with its own parameters
    heads: Vec<AttentionHead>,
    /// Bias added after combining heads
    bias: Option<Array1<f64>>,
    /// Head combination policy
    combine: HeadCombine,
    /// Whether attention dropout is active
    training: bool,
}

impl GraphAttentionLayer {
    /// Create a new Graph Attention Layer
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        num_heads: usize,
        combine: HeadCombine,
        negative_slope: f64,
        dropout: f64,
        bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(GatError::config(format!(
                "layer widths must be positive, got {} -> {}",
                in_features, out_features
            )));
        }
        if num_heads == 0 {
            return Err(GatError::config("a layer needs at least one head"));
        }

        let heads = (0..num_heads)
            .map(|_| AttentionHead::new(in_features, out_features, negative_slope, dropout, rng))
            .collect();

        Self::from_heads(heads, combine, bias)
    }

    /// Assemble a layer from existing heads
    pub fn from_heads(heads: Vec<AttentionHead>, combine: HeadCombine, bias: bool) -> Result<Self> {
        let first = heads
            .first()
            .ok_or_else(|| GatError::config("a layer needs at least one head"))?;
        let (in_features, out_features) = (first.in_dim(), first.out_dim());

        if heads
            .iter()
            .any(|h| h.in_dim() != in_features || h.out_dim() != out_features)
        {
            return Err(GatError::config("all heads of a layer must share their widths"));
        }

        let output_dim = match combine {
            HeadCombine::Concat => out_features * heads.len(),
            HeadCombine::Average => out_features,
        };

        Ok(Self {
            in_features,
            out_features,
            heads,
            bias: bias.then(|| Array1::zeros(output_dim)),
            combine,
            training: false,
        })
    }

    /// Enable attention dropout
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Disable attention dropout
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Check if the layer is in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Forward pass over an edge list
    pub fn forward_with_rng<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let incoming = edges.incoming(x.nrows())?;
        self.forward_incoming(x, &incoming, rng)
    }

    /// Forward pass using the thread-local RNG for dropout
    pub fn forward(&self, x: &Array2<f64>, edges: &EdgeIndex) -> Result<Array2<f64>> {
        self.forward_with_rng(x, edges, &mut rand::thread_rng())
    }

    /// Forward pass over a prebuilt destination-grouped view
    pub fn forward_incoming<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        incoming: &IncomingEdges,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        self.forward_incoming_with_attention(x, incoming, rng)
            .map(|(output, _)| output)
    }

    /// Forward pass returning per-head attention in edge order
    pub fn forward_incoming_with_attention<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        incoming: &IncomingEdges,
        rng: &mut R,
    ) -> Result<(Array2<f64>, Vec<Array1<f64>>)> {
        if x.ncols() != self.in_features {
            return Err(GatError::Shape {
                expected: self.in_features,
                got: x.ncols(),
            });
        }

        let mut head_outputs = Vec::with_capacity(self.heads.len());
        let mut attention = Vec::with_capacity(self.heads.len());
        for head in &self.heads {
            let (output, alpha) = head.forward_with_attention(x, incoming, self.training, rng)?;
            head_outputs.push(output);
            attention.push(alpha);
        }

        let output = self.combine_heads(&head_outputs);
        let output = match self.bias {
            Some(ref bias) => output + bias,
            None => output,
        };

        debug!(
            nodes = x.nrows(),
            edges = incoming.num_edges(),
            heads = self.heads.len(),
            in_dim = self.in_features,
            out_dim = output.ncols(),
            "graph attention layer forward"
        );

        Ok((output, attention))
    }

    /// Forward pass over an edge list returning per-head attention
    pub fn forward_with_attention(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
    ) -> Result<(Array2<f64>, Vec<Array1<f64>>)> {
        let incoming = edges.incoming(x.nrows())?;
        self.forward_incoming_with_attention(x, &incoming, &mut rand::thread_rng())
    }

    fn combine_heads(&self, head_outputs: &[Array2<f64>]) -> Array2<f64> {
        let n = head_outputs.first().map_or(0, |h| h.nrows());

        match self.combine {
            HeadCombine::Concat => {
                let mut combined = Array2::zeros((n, self.output_dim()));
                for (head_idx, head_out) in head_outputs.iter().enumerate() {
                    let start = head_idx * self.out_features;
                    let end = start + self.out_features;
                    combined.slice_mut(s![.., start..end]).assign(head_out);
                }
                combined
            }
            HeadCombine::Average => {
                let mut avg = Array2::zeros((n, self.out_features));
                for head_out in head_outputs {
                    avg += head_out;
                }
                avg / head_outputs.len() as f64
            }
        }
    }

    /// Get the heads
    pub fn heads(&self) -> &[AttentionHead] {
        &self.heads
    }

    /// Get mutable heads (for training updates)
    pub fn heads_mut(&mut self) -> &mut [AttentionHead] {
        &mut self.heads
    }

    /// Get the bias
    pub fn bias(&self) -> Option<&Array1<f64>> {
        self.bias.as_ref()
    }

    /// Get mutable bias (for training updates)
    pub fn bias_mut(&mut self) -> Option<&mut Array1<f64>> {
        self.bias.as_mut()
    }

    /// Get head combination policy
    pub fn combine(&self) -> HeadCombine {
        self.combine
    }

    /// Get number of heads
    pub fn num_heads(&self) -> usize {
        self.heads.len()
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        let head_params: usize = self.heads.iter().map(|h| h.num_parameters()).sum();
        let bias_params = self.bias.as_ref().map_or(0, |b| b.len());
        head_params + bias_params
    }

    /// Get input dimension
    pub fn input_dim(&self) -> usize {
        self.in_features
    }

    /// Get output dimension
    pub fn output_dim(&self) -> usize {
        match self.combine {
            HeadCombine::Concat => self.out_features * self.heads.len(),
            HeadCombine::Average => self.out_features,
        }
    }
}
