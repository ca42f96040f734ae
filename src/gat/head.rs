//! Single graph attention head
//!
//! Projects node features, scores every edge with a learned attention
//! vector, normalizes the scores over each destination's incoming edges and
//! aggregates the projected source features.

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::init::{glorot_matrix, glorot_vector};
use crate::error::{GatError, Result};
use crate::graph::IncomingEdges;

/// Learned parameters of one attention head
///
/// The attention vector `a` of length `2 * out_dim` is stored as its two
/// halves, so that `a · [h_s || h_d] = att_src · h_s + att_dst · h_d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadParams {
    /// Projection weight, shape `(in_dim, out_dim)`
    pub weight: Array2<f64>,
    /// Attention vector half applied to the source node
    pub att_src: Array1<f64>,
    /// Attention vector half applied to the destination node
    pub att_dst: Array1<f64>,
}

impl HeadParams {
    /// Glorot-initialized parameters
    pub fn init<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self {
        Self {
            weight: glorot_matrix(in_dim, out_dim, rng),
            att_src: glorot_vector(out_dim, rng),
            att_dst: glorot_vector(out_dim, rng),
        }
    }

    /// Full attention vector `[att_src || att_dst]`
    pub fn attention_vector(&self) -> Array1<f64> {
        ndarray::concatenate![ndarray::Axis(0), self.att_src.view(), self.att_dst.view()]
    }

    fn check(&self) -> Result<()> {
        let out_dim = self.weight.ncols();
        for len in [self.att_src.len(), self.att_dst.len()] {
            if len != out_dim {
                return Err(GatError::Shape {
                    expected: out_dim,
                    got: len,
                });
            }
        }
        Ok(())
    }
}

/// Single attention head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionHead {
    /// Projection and attention parameters
    params: HeadParams,
    /// Negative slope for LeakyReLU
    negative_slope: f64,
    /// Dropout rate on attention weights
    dropout_rate: f64,
}

impl AttentionHead {
    /// Create a new attention head with Glorot-initialized parameters
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        negative_slope: f64,
        dropout_rate: f64,
        rng: &mut R,
    ) -> Self {
        Self {
            params: HeadParams::init(in_dim, out_dim, rng),
            negative_slope,
            dropout_rate,
        }
    }

    /// Create a head from explicit parameters
    pub fn from_params(params: HeadParams, negative_slope: f64, dropout_rate: f64) -> Result<Self> {
        params.check()?;
        Ok(Self {
            params,
            negative_slope,
            dropout_rate,
        })
    }

    /// Input feature width
    pub fn in_dim(&self) -> usize {
        self.params.weight.nrows()
    }

    /// Output feature width
    pub fn out_dim(&self) -> usize {
        self.params.weight.ncols()
    }

    /// Get parameters
    pub fn params(&self) -> &HeadParams {
        &self.params
    }

    /// Get mutable parameters (for training updates)
    pub fn params_mut(&mut self) -> &mut HeadParams {
        &mut self.params
    }

    /// Get dropout rate
    pub fn dropout_rate(&self) -> f64 {
        self.dropout_rate
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.params.weight.len() + self.params.att_src.len() + self.params.att_dst.len()
    }

    /// Project node features: `H = X · W`
    pub fn project(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.in_dim() {
            return Err(GatError::Shape {
                expected: self.in_dim(),
                got: x.ncols(),
            });
        }
        self.params.check()?;
        Ok(x.dot(&self.params.weight))
    }

    /// Attention weights per incoming slot, normalized per destination
    fn slot_attention(&self, h: &Array2<f64>, incoming: &IncomingEdges) -> Vec<f64> {
        let src_scores = h.dot(&self.params.att_src);
        let dst_scores = h.dot(&self.params.att_dst);

        let mut alpha = vec![0.0; incoming.num_edges()];
        for dst in 0..incoming.num_nodes() {
            let slots = incoming.slots(dst);
            if slots.is_empty() {
                continue;
            }

            let scores: Vec<f64> = incoming
                .sources_of(dst)
                .iter()
                .map(|&src| leaky_relu(src_scores[src] + dst_scores[dst], self.negative_slope))
                .collect();

            alpha[slots].copy_from_slice(&softmax(&scores));
        }
        alpha
    }

    /// Inverted dropout: zero with probability p, scale survivors by 1/(1-p)
    fn apply_dropout<R: Rng + ?Sized>(&self, alpha: &mut [f64], rng: &mut R) {
        if self.dropout_rate <= 0.0 {
            return;
        }

        let scale = 1.0 / (1.0 - self.dropout_rate);
        for a in alpha.iter_mut() {
            if rng.gen::<f64>() < self.dropout_rate {
                *a = 0.0;
            } else {
                *a *= scale;
            }
        }
    }

    /// Forward pass returning node features and per-edge attention
    ///
    /// Attention weights are returned in the order of the original edge
    /// list, after dropout. A node without incoming edges aggregates to the
    /// zero vector.
    pub fn forward_with_attention<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        incoming: &IncomingEdges,
        training: bool,
        rng: &mut R,
    ) -> Result<(Array2<f64>, Array1<f64>)> {
        if x.nrows() != incoming.num_nodes() {
            return Err(GatError::NodeCount {
                expected: incoming.num_nodes(),
                got: x.nrows(),
            });
        }

        let h = self.project(x)?;
        let mut alpha = self.slot_attention(&h, incoming);
        if training {
            self.apply_dropout(&mut alpha, rng);
        }

        let mut output = Array2::zeros((x.nrows(), self.out_dim()));
        for dst in 0..incoming.num_nodes() {
            let slots = incoming.slots(dst);
            let mut row = output.row_mut(dst);
            for (&src, &a) in incoming.sources_of(dst).iter().zip(&alpha[slots]) {
                row.scaled_add(a, &h.row(src));
            }
        }

        let attention = Array1::from(incoming.to_edge_order(&alpha));
        Ok((output, attention))
    }

    /// Forward pass
    pub fn forward<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        incoming: &IncomingEdges,
        training: bool,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        self.forward_with_attention(x, incoming, training, rng)
            .map(|(output, _)| output)
    }
}

/// LeakyReLU activation
pub(crate) fn leaky_relu(x: f64, negative_slope: f64) -> f64 {
    if x >= 0.0 {
        x
    } else {
        negative_slope * x
    }
}

/// Softmax function
fn softmax(scores: &[f64]) -> Vec<f64> {
    // Numerical stability: subtract max
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp_scores: Vec<f64> = scores.iter().map(|&s| (s - max_score).exp()).collect();
    let sum: f64 = exp_scores.iter().sum();

    exp_scores.iter().map(|&e| e / sum).collect()
}
