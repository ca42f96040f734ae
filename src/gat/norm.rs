//! Per-channel feature normalization
//!
//! Batch normalization over the nodes of the current forward pass.
//! Statistics are recomputed on every call and never stored.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{GatError, Result};

/// Small constant for numerical stability
const EPS: f64 = 1e-5;

/// Feature normalization layer
///
/// Applies `y = gamma * (x - mean) / sqrt(var + eps) + beta` per column,
/// with `mean` and the biased `var` taken over the rows of `x`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureNorm {
    /// Learned scale
    pub gamma: Array1<f64>,
    /// Learned shift
    pub beta: Array1<f64>,
}

impl FeatureNorm {
    /// Create a new normalization layer with identity affine parameters
    pub fn new(dim: usize) -> Self {
        Self {
            gamma: Array1::ones(dim),
            beta: Array1::zeros(dim),
        }
    }

    /// Get dimension
    pub fn dim(&self) -> usize {
        self.gamma.len()
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.gamma.len() + self.beta.len()
    }

    /// Forward pass
    ///
    /// An empty batch is returned unchanged. A single-node batch has zero
    /// variance and normalizes to `beta`.
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.dim() {
            return Err(GatError::Shape {
                expected: self.dim(),
                got: x.ncols(),
            });
        }

        let mean = match x.mean_axis(Axis(0)) {
            Some(mean) => mean,
            None => return Ok(x.clone()),
        };
        let var = x.var_axis(Axis(0), 0.0);
        let inv_std = var.mapv(|v| 1.0 / (v + EPS).sqrt());

        Ok((x - &mean) * &(inv_std * &self.gamma) + &self.beta)
    }
}
