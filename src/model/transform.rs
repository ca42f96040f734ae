//! Encoder and decoder collaborators
//!
//! The attention stack treats the encoder and decoder as opaque node-wise
//! feature transforms. A few reference implementations are provided.

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GatError, Result};
use crate::gat::{glorot_matrix, init_rng};

/// Node-wise feature transform: `(N, input_dim) -> (N, output_dim)`
pub trait NodeTransform: std::fmt::Debug {
    /// Expected input feature width
    fn input_dim(&self) -> usize;

    /// Produced output feature width
    fn output_dim(&self) -> usize;

    /// Transform every node's features
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Number of learned parameters
    fn num_parameters(&self) -> usize {
        0
    }
}

impl<T: NodeTransform + ?Sized> NodeTransform for Box<T> {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        (**self).transform(x)
    }

    fn num_parameters(&self) -> usize {
        (**self).num_parameters()
    }
}

fn check_width(x: &Array2<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(GatError::Shape {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

/// Pass-through transform of a fixed width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    dim: usize,
}

impl Identity {
    /// Create an identity transform over `dim` features
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl NodeTransform for Identity {
    fn input_dim(&self) -> usize {
        self.dim
    }

    fn output_dim(&self) -> usize {
        self.dim
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width(x, self.dim)?;
        Ok(x.clone())
    }
}

/// Affine transform `X · W + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    /// Weight, shape `(input_dim, output_dim)`
    pub weight: Array2<f64>,
    /// Bias of length `output_dim`
    pub bias: Array1<f64>,
}

impl Linear {
    /// Glorot-initialized weight with zero bias
    pub fn new<R: Rng + ?Sized>(input_dim: usize, output_dim: usize, rng: &mut R) -> Result<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(GatError::config(format!(
                "linear widths must be positive, got {} -> {}",
                input_dim, output_dim
            )));
        }

        Ok(Self {
            weight: glorot_matrix(input_dim, output_dim, rng),
            bias: Array1::zeros(output_dim),
        })
    }

    /// Create from explicit weight and bias
    pub fn from_weights(weight: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        if bias.len() != weight.ncols() {
            return Err(GatError::Shape {
                expected: weight.ncols(),
                got: bias.len(),
            });
        }
        Ok(Self { weight, bias })
    }
}

impl NodeTransform for Linear {
    fn input_dim(&self) -> usize {
        self.weight.nrows()
    }

    fn output_dim(&self) -> usize {
        self.weight.ncols()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_width(x, self.input_dim())?;
        Ok(x.dot(&self.weight) + &self.bias)
    }

    fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

/// Multilayer perceptron with ReLU between linear layers
///
/// Built from a width list `[d0, d1, ..., dk]`; no activation after the
/// last layer. Always holds at least one layer, and each layer's input
/// width equals the previous layer's output width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MlpLayers")]
pub struct Mlp {
    layers: Vec<Linear>,
}

/// Unchecked serialized form of [`Mlp`]
#[derive(Deserialize)]
struct MlpLayers {
    layers: Vec<Linear>,
}

impl TryFrom<MlpLayers> for Mlp {
    type Error = GatError;

    fn try_from(raw: MlpLayers) -> Result<Self> {
        Mlp::from_layers(raw.layers)
    }
}

impl Mlp {
    /// Create an MLP from layer widths
    pub fn new(widths: &[usize], seed: Option<u64>) -> Result<Self> {
        if widths.len() < 2 {
            return Err(GatError::config(format!(
                "an MLP needs at least two widths, got {:?}",
                widths
            )));
        }

        let mut rng = init_rng(seed);
        let layers = widths
            .windows(2)
            .map(|w| Linear::new(w[0], w[1], &mut rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { layers })
    }

    /// Create an MLP from existing layers
    pub fn from_layers(layers: Vec<Linear>) -> Result<Self> {
        if layers.is_empty() {
            return Err(GatError::config("an MLP needs at least one layer"));
        }

        for layer in &layers {
            if layer.bias.len() != layer.output_dim() {
                return Err(GatError::Shape {
                    expected: layer.output_dim(),
                    got: layer.bias.len(),
                });
            }
        }

        for pair in layers.windows(2) {
            if pair[1].input_dim() != pair[0].output_dim() {
                return Err(GatError::config(format!(
                    "MLP layer widths do not chain: {} -> {}",
                    pair[0].output_dim(),
                    pair[1].input_dim()
                )));
            }
        }

        Ok(Self { layers })
    }

    /// Get layers
    pub fn layers(&self) -> &[Linear] {
        &self.layers
    }

    /// Get mutable layers (for training updates)
    pub fn layers_mut(&mut self) -> &mut [Linear] {
        &mut self.layers
    }
}

impl NodeTransform for Mlp {
    fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.transform(&h)?;
            if i < last {
                h.mapv_inplace(|v| v.max(0.0));
            }
        }
        Ok(h)
    }

    fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters()).sum()
    }
}
