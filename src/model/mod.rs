//! Graph attention model
//!
//! Composes `decoder(stack(encoder(x), edges))`.

mod transform;

pub use transform::{Identity, Linear, Mlp, NodeTransform};

use ndarray::Array2;
use rand::Rng;
use tracing::info;

use crate::error::{GatError, Result};
use crate::gat::{GatConfig, LayerStack, StackAttention};
use crate::graph::EdgeIndex;

/// Encoder, attention stack and decoder in one forward pipeline
#[derive(Debug)]
pub struct GraphAttentionModel<E = Box<dyn NodeTransform>, D = Box<dyn NodeTransform>> {
    encoder: E,
    stack: LayerStack,
    decoder: D,
}

impl<E: NodeTransform, D: NodeTransform> GraphAttentionModel<E, D> {
    /// Create a model, checking collaborator widths against the stack
    pub fn new(config: GatConfig, encoder: E, decoder: D) -> Result<Self> {
        if encoder.output_dim() != config.encoder_out_dim {
            return Err(GatError::config(format!(
                "encoder produces {} features but the stack expects {}",
                encoder.output_dim(),
                config.encoder_out_dim
            )));
        }
        if decoder.input_dim() != config.decoder_in_dim {
            return Err(GatError::config(format!(
                "stack produces {} features but the decoder expects {}",
                config.decoder_in_dim,
                decoder.input_dim()
            )));
        }

        let stack = LayerStack::new(config)?;

        info!(
            input_dim = encoder.input_dim(),
            output_dim = decoder.output_dim(),
            parameters = stack.num_parameters() + encoder.num_parameters() + decoder.num_parameters(),
            "built graph attention model"
        );

        Ok(Self {
            encoder,
            stack,
            decoder,
        })
    }

    /// Forward pass using the thread-local RNG for dropout
    pub fn forward(&self, x: &Array2<f64>, edges: &EdgeIndex) -> Result<Array2<f64>> {
        self.forward_with_rng(x, edges, &mut rand::thread_rng())
    }

    /// Forward pass with an explicit RNG for dropout
    pub fn forward_with_rng<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let z = self.encode(x)?;
        let z = self.stack.forward_with_rng(&z, edges, rng)?;
        self.decode(&z)
    }

    /// Forward pass returning the attention weights of every layer
    pub fn forward_with_attention(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
    ) -> Result<(Array2<f64>, StackAttention)> {
        let z = self.encode(x)?;
        let (z, attention) = self.stack.forward_with_attention(&z, edges)?;
        Ok((self.decode(&z)?, attention))
    }

    fn encode(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.encoder.input_dim() {
            return Err(GatError::Shape {
                expected: self.encoder.input_dim(),
                got: x.ncols(),
            });
        }

        let z = self.encoder.transform(x)?;
        check_nodes(x.nrows(), &z)?;
        Ok(z)
    }

    fn decode(&self, z: &Array2<f64>) -> Result<Array2<f64>> {
        let output = self.decoder.transform(z)?;
        check_nodes(z.nrows(), &output)?;
        Ok(output)
    }

    /// Enable attention dropout
    pub fn train(&mut self) {
        self.stack.train();
    }

    /// Disable attention dropout
    pub fn eval(&mut self) {
        self.stack.eval();
    }

    /// Check if the model is in training mode
    pub fn is_training(&self) -> bool {
        self.stack.is_training()
    }

    /// Get the encoder
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Get the decoder
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Get the attention stack
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Get the mutable attention stack (for training updates)
    pub fn stack_mut(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.encoder.num_parameters() + self.stack.num_parameters() + self.decoder.num_parameters()
    }
}

fn check_nodes(expected: usize, output: &Array2<f64>) -> Result<()> {
    if output.nrows() != expected {
        return Err(GatError::NodeCount {
            expected,
            got: output.nrows(),
        });
    }
    Ok(())
}
