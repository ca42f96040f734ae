//! Graph attention layer stack
//!
//! Input layer and hidden layers concatenate their heads; the output layer
//! averages its heads so its width matches the decoder. Normalization and
//! ReLU follow every layer except the output layer.

use std::borrow::Cow;

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::GatConfig;
use super::init::init_rng;
use super::layer::{GraphAttentionLayer, HeadCombine};
use super::norm::FeatureNorm;
use crate::error::{GatError, Result};
use crate::graph::EdgeIndex;

/// Attention weights collected from a stack forward pass
#[derive(Debug, Clone)]
pub struct StackAttention {
    /// Edge list the layers attended over (includes added self-loops)
    pub edges: EdgeIndex,
    /// Per layer, per head attention weights in `edges` order
    pub layers: Vec<Vec<Array1<f64>>>,
}

/// Multi-layer graph attention stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStack {
    /// Stack configuration
    config: GatConfig,
    /// Encoder output -> concatenated hidden width
    input_layer: GraphAttentionLayer,
    /// Hidden width -> hidden width, `num_hidden_layers - 1` of them
    hidden_layers: Vec<GraphAttentionLayer>,
    /// Hidden width -> decoder input width, heads averaged
    output_layer: GraphAttentionLayer,
    /// One per input/hidden layer when normalization is enabled
    norms: Vec<FeatureNorm>,
}

impl LayerStack {
    /// Build a stack from a validated configuration
    pub fn new(config: GatConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = init_rng(config.seed);
        let concat_dim = config.concat_dim();

        let concat_layer = |in_dim: usize, rng: &mut rand::rngs::StdRng| {
            GraphAttentionLayer::new(
                in_dim,
                config.hidden_dim,
                config.heads,
                HeadCombine::Concat,
                config.negative_slope,
                config.attention_dropout,
                config.bias,
                rng,
            )
        };

        let input_layer = concat_layer(config.encoder_out_dim, &mut rng)?;
        let hidden_layers = (0..config.num_extra_hidden_layers())
            .map(|_| concat_layer(concat_dim, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        let output_layer = GraphAttentionLayer::new(
            concat_dim,
            config.decoder_in_dim,
            config.out_heads,
            HeadCombine::Average,
            config.negative_slope,
            config.attention_dropout,
            config.bias,
            &mut rng,
        )?;

        let norms = if config.batch_norm {
            (0..config.num_extra_hidden_layers() + 1)
                .map(|_| FeatureNorm::new(concat_dim))
                .collect()
        } else {
            Vec::new()
        };

        let stack = Self {
            config,
            input_layer,
            hidden_layers,
            output_layer,
            norms,
        };

        info!(
            layers = stack.num_layers(),
            heads = stack.config.heads,
            out_heads = stack.config.out_heads,
            batch_norm = stack.config.batch_norm,
            parameters = stack.num_parameters(),
            "built graph attention stack"
        );

        Ok(stack)
    }

    /// Enable attention dropout in every layer
    pub fn train(&mut self) {
        self.layers_mut().for_each(|l| l.train());
    }

    /// Disable attention dropout in every layer
    pub fn eval(&mut self) {
        self.layers_mut().for_each(|l| l.eval());
    }

    /// Check if any layer is in training mode
    pub fn is_training(&self) -> bool {
        self.layers().any(|l| l.is_training())
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
        let edges = self.prepare_edges(x, edges)?;
        self.run(x, &edges, rng).map(|(output, _)| output)
    }

    /// Forward pass returning the attention weights of every layer
    pub fn forward_with_attention(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
    ) -> Result<(Array2<f64>, StackAttention)> {
        let edges = self.prepare_edges(x, edges)?;
        let (output, layers) = self.run(x, &edges, &mut rand::thread_rng())?;
        Ok((
            output,
            StackAttention {
                edges: edges.into_owned(),
                layers,
            },
        ))
    }

    /// Check the input width and add self-loops when configured
    fn prepare_edges<'a>(
        &self,
        x: &Array2<f64>,
        edges: &'a EdgeIndex,
    ) -> Result<Cow<'a, EdgeIndex>> {
        if x.ncols() != self.input_dim() {
            return Err(GatError::Shape {
                expected: self.input_dim(),
                got: x.ncols(),
            });
        }

        if self.config.add_self_loops {
            Ok(Cow::Owned(edges.with_self_loops(x.nrows())?))
        } else {
            Ok(Cow::Borrowed(edges))
        }
    }

    fn run<R: Rng + ?Sized>(
        &self,
        x: &Array2<f64>,
        edges: &EdgeIndex,
        rng: &mut R,
    ) -> Result<(Array2<f64>, Vec<Vec<Array1<f64>>>)> {
        let n = x.nrows();
        let incoming = edges.incoming(n)?;

        debug!(
            nodes = n,
            edges = incoming.num_edges(),
            training = self.is_training(),
            "graph attention stack forward"
        );

        let mut attention = Vec::with_capacity(self.num_layers());

        let (mut z, alpha) = self.input_layer.forward_incoming_with_attention(x, &incoming, rng)?;
        attention.push(alpha);
        z = self.activate(0, z)?;

        for (i, layer) in self.hidden_layers.iter().enumerate() {
            let (next, alpha) = layer.forward_incoming_with_attention(&z, &incoming, rng)?;
            attention.push(alpha);
            z = self.activate(i + 1, next)?;
        }

        // No normalization or activation after the output layer
        let (output, alpha) = self.output_layer.forward_incoming_with_attention(&z, &incoming, rng)?;
        attention.push(alpha);

        Ok((output, attention))
    }

    /// Optional normalization followed by ReLU
    fn activate(&self, index: usize, z: Array2<f64>) -> Result<Array2<f64>> {
        let mut z = match self.norms.get(index) {
            Some(norm) => norm.forward(&z)?,
            None => z,
        };
        z.mapv_inplace(|v| v.max(0.0));
        Ok(z)
    }

    /// Iterate over all layers in forward order
    pub fn layers(&self) -> impl Iterator<Item = &GraphAttentionLayer> {
        std::iter::once(&self.input_layer)
            .chain(self.hidden_layers.iter())
            .chain(std::iter::once(&self.output_layer))
    }

    /// Iterate mutably over all layers in forward order
    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut GraphAttentionLayer> {
        std::iter::once(&mut self.input_layer)
            .chain(self.hidden_layers.iter_mut())
            .chain(std::iter::once(&mut self.output_layer))
    }

    /// Get normalization layers
    pub fn norms(&self) -> &[FeatureNorm] {
        &self.norms
    }

    /// Get mutable normalization layers (for training updates)
    pub fn norms_mut(&mut self) -> &mut [FeatureNorm] {
        &mut self.norms
    }

    /// Get configuration
    pub fn config(&self) -> &GatConfig {
        &self.config
    }

    /// Get number of attention layers
    pub fn num_layers(&self) -> usize {
        self.hidden_layers.len() + 2
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        let layer_params: usize = self.layers().map(|l| l.num_parameters()).sum();
        let norm_params: usize = self.norms.iter().map(|n| n.num_parameters()).sum();
        layer_params + norm_params
    }

    /// Get input dimension
    pub fn input_dim(&self) -> usize {
        self.input_layer.input_dim()
    }

    /// Get output dimension
    pub fn output_dim(&self) -> usize {
        self.output_layer.output_dim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    fn sample_input(n: usize, dim: usize, seed: u64) -> Array2<f64> {
        Array2::random_using((n, dim), Uniform::new(-1.0, 1.0), &mut init_rng(Some(seed)))
    }

    fn sample_edges() -> EdgeIndex {
        EdgeIndex::from_pairs(&[(0, 1), (1, 1), (2, 1), (0, 0), (1, 1), (2, 2), (3, 2), (2, 3)])
    }

    #[test]
    fn test_stack_structure() {
        let config = GatConfig::minimal().with_hidden_layers(3).with_batch_norm(true);
        let stack = LayerStack::new(config).unwrap();

        // Input layer, two further hidden layers, output layer
        assert_eq!(stack.num_layers(), 4);
        assert_eq!(stack.norms().len(), 3);
        assert_eq!(stack.input_dim(), 4);
        assert_eq!(stack.output_dim(), 2);

        let layers: Vec<_> = stack.layers().collect();
        assert_eq!(layers[0].input_dim(), 4);
        assert_eq!(layers[0].output_dim(), 6);
        for hidden in &layers[1..3] {
            assert_eq!(hidden.combine(), HeadCombine::Concat);
            assert_eq!(hidden.input_dim(), 6);
            assert_eq!(hidden.output_dim(), 6);
        }
        assert_eq!(layers[3].combine(), HeadCombine::Average);
        assert_eq!(layers[3].num_heads(), 1);
    }

    #[test]
    fn test_single_hidden_layer_is_input_layer() {
        let config = GatConfig::minimal().with_hidden_layers(1).with_batch_norm(true);
        let stack = LayerStack::new(config).unwrap();

        assert_eq!(stack.num_layers(), 2);
        assert_eq!(stack.norms().len(), 1);
    }

    #[test]
    fn test_zero_hidden_layers() {
        let config = GatConfig::minimal().with_hidden_layers(0).with_batch_norm(true);
        assert!(matches!(LayerStack::new(config), Err(GatError::Config(_))));

        let config = GatConfig::minimal().with_hidden_layers(0).with_batch_norm(false);
        let stack = LayerStack::new(config).unwrap();
        assert_eq!(stack.num_layers(), 2);
        assert!(stack.norms().is_empty());

        let output = stack.forward(&sample_input(4, 4, 1), &sample_edges()).unwrap();
        assert_eq!(output.dim(), (4, 2));
    }

    #[test]
    fn test_output_heads_averaged() {
        let config = GatConfig::minimal().with_out_heads(4);
        let stack = LayerStack::new(config).unwrap();

        let output = stack.forward(&sample_input(4, 4, 2), &sample_edges()).unwrap();
        assert_eq!(output.dim(), (4, 2));
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        assert!(matches!(
            LayerStack::new(GatConfig::minimal().with_heads(0)),
            Err(GatError::Config(_))
        ));
        assert!(matches!(
            LayerStack::new(GatConfig::minimal().with_dropout(1.0)),
            Err(GatError::Config(_))
        ));
    }

    #[test]
    fn test_deterministic_in_eval_mode() {
        let stack = LayerStack::new(GatConfig::minimal().with_dropout(0.5).with_batch_norm(true)).unwrap();
        let x = sample_input(4, 4, 3);
        let edges = sample_edges();

        let first = stack.forward(&x, &edges).unwrap();
        let second = stack.forward(&x, &edges).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seed_reproducible() {
        let a = LayerStack::new(GatConfig::minimal().with_seed(11)).unwrap();
        let b = LayerStack::new(GatConfig::minimal().with_seed(11)).unwrap();
        let x = sample_input(4, 4, 4);

        assert_eq!(
            a.forward(&x, &sample_edges()).unwrap(),
            b.forward(&x, &sample_edges()).unwrap()
        );
    }

    #[test]
    fn test_training_mode_dropout() {
        let mut stack = LayerStack::new(GatConfig::minimal().with_dropout(0.5)).unwrap();
        stack.train();
        assert!(stack.is_training());
        assert!(stack.layers().all(|l| l.is_training()));

        let x = sample_input(4, 4, 5);
        let mut rng = init_rng(Some(99));
        let output = stack.forward_with_rng(&x, &sample_edges(), &mut rng).unwrap();
        assert_eq!(output.dim(), (4, 2));
        assert!(output.iter().all(|v| v.is_finite()));

        stack.eval();
        assert!(!stack.is_training());
        assert!(stack.layers().all(|l| !l.is_training()));
    }

    #[test]
    fn test_training_mode_follows_layers() {
        let mut stack = LayerStack::new(GatConfig::minimal().with_hidden_layers(2)).unwrap();
        assert!(!stack.is_training());

        if let Some(layer) = stack.layers_mut().next() {
            layer.train();
        }
        assert!(stack.is_training());

        stack.eval();
        assert!(!stack.is_training());
    }

    #[test]
    fn test_forward_matches_attention_pass() {
        let config = GatConfig::minimal().with_hidden_layers(2).with_self_loops(true);
        let stack = LayerStack::new(config).unwrap();
        let x = sample_input(4, 4, 8);
        let edges = sample_edges();

        let output = stack.forward(&x, &edges).unwrap();
        let (with_attention, _) = stack.forward_with_attention(&x, &edges).unwrap();
        assert_eq!(output, with_attention);
    }

    #[test]
    fn test_attention_reported_per_layer() {
        let stack = LayerStack::new(GatConfig::minimal()).unwrap();
        let edges = sample_edges();

        let (_, attention) = stack.forward_with_attention(&sample_input(4, 4, 6), &edges).unwrap();

        assert_eq!(attention.layers.len(), 2);
        assert_eq!(attention.layers[0].len(), 2);
        assert_eq!(attention.layers[1].len(), 1);
        assert_eq!(attention.edges, edges);
        for alpha in attention.layers.iter().flatten() {
            let mut sums = [0.0; 4];
            for ((_, dst), a) in edges.iter().zip(alpha.iter()) {
                sums[dst] += a;
            }
            for s in sums {
                assert_abs_diff_eq!(s, 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_added_self_loops() {
        let stack = LayerStack::new(GatConfig::minimal().with_self_loops(true)).unwrap();
        // Node 0 has no incoming edges before self-loops are added
        let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 2), (2, 1)]);

        let (output, attention) = stack.forward_with_attention(&sample_input(3, 4, 7), &edges).unwrap();

        assert_eq!(attention.edges.num_edges(), 6);
        assert_eq!(attention.edges.in_degrees(3).unwrap(), vec![1, 3, 2]);
        assert!(output.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_input_errors() {
        let stack = LayerStack::new(GatConfig::minimal()).unwrap();

        assert!(matches!(
            stack.forward(&sample_input(4, 5, 1), &sample_edges()),
            Err(GatError::Shape {
                expected: 4,
                got: 5
            })
        ));
        assert!(matches!(
            stack.forward(&sample_input(3, 4, 1), &sample_edges()),
            Err(GatError::GraphIndex { node: 3, .. })
        ));
    }
}
