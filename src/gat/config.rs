//! Graph attention stack configuration
//!
//! Defines the hyperparameters of a [`LayerStack`](super::LayerStack).
//! A configuration is validated once at construction and never changes
//! afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatError, Result};

/// Configuration for the attention layer stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatConfig {
    /// Width of the encoder output (input width of the first layer)
    pub encoder_out_dim: usize,
    /// Number of concat-mode layers, counting the input layer
    ///
    /// The stack holds the input layer, `num_hidden_layers - 1` further
    /// hidden layers and the output layer. One normalization follows each
    /// of these concat layers. Zero leaves nothing to normalize and is
    /// rejected when `batch_norm` is set.
    pub num_hidden_layers: usize,
    /// Output width of each attention head in the input and hidden layers
    pub hidden_dim: usize,
    /// Number of heads in the input and hidden layers
    pub heads: usize,
    /// Number of heads in the output layer
    pub out_heads: usize,
    /// Width expected by the decoder (output width of the last layer)
    pub decoder_in_dim: usize,
    /// Whether to normalize features after the input and hidden layers
    pub batch_norm: bool,
    /// Dropout rate applied to attention weights in training mode
    pub attention_dropout: f64,
    /// Negative slope of the LeakyReLU used for attention scores
    pub negative_slope: f64,
    /// Whether the stack adds one self-loop per node before attending
    pub add_self_loops: bool,
    /// Whether each layer has a learned bias
    pub bias: bool,
    /// Seed for parameter initialization (None = random)
    pub seed: Option<u64>,
}

impl Default for GatConfig {
    fn default() -> Self {
        Self {
            encoder_out_dim: 64,
            num_hidden_layers: 2,
            hidden_dim: 32,
            heads: 4,
            out_heads: 1,
            decoder_in_dim: 64,
            batch_norm: true,
            attention_dropout: 0.6,
            negative_slope: 0.2,
            add_self_loops: false,
            bias: true,
            seed: None,
        }
    }
}

impl GatConfig {
    /// Create a configuration with the given encoder and decoder widths
    pub fn new(encoder_out_dim: usize, decoder_in_dim: usize) -> Self {
        Self {
            encoder_out_dim,
            decoder_in_dim,
            ..Default::default()
        }
    }

    /// Create a minimal config for testing
    pub fn minimal() -> Self {
        Self {
            encoder_out_dim: 4,
            num_hidden_layers: 1,
            hidden_dim: 3,
            heads: 2,
            out_heads: 1,
            decoder_in_dim: 2,
            batch_norm: false,
            attention_dropout: 0.0,
            negative_slope: 0.2,
            add_self_loops: false,
            bias: true,
            seed: Some(42),
        }
    }

    /// Width produced by the input and hidden layers
    pub fn concat_dim(&self) -> usize {
        self.hidden_dim * self.heads
    }

    /// Concat-mode layers after the input layer
    pub fn num_extra_hidden_layers(&self) -> usize {
        self.num_hidden_layers.saturating_sub(1)
    }

    /// Total number of attention layers (input + hidden + output)
    pub fn num_layers(&self) -> usize {
        self.num_extra_hidden_layers() + 2
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let widths = [
            ("encoder_out_dim", self.encoder_out_dim),
            ("hidden_dim", self.hidden_dim),
            ("decoder_in_dim", self.decoder_in_dim),
        ];
        for (name, value) in widths {
            if value == 0 {
                return Err(GatError::config(format!("{} must be positive", name)));
            }
        }

        if self.heads == 0 {
            return Err(GatError::config("heads must be at least 1"));
        }

        if self.out_heads == 0 {
            return Err(GatError::config("out_heads must be at least 1"));
        }

        if self.batch_norm && self.num_hidden_layers == 0 {
            return Err(GatError::config(
                "batch_norm needs at least one hidden layer to normalize",
            ));
        }

        if !(0.0..1.0).contains(&self.attention_dropout) {
            return Err(GatError::config(format!(
                "attention_dropout must be in [0, 1), got {}",
                self.attention_dropout
            )));
        }

        if !self.negative_slope.is_finite() || self.negative_slope < 0.0 {
            return Err(GatError::config(format!(
                "negative_slope must be finite and non-negative, got {}",
                self.negative_slope
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder method: set number of hidden layers
    pub fn with_hidden_layers(mut self, n: usize) -> Self {
        self.num_hidden_layers = n;
        self
    }

    /// Builder method: set per-head hidden width
    pub fn with_hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    /// Builder method: set number of heads for input and hidden layers
    pub fn with_heads(mut self, n: usize) -> Self {
        self.heads = n;
        self
    }

    /// Builder method: set number of heads for the output layer
    pub fn with_out_heads(mut self, n: usize) -> Self {
        self.out_heads = n;
        self
    }

    /// Builder method: enable or disable feature normalization
    pub fn with_batch_norm(mut self, enabled: bool) -> Self {
        self.batch_norm = enabled;
        self
    }

    /// Builder method: set attention dropout
    pub fn with_dropout(mut self, p: f64) -> Self {
        self.attention_dropout = p;
        self
    }

    /// Builder method: set LeakyReLU negative slope
    pub fn with_negative_slope(mut self, slope: f64) -> Self {
        self.negative_slope = slope;
        self
    }

    /// Builder method: add self-loops inside the stack
    pub fn with_self_loops(mut self, enabled: bool) -> Self {
        self.add_self_loops = enabled;
        self
    }

    /// Builder method: enable or disable layer bias
    pub fn with_bias(mut self, enabled: bool) -> Self {
        self.bias = enabled;
        self
    }

    /// Builder method: set initialization seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.out_heads, 1);
        assert_eq!(config.negative_slope, 0.2);
        assert_eq!(config.concat_dim(), 128);
        assert_eq!(config.num_layers(), 3);
    }

    #[test]
    fn test_invalid_config() {
        assert!(GatConfig::minimal().with_heads(0).validate().is_err());
        assert!(GatConfig::minimal().with_out_heads(0).validate().is_err());
        assert!(GatConfig::minimal().with_hidden_dim(0).validate().is_err());
        assert!(GatConfig::minimal().with_dropout(1.0).validate().is_err());
        assert!(GatConfig::minimal().with_dropout(-0.1).validate().is_err());
        assert!(GatConfig::minimal()
            .with_negative_slope(f64::NAN)
            .validate()
            .is_err());

        let config = GatConfig {
            decoder_in_dim: 0,
            ..GatConfig::minimal()
        };
        assert!(matches!(config.validate(), Err(GatError::Config(_))));
    }

    #[test]
    fn test_zero_hidden_layers_with_batch_norm_rejected() {
        let config = GatConfig::minimal().with_hidden_layers(0).with_batch_norm(true);
        assert!(matches!(config.validate(), Err(GatError::Config(_))));

        let config = GatConfig::minimal().with_hidden_layers(0).with_batch_norm(false);
        assert!(config.validate().is_ok());
        assert_eq!(config.num_layers(), 2);
    }

    #[test]
    fn test_hidden_layer_count_includes_input_layer() {
        let config = GatConfig::minimal().with_hidden_layers(1);
        assert_eq!(config.num_extra_hidden_layers(), 0);
        assert_eq!(config.num_layers(), 2);

        let config = GatConfig::minimal().with_hidden_layers(3);
        assert_eq!(config.num_extra_hidden_layers(), 2);
        assert_eq!(config.num_layers(), 4);
    }

    #[test]
    fn test_json_roundtrip_with_defaults() {
        let config = GatConfig::from_json(r#"{"encoder_out_dim": 8, "heads": 2}"#).unwrap();
        assert_eq!(config.encoder_out_dim, 8);
        assert_eq!(config.heads, 2);
        assert_eq!(config.hidden_dim, GatConfig::default().hidden_dim);

        let json = config.to_json().unwrap();
        assert_eq!(GatConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(matches!(
            GatConfig::from_json(r#"{"attention_dropout": 1.5}"#),
            Err(GatError::Config(_))
        ));
        assert!(matches!(
            GatConfig::from_json("{not json"),
            Err(GatError::Json(_))
        ));
    }
}
