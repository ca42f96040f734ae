//! Graph Attention Stack CLI
//!
//! Command-line interface for running the attention stack on sample graphs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::{array, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gat_stack::{EdgeIndex, GatConfig, GraphAttentionModel, Identity, Mlp};

#[derive(Parser)]
#[command(name = "gat_stack")]
#[command(about = "Multi-head graph attention stack", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the three-node example graph and print attention weights
    Demo,

    /// Run a model on a random ring graph
    Run {
        /// JSON configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of nodes
        #[arg(short, long, default_value = "16")]
        nodes: usize,

        /// Raw input feature width
        #[arg(long, default_value = "8")]
        input_dim: usize,

        /// Output width of the decoder
        #[arg(long, default_value = "1")]
        output_dim: usize,

        /// Seed for features and dropout
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Enable attention dropout
        #[arg(long)]
        train: bool,
    },

    /// Print the layer structure of a configuration
    Summary {
        /// JSON configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<GatConfig> {
    match path {
        Some(path) => GatConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(GatConfig::default()),
    }
}

fn ring_graph(n: usize) -> EdgeIndex {
    let mut edges = EdgeIndex::new();
    for i in 0..n {
        edges.push(i, (i + 1) % n);
        edges.push((i + 1) % n, i);
        edges.push(i, i);
    }
    edges
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => {
            let config = GatConfig::minimal();
            let model = GraphAttentionModel::new(config, Identity::new(4), Identity::new(2))?;

            let x = array![
                [1.0, 0.0, 0.5, -1.0],
                [0.0, 1.0, -0.5, 2.0],
                [0.3, -0.7, 1.0, 0.0]
            ];
            let edges = EdgeIndex::from_pairs(&[(0, 1), (1, 1), (2, 1), (0, 0), (1, 1), (2, 2)]);

            let (output, attention) = model.forward_with_attention(&x, &edges)?;

            println!("Output shape: {:?}", output.dim());
            for (i, row) in output.axis_iter(Axis(0)).enumerate() {
                println!("  node {}: {:?}", i, row.to_vec());
            }

            for (layer, heads) in attention.layers.iter().enumerate() {
                println!("Layer {} attention:", layer);
                for (head, alpha) in heads.iter().enumerate() {
                    let weights: Vec<String> = attention
                        .edges
                        .iter()
                        .zip(alpha.iter())
                        .map(|((s, d), a)| format!("{}->{}: {:.3}", s, d, a))
                        .collect();
                    println!("  head {}: {}", head, weights.join(", "));
                }
            }
        }

        Commands::Run {
            config,
            nodes,
            input_dim,
            output_dim,
            seed,
            train,
        } => {
            let config = load_config(config.as_ref())?;
            info!("Running on a ring graph with {} nodes", nodes);

            let encoder = Mlp::new(&[input_dim, config.encoder_out_dim], Some(seed))?;
            let decoder = Mlp::new(&[config.decoder_in_dim, output_dim], Some(seed + 1))?;
            let mut model = GraphAttentionModel::new(config, encoder, decoder)?;
            if train {
                model.train();
            }
            info!("Model created with {} parameters", model.num_parameters());

            let mut rng = StdRng::seed_from_u64(seed);
            let x = Array2::random_using((nodes, input_dim), Uniform::new(-1.0, 1.0), &mut rng);
            let edges = ring_graph(nodes);

            let output = model.forward_with_rng(&x, &edges, &mut rng)?;

            info!("Output shape: {:?}", output.dim());
            if let (Some(mean), std) = (output.mean_axis(Axis(0)), output.std_axis(Axis(0), 0.0)) {
                info!("Per-feature mean: {:?}", mean.to_vec());
                info!("Per-feature std: {:?}", std.to_vec());
            }
        }

        Commands::Summary { config } => {
            let config = load_config(config.as_ref())?;
            let stack = gat_stack::LayerStack::new(config)?;

            println!("Layers: {}", stack.num_layers());
            for (i, layer) in stack.layers().enumerate() {
                println!(
                    "  [{}] {:?}: {} heads, {} -> {} ({} parameters)",
                    i,
                    layer.combine(),
                    layer.num_heads(),
                    layer.input_dim(),
                    layer.output_dim(),
                    layer.num_parameters()
                );
            }
            println!("Normalization layers: {}", stack.norms().len());
            println!("Total parameters: {}", stack.num_parameters());
        }
    }

    Ok(())
}
