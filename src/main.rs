use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use posterize::config::{QuantizeConfig, StopPolicy};
use posterize::core::quantizer::Quantizer;
use posterize::core::vector::Norm;
use posterize::decoder::image_loader;
use posterize::renderer;

#[derive(Parser)]
#[command(author, version, about = "Posterize an image to a small adaptive palette", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize an image and write the result as PNG
    Quantize {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Learn the palette of an image and print it as JSON
    Palette {
        #[arg(short, long)]
        input: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Print the default configuration as JSON
    Defaults,
}

#[derive(Args, Debug)]
struct Tuning {
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Palette size
    #[arg(short, long)]
    colors: Option<usize>,
    /// Rounds to run (upper bound with --stop converge)
    #[arg(short, long)]
    rounds: Option<usize>,
    #[arg(short, long, value_enum)]
    metric: Option<Norm>,
    #[arg(long, value_enum)]
    stop: Option<StopPolicy>,
    /// Split while low * imbalance < high
    #[arg(long)]
    imbalance: Option<usize>,
    #[arg(long)]
    min_spread: Option<f64>,
    #[arg(long)]
    split_fraction: Option<f64>,
    #[arg(long)]
    shift_epsilon: Option<f64>,
    /// Also split in the last round
    #[arg(long, default_value_t = false)]
    split_last_round: bool,
    /// Seed for the initial palette; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    #[arg(short, long)]
    threads: Option<usize>,
}

fn build_config(tuning: &Tuning) -> Result<QuantizeConfig> {
    let mut cfg = match &tuning.config {
        Some(path) => QuantizeConfig::from_json_file(path)?,
        None => QuantizeConfig::default(),
    };
    if let Some(v) = tuning.colors {
        cfg.colors = v;
    }
    if let Some(v) = tuning.rounds {
        cfg.rounds = v;
    }
    if let Some(v) = tuning.metric {
        cfg.metric = v;
    }
    if let Some(v) = tuning.stop {
        cfg.stop = v;
    }
    if let Some(v) = tuning.imbalance {
        cfg.imbalance_factor = v;
    }
    if let Some(v) = tuning.min_spread {
        cfg.min_spread = v;
    }
    if let Some(v) = tuning.split_fraction {
        cfg.split_fraction = v;
    }
    if let Some(v) = tuning.shift_epsilon {
        cfg.shift_epsilon = v;
    }
    if tuning.split_last_round {
        cfg.skip_final_split = false;
    }
    if let Some(v) = tuning.seed {
        cfg.seed = Some(v);
    }
    if let Some(v) = tuning.threads {
        cfg.threads = Some(v);
    }
    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Quantize { input, output, tuning } => {
            let quantizer = Quantizer::new(build_config(tuning)?)?;
            let pixels = image_loader::load(input)?;
            let result = quantizer.run(&pixels)?;
            let img = renderer::render(&result);
            renderer::save_png(&img, output)?;
        }
        Commands::Palette { input, tuning } => {
            let quantizer = Quantizer::new(build_config(tuning)?)?;
            let pixels = image_loader::load(input)?;
            let result = quantizer.run(&pixels)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "width": pixels.width(),
                    "height": pixels.height(),
                    "rounds": result.rounds,
                    "palette": result.entries(),
                }))?
            );
        }
        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&QuantizeConfig::default())?);
        }
    }

    Ok(())
}
