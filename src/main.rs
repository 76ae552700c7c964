//! CNN Training Visualizer
//!
//! Trains the classifier, writes one embedding snapshot per cadence tick into
//! a timestamped output directory, then runs a final held-out evaluation.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use burn::module::AutodiffModule;
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use cnn_timelapse::backend::{backend_name, default_device, TrainingBackend};
use cnn_timelapse::utils::format_duration;
use cnn_timelapse::utils::logging::{init_logging, LogConfig};
use cnn_timelapse::{
    evaluate, run_training, IndexedBatcher, IndexedImageDataset, Visualization, VisualizerConfig,
};

/// Train a CNN and render a time-lapse of its embeddings
#[derive(Parser, Debug)]
#[command(name = "cnn-timelapse")]
#[command(version)]
#[command(about = "Train a CNN with Burn and visualize its embeddings per epoch", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// TOML file overriding the built-in configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    println!(
        "{}",
        "Hello and welcome to the CNN training visualizer.".green().bold()
    );
    let start_time = Local::now();
    let started = Instant::now();
    println!("Started {}", start_time.format("%Y-%m-%d %H:%M:%S"));
    println!();

    let config = match &cli.config {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => {
            let config = VisualizerConfig::default();
            config.validate()?;
            config
        }
    };
    let output_dir = config.run_output_dir(start_time);

    println!("{}", "Loading Dataset...".cyan());
    let train = IndexedImageDataset::load(&config.train_dir, config.image_width)
        .with_context(|| format!("loading training set {}", config.train_dir.display()))?;
    let test = IndexedImageDataset::load(&config.test_dir, config.image_width)
        .with_context(|| format!("loading test set {}", config.test_dir.display()))?;

    if train.classes() != test.classes() {
        bail!(
            "class folders differ between {} and {}",
            config.train_dir.display(),
            config.test_dir.display()
        );
    }
    if train.classes().len() != config.num_classes {
        bail!(
            "found {} class folders but num_classes is {}",
            train.classes().len(),
            config.num_classes
        );
    }

    println!("  Classes:          {}", train.classes().names().join(", "));
    println!("  Training images:  {}", train.items().len());
    println!("  Test images:      {}", test.items().len());
    println!();

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Epochs:           {}", config.num_epochs);
    println!("  Batch size:       {}", config.batch_size);
    println!("  Learning rate:    {}", config.learning_rate);
    println!("  Snapshot every:   {} epoch(s)", config.show_after_epochs);
    println!("  Backend:          {}", backend_name());
    println!("  Output:           {}", output_dir.display());
    println!();

    let device = default_device();
    let model = config.model_config().init::<TrainingBackend>(&device);
    let mut visualization = Visualization::new(train.classes().clone(), &output_dir);

    let outcome = run_training(&config, model, &train, &test, &mut visualization, &device)?;

    println!();
    println!("{}", "Final Evaluation...".cyan().bold());
    let batcher = IndexedBatcher::new(
        config.image_width,
        config.normalization_mean,
        config.normalization_std,
    );
    let result = evaluate(
        &outcome.model.valid(),
        &test,
        &batcher,
        config.batch_size,
        &config.checkpoint_path(),
        &device,
    )?;

    visualization.write_accuracy_chart()?;
    visualization.write_history(&outcome.batch_losses, &outcome.batch_accuracies)?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    println!("  Final test accuracy: {:.2}%", result.accuracy * 100.0);
    println!("  Snapshots:           {}", visualization.snapshots().len());
    println!("  Checkpoint:          {}", config.checkpoint_path().display());
    println!("  Elapsed:             {}", format_duration(started.elapsed().as_secs_f64()));

    info!("Run written to {:?}", output_dir);
    Ok(())
}
