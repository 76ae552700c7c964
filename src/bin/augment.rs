//! Offline augmentation utility
//!
//! Writes flipped, rotated, shifted and scaled copies of every image in the
//! configured class folders next to the source file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cnn_timelapse::utils::logging::{init_logging, LogConfig};
use cnn_timelapse::{AugmentationConfig, ImageAugmenter};

/// Augment class folders in place
#[derive(Parser, Debug)]
#[command(name = "augment")]
#[command(version)]
#[command(about = "Write flipped/rotated/shifted/scaled copies of training images", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// TOML file overriding the built-in folder list and ranges
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

    let config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<AugmentationConfig>(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => AugmentationConfig::default(),
    };

    println!(
        "{} {} folders under {}",
        "Augmenting".cyan().bold(),
        config.class_folders.len(),
        config.root.display()
    );

    let mut augmenter = ImageAugmenter::new(config);
    let summary = augmenter.augment_folders()?;

    println!(
        "{} {} source images, {} files written",
        "Done:".green().bold(),
        summary.source_images,
        summary.written.len()
    );
    Ok(())
}
