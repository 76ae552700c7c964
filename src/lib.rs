//! # CNN Training Time-Lapse
//!
//! Trains a small two-block convolutional classifier with the Burn framework
//! and renders, epoch by epoch, a 2-D projection of the embeddings it learns.
//! The frames form a time-lapse of how the representation separates classes.
//!
//! ## Modules
//!
//! - `config`: Run configuration (sizes, hyperparameters, paths)
//! - `dataset`: Image folder discovery, Burn dataset/batcher, offline augmentation
//! - `model`: The CNN and its layer geometry
//! - `training`: Training loop, evaluation, checkpoints, per-sample records
//! - `visualization`: Projection, SVG rendering and cross-epoch aggregation
//! - `utils`: Logging, metrics and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cnn_timelapse::{run_training, IndexedImageDataset, Visualization, VisualizerConfig};
//!
//! let config = VisualizerConfig::default();
//! let train = IndexedImageDataset::load(&config.train_dir, config.image_width)?;
//! let test = IndexedImageDataset::load(&config.test_dir, config.image_width)?;
//! let mut vis = Visualization::new(train.classes().clone(), "output/run");
//! let model = config.model_config().init::<TrainingBackend>(&device);
//! let outcome = run_training(&config, model, &train, &test, &mut vis, &device)?;
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;
pub mod visualization;

// Re-export commonly used items for convenience
pub use config::VisualizerConfig;
pub use dataset::{
    AugmentationConfig, ClassLabelSet, ImageAugmenter, IndexedBatcher, IndexedImageDataset,
};
pub use model::{ConvNet, ConvNetConfig};
pub use training::{
    evaluate, load_checkpoint, run_training, save_checkpoint, EvaluationResult, TrainingOutcome,
};
pub use utils::error::{Result, VisualizerError};
pub use visualization::Visualization;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
