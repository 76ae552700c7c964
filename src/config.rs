//! Run Configuration
//!
//! Every named constant of a training run lives here: image geometry,
//! class count, embedding size, optimisation hyperparameters, snapshot
//! cadence, and the input/output locations. The struct is read once at
//! startup and passed explicitly to the model constructor and the
//! training loop.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::model::cnn::ConvNetConfig;
use crate::utils::error::{Result, VisualizerError};

/// Folder name format of a run's output directory
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// Configuration for one training + visualization run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Width (and height) every image is resized to
    pub image_width: usize,

    /// Number of classes the classifier predicts
    pub num_classes: usize,

    /// Size of the embedding vector (output of the first fully connected layer)
    pub embedding_dim: usize,

    /// Samples per batch, for training and evaluation
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Number of passes over the training set
    pub num_epochs: usize,

    /// Render a snapshot every N epochs
    pub show_after_epochs: usize,

    /// Print a progress line every N training steps
    pub log_every: usize,

    /// Mean subtracted from grey values in [0, 1]
    pub normalization_mean: f32,

    /// Standard deviation the centred grey values are divided by
    pub normalization_std: f32,

    /// Seed for the per-epoch shuffle
    pub seed: u64,

    /// Training split: `train_dir/<class_name>/*`
    pub train_dir: PathBuf,

    /// Held-out split: `test_dir/<class_name>/*`
    pub test_dir: PathBuf,

    /// Directory holding the checkpoint file
    pub model_dir: PathBuf,

    /// File name of the checkpoint, overwritten after every evaluation
    pub checkpoint_name: String,

    /// Root under which each run creates its timestamped directory
    pub output_root: PathBuf,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            image_width: 28,
            num_classes: 10,
            embedding_dim: 100,
            batch_size: 100,
            learning_rate: 0.001,
            num_epochs: 20,
            show_after_epochs: 1,
            log_every: 20,
            normalization_mean: 0.8,
            normalization_std: 0.2,
            seed: 42,
            train_dir: PathBuf::from("data/train"),
            test_dir: PathBuf::from("data/test"),
            model_dir: PathBuf::from("model"),
            checkpoint_name: "conv_net_model.ckpt".to_string(),
            output_root: PathBuf::from("output"),
        }
    }
}

impl VisualizerConfig {
    /// Load a configuration from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VisualizerError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            VisualizerError::Config(format!("Failed to parse config {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(VisualizerError::Config(msg.to_string()));

        if self.image_width == 0 {
            return fail("image_width must be greater than 0");
        }
        if self.num_classes == 0 {
            return fail("num_classes must be greater than 0");
        }
        if self.embedding_dim == 0 {
            return fail("embedding_dim must be greater than 0");
        }
        if self.batch_size == 0 {
            return fail("batch_size must be greater than 0");
        }
        if !(self.learning_rate > 0.0) {
            return fail("learning_rate must be positive");
        }
        if self.num_epochs == 0 {
            return fail("num_epochs must be greater than 0");
        }
        if self.show_after_epochs == 0 {
            return fail("show_after_epochs must be greater than 0");
        }
        if !(self.normalization_std > 0.0) {
            return fail("normalization_std must be positive");
        }
        if self.checkpoint_name.is_empty() {
            return fail("checkpoint_name must not be empty");
        }

        Ok(())
    }

    /// Model hyperparameters derived from this configuration
    pub fn model_config(&self) -> ConvNetConfig {
        ConvNetConfig::new(self.num_classes, self.embedding_dim).with_image_width(self.image_width)
    }

    /// Full path of the checkpoint file
    pub fn checkpoint_path(&self) -> PathBuf {
        self.model_dir.join(&self.checkpoint_name)
    }

    /// Output directory of a run started at `start`
    pub fn run_output_dir(&self, start: DateTime<Local>) -> PathBuf {
        self.output_root
            .join(start.format(RUN_DIR_FORMAT).to_string())
    }

    /// Whether a snapshot is due after the given (1-based) epoch
    pub fn is_snapshot_epoch(&self, epoch: usize) -> bool {
        epoch % self.show_after_epochs == 0
    }
}
