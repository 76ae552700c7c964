//! Training module
//!
//! Contains:
//! - Per-sample records and accuracy histories
//! - The epoch/batch training loop
//! - Held-out evaluation
//! - Checkpoint persistence

pub mod checkpoint;
pub mod evaluator;
pub mod records;
pub mod trainer;

pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use evaluator::{evaluate, EvaluationResult, ImagePrediction};
pub use records::{AccuracyHistory, AccuracyPoint, EpochRecord, SampleRecord};
pub use trainer::{run_training, TrainingOutcome};
