//! Dataset module for image data handling
//!
//! This module provides functionality for:
//! - Discovering labeled image folders on disk (`train_dir/<class>/*`)
//! - Preloading indexed, single-channel samples for Burn
//! - The offline augmentation pass that writes transformed copies to disk

pub mod augmentation;
pub mod burn_dataset;
pub mod loader;

// Re-export main types for convenience
pub use augmentation::{AugmentationConfig, AugmentationSummary, ImageAugmenter};
pub use burn_dataset::{IndexedBatch, IndexedBatcher, IndexedImageDataset, IndexedItem};
pub use loader::{ClassLabelSet, ImageFolder, ImageSample};
