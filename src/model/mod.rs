//! Model module for the CNN architecture using the Burn framework
//!
//! This module provides:
//! - The two-block convolutional classifier that exposes embeddings
//! - Layer geometry derivation (paddings that keep/halve the width)

pub mod cnn;
pub mod geometry;

// Re-export main types for convenience
pub use cnn::{ClassifierOutput, ConvNet, ConvNetConfig};
pub use geometry::LayerGeometry;
