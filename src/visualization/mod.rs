//! Visualization module
//!
//! - 2-D projection of embeddings
//! - SVG rendering of snapshots and accuracy curves
//! - The aggregator that owns cross-epoch state

pub mod aggregator;
pub mod charts;
pub mod projection;

pub use aggregator::{ClassAssignment, Visualization};
pub use projection::{EmbeddingProjector, PcaProjector};
