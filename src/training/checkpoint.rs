//! Model checkpointing.
//!
//! The checkpoint is a single file at a fixed path, rewritten in full after
//! every evaluation. There is no versioning.

use std::fs;
use std::path::Path;

use burn::{
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::Backend,
};
use tracing::debug;

use crate::model::ConvNet;
use crate::utils::error::{Result, VisualizerError};

type CheckpointRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Persist the model weights to `path`, replacing any previous file
pub fn save_checkpoint<B: Backend>(model: &ConvNet<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let recorder = CheckpointRecorder::default();
    let bytes = Recorder::<B>::record(&recorder, model.clone().into_record(), ())
        .map_err(|e| VisualizerError::Checkpoint(path.to_path_buf(), format!("{e:?}")))?;

    fs::write(path, bytes)?;
    debug!("Checkpoint written to {:?}", path);
    Ok(())
}

/// Restore weights from `path` into a model of the same architecture
pub fn load_checkpoint<B: Backend>(
    model: ConvNet<B>,
    path: &Path,
    device: &B::Device,
) -> Result<ConvNet<B>> {
    if !path.exists() {
        return Err(VisualizerError::PathNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let recorder = CheckpointRecorder::default();
    let record = Recorder::<B>::load(&recorder, bytes, device)
        .map_err(|e| VisualizerError::Checkpoint(path.to_path_buf(), format!("{e:?}")))?;

    Ok(model.load_record(record))
}
