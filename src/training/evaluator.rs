//! Evaluation on the held-out split
//!
//! Runs the whole split once in inference mode, reports the accuracy and
//! rewrites the checkpoint with the current weights.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use colored::Colorize;
use tracing::info;

use super::checkpoint::save_checkpoint;
use super::records::{zip_batch, SampleRecord};
use crate::dataset::{IndexedBatch, IndexedBatcher, IndexedImageDataset};
use crate::model::ConvNet;
use crate::utils::error::{Result, VisualizerError};
use crate::utils::metrics::{accuracy, argmax_rows};

/// Prediction for one held-out image, used to colour the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePrediction {
    pub index: usize,
    pub prediction: usize,
    pub label: usize,
}

/// Outcome of one pass over the held-out split
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// One record per held-out image, in dataset order
    pub records: Vec<SampleRecord>,
    pub correct: usize,
    pub total: usize,
    /// `correct / total`
    pub accuracy: f64,
}

impl EvaluationResult {
    /// Per-image predictions
    pub fn predictions(&self) -> impl Iterator<Item = ImagePrediction> + '_ {
        self.records.iter().map(|r| ImagePrediction {
            index: r.index,
            prediction: r.prediction,
            label: r.label,
        })
    }
}

/// Flatten one batch of model output into records
pub(crate) fn batch_records<B: Backend>(
    batch: &IndexedBatch<B>,
    logits: burn::tensor::Tensor<B, 2>,
    embedding: burn::tensor::Tensor<B, 2>,
) -> Result<Vec<SampleRecord>> {
    let [_, num_classes] = logits.dims();
    let [_, embedding_dim] = embedding.dims();

    let scores = logits
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| VisualizerError::Model(format!("Failed to read logits: {e:?}")))?;
    let embeddings = embedding
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| VisualizerError::Model(format!("Failed to read embeddings: {e:?}")))?;

    let predictions = argmax_rows(&scores, num_classes);
    Ok(zip_batch(
        &batch.indices,
        &batch.labels,
        &predictions,
        &embeddings,
        embedding_dim,
    ))
}

/// Evaluate `model` on every item of `dataset` and save the checkpoint
///
/// `model` is expected to be in inference mode already (an inner-backend
/// module obtained through `AutodiffModule::valid`), so dropout is disabled
/// and no gradients are tracked.
pub fn evaluate<B: Backend>(
    model: &ConvNet<B>,
    dataset: &IndexedImageDataset,
    batcher: &IndexedBatcher,
    batch_size: usize,
    checkpoint_path: &Path,
    device: &B::Device,
) -> Result<EvaluationResult> {
    let len = dataset.len();
    if len == 0 {
        return Err(VisualizerError::EmptyDataset(dataset.root().to_path_buf()));
    }

    let mut records = Vec::with_capacity(len);

    for start in (0..len).step_by(batch_size.max(1)) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();

        let batch: IndexedBatch<B> = batcher.batch(items, device);
        let output = model.forward(batch.images.clone());
        records.extend(batch_records(&batch, output.logits, output.embedding)?);
    }

    let correct = records.iter().filter(|r| r.is_correct()).count();
    let total = records.len();
    let accuracy = accuracy(correct, total)
        .ok_or_else(|| VisualizerError::EmptyDataset(dataset.root().to_path_buf()))?;

    println!(
        "{} {:.2} %",
        "Test accuracy of the model on the test images:".cyan(),
        accuracy * 100.0
    );

    save_checkpoint(model, checkpoint_path)?;
    info!(
        "Evaluated {} images ({} correct), checkpoint saved to {:?}",
        total, correct, checkpoint_path
    );

    Ok(EvaluationResult {
        records,
        correct,
        total,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ClassLabelSet, IndexedItem};
    use crate::model::ConvNetConfig;
    use burn_ndarray::NdArray;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn dataset(n: usize) -> IndexedImageDataset {
        let classes = ClassLabelSet::new(vec!["a".into(), "b".into()]);
        let items = (0..n)
            .map(|i| IndexedItem::from_data(vec![(i % 2) as f32; 64], i % 2, i))
            .collect();
        IndexedImageDataset::from_items("held-out", classes, items, 8)
    }

    #[test]
    fn test_evaluate_covers_every_image() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("model").join("conv_net_model.ckpt");
        let device = Default::default();
        let model =
            ConvNet::<TestBackend>::new(&ConvNetConfig::new(2, 6).with_image_width(8), &device);
        let batcher = IndexedBatcher::new(8, 0.8, 0.2);

        let result = evaluate(&model, &dataset(5), &batcher, 2, &checkpoint, &device).unwrap();

        assert_eq!(result.total, 5);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.accuracy, result.correct as f64 / 5.0);
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert!(result.records.iter().all(|r| r.embedding.len() == 6));

        let indices: Vec<usize> = result.predictions().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(checkpoint.exists());
    }

    #[test]
    fn test_evaluate_empty_set_fails() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("conv_net_model.ckpt");
        let device = Default::default();
        let model =
            ConvNet::<TestBackend>::new(&ConvNetConfig::new(2, 6).with_image_width(8), &device);
        let batcher = IndexedBatcher::new(8, 0.8, 0.2);

        let result = evaluate(&model, &dataset(0), &batcher, 2, &checkpoint, &device);
        assert!(matches!(result, Err(VisualizerError::EmptyDataset(_))));
        assert!(!checkpoint.exists());
    }
}
