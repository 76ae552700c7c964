//! Per-sample and per-epoch bookkeeping shared by training, evaluation and
//! visualization.

use serde::{Deserialize, Serialize};

use crate::utils::metrics::{accuracy, count_correct};

/// One image's embedding and classification in a pass over a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Dataset index of the image
    pub index: usize,
    /// Pre-final-layer representation
    pub embedding: Vec<f32>,
    /// True class
    pub label: usize,
    /// Predicted class
    pub prediction: usize,
}

impl SampleRecord {
    /// Whether the prediction matches the label
    pub fn is_correct(&self) -> bool {
        self.label == self.prediction
    }
}

/// Zip the parts of one batch into explicit per-sample records
///
/// `embeddings` is row-major `[indices.len(), embedding_dim]`.
pub fn zip_batch(
    indices: &[usize],
    labels: &[usize],
    predictions: &[usize],
    embeddings: &[f32],
    embedding_dim: usize,
) -> Vec<SampleRecord> {
    debug_assert_eq!(indices.len(), labels.len());
    debug_assert_eq!(indices.len(), predictions.len());
    debug_assert_eq!(indices.len() * embedding_dim, embeddings.len());

    indices
        .iter()
        .zip(labels)
        .zip(predictions)
        .zip(embeddings.chunks(embedding_dim.max(1)))
        .map(|(((&index, &label), &prediction), embedding)| SampleRecord {
            index,
            embedding: embedding.to_vec(),
            label,
            prediction,
        })
        .collect()
}

/// Everything recorded for one pass over the training set
#[derive(Debug, Clone, Default)]
pub struct EpochRecord {
    /// 1-based epoch number
    pub epoch: usize,
    samples: Vec<SampleRecord>,
    correct: usize,
}

impl EpochRecord {
    /// Start recording the given epoch
    pub fn new(epoch: usize) -> Self {
        Self {
            epoch,
            samples: Vec::new(),
            correct: 0,
        }
    }

    /// Append one batch of records and return the batch accuracy
    pub fn push_batch(&mut self, records: Vec<SampleRecord>) -> f64 {
        let predictions: Vec<usize> = records.iter().map(|r| r.prediction).collect();
        let labels: Vec<usize> = records.iter().map(|r| r.label).collect();
        let correct = count_correct(&predictions, &labels);

        self.correct += correct;
        let batch_accuracy = accuracy(correct, records.len()).unwrap_or(0.0);
        self.samples.extend(records);
        batch_accuracy
    }

    /// Accuracy over all samples seen this epoch
    pub fn accuracy(&self) -> Option<f64> {
        accuracy(self.correct, self.samples.len())
    }

    /// Recorded samples, in the order they were seen
    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    /// Number of correct predictions
    pub fn correct(&self) -> usize {
        self.correct
    }

    /// Number of recorded samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop every recorded sample
    pub fn clear(&mut self) {
        self.samples.clear();
        self.correct = 0;
    }
}

/// A single accuracy measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyPoint {
    pub epoch: usize,
    pub accuracy: f64,
}

/// Ordered accuracy measurements over epochs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccuracyHistory {
    points: Vec<AccuracyPoint>,
}

impl AccuracyHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measurement
    pub fn push(&mut self, epoch: usize, accuracy: f64) {
        debug_assert!(
            (0.0..=1.0).contains(&accuracy),
            "accuracy {accuracy} outside [0, 1]"
        );
        self.points.push(AccuracyPoint { epoch, accuracy });
    }

    /// All measurements in insertion order
    pub fn points(&self) -> &[AccuracyPoint] {
        &self.points
    }

    /// Most recent measurement
    pub fn last(&self) -> Option<AccuracyPoint> {
        self.points.last().copied()
    }

    /// Number of measurements
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if there are no measurements
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, label: usize, prediction: usize) -> SampleRecord {
        SampleRecord {
            index,
            embedding: vec![index as f32; 2],
            label,
            prediction,
        }
    }

    #[test]
    fn test_zip_batch_keeps_alignment() {
        let records = zip_batch(&[7, 2], &[1, 0], &[1, 1], &[0.1, 0.2, 0.3, 0.4], 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 7);
        assert_eq!(records[0].embedding, vec![0.1, 0.2]);
        assert!(records[0].is_correct());
        assert_eq!(records[1].index, 2);
        assert_eq!(records[1].embedding, vec![0.3, 0.4]);
        assert!(!records[1].is_correct());
    }

    #[test]
    fn test_epoch_record_accuracy() {
        let mut epoch = EpochRecord::new(1);
        assert_eq!(epoch.accuracy(), None);

        let batch_acc = epoch.push_batch(vec![record(0, 1, 1), record(1, 0, 1)]);
        assert_eq!(batch_acc, 0.5);

        let batch_acc = epoch.push_batch(vec![record(2, 0, 0), record(3, 1, 1)]);
        assert_eq!(batch_acc, 1.0);

        assert_eq!(epoch.len(), 4);
        assert_eq!(epoch.correct(), 3);
        assert_eq!(epoch.accuracy(), Some(0.75));
    }

    #[test]
    fn test_epoch_record_clear() {
        let mut epoch = EpochRecord::new(3);
        epoch.push_batch(vec![record(0, 0, 0)]);
        epoch.clear();
        assert!(epoch.is_empty());
        assert_eq!(epoch.correct(), 0);
        assert_eq!(epoch.epoch, 3);
    }

    #[test]
    fn test_accuracy_history_order() {
        let mut history = AccuracyHistory::new();
        history.push(0, 0.1);
        history.push(1, 0.6);
        assert_eq!(history.len(), 2);
        assert_eq!(history.points()[0].epoch, 0);
        assert_eq!(history.last().unwrap().accuracy, 0.6);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_accuracy_history_rejects_out_of_range() {
        AccuracyHistory::new().push(1, 1.5);
    }
}
