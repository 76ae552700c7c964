//! Visualization Aggregator
//!
//! Owns all state that lives across epochs: the train and test accuracy
//! histories, the training records of every epoch since the last snapshot,
//! and the colour/label assignment of every held-out image. On each snapshot
//! it projects the embeddings to the plane and writes one SVG frame of the
//! time-lapse.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::charts::{
    generate_line_chart, generate_snapshot, DataPoint, DataSeries, ScatterPoint, SnapshotFrame,
    COLOR_PRIMARY, COLOR_SECONDARY,
};
use super::projection::{EmbeddingProjector, PcaProjector};
use crate::dataset::ClassLabelSet;
use crate::training::{AccuracyHistory, EpochRecord, EvaluationResult, SampleRecord};
use crate::utils::error::{Result, VisualizerError};

/// Colour and label of one held-out image as of the latest evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassAssignment {
    pub prediction: usize,
    pub label: usize,
}

#[derive(Serialize)]
struct RunHistory<'a> {
    classes: &'a [String],
    train_accuracy: &'a AccuracyHistory,
    test_accuracy: &'a AccuracyHistory,
    batch_losses: &'a [f64],
    batch_accuracies: &'a [f64],
    snapshots: &'a [PathBuf],
}

pub struct Visualization {
    classes: ClassLabelSet,
    output_dir: PathBuf,
    projector: Box<dyn EmbeddingProjector>,
    train_history: AccuracyHistory,
    test_history: AccuracyHistory,
    epoch_record: EpochRecord,
    /// Finished epochs not yet shown in a snapshot
    window: Vec<EpochRecord>,
    assignments: BTreeMap<usize, ClassAssignment>,
    snapshots: Vec<PathBuf>,
}

impl Visualization {
    /// Create an aggregator writing into `output_dir`
    ///
    /// The directory is created on the first write, not here.
    pub fn new(classes: ClassLabelSet, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            classes,
            output_dir: output_dir.into(),
            projector: Box::new(PcaProjector::default()),
            train_history: AccuracyHistory::new(),
            test_history: AccuracyHistory::new(),
            epoch_record: EpochRecord::default(),
            window: Vec::new(),
            assignments: BTreeMap::new(),
            snapshots: Vec::new(),
        }
    }

    /// Replace the projection collaborator
    pub fn with_projector(mut self, projector: impl EmbeddingProjector + 'static) -> Self {
        self.projector = Box::new(projector);
        self
    }

    /// Take over the records of a finished epoch
    pub fn add_epoch(&mut self, record: EpochRecord) {
        debug!(
            "Epoch {} handed over with {} samples",
            record.epoch,
            record.len()
        );
        self.epoch_record = record;
    }

    pub fn record_train_accuracy(&mut self, epoch: usize, accuracy: f64) {
        self.train_history.push(epoch, accuracy);
    }

    pub fn record_test_accuracy(&mut self, epoch: usize, accuracy: f64) {
        self.test_history.push(epoch, accuracy);
    }

    /// Set the colour/label of one held-out image, replacing any earlier one
    pub fn add_class_colour(&mut self, index: usize, prediction: usize, label: usize) {
        self.assignments
            .insert(index, ClassAssignment { prediction, label });
    }

    /// Refresh the assignments of every image in an evaluation
    pub fn apply_evaluation(&mut self, result: &EvaluationResult) {
        for p in result.predictions() {
            self.add_class_colour(p.index, p.prediction, p.label);
        }
    }

    /// Render the snapshot for `epoch` and return its path
    ///
    /// The frame shows the training samples of every epoch since the previous
    /// snapshot, including the current one. Those epochs are consumed.
    pub fn make_label_vis(&mut self, epoch: usize, test: &EvaluationResult) -> Result<PathBuf> {
        self.ensure_output_dir()?;

        let current = std::mem::take(&mut self.epoch_record);
        if !current.is_empty() {
            self.window.push(current);
        }
        let train_records: Vec<&SampleRecord> =
            self.window.iter().flat_map(|r| r.samples()).collect();

        let embeddings: Vec<Vec<f32>> = train_records
            .iter()
            .copied()
            .chain(&test.records)
            .map(|r| r.embedding.clone())
            .collect();
        let projected = self.projector.project(&embeddings);
        if projected.len() != embeddings.len() {
            return Err(VisualizerError::Render(format!(
                "Projection returned {} points for {} embeddings",
                projected.len(),
                embeddings.len()
            )));
        }
        let (train_xy, test_xy) = projected.split_at(train_records.len());

        let train_points = train_records
            .iter()
            .zip(train_xy)
            .map(|(r, xy)| ScatterPoint {
                x: xy[0],
                y: xy[1],
                class: r.label,
                outline: r.label,
            })
            .collect();

        let test_points = test
            .records
            .iter()
            .zip(test_xy)
            .map(|(r, xy)| {
                let assignment = self
                    .assignments
                    .get(&r.index)
                    .copied()
                    .unwrap_or(ClassAssignment {
                        prediction: r.prediction,
                        label: r.label,
                    });
                ScatterPoint {
                    x: xy[0],
                    y: xy[1],
                    class: assignment.prediction,
                    outline: assignment.label,
                }
            })
            .collect();

        let frame = SnapshotFrame {
            title: self.snapshot_title(epoch),
            class_names: self.classes.names(),
            train_points,
            test_points,
            accuracy: self.accuracy_series(),
        };

        let path = self.output_dir.join(format!("epoch_{:04}.svg", epoch));
        generate_snapshot(&frame, &path)
            .map_err(|e| VisualizerError::Render(format!("{}: {e}", path.display())))?;

        debug!(
            "Snapshot {} covers {} epochs, {} train samples",
            epoch,
            self.window.len(),
            train_xy.len()
        );
        self.window.clear();
        self.snapshots.push(path.clone());
        Ok(path)
    }

    /// Close the current epoch
    ///
    /// Its records move to the window of the next snapshot and the current
    /// record is left empty.
    pub fn clear_after_epoch(&mut self) {
        let finished = std::mem::take(&mut self.epoch_record);
        if !finished.is_empty() {
            self.window.push(finished);
        }
    }

    /// Render train and test accuracy over epochs to `accuracy.svg`
    pub fn write_accuracy_chart(&self) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join("accuracy.svg");

        generate_line_chart(
            "Accuracy over epochs",
            "Epoch",
            "Accuracy (%)",
            &self.accuracy_series(),
            &path,
        )
        .map_err(|e| VisualizerError::Render(format!("{}: {e}", path.display())))?;

        info!("Accuracy chart written to {:?}", path);
        Ok(path)
    }

    /// Write both histories and the per-batch series to `history.json`
    pub fn write_history(&self, batch_losses: &[f64], batch_accuracies: &[f64]) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join("history.json");

        let history = RunHistory {
            classes: self.classes.names(),
            train_accuracy: &self.train_history,
            test_accuracy: &self.test_history,
            batch_losses,
            batch_accuracies,
            snapshots: &self.snapshots,
        };
        fs::write(&path, serde_json::to_string_pretty(&history)?)?;

        info!("History written to {:?}", path);
        Ok(path)
    }

    pub fn train_history(&self) -> &AccuracyHistory {
        &self.train_history
    }

    pub fn test_history(&self) -> &AccuracyHistory {
        &self.test_history
    }

    /// Records of the latest epoch, empty after `clear_after_epoch`
    pub fn epoch_record(&self) -> &EpochRecord {
        &self.epoch_record
    }

    /// Finished epochs waiting for the next snapshot
    pub fn buffered_epochs(&self) -> usize {
        self.window.len()
    }

    pub fn assignment(&self, index: usize) -> Option<ClassAssignment> {
        self.assignments.get(&index).copied()
    }

    pub fn num_assignments(&self) -> usize {
        self.assignments.len()
    }

    /// Paths of every snapshot written so far
    pub fn snapshots(&self) -> &[PathBuf] {
        &self.snapshots
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn snapshot_title(&self, epoch: usize) -> String {
        let pct = |h: &AccuracyHistory| {
            h.last()
                .map(|p| format!("{:.1}%", p.accuracy * 100.0))
                .unwrap_or_else(|| "-".to_string())
        };
        format!(
            "Epoch {} | Train {} | Test {}",
            epoch,
            pct(&self.train_history),
            pct(&self.test_history)
        )
    }

    fn accuracy_series(&self) -> Vec<DataSeries> {
        let to_series = |name: &str, history: &AccuracyHistory, color: &str| DataSeries {
            name: name.to_string(),
            points: history
                .points()
                .iter()
                .map(|p| DataPoint {
                    x: p.epoch as f64,
                    y: p.accuracy * 100.0,
                    label: None,
                })
                .collect(),
            color: color.to_string(),
        };

        vec![
            to_series("Train", &self.train_history, COLOR_PRIMARY),
            to_series("Test", &self.test_history, COLOR_SECONDARY),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn classes() -> ClassLabelSet {
        ClassLabelSet::new(vec!["a".into(), "b".into()])
    }

    fn sample(index: usize, label: usize, prediction: usize) -> SampleRecord {
        SampleRecord {
            index,
            embedding: vec![index as f32, (index * index) as f32, label as f32],
            label,
            prediction,
        }
    }

    fn evaluation(records: Vec<SampleRecord>) -> EvaluationResult {
        let correct = records.iter().filter(|r| r.is_correct()).count();
        let total = records.len();
        EvaluationResult {
            records,
            correct,
            total,
            accuracy: correct as f64 / total as f64,
        }
    }

    #[test]
    fn test_output_dir_created_lazily() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("2020-01-01 00.00.00");
        let mut vis = Visualization::new(classes(), &out);
        assert!(!out.exists());

        let mut record = EpochRecord::new(1);
        record.push_batch(vec![sample(0, 0, 0), sample(1, 1, 0)]);
        vis.add_epoch(record);
        vis.record_train_accuracy(1, 0.5);

        let test = evaluation(vec![sample(0, 0, 1), sample(1, 1, 1)]);
        vis.apply_evaluation(&test);
        vis.record_test_accuracy(1, test.accuracy);

        let path = vis.make_label_vis(1, &test).unwrap();
        assert_eq!(path, out.join("epoch_0001.svg"));
        assert!(path.exists());
        assert_eq!(vis.snapshots().len(), 1);
    }

    #[test]
    fn test_assignments_are_keyed_by_index() {
        let mut vis = Visualization::new(classes(), "unused");
        vis.apply_evaluation(&evaluation(vec![sample(3, 0, 1), sample(4, 1, 1)]));
        vis.apply_evaluation(&evaluation(vec![sample(3, 0, 0), sample(4, 1, 1)]));

        assert_eq!(vis.num_assignments(), 2);
        assert_eq!(
            vis.assignment(3),
            Some(ClassAssignment {
                prediction: 0,
                label: 0
            })
        );
    }

    #[test]
    fn test_clear_after_epoch_empties_record() {
        let mut vis = Visualization::new(classes(), "unused");
        let mut record = EpochRecord::new(2);
        record.push_batch(vec![sample(0, 0, 0)]);
        vis.add_epoch(record);
        assert_eq!(vis.epoch_record().len(), 1);

        vis.clear_after_epoch();
        assert!(vis.epoch_record().is_empty());
    }

    struct CountingProjector(std::rc::Rc<std::cell::RefCell<Vec<usize>>>);

    impl EmbeddingProjector for CountingProjector {
        fn project(&self, embeddings: &[Vec<f32>]) -> Vec<[f64; 2]> {
            self.0.borrow_mut().push(embeddings.len());
            embeddings.iter().map(|e| [e[0] as f64, e[1] as f64]).collect()
        }
    }

    #[test]
    fn test_snapshot_covers_every_epoch_since_the_last_one() {
        let dir = TempDir::new().unwrap();
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut vis = Visualization::new(classes(), dir.path())
            .with_projector(CountingProjector(calls.clone()));
        let test = evaluation(vec![sample(10, 0, 0)]);

        for epoch in 1..=3 {
            let mut record = EpochRecord::new(epoch);
            record.push_batch(vec![sample(0, 0, 0), sample(1, 1, 1)]);
            vis.add_epoch(record);
            if epoch == 2 {
                vis.make_label_vis(epoch, &test).unwrap();
                assert_eq!(vis.buffered_epochs(), 0);
            }
            vis.clear_after_epoch();
        }
        assert_eq!(vis.buffered_epochs(), 1);

        let mut record = EpochRecord::new(4);
        record.push_batch(vec![sample(0, 0, 0), sample(1, 1, 1)]);
        vis.add_epoch(record);
        vis.make_label_vis(4, &test).unwrap();
        vis.clear_after_epoch();

        // Epochs 1-2 then 3-4, two train samples each, plus one held-out sample
        assert_eq!(*calls.borrow(), vec![5, 5]);
        assert_eq!(vis.buffered_epochs(), 0);
        assert!(vis.epoch_record().is_empty());
    }

    #[test]
    fn test_history_and_chart_written() {
        let dir = TempDir::new().unwrap();
        let mut vis = Visualization::new(classes(), dir.path());
        vis.record_test_accuracy(0, 0.5);
        vis.record_train_accuracy(1, 0.75);
        vis.record_test_accuracy(1, 1.0);

        let chart = vis.write_accuracy_chart().unwrap();
        assert!(chart.ends_with("accuracy.svg"));

        let json = vis.write_history(&[0.7, 0.6], &[0.5, 1.0]).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(value["test_accuracy"]["points"].as_array().unwrap().len(), 2);
        assert_eq!(value["batch_losses"].as_array().unwrap().len(), 2);
    }

    struct FixedProjector;

    impl EmbeddingProjector for FixedProjector {
        fn project(&self, embeddings: &[Vec<f32>]) -> Vec<[f64; 2]> {
            embeddings.iter().map(|_| [1.0, 1.0]).collect()
        }
    }

    #[test]
    fn test_custom_projector() {
        let dir = TempDir::new().unwrap();
        let mut vis = Visualization::new(classes(), dir.path()).with_projector(FixedProjector);
        let test = evaluation(vec![sample(0, 0, 0)]);
        let path = vis.make_label_vis(5, &test).unwrap();
        let svg = fs::read_to_string(path).unwrap();
        assert!(!svg.contains("NaN"));
        assert!(svg.contains("Epoch 5"));
    }
}
