//! Training loop
//!
//! A hand-written burn loop: per batch forward, cross-entropy, backward and an
//! Adam step. Every sample's embedding and prediction is recorded so the
//! visualization can follow the same images across epochs.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::evaluator::{batch_records, evaluate};
use super::records::EpochRecord;
use crate::config::VisualizerConfig;
use crate::dataset::{IndexedBatch, IndexedBatcher, IndexedImageDataset};
use crate::model::ConvNet;
use crate::utils::error::{Result, VisualizerError};
use crate::utils::logging::TrainingLogger;
use crate::visualization::Visualization;

/// What a training run hands back besides the aggregator state
#[derive(Debug)]
pub struct TrainingOutcome<B: AutodiffBackend> {
    /// Trained model
    pub model: ConvNet<B>,
    /// Loss of every batch, in order
    pub batch_losses: Vec<f64>,
    /// Accuracy of every batch, in order
    pub batch_accuracies: Vec<f64>,
}

/// Train `model` on `train`, evaluating on `test` at the snapshot cadence
///
/// The held-out split is evaluated once before the first batch to seed the
/// epoch-0 baseline. After every epoch the recorded samples are handed to
/// `visualization`; on snapshot epochs the held-out split is evaluated, the
/// checkpoint rewritten and a snapshot rendered. The epoch record is cleared
/// after every epoch.
pub fn run_training<B: AutodiffBackend>(
    config: &VisualizerConfig,
    mut model: ConvNet<B>,
    train: &IndexedImageDataset,
    test: &IndexedImageDataset,
    visualization: &mut Visualization,
    device: &B::Device,
) -> Result<TrainingOutcome<B>> {
    if train.is_empty() {
        return Err(VisualizerError::EmptyDataset(train.root().to_path_buf()));
    }

    let batch_size = config.batch_size;
    let batcher = IndexedBatcher::new(
        config.image_width,
        config.normalization_mean,
        config.normalization_std,
    );
    let checkpoint_path = config.checkpoint_path();

    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut optimizer = AdamConfig::new().init();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut logger = TrainingLogger::new(config.num_epochs);

    let total_steps = train.len().div_ceil(batch_size);
    let mut batch_losses = Vec::with_capacity(total_steps * config.num_epochs);
    let mut batch_accuracies = Vec::with_capacity(total_steps * config.num_epochs);

    println!("{}", "Evaluating baseline...".cyan());
    let baseline = evaluate(
        &model.valid(),
        test,
        &batcher,
        batch_size,
        &checkpoint_path,
        device,
    )?;
    visualization.record_test_accuracy(0, baseline.accuracy);
    visualization.apply_evaluation(&baseline);

    println!("{}", "Starting Training...".green().bold());

    for epoch in 0..config.num_epochs {
        let epoch_number = epoch + 1;
        logger.start_epoch(epoch);

        let mut record = EpochRecord::new(epoch_number);
        let mut epoch_loss = 0.0f64;

        let mut order: Vec<usize> = (0..train.len()).collect();
        order.shuffle(&mut rng);

        for (step, chunk) in order.chunks(batch_size).enumerate() {
            let items: Vec<_> = chunk.iter().filter_map(|&i| train.get(i)).collect();
            let batch: IndexedBatch<B> = batcher.batch(items, device);

            let output = model.forward(batch.images.clone());
            let loss = loss_fn.forward(output.logits.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                warn!(
                    "Non-finite loss {} at epoch {}, step {}",
                    loss_value,
                    epoch_number,
                    step + 1
                );
            }

            let records = batch_records(&batch, output.logits, output.embedding)?;
            let batch_accuracy = record.push_batch(records);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            epoch_loss += loss_value;
            batch_losses.push(loss_value);
            batch_accuracies.push(batch_accuracy);

            if config.log_every > 0 && (step + 1) % config.log_every == 0 {
                println!(
                    "Epoch [{}/{}], Step [{}/{}], Loss: {:.4}, Accuracy: {:.2}%",
                    epoch_number,
                    config.num_epochs,
                    step + 1,
                    total_steps,
                    loss_value,
                    batch_accuracy * 100.0
                );
            }
        }

        let mean_loss = epoch_loss / total_steps.max(1) as f64;
        let train_accuracy = record.accuracy().unwrap_or(0.0);
        logger.end_epoch(mean_loss, train_accuracy);

        println!(
            "  {} Epoch {}: Loss: {:.4} | Train Acc: {:.2}%",
            "→".cyan(),
            epoch_number,
            mean_loss,
            train_accuracy * 100.0
        );

        visualization.record_train_accuracy(epoch_number, train_accuracy);
        visualization.add_epoch(record);

        if config.is_snapshot_epoch(epoch_number) {
            let result = evaluate(
                &model.valid(),
                test,
                &batcher,
                batch_size,
                &checkpoint_path,
                device,
            )?;
            visualization.record_test_accuracy(epoch_number, result.accuracy);
            visualization.apply_evaluation(&result);

            let path = visualization.make_label_vis(epoch_number, &result)?;
            logger.log_snapshot(result.accuracy, &path);
        } else {
            debug!("No snapshot due after epoch {}", epoch_number);
        }

        visualization.clear_after_epoch();
    }

    logger.log_complete();

    Ok(TrainingOutcome {
        model,
        batch_losses,
        batch_accuracies,
    })
}
