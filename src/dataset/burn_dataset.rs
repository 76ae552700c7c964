//! Burn Dataset Integration
//!
//! This module implements Burn's Dataset trait and Batcher for indexed,
//! single-channel images. Every item carries its dataset index so that
//! embeddings can be matched to the same image across epochs.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use super::loader::{ClassLabelSet, ImageFolder};
use crate::utils::error::{Result, VisualizerError};

/// A single preprocessed image ready for Burn
#[derive(Clone, Debug)]
pub struct IndexedItem {
    /// Grey values in [0, 1], row-major [width * width]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Dataset index, stable for the run
    pub index: usize,
}

impl IndexedItem {
    /// Load an image, convert it to one grey channel and resize it to `width x width`
    pub fn from_path(path: &Path, label: usize, index: usize, width: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| VisualizerError::ImageLoadError(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| VisualizerError::ImageLoadError(path.to_path_buf(), e.to_string()))?;

        let grey = img.to_luma8();
        let resized =
            image::imageops::resize(&grey, width as u32, width as u32, FilterType::Triangle);

        let image = resized.pixels().map(|p| p[0] as f32 / 255.0).collect();

        Ok(Self {
            image,
            label,
            index,
        })
    }

    /// Create from pre-loaded image data
    pub fn from_data(image: Vec<f32>, label: usize, index: usize) -> Self {
        Self {
            image,
            label,
            index,
        }
    }
}

/// A fully preloaded, indexed image dataset
#[derive(Debug, Clone)]
pub struct IndexedImageDataset {
    root: std::path::PathBuf,
    classes: ClassLabelSet,
    items: Vec<IndexedItem>,
    image_width: usize,
}

impl IndexedImageDataset {
    /// Discover and load every image under `root`
    pub fn load<P: AsRef<Path>>(root: P, image_width: usize) -> Result<Self> {
        let folder = ImageFolder::new(root)?;
        Self::from_folder(&folder, image_width)
    }

    /// Load every sample of an already discovered folder
    ///
    /// Images are decoded in parallel; item order still follows sample order.
    pub fn from_folder(folder: &ImageFolder, image_width: usize) -> Result<Self> {
        let pb = ProgressBar::new(folder.samples.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let items = folder
            .samples
            .par_iter()
            .map(|s| {
                let item = IndexedItem::from_path(&s.path, s.label, s.index, image_width);
                pb.inc(1);
                item
            })
            .collect::<Result<Vec<_>>>()?;

        pb.finish_and_clear();
        tracing::info!("Loaded {} images from {:?}", items.len(), folder.root);

        Ok(Self {
            root: folder.root.clone(),
            classes: folder.classes.clone(),
            items,
            image_width,
        })
    }

    /// Build from in-memory items
    pub fn from_items(
        root: impl Into<std::path::PathBuf>,
        classes: ClassLabelSet,
        items: Vec<IndexedItem>,
        image_width: usize,
    ) -> Self {
        Self {
            root: root.into(),
            classes,
            items,
            image_width,
        }
    }

    /// Class label set of this split
    pub fn classes(&self) -> &ClassLabelSet {
        &self.classes
    }

    /// Root directory the items were loaded from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Width of every item
    pub fn image_width(&self) -> usize {
        self.image_width
    }

    /// All items, in dataset order
    pub fn items(&self) -> &[IndexedItem] {
        &self.items
    }
}

impl Dataset<IndexedItem> for IndexedImageDataset {
    fn get(&self, index: usize) -> Option<IndexedItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of indexed images
#[derive(Clone, Debug)]
pub struct IndexedBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 1, width, width]
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
    /// Labels, in batch order
    pub labels: Vec<usize>,
    /// Dataset indices, in batch order
    pub indices: Vec<usize>,
}

/// Batcher that stacks items and applies `(x - mean) / std` normalisation
#[derive(Clone, Debug)]
pub struct IndexedBatcher {
    image_width: usize,
    mean: f32,
    std: f32,
}

impl IndexedBatcher {
    /// Create a new batcher
    pub fn new(image_width: usize, mean: f32, std: f32) -> Self {
        Self {
            image_width,
            mean,
            std,
        }
    }
}

impl<B: Backend> Batcher<B, IndexedItem, IndexedBatch<B>> for IndexedBatcher {
    fn batch(&self, items: Vec<IndexedItem>, device: &B::Device) -> IndexedBatch<B> {
        let batch_size = items.len();
        let width = self.image_width;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().map(|v| (v - self.mean) / self.std))
            .collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 1, width, width]),
            device,
        );

        let labels: Vec<usize> = items.iter().map(|item| item.label).collect();
        let indices: Vec<usize> = items.iter().map(|item| item.index).collect();

        let targets_data: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        IndexedBatch {
            images,
            targets,
            labels,
            indices,
        }
    }
}
