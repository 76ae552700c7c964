//! Image Folder Loader
//!
//! Discovers a labeled image tree laid out as `root/<class_name>/<image>`.
//! Class names are sorted alphabetically and become label indices; samples
//! are ordered by class and then by file name, so each sample's index is
//! stable for the lifetime of a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{Result, VisualizerError};

/// File extensions treated as images
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Whether the path has one of the known image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Ordered mapping from class folder name to label index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabelSet {
    names: Vec<String>,
}

impl ClassLabelSet {
    /// Build from class names; they are sorted so the mapping is order-stable
    pub fn new(mut names: Vec<String>) -> Self {
        names.sort();
        names.dedup();
        Self { names }
    }

    /// Read the subfolder names of `root`
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(VisualizerError::PathNotFound(root.to_path_buf()));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        Ok(Self::new(names))
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no classes
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for a label index
    pub fn name(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    /// Label index for a class name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    /// All class names in label order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single image file with its label and dataset index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Position in the dataset ordering
    pub index: usize,
}

/// A labeled image tree on disk
#[derive(Debug, Clone)]
pub struct ImageFolder {
    /// Root directory of the split
    pub root: PathBuf,
    /// Classes found under the root
    pub classes: ClassLabelSet,
    /// All samples, ordered by class then file name
    pub samples: Vec<ImageSample>,
}

impl ImageFolder {
    /// Discover all samples under `root`
    ///
    /// The directory should be structured as:
    /// ```text
    /// root/
    /// ├── airplane/
    /// │   ├── 0001.png
    /// │   └── 0002.png
    /// ├── apple/
    /// │   └── ...
    /// └── ...
    /// ```
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("Loading image folder from: {:?}", root);

        let classes = ClassLabelSet::from_dir(&root)?;
        if classes.is_empty() {
            return Err(VisualizerError::Dataset(format!(
                "No class folders found in {:?}",
                root
            )));
        }

        let mut samples = Vec::new();
        for (label, class_name) in classes.names().iter().enumerate() {
            let class_dir = root.join(class_name);

            let mut files: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            files.sort();

            if files.is_empty() {
                return Err(VisualizerError::Dataset(format!(
                    "Class folder {:?} contains no images",
                    class_dir
                )));
            }

            debug!("Class '{}' (label {}): {} images", class_name, label, files.len());

            for path in files {
                let index = samples.len();
                samples.push(ImageSample { path, label, index });
            }
        }

        info!(
            "Loaded {} samples across {} classes",
            samples.len(),
            classes.len()
        );

        Ok(Self {
            root,
            classes,
            samples,
        })
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the folder has no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Samples per class, in label order
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }
}
