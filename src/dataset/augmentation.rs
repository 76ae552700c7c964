//! Offline Data Augmentation
//!
//! Writes four augmented siblings next to every image of a fixed list of
//! class folders: a horizontal flip, a small rotation, a shift and a
//! rescale. Every variant keeps the source's pixel dimensions, colour type
//! and file format; uncovered areas are filled with white.
//!
//! This pass is independent of training: it only reads and writes files.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::loader::is_image_file;
use crate::utils::error::{Result, VisualizerError};
use crate::utils::logging::ProgressLogger;

/// File-name suffixes of the generated variants, in write order
pub const AUGMENTATION_SUFFIXES: [&str; 4] = ["_flipped", "_rotated", "_shifted", "_scaled"];

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Configuration for the augmentation pass
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Directory holding the class folders
    pub root: PathBuf,
    /// Class folders to augment
    pub class_folders: Vec<String>,
    /// Smallest absolute rotation in whole degrees
    pub rotation_min_degrees: i32,
    /// Largest absolute rotation in whole degrees
    pub rotation_max_degrees: i32,
    /// Smallest absolute shift per axis, in pixels
    pub shift_min: f32,
    /// Largest absolute shift per axis, in pixels
    pub shift_max: f32,
    /// Scale factor range when shrinking
    pub shrink_range: (f32, f32),
    /// Scale factor range when growing
    pub grow_range: (f32, f32),
    /// Seed for the random parameters (fresh entropy when unset)
    pub seed: Option<u64>,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/train_diff_trans"),
            class_folders: [
                "airplane",
                "alarm clock",
                "angel",
                "ant",
                "apple",
                "banana",
                "basket",
                "bed",
                "bell",
                "calculator",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rotation_min_degrees: 3,
            rotation_max_degrees: 20,
            shift_min: 20.0,
            shift_max: 100.0,
            shrink_range: (0.75, 0.9),
            grow_range: (1.1, 1.25),
            seed: None,
        }
    }
}

impl AugmentationConfig {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        let ranges_ok = self.rotation_min_degrees <= self.rotation_max_degrees
            && self.shift_min <= self.shift_max
            && self.shrink_range.0 > 0.0
            && self.shrink_range.0 <= self.shrink_range.1
            && self.grow_range.0 <= self.grow_range.1;

        if ranges_ok {
            Ok(())
        } else {
            Err(VisualizerError::Config(
                "augmentation ranges must be ordered (min <= max) and scale factors positive"
                    .to_string(),
            ))
        }
    }
}

/// Result of an augmentation pass
#[derive(Debug, Clone, Default)]
pub struct AugmentationSummary {
    /// Class folders visited
    pub folders: usize,
    /// Source images augmented
    pub source_images: usize,
    /// Every file written
    pub written: Vec<PathBuf>,
}

/// Whether a file is itself the output of a previous pass
pub fn is_augmented_output(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| {
            let stem = stem.to_string_lossy();
            AUGMENTATION_SUFFIXES.iter().any(|s| stem.ends_with(s))
        })
        .unwrap_or(false)
}

/// Sibling path `<stem><suffix>.<ext>` of `source`
pub fn variant_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    source.with_file_name(name)
}

/// Image augmenter producing the four fixed variants
pub struct ImageAugmenter {
    config: AugmentationConfig,
    rng: ChaCha8Rng,
}

impl ImageAugmenter {
    /// Create a new augmenter with the given configuration
    pub fn new(config: AugmentationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Mirror left to right
    pub fn flipped(&self, img: &DynamicImage) -> DynamicImage {
        img.fliph()
    }

    /// Rotate counter-clockwise by `angle_degrees` around the centre
    pub fn rotated(&self, img: &DynamicImage, angle_degrees: f32) -> DynamicImage {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let (sin_a, cos_a) = angle_degrees.to_radians().sin_cos();
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;

        let output = RgbaImage::from_fn(width, height, |x, y| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;

            let src_x = cx + dx * cos_a + dy * sin_a - 0.5;
            let src_y = cy - dx * sin_a + dy * cos_a - 0.5;

            bilinear_sample(&rgba, src_x, src_y)
        });

        restore_colour(output, img)
    }

    /// Move the content by `(dx, dy)` pixels (positive: right / down)
    pub fn shifted(&self, img: &DynamicImage, dx: i64, dy: i64) -> DynamicImage {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let output = RgbaImage::from_fn(width, height, |x, y| {
            let src_x = x as i64 - dx;
            let src_y = y as i64 - dy;
            if src_x >= 0 && src_y >= 0 && src_x < width as i64 && src_y < height as i64 {
                *rgba.get_pixel(src_x as u32, src_y as u32)
            } else {
                WHITE
            }
        });

        restore_colour(output, img)
    }

    /// Rescale the content by `factor` and crop or pad back to the source size
    pub fn scaled(&self, img: &DynamicImage, factor: f32) -> DynamicImage {
        let (width, height) = img.dimensions();
        let new_w = ((width as f32 * factor).round() as u32).max(1);
        let new_h = ((height as f32 * factor).round() as u32).max(1);

        let resized = image::imageops::resize(
            &img.to_rgba8(),
            new_w,
            new_h,
            image::imageops::FilterType::CatmullRom,
        );

        let mut canvas = RgbaImage::from_pixel(width, height, WHITE);
        // Negative offsets crop the enlarged image around its centre
        let left = (width as i64 - new_w as i64) / 2;
        let top = (height as i64 - new_h as i64) / 2;
        image::imageops::overlay(&mut canvas, &resized, left, top);

        restore_colour(canvas, img)
    }

    fn random_angle(&mut self) -> f32 {
        let magnitude = self
            .rng
            .gen_range(self.config.rotation_min_degrees..=self.config.rotation_max_degrees);
        let sign = if self.rng.gen_bool(0.5) { 1 } else { -1 };
        (sign * magnitude) as f32
    }

    fn random_shift(&mut self) -> i64 {
        let magnitude = self
            .rng
            .gen_range(self.config.shift_min..=self.config.shift_max);
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        (sign * magnitude).round() as i64
    }

    fn random_scale(&mut self) -> f32 {
        let (lo, hi) = if self.rng.gen_bool(0.5) {
            self.config.shrink_range
        } else {
            self.config.grow_range
        };
        self.rng.gen_range(lo..=hi)
    }

    /// Write the four variants of one image and return their paths
    pub fn augment_file(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        let format = ImageFormat::from_path(path)
            .map_err(|e| VisualizerError::ImageLoadError(path.to_path_buf(), e.to_string()))?;
        let img = image::open(path)
            .map_err(|e| VisualizerError::ImageLoadError(path.to_path_buf(), e.to_string()))?;

        let angle = self.random_angle();
        let (dx, dy) = (self.random_shift(), self.random_shift());
        let factor = self.random_scale();
        debug!(
            "Augmenting {:?}: angle {}, shift ({}, {}), scale {:.3}",
            path, angle, dx, dy, factor
        );

        let variants = [
            self.flipped(&img),
            self.rotated(&img, angle),
            self.shifted(&img, dx, dy),
            self.scaled(&img, factor),
        ];

        let mut written = Vec::with_capacity(variants.len());
        for (variant, suffix) in variants.iter().zip(AUGMENTATION_SUFFIXES) {
            let out = variant_path(path, suffix);
            encodable(variant, format)
                .save_with_format(&out, format)
                .map_err(|e| VisualizerError::ImageSaveError(out.clone(), e.to_string()))?;
            written.push(out);
        }

        Ok(written)
    }

    /// Augment every source image in the configured class folders
    pub fn augment_folders(&mut self) -> Result<AugmentationSummary> {
        self.config.validate()?;

        // Collect sources first so freshly written variants are not revisited
        let mut sources = Vec::new();
        for folder in &self.config.class_folders {
            let dir = self.config.root.join(folder);
            if !dir.is_dir() {
                return Err(VisualizerError::PathNotFound(dir));
            }

            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_image_file(p) && !is_augmented_output(p))
                .collect();
            files.sort();

            debug!("Folder {:?}: {} source images", dir, files.len());
            sources.extend(files);
        }

        let mut summary = AugmentationSummary {
            folders: self.config.class_folders.len(),
            ..Default::default()
        };

        let mut progress = ProgressLogger::new("Augmenting", sources.len());
        for source in &sources {
            let written = self.augment_file(source)?;
            summary.written.extend(written);
            summary.source_images += 1;
            progress.increment();
        }
        progress.finish();

        info!(
            "Augmented {} images in {} folders ({} files written)",
            summary.source_images,
            summary.folders,
            summary.written.len()
        );

        Ok(summary)
    }
}

/// Sample a pixel using bilinear interpolation; outside the image is white
fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (width, height) = img.dimensions();

    if x < -0.5 || y < -0.5 || x > width as f32 - 0.5 || y > height as f32 - 0.5 {
        return WHITE;
    }

    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 4];
    for c in 0..4 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;

        result[c] = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgba(result)
}

/// Convert an RGBA working buffer back to the colour type of `like`
fn restore_colour(img: RgbaImage, like: &DynamicImage) -> DynamicImage {
    let rgba = DynamicImage::ImageRgba8(img);
    match like {
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(rgba.to_luma8()),
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLumaA8(rgba.to_luma_alpha8()),
        DynamicImage::ImageRgb8(_) => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma16(rgba.to_luma16()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA16(rgba.to_luma_alpha16()),
        DynamicImage::ImageRgb16(_) => DynamicImage::ImageRgb16(rgba.to_rgb16()),
        DynamicImage::ImageRgba16(_) => DynamicImage::ImageRgba16(rgba.to_rgba16()),
        DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb32F(rgba.to_rgb32f()),
        DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba32F(rgba.to_rgba32f()),
        _ => rgba,
    }
}

/// Drop what the target encoder cannot store (JPEG: alpha and 16-bit samples)
fn encodable(img: &DynamicImage, format: ImageFormat) -> DynamicImage {
    match (format, img) {
        (ImageFormat::Jpeg, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => img.clone(),
        (ImageFormat::Jpeg, DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageLuma8(img.to_luma8())
        }
        (ImageFormat::Jpeg, _) => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn create_test_image() -> DynamicImage {
        // Black vertical bar on white
        let img = GrayImage::from_fn(20, 10, |x, _| if x < 5 { Luma([0]) } else { Luma([255]) });
        DynamicImage::ImageLuma8(img)
    }

    fn seeded() -> ImageAugmenter {
        ImageAugmenter::new(AugmentationConfig {
            seed: Some(7),
            ..Default::default()
        })
    }

    #[test]
    fn test_flip_moves_bar_to_the_right() {
        let aug = seeded();
        let flipped = aug.flipped(&create_test_image()).to_luma8();
        assert_eq!(flipped.get_pixel(0, 0)[0], 255);
        assert_eq!(flipped.get_pixel(19, 0)[0], 0);
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let aug = seeded();
        let img = create_test_image();
        let rotated = aug.rotated(&img, 0.0);
        assert_eq!(rotated.to_luma8(), img.to_luma8());
    }

    #[test]
    fn test_rotation_keeps_size_and_colour_type() {
        let aug = seeded();
        let rotated = aug.rotated(&create_test_image(), 15.0);
        assert_eq!(rotated.dimensions(), (20, 10));
        assert!(matches!(rotated, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_sixteen_bit_source_keeps_colour_type() {
        let aug = seeded();
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
            12,
            8,
            image::Rgb([65535u16, 0, 0]),
        ));

        for variant in [
            aug.rotated(&img, 5.0),
            aug.shifted(&img, 2, 1),
            aug.scaled(&img, 0.8),
        ] {
            assert!(matches!(variant, DynamicImage::ImageRgb16(_)));
            assert_eq!(variant.dimensions(), (12, 8));
        }

        let grey = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(6, 6, Luma([1000u16])));
        assert!(matches!(aug.shifted(&grey, 1, 1), DynamicImage::ImageLuma16(_)));
    }

    #[test]
    fn test_sixteen_bit_png_written_as_sixteen_bit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep.png");
        image::ImageBuffer::<image::Rgba<u16>, _>::from_pixel(16, 16, image::Rgba([0u16, 40000, 0, 65535]))
            .save(&path)
            .unwrap();

        let written = seeded().augment_file(&path).unwrap();
        assert_eq!(written.len(), 4);
        for out in written {
            let decoded = image::open(&out).unwrap();
            assert!(matches!(decoded, DynamicImage::ImageRgba16(_)), "{}", out.display());
        }
    }

    #[test]
    fn test_jpeg_targets_have_no_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, WHITE));
        assert!(matches!(encodable(&rgba, ImageFormat::Jpeg), DynamicImage::ImageRgb8(_)));
        assert!(matches!(encodable(&rgba, ImageFormat::Png), DynamicImage::ImageRgba8(_)));

        let deep = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(4, 4, image::Rgb([1u16, 2, 3])));
        assert!(matches!(encodable(&deep, ImageFormat::Jpeg), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_shift_fills_with_white() {
        let aug = seeded();
        let shifted = aug.shifted(&create_test_image(), 3, 0).to_luma8();
        // Bar moved right by three pixels; vacated columns are white
        assert_eq!(shifted.get_pixel(0, 5)[0], 255);
        assert_eq!(shifted.get_pixel(3, 5)[0], 0);
        assert_eq!(shifted.get_pixel(8, 5)[0], 255);
    }

    #[test]
    fn test_scale_keeps_dimensions() {
        let aug = seeded();
        let img = create_test_image();
        assert_eq!(aug.scaled(&img, 0.8).dimensions(), (20, 10));
        assert_eq!(aug.scaled(&img, 1.2).dimensions(), (20, 10));
    }

    #[test]
    fn test_random_parameters_stay_in_range() {
        let mut aug = seeded();
        for _ in 0..200 {
            let angle = aug.random_angle().abs();
            assert!((3.0..=20.0).contains(&angle));

            let shift = aug.random_shift().abs();
            assert!((20..=100).contains(&shift));

            let factor = aug.random_scale();
            assert!((0.75..=0.9).contains(&factor) || (1.1..=1.25).contains(&factor));
        }
    }

    #[test]
    fn test_variant_path_and_output_detection() {
        let p = Path::new("data/cat/001.png");
        let v = variant_path(p, "_rotated");
        assert_eq!(v, PathBuf::from("data/cat/001_rotated.png"));
        assert!(is_augmented_output(&v));
        assert!(!is_augmented_output(p));
    }

    #[test]
    fn test_missing_class_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut aug = ImageAugmenter::new(AugmentationConfig {
            root: dir.path().to_path_buf(),
            class_folders: vec!["ghost".to_string()],
            seed: Some(1),
            ..Default::default()
        });
        assert!(matches!(
            aug.augment_folders(),
            Err(VisualizerError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_rerun_does_not_augment_outputs() {
        let dir = TempDir::new().unwrap();
        let class_dir = dir.path().join("ant");
        std::fs::create_dir_all(&class_dir).unwrap();
        create_test_image().save(class_dir.join("a.png")).unwrap();

        let config = AugmentationConfig {
            root: dir.path().to_path_buf(),
            class_folders: vec!["ant".to_string()],
            seed: Some(3),
            ..Default::default()
        };

        let first = ImageAugmenter::new(config.clone()).augment_folders().unwrap();
        assert_eq!(first.source_images, 1);
        assert_eq!(first.written.len(), 4);

        let second = ImageAugmenter::new(config).augment_folders().unwrap();
        assert_eq!(second.source_images, 1);
        assert_eq!(std::fs::read_dir(&class_dir).unwrap().count(), 5);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let config = AugmentationConfig {
            shift_min: 50.0,
            shift_max: 10.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
