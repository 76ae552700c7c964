//! Augmentation of a single 100x100 source image.

use std::fs;

use image::{GenericImageView, ImageFormat};
use tempfile::TempDir;

use cnn_timelapse::{AugmentationConfig, ImageAugmenter};

#[test]
fn test_single_image_gets_four_variants() {
    let dir = TempDir::new().unwrap();
    let class_dir = dir.path().join("apple");
    fs::create_dir_all(&class_dir).unwrap();

    let mut img = image::RgbImage::from_pixel(100, 100, image::Rgb([255, 255, 255]));
    for x in 30..70 {
        for y in 40..60 {
            img.put_pixel(x, y, image::Rgb([200, 20, 20]));
        }
    }
    let source = class_dir.join("apple_1.png");
    img.save(&source).unwrap();

    let config = AugmentationConfig {
        root: dir.path().to_path_buf(),
        class_folders: vec!["apple".to_string()],
        seed: Some(7),
        ..Default::default()
    };
    let summary = ImageAugmenter::new(config.clone()).augment_folders().unwrap();

    assert_eq!(summary.source_images, 1);
    assert_eq!(summary.written.len(), 4);

    for suffix in ["_flipped", "_rotated", "_shifted", "_scaled"] {
        let path = class_dir.join(format!("apple_1{suffix}.png"));
        assert!(path.exists(), "missing {}", path.display());
        assert_eq!(ImageFormat::from_path(&path).unwrap(), ImageFormat::Png);

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.dimensions(), (100, 100));
    }

    let files = fs::read_dir(&class_dir).unwrap().count();
    assert_eq!(files, 5);

    // Variants written by the first pass are not augmented again
    let rerun = ImageAugmenter::new(config).augment_folders().unwrap();
    assert_eq!(rerun.source_images, 1);
    assert_eq!(fs::read_dir(&class_dir).unwrap().count(), 5);
}

#[test]
fn test_missing_class_folder_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = AugmentationConfig {
        root: dir.path().to_path_buf(),
        class_folders: vec!["banana".to_string()],
        seed: Some(1),
        ..Default::default()
    };
    assert!(ImageAugmenter::new(config).augment_folders().is_err());
}
