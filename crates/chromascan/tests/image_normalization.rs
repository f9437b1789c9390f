//! Image normalization integration tests.

use chromascan::image::{BinarizationMode, ContrastMode, normalize};
use chromascan::{ChromascanError, DeskewMethod, PreprocessingOptions, RawImage};
use image::Luma;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

mod helpers;
use helpers::{blank_page, encode_png, ruled_page};

fn without_deskew() -> PreprocessingOptions {
    let mut options = PreprocessingOptions::default();
    options.deskew.enabled = false;
    options
}

#[test]
fn test_upright_page_matches_deskew_disabled_output() {
    let raw = RawImage::with_format(encode_png(&ruled_page(640, 480)), "png");

    let corrected = normalize(&raw, &PreprocessingOptions::default()).unwrap();
    let untouched = normalize(&raw, &without_deskew()).unwrap();

    assert!(!corrected.rotation_applied);
    assert_eq!(corrected.skew_angle, Some(0.0));
    assert_eq!(corrected.image.as_raw(), untouched.image.as_raw());
}

#[test]
fn test_skew_inside_dead_zone_is_left_alone() {
    let tilted = rotate_about_center(
        &ruled_page(640, 480),
        0.1_f32.to_radians(),
        Interpolation::Bilinear,
        Luma([255]),
    );
    let raw = RawImage::new(encode_png(&tilted));

    let corrected = normalize(&raw, &PreprocessingOptions::default()).unwrap();
    let untouched = normalize(&raw, &without_deskew()).unwrap();

    assert!(!corrected.rotation_applied);
    assert!(corrected.skew_angle.is_some_and(|angle| angle.abs() <= 0.3));
    assert_eq!(corrected.image.as_raw(), untouched.image.as_raw());
}

#[test]
fn test_tilted_page_is_rotated() {
    let tilted = rotate_about_center(
        &ruled_page(640, 480),
        3.0_f32.to_radians(),
        Interpolation::Bilinear,
        Luma([255]),
    );
    let raw = RawImage::new(encode_png(&tilted));

    let normalized = normalize(&raw, &PreprocessingOptions::default()).unwrap();
    assert!(normalized.rotation_applied);
    assert_eq!(normalized.deskew_method, Some(DeskewMethod::LineBased));
    let angle = normalized.skew_angle.unwrap();
    assert!((angle - 3.0).abs() <= 0.5, "estimated {}", angle);
    assert_eq!((normalized.width, normalized.height), (640, 480));
}

#[test]
fn test_blank_page_warns_when_skew_unknown() {
    let normalized = normalize(&blank_page(300, 300), &PreprocessingOptions::default()).unwrap();
    assert!(normalized.skew_angle.is_none());
    assert!(!normalized.rotation_applied);
    assert!(normalized.warnings.iter().any(|w| w.contains("Skew could not be estimated")));
}

#[test]
fn test_output_is_binary() {
    let raw = RawImage::with_format(encode_png(&ruled_page(400, 300)), "png");
    let options = PreprocessingOptions {
        contrast: ContrastMode::Disabled,
        binarization: BinarizationMode::Fixed { threshold: 128 },
        ..without_deskew()
    };
    let normalized = normalize(&raw, &options).unwrap();
    assert!(normalized.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    assert!(normalized.image.pixels().any(|p| p.0[0] == 0));
}

#[test]
fn test_decode_failures() {
    let empty = normalize(&RawImage::new(Vec::new()), &PreprocessingOptions::default());
    assert!(matches!(empty, Err(ChromascanError::ImageDecode { .. })));

    let garbage = normalize(&RawImage::new(vec![0u8; 64]), &PreprocessingOptions::default());
    assert!(matches!(garbage, Err(ChromascanError::ImageDecode { .. })));
}

#[test]
fn test_min_dimension_is_configurable() {
    let options = PreprocessingOptions {
        min_dimension: 100,
        ..without_deskew()
    };
    assert!(normalize(&blank_page(150, 120), &options).is_ok());
    assert!(matches!(
        normalize(&blank_page(150, 90), &options),
        Err(ChromascanError::ImageTooSmall { .. })
    ));
}
