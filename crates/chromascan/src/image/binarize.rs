//! Binarization: ink becomes 0, background becomes 255.

use image::{GrayImage, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};

use super::BinarizationMode;

pub fn apply(image: &GrayImage, mode: BinarizationMode) -> GrayImage {
    match mode {
        BinarizationMode::Adaptive { window, sensitivity } => adaptive(image, window, sensitivity),
        BinarizationMode::Fixed { threshold } => fixed(image, threshold),
    }
}

fn fixed(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Local-mean threshold computed from an integral image.
///
/// A pixel is ink when it is darker than the mean of its `window x window` neighbourhood by
/// more than `sensitivity` (as a fraction of that mean). Same block mean as
/// `imageproc::contrast::adaptive_threshold`, plus the sensitivity margin.
fn adaptive(image: &GrayImage, window: u32, sensitivity: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    // u64 sums so large scans cannot overflow.
    let integral = integral_image::<_, u64>(image);
    let half = window / 2;
    let factor = 1.0 - sensitivity as f64;

    GrayImage::from_fn(width, height, |x, y| {
        let left = x.saturating_sub(half);
        let top = y.saturating_sub(half);
        let right = (x + half).min(width - 1);
        let bottom = (y + half).min(height - 1);

        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
        let count = ((right - left + 1) * (bottom - top + 1)) as f64;
        let mean = sum as f64 / count;

        if (image.get_pixel(x, y)[0] as f64) < mean * factor {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}
