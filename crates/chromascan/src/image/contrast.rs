//! Contrast adjustment.

use image::GrayImage;
use imageproc::stats::cumulative_histogram;

use super::ContrastMode;

const LOW_PERCENTILE: f64 = 0.01;
const HIGH_PERCENTILE: f64 = 0.99;
const MAX_GAIN: f32 = 3.0;
const MID_GRAY: f32 = 128.0;

pub fn apply(image: GrayImage, mode: ContrastMode) -> GrayImage {
    match mode {
        ContrastMode::Auto => stretch(image),
        ContrastMode::Fixed { level } => scale(image, level),
        ContrastMode::Disabled => image,
    }
}

/// Percentile stretch: the 1st percentile maps towards black and the 99th towards white.
///
/// Gain is capped at 3x around the midpoint of the two percentiles.
fn stretch(mut image: GrayImage) -> GrayImage {
    let Some((low, high)) = percentiles(&image) else {
        return image;
    };
    if high <= low {
        return image;
    }

    let gain = (255.0 / (high - low) as f32).min(MAX_GAIN);
    let mid = (low as f32 + high as f32) / 2.0;
    let lut = lookup_table(|value| 127.5 + (value - mid) * gain);
    for pixel in image.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    image
}

fn scale(mut image: GrayImage, level: f32) -> GrayImage {
    let lut = lookup_table(|value| MID_GRAY + (value - MID_GRAY) * level);
    for pixel in image.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    image
}

fn lookup_table(map: impl Fn(f32) -> f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        *slot = map(value as f32).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn percentiles(image: &GrayImage) -> Option<(u8, u8)> {
    let total = image.as_raw().len() as u64;
    if total == 0 {
        return None;
    }

    let cumulative = cumulative_histogram(image);
    let counts = cumulative.channels.first()?;
    let low_target = ((total as f64 * LOW_PERCENTILE).ceil() as u64).max(1);
    let high_target = ((total as f64 * HIGH_PERCENTILE).ceil() as u64).max(1);

    let low = counts.iter().position(|&seen| seen as u64 >= low_target)?;
    let high = counts.iter().position(|&seen| seen as u64 >= high_target)?;
    Some((low as u8, high as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_uniform_image_unchanged() {
        let image = GrayImage::from_pixel(10, 10, Luma([90]));
        let out = apply(image.clone(), ContrastMode::Auto);
        assert_eq!(out, image);
    }

    #[test]
    fn test_disabled_is_identity() {
        let image = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 8 + y) as u8]));
        assert_eq!(apply(image.clone(), ContrastMode::Disabled), image);
    }

    #[test]
    fn test_auto_stretches_faint_scan() {
        let image = GrayImage::from_fn(100, 100, |x, _| Luma([if x < 50 { 100 } else { 160 }]));
        let out = apply(image, ContrastMode::Auto);
        let dark = out.get_pixel(10, 10)[0];
        let light = out.get_pixel(90, 10)[0];
        assert!(light - dark > 60 * 2, "dark {dark} light {light}");
    }

    #[test]
    fn test_auto_gain_is_bounded() {
        let image = GrayImage::from_fn(100, 100, |x, _| Luma([if x < 50 { 126 } else { 130 }]));
        let out = apply(image, ContrastMode::Auto);
        let dark = out.get_pixel(10, 10)[0];
        let light = out.get_pixel(90, 10)[0];
        assert!(light - dark <= 12, "dark {dark} light {light}");
    }

    #[test]
    fn test_fixed_scales_around_mid_gray() {
        let image = GrayImage::from_fn(3, 1, |x, _| Luma([[100, 128, 156][x as usize]]));
        let out = apply(image, ContrastMode::Fixed { level: 2.0 });
        assert_eq!(out.get_pixel(0, 0)[0], 72);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
        assert_eq!(out.get_pixel(2, 0)[0], 184);
    }
}
