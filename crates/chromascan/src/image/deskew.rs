//! Skew estimation and correction.
//!
//! Angles are in degrees and positive when text baselines descend to the right (a clockwise
//! tilt on screen). Correcting an angle rotates the image back by the same amount.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::geometry::min_area_rect;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};

use super::DeskewOptions;
use crate::types::DeskewMethod;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 100.0;
const MIN_VOTES: u32 = 40;
const SUPPRESSION_RADIUS: u32 = 8;
const MIN_STRONG_LINES: usize = 2;
const REFINE_SPAN_DEGREES: f32 = 1.5;
const REFINE_STEP_DEGREES: f32 = 0.1;
const INK_THRESHOLD: u8 = 128;
const MIN_CONTOUR_POINTS: usize = 10;
const MIN_BLOB_ASPECT: f32 = 2.0;
const MIN_BLOBS: usize = 3;

/// An estimated skew angle and the method that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewEstimate {
    pub angle: f32,
    pub method: DeskewMethod,
}

/// Estimate the skew of a grayscale page.
///
/// Line-based estimation falls back to contour orientation when too few strong lines are
/// found. Returns `None` when neither method has enough evidence.
pub fn estimate_skew(gray: &GrayImage, options: &DeskewOptions) -> Option<SkewEstimate> {
    if options.method == DeskewMethod::LineBased {
        if let Some(angle) = estimate_line_based(gray, options.max_angle_degrees) {
            return Some(SkewEstimate {
                angle,
                method: DeskewMethod::LineBased,
            });
        }
        tracing::debug!("Too few strong lines, falling back to contour orientation");
    }

    estimate_contour_based(gray, options.max_angle_degrees).map(|angle| SkewEstimate {
        angle,
        method: DeskewMethod::ContourBased,
    })
}

/// Rotate the page back by `angle` degrees, filling exposed corners with white.
pub fn rotate(gray: &GrayImage, angle: f32) -> GrayImage {
    rotate_about_center(gray, -angle.to_radians(), Interpolation::Bilinear, Luma([255]))
}

fn estimate_line_based(gray: &GrayImage, max_angle: f32) -> Option<f32> {
    let edges = canny(gray, CANNY_LOW, CANNY_HIGH);
    let options = LineDetectionOptions {
        vote_threshold: (gray.width() / 4).max(MIN_VOTES),
        suppression_radius: SUPPRESSION_RADIUS,
    };

    let mut angles: Vec<f32> = detect_lines(&edges, options)
        .iter()
        .filter_map(line_skew)
        .filter(|angle| angle.abs() <= max_angle)
        .collect();

    tracing::debug!(lines = angles.len(), "Hough line candidates");
    if angles.len() < MIN_STRONG_LINES {
        return None;
    }

    let coarse = median(&mut angles)?;
    Some(refine_with_projection(gray, coarse))
}

/// Skew implied by a Hough line, folding near-vertical lines onto the horizontal axis.
fn line_skew(line: &PolarLine) -> Option<f32> {
    let theta = line.angle_in_degrees as f32;
    if (45.0..135.0).contains(&theta) {
        Some(theta - 90.0)
    } else if theta < 45.0 {
        Some(theta)
    } else if theta < 180.0 {
        Some(theta - 180.0)
    } else {
        None
    }
}

/// Search around `coarse` for the angle whose row projection of ink is sharpest.
///
/// Candidates are tried in order of increasing magnitude and only a strictly better score
/// replaces the current best, so an upright page resolves to exactly zero.
fn refine_with_projection(gray: &GrayImage, coarse: f32) -> f32 {
    let ink: Vec<(f32, f32)> = gray
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[0] < INK_THRESHOLD)
        .map(|(x, y, _)| (x as f32, y as f32))
        .collect();

    if ink.is_empty() {
        return coarse;
    }

    let lo = ((coarse - REFINE_SPAN_DEGREES) / REFINE_STEP_DEGREES).round() as i32;
    let hi = ((coarse + REFINE_SPAN_DEGREES) / REFINE_STEP_DEGREES).round() as i32;
    let mut steps: Vec<i32> = (lo..=hi).collect();
    steps.sort_by_key(|step| (step.abs(), *step));

    let mut best_step = steps[0];
    let mut best_score = f64::MIN;
    for step in steps {
        let angle = step as f32 * REFINE_STEP_DEGREES;
        let score = projection_variance(&ink, gray.height(), angle);
        if score > best_score {
            best_score = score;
            best_step = step;
        }
    }

    best_step as f32 * REFINE_STEP_DEGREES
}

fn projection_variance(ink: &[(f32, f32)], height: u32, angle: f32) -> f64 {
    let (sin, cos) = angle.to_radians().sin_cos();
    let margin = height as i64;
    let mut bins = vec![0u32; (height as usize) * 3];

    for &(x, y) in ink {
        let projected = (y * cos - x * sin).round() as i64 + margin;
        if projected >= 0 && (projected as usize) < bins.len() {
            bins[projected as usize] += 1;
        }
    }

    let n = bins.len() as f64;
    let mean = bins.iter().map(|&b| b as f64).sum::<f64>() / n;
    bins.iter()
        .map(|&b| {
            let diff = b as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n
}

fn estimate_contour_based(gray: &GrayImage, max_angle: f32) -> Option<f32> {
    let threshold = imageproc::contrast::otsu_level(gray);
    let mut foreground = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel[0] < threshold {
            foreground.put_pixel(x, y, Luma([255]));
        }
    }

    let mut angles: Vec<f32> = find_contours::<i32>(&foreground)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter(|contour| contour.points.len() >= MIN_CONTOUR_POINTS)
        .filter_map(|contour| blob_orientation(&contour.points))
        .filter(|angle| angle.abs() <= max_angle)
        .collect();

    tracing::debug!(blobs = angles.len(), "Elongated blob candidates");
    if angles.len() < MIN_BLOBS {
        return None;
    }

    median(&mut angles).map(|angle| (angle / REFINE_STEP_DEGREES).round() * REFINE_STEP_DEGREES)
}

/// Orientation of the long side of an elongated blob's minimum-area rectangle.
fn blob_orientation(points: &[imageproc::point::Point<i32>]) -> Option<f32> {
    let corners = min_area_rect(points);
    let side = |a: usize, b: usize| {
        let dx = (corners[b].x - corners[a].x) as f32;
        let dy = (corners[b].y - corners[a].y) as f32;
        (dx, dy, (dx * dx + dy * dy).sqrt())
    };

    let first = side(0, 1);
    let second = side(1, 2);
    let (long, short) = if first.2 >= second.2 { (first, second) } else { (second, first) };
    if short.2 <= f32::EPSILON || long.2 / short.2 < MIN_BLOB_ASPECT {
        return None;
    }

    let mut angle = long.1.atan2(long.0).to_degrees();
    if angle > 90.0 {
        angle -= 180.0;
    } else if angle <= -90.0 {
        angle += 180.0;
    }
    Some(angle)
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
