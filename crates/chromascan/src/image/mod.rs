//! Image normalization.
//!
//! Turns a raw photographed or scanned report into a clean, upright, binarized grayscale image
//! ready for text recognition. Stages run in a fixed order:
//!
//! 1. decode and convert to 8-bit grayscale,
//! 2. deskew (line-based with contour fallback),
//! 3. contrast adjustment,
//! 4. binarization,
//! 5. optional speck removal.
//!
//! The result is deterministic for identical bytes and options.

pub mod binarize;
pub mod contrast;
pub mod denoise;
pub mod deskew;

use std::io::Cursor;

use image::{GrayImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::{ChromascanError, Result};
use crate::types::DeskewMethod;

/// Encoded image bytes plus an optional format hint.
///
/// The hint may be an extension (`"png"`, `"jpg"`, `"tiff"`) or a MIME type (`"image/png"`).
/// Unknown hints fall back to content sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub declared_format: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            declared_format: None,
        }
    }

    pub fn with_format(bytes: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            bytes,
            declared_format: Some(format.into()),
        }
    }

    /// Read an image file, taking the format hint from its extension.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let declared_format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        Ok(Self { bytes, declared_format })
    }

    fn resolved_format(&self) -> Option<ImageFormat> {
        let hint = self.declared_format.as_deref()?.trim();
        if hint.contains('/') {
            ImageFormat::from_mime_type(hint)
        } else {
            ImageFormat::from_extension(hint.trim_start_matches('.'))
        }
    }
}

/// Deskew settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskewOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_deskew_method")]
    pub method: DeskewMethod,

    /// Estimated angles at or below this magnitude are not corrected
    #[serde(default = "default_dead_zone")]
    pub dead_zone_degrees: f32,

    /// Lines or blobs tilted further than this are ignored
    #[serde(default = "default_max_angle")]
    pub max_angle_degrees: f32,
}

impl Default for DeskewOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            method: default_deskew_method(),
            dead_zone_degrees: default_dead_zone(),
            max_angle_degrees: default_max_angle(),
        }
    }
}

/// Contrast adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContrastMode {
    /// 1%/99% percentile stretch with bounded gain
    #[default]
    Auto,
    /// Scale around mid-gray by `level`
    Fixed { level: f32 },
    Disabled,
}

/// Binarization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BinarizationMode {
    /// Local-mean threshold over a `window`-sized neighbourhood
    Adaptive {
        #[serde(default = "default_window")]
        window: u32,
        #[serde(default = "default_sensitivity")]
        sensitivity: f32,
    },
    /// Global threshold: pixels darker than `threshold` become ink
    Fixed { threshold: u8 },
}

impl Default for BinarizationMode {
    fn default() -> Self {
        BinarizationMode::Adaptive {
            window: default_window(),
            sensitivity: default_sensitivity(),
        }
    }
}

/// Image normalization options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingOptions {
    #[serde(default)]
    pub deskew: DeskewOptions,

    #[serde(default)]
    pub contrast: ContrastMode,

    #[serde(default)]
    pub binarization: BinarizationMode,

    #[serde(default)]
    pub denoise: bool,

    /// Images with either side below this are rejected
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            deskew: DeskewOptions::default(),
            contrast: ContrastMode::default(),
            binarization: BinarizationMode::default(),
            denoise: false,
            min_dimension: default_min_dimension(),
        }
    }
}

impl PreprocessingOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.deskew.dead_zone_degrees >= 0.0) {
            return Err(ChromascanError::validation(
                "preprocessing.deskew.dead_zone_degrees must be non-negative",
            ));
        }
        if !(self.deskew.max_angle_degrees > 0.0 && self.deskew.max_angle_degrees <= 45.0) {
            return Err(ChromascanError::validation(format!(
                "preprocessing.deskew.max_angle_degrees must be within (0, 45], got {}",
                self.deskew.max_angle_degrees
            )));
        }
        if let ContrastMode::Fixed { level } = self.contrast
            && !(level > 0.0 && level <= 10.0)
        {
            return Err(ChromascanError::validation(format!(
                "preprocessing.contrast.level must be within (0, 10], got {}",
                level
            )));
        }
        if let BinarizationMode::Adaptive { window, sensitivity } = self.binarization {
            if window < 3 {
                return Err(ChromascanError::validation(format!(
                    "preprocessing.binarization.window must be at least 3, got {}",
                    window
                )));
            }
            if !(0.0..1.0).contains(&sensitivity) {
                return Err(ChromascanError::validation(format!(
                    "preprocessing.binarization.sensitivity must be within [0, 1), got {}",
                    sensitivity
                )));
            }
        }
        if self.min_dimension == 0 {
            return Err(ChromascanError::validation("preprocessing.min_dimension must be positive"));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_deskew_method() -> DeskewMethod {
    DeskewMethod::LineBased
}

fn default_dead_zone() -> f32 {
    0.3
}

fn default_max_angle() -> f32 {
    15.0
}

fn default_window() -> u32 {
    31
}

fn default_sensitivity() -> f32 {
    0.15
}

fn default_min_dimension() -> u32 {
    200
}

/// A binarized, upright grayscale image and what was done to produce it.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Ink is 0, background is 255
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
    /// Estimated skew in degrees, positive when baselines descend to the right
    pub skew_angle: Option<f32>,
    pub rotation_applied: bool,
    pub deskew_method: Option<DeskewMethod>,
    pub warnings: Vec<String>,
}

/// Decode a raw image and convert it to 8-bit grayscale.
pub fn decode_grayscale(raw: &RawImage) -> Result<GrayImage> {
    if raw.bytes.is_empty() {
        return Err(ChromascanError::image_decode("image buffer is empty"));
    }

    let reader = match raw.resolved_format() {
        Some(format) => ImageReader::with_format(Cursor::new(raw.bytes.as_slice()), format),
        None => ImageReader::new(Cursor::new(raw.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| ChromascanError::image_decode_with_source("Failed to read image format", e))?,
    };

    if reader.format().is_none() {
        return Err(ChromascanError::image_decode("Could not determine image format"));
    }

    let decoded = reader
        .decode()
        .map_err(|e| ChromascanError::image_decode_with_source(format!("Failed to decode image: {}", e), e))?;

    Ok(decoded.to_luma8())
}

/// Run the full normalization chain.
///
/// # Errors
///
/// - `ImageDecode` for empty, corrupt or unsupported bytes
/// - `ImageTooSmall` when either side is below `options.min_dimension`
#[tracing::instrument(skip_all, fields(bytes = raw.bytes.len()))]
pub fn normalize(raw: &RawImage, options: &PreprocessingOptions) -> Result<NormalizedImage> {
    let gray = decode_grayscale(raw)?;
    let (width, height) = gray.dimensions();

    if width < options.min_dimension || height < options.min_dimension {
        return Err(ChromascanError::ImageTooSmall {
            width,
            height,
            min_dimension: options.min_dimension,
        });
    }

    let mut warnings = Vec::new();
    let mut skew_angle = None;
    let mut rotation_applied = false;
    let mut deskew_method = None;

    let upright = if options.deskew.enabled {
        match deskew::estimate_skew(&gray, &options.deskew) {
            Some(estimate) => {
                skew_angle = Some(estimate.angle);
                deskew_method = Some(estimate.method);
                if estimate.angle.abs() > options.deskew.dead_zone_degrees {
                    rotation_applied = true;
                    tracing::debug!(angle = estimate.angle, method = ?estimate.method, "Correcting skew");
                    deskew::rotate(&gray, estimate.angle)
                } else {
                    gray
                }
            }
            None => {
                tracing::warn!("Skew could not be estimated");
                warnings.push("Skew could not be estimated; image left unrotated".to_string());
                gray
            }
        }
    } else {
        gray
    };

    let adjusted = contrast::apply(upright, options.contrast);
    let mut binary = binarize::apply(&adjusted, options.binarization);
    if options.denoise {
        let removed = denoise::remove_specks(&mut binary);
        tracing::debug!(removed, "Removed isolated specks");
    }

    Ok(NormalizedImage {
        width: binary.width(),
        height: binary.height(),
        image: binary,
        skew_angle,
        rotation_applied,
        deskew_method,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, Luma};

    fn encode_png(image: &GrayImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::codecs::png::PngEncoder::new(&mut bytes)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::L8,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_empty_bytes_is_decode_error() {
        let raw = RawImage::new(Vec::new());
        let err = normalize(&raw, &PreprocessingOptions::default()).unwrap_err();
        assert!(matches!(err, ChromascanError::ImageDecode { .. }));
    }

    #[test]
    fn test_garbage_bytes_is_decode_error() {
        let raw = RawImage::new(b"definitely not an image".to_vec());
        let err = normalize(&raw, &PreprocessingOptions::default()).unwrap_err();
        assert!(matches!(err, ChromascanError::ImageDecode { .. }));
    }

    #[test]
    fn test_wrong_declared_format_is_decode_error() {
        let image = GrayImage::from_pixel(300, 300, Luma([255]));
        let raw = RawImage::with_format(encode_png(&image), "jpeg");
        let err = normalize(&raw, &PreprocessingOptions::default()).unwrap_err();
        assert!(matches!(err, ChromascanError::ImageDecode { .. }));
    }

    #[test]
    fn test_mime_type_hint_is_honoured() {
        let image = GrayImage::from_pixel(300, 300, Luma([255]));
        let raw = RawImage::with_format(encode_png(&image), "image/png");
        assert_eq!(raw.resolved_format(), Some(ImageFormat::Png));
        assert!(decode_grayscale(&raw).is_ok());
    }

    #[test]
    fn test_small_image_rejected() {
        let image = GrayImage::from_pixel(320, 120, Luma([255]));
        let raw = RawImage::new(encode_png(&image));
        let err = normalize(&raw, &PreprocessingOptions::default()).unwrap_err();
        match err {
            ChromascanError::ImageTooSmall {
                width,
                height,
                min_dimension,
            } => {
                assert_eq!((width, height, min_dimension), (320, 120, 200));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_page_warns_about_skew() {
        let image = GrayImage::from_pixel(300, 300, Luma([255]));
        let raw = RawImage::new(encode_png(&image));
        let normalized = normalize(&raw, &PreprocessingOptions::default()).unwrap();
        assert_eq!(normalized.skew_angle, None);
        assert!(!normalized.rotation_applied);
        assert_eq!(normalized.warnings.len(), 1);
        assert!(normalized.warnings[0].contains("Skew could not be estimated"));
    }

    #[test]
    fn test_default_options_are_valid() {
        assert!(PreprocessingOptions::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sensitivity() {
        let options = PreprocessingOptions {
            binarization: BinarizationMode::Adaptive {
                window: 31,
                sensitivity: 1.5,
            },
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_large_max_angle() {
        let mut options = PreprocessingOptions::default();
        options.deskew.max_angle_degrees = 60.0;
        assert!(options.validate().is_err());
    }
}
