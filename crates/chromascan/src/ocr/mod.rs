//! Text recognition.
//!
//! The pipeline talks to recognition through [`RecognitionEngine`], so any backend that can
//! turn a [`NormalizedImage`] into positioned words can be plugged in. The `tesseract` feature
//! provides a native implementation.

pub mod layout;
#[cfg(feature = "tesseract")]
pub mod tesseract;
pub mod tsv;

use crate::error::Result;
use crate::image::NormalizedImage;
use crate::types::TextRegion;

pub use layout::{group_rows, sort_reading_order};
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
pub use tsv::parse_tsv_regions;

/// Converts a normalized image into text regions.
///
/// Implementations must:
/// - return regions in reading order (top-to-bottom, then left-to-right)
/// - report the engine's own per-region confidence in `[0, 1]`, unmodified otherwise
/// - fail with `EngineUnavailable` when the engine cannot be initialized
///
/// Unreadable areas produce no region or a low-confidence region, never an error.
pub trait RecognitionEngine: Send + Sync {
    /// Engine name recorded in result diagnostics.
    fn name(&self) -> &str;

    fn recognize(&self, image: &NormalizedImage) -> Result<Vec<TextRegion>>;
}
