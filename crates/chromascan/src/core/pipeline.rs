//! Per-image processing pipeline.
//!
//! Stages run in a fixed order: normalization, recognition, field extraction, confidence
//! aggregation and assembly. Extractors fan out over the same immutable region slice with
//! rayon and their outputs are collected in composition order, so results do not depend on
//! thread scheduling.

use std::hash::Hasher;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHasher;
use rayon::prelude::*;

use crate::assembler::{AssemblyInput, ResultAssembler};
use crate::bridge::{BridgeOutcome, ValidationPolicy, validate_and_bridge};
use crate::confidence::ConfidenceAggregator;
use crate::core::config::{BatchConfig, ChromascanConfig, RecognitionConfig};
use crate::error::Result;
use crate::extraction::{Extraction, FieldExtractor, default_extractors};
use crate::image::{PreprocessingOptions, RawImage, normalize};
use crate::ocr::RecognitionEngine;
use crate::types::ProcessingResult;

/// A configured pipeline. Cheap to clone; holds no per-run state.
#[derive(Clone)]
pub struct Pipeline {
    engine: Arc<dyn RecognitionEngine>,
    extractors: Vec<Arc<dyn FieldExtractor>>,
    aggregator: ConfidenceAggregator,
    assembler: ResultAssembler,
    policy: ValidationPolicy,
    preprocessing: PreprocessingOptions,
    batch: BatchConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine", &self.engine.name())
            .field(
                "extractors",
                &self.extractors.iter().map(|e| e.name().to_string()).collect::<Vec<_>>(),
            )
            .field("aggregator", &self.aggregator)
            .field("policy", &self.policy)
            .field("preprocessing", &self.preprocessing)
            .field("batch", &self.batch)
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline with the native recognition engine.
    ///
    /// # Errors
    ///
    /// - `Validation` for out-of-range settings or unreadable dictionaries
    /// - `EngineUnavailable` when no recognition engine can be set up
    pub fn from_config(config: &ChromascanConfig) -> Result<Self> {
        let engine = default_engine(&config.recognition)?;
        Self::with_engine(engine, config)
    }

    /// Build a pipeline around a caller-supplied engine.
    pub fn with_engine(engine: Arc<dyn RecognitionEngine>, config: &ChromascanConfig) -> Result<Self> {
        config.validate()?;
        let extractors = default_extractors(&config.extraction)?;

        Ok(Self {
            engine,
            extractors,
            aggregator: ConfidenceAggregator::new(config.confidence.clone()),
            assembler: ResultAssembler,
            policy: config.validation.clone(),
            preprocessing: config.preprocessing.clone(),
            batch: config.batch.clone(),
        })
    }

    /// Replace the extractor set. Composition order is the order given.
    pub fn with_extractors(mut self, extractors: Vec<Arc<dyn FieldExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn preprocessing(&self) -> &PreprocessingOptions {
        &self.preprocessing
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch
    }

    /// Process one image into a [`ProcessingResult`].
    ///
    /// Soft gaps (unreadable fields, dropped rows, failed skew estimation) become warnings
    /// on the result. No validation is applied here; see [`Pipeline::validate`].
    ///
    /// # Errors
    ///
    /// - `Validation` when `options` are out of range
    /// - `ImageDecode` for empty, corrupt or unsupported image bytes
    /// - `ImageTooSmall` when a side is below `options.min_dimension`
    /// - `EngineUnavailable` when recognition cannot run
    #[tracing::instrument(skip_all, fields(engine = self.engine.name(), bytes = raw.bytes.len()))]
    pub fn process(&self, raw: RawImage, options: &PreprocessingOptions) -> Result<ProcessingResult> {
        options.validate()?;
        let start = Instant::now();
        let source_fingerprint = fingerprint(&raw.bytes);

        let image = normalize(&raw, options)?;
        drop(raw);
        tracing::debug!(
            width = image.width,
            height = image.height,
            skew = ?image.skew_angle,
            rotated = image.rotation_applied,
            "Image normalized"
        );

        let regions = self.engine.recognize(&image)?;
        tracing::debug!(regions = regions.len(), "Text recognized");

        let extractions: Vec<Extraction> = self
            .extractors
            .par_iter()
            .map(|extractor| extractor.extract(&regions))
            .collect();

        for extraction in &extractions {
            for warning in &extraction.warnings {
                tracing::warn!(group = %extraction.group, "{}", warning);
            }
        }

        let confidence = self.aggregator.aggregate(&regions, &extractions);

        let result = self.assembler.assemble(AssemblyInput {
            image: &image,
            engine: self.engine.name(),
            source_fingerprint,
            regions,
            extractions,
            confidence,
            elapsed: start.elapsed(),
        });

        tracing::info!(
            peaks = result.peaks.len(),
            overall_confidence = result.overall_confidence,
            warnings = result.warnings.len(),
            elapsed_ms = result.processing_time_ms,
            "Image processed"
        );

        Ok(result)
    }

    /// Read and process an image file with the configured preprocessing options.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<ProcessingResult> {
        let raw = RawImage::from_path(path)?;
        self.process(raw, &self.preprocessing)
    }

    /// Apply the configured validation policy to a result.
    pub fn validate(&self, result: &ProcessingResult) -> BridgeOutcome {
        validate_and_bridge(result, &self.policy)
    }
}

/// Hex digest of the source bytes, recorded in diagnostics.
fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = AHasher::default();
    hasher.write(bytes);
    format!("{:016x}", hasher.finish())
}

#[cfg(feature = "tesseract")]
fn default_engine(config: &RecognitionConfig) -> Result<Arc<dyn RecognitionEngine>> {
    Ok(Arc::new(crate::ocr::TesseractEngine::new(config)?))
}

#[cfg(not(feature = "tesseract"))]
fn default_engine(config: &RecognitionConfig) -> Result<Arc<dyn RecognitionEngine>> {
    Err(crate::error::ChromascanError::engine_unavailable(format!(
        "No recognition engine compiled in (language '{}'); enable the `tesseract` feature or use Pipeline::with_engine",
        config.language
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChromascanError;
    use crate::image::{BinarizationMode, NormalizedImage};
    use crate::types::{BoundingBox, FieldGroup, TextRegion};
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    struct StaticEngine(Vec<TextRegion>);

    impl RecognitionEngine for StaticEngine {
        fn name(&self) -> &str {
            "static"
        }

        fn recognize(&self, _image: &NormalizedImage) -> Result<Vec<TextRegion>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenEngine;

    impl RecognitionEngine for BrokenEngine {
        fn name(&self) -> &str {
            "broken"
        }

        fn recognize(&self, _image: &NormalizedImage) -> Result<Vec<TextRegion>> {
            Err(ChromascanError::engine_unavailable("no language data"))
        }
    }

    fn blank_png(side: u32) -> RawImage {
        let image = GrayImage::from_pixel(side, side, Luma([255]));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        RawImage::with_format(bytes, "png")
    }

    fn word(text: &str, x: u32, y: u32) -> TextRegion {
        TextRegion::new(text, BoundingBox::new(x, y, 40, 12), 0.9)
    }

    fn table_regions() -> Vec<TextRegion> {
        vec![
            word("RT", 10, 10),
            word("Area", 110, 10),
            word("1.25", 10, 40),
            word("1500", 110, 40),
            word("2.50", 10, 70),
            word("3200", 110, 70),
        ]
    }

    fn options() -> PreprocessingOptions {
        let mut options = PreprocessingOptions::default();
        options.deskew.enabled = false;
        options
    }

    #[test]
    fn test_process_extracts_peaks() {
        let engine = Arc::new(StaticEngine(table_regions()));
        let pipeline = Pipeline::with_engine(engine, &ChromascanConfig::default()).unwrap();

        let result = pipeline.process(blank_png(240), &options()).unwrap();
        assert_eq!(result.peaks.len(), 2);
        assert_eq!(result.diagnostics.engine, "static");
        assert_eq!(result.diagnostics.source_fingerprint.len(), 16);
        assert_eq!(result.per_field_confidence.len(), 3);
        assert!(result.per_field_confidence[&FieldGroup::PeakTable] > 0.0);
    }

    #[test]
    fn test_engine_failure_is_hard_error() {
        let pipeline = Pipeline::with_engine(Arc::new(BrokenEngine), &ChromascanConfig::default()).unwrap();
        let err = pipeline.process(blank_png(240), &options()).unwrap_err();
        assert!(matches!(err, ChromascanError::EngineUnavailable { .. }));
    }

    #[test]
    fn test_small_image_rejected_before_recognition() {
        let pipeline = Pipeline::with_engine(Arc::new(BrokenEngine), &ChromascanConfig::default()).unwrap();
        let err = pipeline.process(blank_png(50), &options()).unwrap_err();
        assert!(matches!(err, ChromascanError::ImageTooSmall { .. }));
    }

    #[test]
    fn test_out_of_range_options_rejected_before_recognition() {
        let pipeline = Pipeline::with_engine(Arc::new(BrokenEngine), &ChromascanConfig::default()).unwrap();
        let mut options = options();
        options.binarization = BinarizationMode::Adaptive {
            window: 31,
            sensitivity: 1.5,
        };
        let err = pipeline.process(blank_png(240), &options).unwrap_err();
        assert!(matches!(err, ChromascanError::Validation { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ChromascanConfig::default();
        config.extraction.row_tolerance = 0.0;
        assert!(Pipeline::with_engine(Arc::new(BrokenEngine), &config).is_err());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn test_from_config_without_engine() {
        let err = Pipeline::from_config(&ChromascanConfig::default()).unwrap_err();
        assert!(matches!(err, ChromascanError::EngineUnavailable { .. }));
    }
}
