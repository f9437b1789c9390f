//! Chromascan - Chromatogram Report Extraction
//!
//! Chromascan turns photographed or scanned chromatogram reports into structured,
//! confidence-scored records: the peak table, method parameters and sample information,
//! each with a field-level confidence and a list of warnings for anything it could not read.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chromascan::{ChromascanConfig, Pipeline, RawImage};
//!
//! # fn main() -> chromascan::Result<()> {
//! let config = ChromascanConfig::default();
//! let pipeline = Pipeline::from_config(&config)?;
//! let raw = RawImage::from_path("report.png")?;
//! let result = pipeline.process(raw, &config.preprocessing)?;
//! let outcome = pipeline.validate(&result);
//! if let Some(request) = outcome.request {
//!     println!("{}", serde_json::to_string_pretty(&request)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Image** (`image`): decoding, deskew, contrast and binarization
//! - **OCR** (`ocr`): the [`RecognitionEngine`] seam and the native Tesseract engine
//! - **Extraction** (`extraction`): peak table and label-dictionary field extractors
//! - **Confidence** (`confidence`): field-level and overall scores
//! - **Assembler** (`assembler`): packages everything into a [`ProcessingResult`]
//! - **Bridge** (`bridge`): minimum-quality policy and [`AnalysisRequest`] hand-off
//! - **Core** (`core`): pipeline, batch processing and configuration
//!
//! # Features
//!
//! - `tesseract`: native recognition through Tesseract

#![deny(unsafe_code)]

pub mod assembler;
pub mod bridge;
pub mod confidence;
pub mod core;
pub mod error;
pub mod extraction;
pub mod image;
pub mod ocr;
pub mod types;

pub use error::{ChromascanError, ErrorKind, Result};
pub use types::*;

pub use bridge::{AnalysisConsumer, BridgeOutcome, ValidationPolicy, forward, validate_and_bridge};
pub use confidence::{ConfidenceAggregator, ConfidenceWeights};
pub use core::config::{BatchConfig, ChromascanConfig, ExtractionSettings, RecognitionConfig};
pub use core::pipeline::Pipeline;
pub use extraction::{FieldExtractor, LabelDictionary};
pub use crate::image::{PreprocessingOptions, RawImage};
pub use ocr::RecognitionEngine;

#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
