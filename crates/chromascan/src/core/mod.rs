//! Pipeline orchestration.
//!
//! This module ties the stages together: [`Pipeline`] runs one image from raw bytes to a
//! [`ProcessingResult`](crate::types::ProcessingResult), the batch entry points run many
//! images concurrently and bridge each result, and [`config`] loads the settings both use.
//!
//! # Example
//!
//! ```rust,no_run
//! use chromascan::core::config::ChromascanConfig;
//! use chromascan::core::pipeline::Pipeline;
//!
//! # fn example() -> chromascan::Result<()> {
//! let config = ChromascanConfig::discover()?.unwrap_or_default();
//! let pipeline = Pipeline::from_config(&config)?;
//! let result = pipeline.process_file("report.png")?;
//! let outcome = pipeline.validate(&result);
//! println!("{} peaks, valid: {}", result.peaks.len(), outcome.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod pipeline;

pub use config::{BatchConfig, ChromascanConfig, ExtractionSettings, RecognitionConfig};
pub use pipeline::Pipeline;
