//! Error types for Chromascan.
//!
//! Every fallible operation in the crate returns [`ChromascanError`]. The variants mirror the
//! failure taxonomy of the pipeline:
//!
//! - **Hard pipeline failures** abort processing of one image: `ImageDecode`,
//!   `ImageTooSmall`, `EngineUnavailable` (and `Timeout` when a batch deadline elapses).
//! - **Configuration problems** surface as `Validation` before any image is touched.
//! - **System errors** (`Io`) always bubble up unchanged.
//!
//! Soft extraction gaps are *not* errors: they are recorded as warnings on the
//! [`ProcessingResult`](crate::ProcessingResult). Validation rejections are not errors either,
//! they are a normal [`ValidationOutcome`](crate::ValidationOutcome) with `is_valid = false`.
//!
//! # Example
//!
//! ```rust
//! use chromascan::{ChromascanError, Result};
//!
//! fn check_floor(value: f64) -> Result<f64> {
//!     if !(0.0..=1.0).contains(&value) {
//!         return Err(ChromascanError::validation(format!(
//!             "confidence floor must be within [0, 1], got {}",
//!             value
//!         )));
//!     }
//!     Ok(value)
//! }
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `ChromascanError`.
pub type Result<T> = std::result::Result<T, ChromascanError>;

/// Main error type for all Chromascan operations.
#[derive(Debug, Error)]
pub enum ChromascanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image too small: {width}x{height} pixels, minimum side is {min_dimension} pixels")]
    ImageTooSmall { width: u32, height: u32, min_dimension: u32 },

    #[error("Recognition engine unavailable: {message}")]
    EngineUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Processing timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("{0}")]
    Other(String),
}

/// Stable, serializable classification of a [`ChromascanError`].
///
/// Batch outcomes and logs carry the kind rather than the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    ImageDecode,
    ImageTooSmall,
    EngineUnavailable,
    Validation,
    Serialization,
    Timeout,
    Other,
}

impl From<serde_json::Error> for ChromascanError {
    fn from(err: serde_json::Error) -> Self {
        ChromascanError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $with_source:ident, $variant:ident) => {
        #[doc = concat!("Create a ", stringify!($variant), " error")]
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::$variant {
                message: message.into(),
                source: None,
            }
        }

        #[doc = concat!("Create a ", stringify!($variant), " error with source")]
        pub fn $with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
            message: S,
            source: E,
        ) -> Self {
            Self::$variant {
                message: message.into(),
                source: Some(Box::new(source)),
            }
        }
    };
}

impl ChromascanError {
    error_constructor!(image_decode, image_decode_with_source, ImageDecode);
    error_constructor!(engine_unavailable, engine_unavailable_with_source, EngineUnavailable);
    error_constructor!(validation, validation_with_source, Validation);
    error_constructor!(serialization, serialization_with_source, Serialization);

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::ImageDecode { .. } => ErrorKind::ImageDecode,
            Self::ImageTooSmall { .. } => ErrorKind::ImageTooSmall,
            Self::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this error aborts processing of a single image.
    ///
    /// Hard pipeline failures are isolated per image in batch mode.
    pub fn is_hard_pipeline_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ImageDecode | ErrorKind::ImageTooSmall | ErrorKind::EngineUnavailable | ErrorKind::Timeout
        )
    }
}
