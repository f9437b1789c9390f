//! Configuration loading and management.
//!
//! This module provides utilities for loading configuration from files
//! (TOML, YAML, JSON) and discovering `chromascan.toml` in parent directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bridge::ValidationPolicy;
use crate::confidence::ConfidenceWeights;
use crate::error::{ChromascanError, Result};
use crate::extraction::LabelDictionary;
use crate::image::PreprocessingOptions;

/// Main configuration for the processing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromascanConfig {
    /// Image normalization settings
    #[serde(default)]
    pub preprocessing: PreprocessingOptions,

    /// Recognition engine settings
    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Field extraction settings
    #[serde(default)]
    pub extraction: ExtractionSettings,

    /// Confidence aggregation weights
    #[serde(default)]
    pub confidence: ConfidenceWeights,

    /// Minimum-quality policy applied before forwarding
    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Batch processing limits
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Recognition engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Language code(s), `+`-separated (e.g. "eng", "eng+deu")
    #[serde(default = "default_language")]
    pub language: String,

    /// Directory holding `.traineddata` files
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,

    /// Page segmentation mode
    #[serde(default = "default_psm")]
    pub psm: i32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            tessdata_path: None,
            psm: default_psm(),
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Row band as a multiple of the median region height
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance: f64,

    /// Replacement dictionary for method parameters (TOML, YAML or JSON)
    #[serde(default)]
    pub method_dictionary: Option<PathBuf>,

    /// Replacement dictionary for sample information (TOML, YAML or JSON)
    #[serde(default)]
    pub sample_dictionary: Option<PathBuf>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            row_tolerance: default_row_tolerance(),
            method_dictionary: None,
            sample_dictionary: None,
        }
    }
}

impl ExtractionSettings {
    /// Method-parameter dictionary: the configured file, or the built-in table.
    pub fn method_dictionary(&self) -> Result<LabelDictionary> {
        match &self.method_dictionary {
            Some(path) => LabelDictionary::from_file(path),
            None => Ok(LabelDictionary::method_parameters()),
        }
    }

    /// Sample-info dictionary: the configured file, or the built-in table.
    pub fn sample_dictionary(&self) -> Result<LabelDictionary> {
        match &self.sample_dictionary {
            Some(path) => LabelDictionary::from_file(path),
            None => Ok(LabelDictionary::sample_info()),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum images processed at once (defaults to `num_cpus * 2`)
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Per-image deadline in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_psm() -> i32 {
    6
}

fn default_row_tolerance() -> f64 {
    0.5
}

impl ChromascanConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ChromascanError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ChromascanError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ChromascanError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        serde_yaml_ng::from_str(&content)
            .map_err(|e| ChromascanError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ChromascanError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| ChromascanError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let config = match extension.as_deref() {
            Some("toml") => Self::from_toml_file(path)?,
            Some("yaml") | Some("yml") => Self::from_yaml_file(path)?,
            Some("json") => Self::from_json_file(path)?,
            _ => {
                return Err(ChromascanError::validation(format!(
                    "Unsupported config file format: {}. Use .toml, .yaml, .yml or .json",
                    path.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `chromascan.toml` in current directory and parent directories.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(ChromascanError::Io)?;

        loop {
            let chromascan_toml = current.join("chromascan.toml");
            if chromascan_toml.exists() {
                let config = Self::from_toml_file(chromascan_toml)?;
                config.validate()?;
                return Ok(Some(config));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Reject values outside their meaningful ranges.
    pub fn validate(&self) -> Result<()> {
        self.preprocessing.validate()?;
        self.confidence.validate()?;
        self.validation.validate()?;

        if self.recognition.language.trim().is_empty() {
            return Err(ChromascanError::validation("recognition.language must not be empty"));
        }
        if !(0..=13).contains(&self.recognition.psm) {
            return Err(ChromascanError::validation(format!(
                "recognition.psm must be within 0..=13, got {}",
                self.recognition.psm
            )));
        }
        if !(self.extraction.row_tolerance > 0.0 && self.extraction.row_tolerance <= 5.0) {
            return Err(ChromascanError::validation(format!(
                "extraction.row_tolerance must be within (0, 5], got {}",
                self.extraction.row_tolerance
            )));
        }
        if self.batch.max_concurrent == Some(0) {
            return Err(ChromascanError::validation("batch.max_concurrent must be at least 1"));
        }
        if self.batch.timeout_ms == Some(0) {
            return Err(ChromascanError::validation("batch.timeout_ms must be positive"));
        }

        Ok(())
    }
}
