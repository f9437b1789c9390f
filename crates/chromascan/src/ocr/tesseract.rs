//! Native Tesseract recognition engine.

use std::env;
use std::path::{Path, PathBuf};

use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};

use super::RecognitionEngine;
use super::layout::sort_reading_order;
use super::tsv::parse_tsv_regions;
use crate::core::config::RecognitionConfig;
use crate::error::{ChromascanError, Result};
use crate::image::NormalizedImage;
use crate::types::TextRegion;

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

const READING_ORDER_TOLERANCE: f64 = 0.5;

/// Tesseract-backed [`RecognitionEngine`].
///
/// A fresh Tesseract handle is created per call, so one engine can serve concurrent
/// pipelines.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
    tessdata_path: PathBuf,
    psm: i32,
}

impl TesseractEngine {
    /// Resolve language data and verify that every requested language is installed.
    ///
    /// # Errors
    ///
    /// `EngineUnavailable` when no tessdata directory can be found, the language is empty,
    /// or a `.traineddata` file is missing.
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        if config.language.trim().is_empty() {
            return Err(ChromascanError::engine_unavailable(
                "Language cannot be empty. Please specify a valid language code (e.g., 'eng')",
            ));
        }

        let tessdata_path = resolve_tessdata(config.tessdata_path.as_deref()).ok_or_else(|| {
            ChromascanError::engine_unavailable(
                "No tessdata directory found. Set recognition.tessdata_path or TESSDATA_PREFIX",
            )
        })?;

        for lang in config.language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
            let traineddata = tessdata_path.join(format!("{}.traineddata", lang));
            if !traineddata.exists() {
                return Err(ChromascanError::engine_unavailable(format!(
                    "Language '{}' not found. Traineddata file does not exist: {}",
                    lang,
                    traineddata.display()
                )));
            }
        }

        tracing::debug!(
            language = %config.language,
            tessdata = %tessdata_path.display(),
            version = %TesseractAPI::version(),
            "Tesseract engine ready"
        );

        Ok(Self {
            language: config.language.clone(),
            tessdata_path,
            psm: config.psm,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn tessdata_path(&self) -> &Path {
        &self.tessdata_path
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<Vec<TextRegion>> {
        let api = TesseractAPI::new();
        let datapath = self.tessdata_path.to_string_lossy().into_owned();

        api.init(&datapath, &self.language).map_err(|e| {
            ChromascanError::engine_unavailable(format!(
                "Failed to initialize language '{}': {}",
                self.language, e
            ))
        })?;

        api.set_page_seg_mode(TessPageSegMode::from_int(self.psm))
            .map_err(|e| ChromascanError::engine_unavailable(format!("Failed to set PSM mode: {}", e)))?;

        api.set_image(
            image.image.as_raw(),
            image.width as i32,
            image.height as i32,
            1,
            image.width as i32,
        )
        .map_err(|e| ChromascanError::engine_unavailable(format!("Failed to set image: {}", e)))?;

        api.recognize()
            .map_err(|e| ChromascanError::engine_unavailable(format!("Failed to recognize text: {}", e)))?;

        let tsv = api
            .get_tsv_text(0)
            .map_err(|e| ChromascanError::engine_unavailable(format!("Failed to extract TSV: {}", e)))?;

        let regions = sort_reading_order(parse_tsv_regions(&tsv), READING_ORDER_TOLERANCE);
        tracing::debug!(regions = regions.len(), "Tesseract recognition complete");
        Ok(regions)
    }
}

/// Pick the tessdata directory: explicit path, then `TESSDATA_PREFIX`, then common installs.
fn resolve_tessdata(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }

    if let Ok(prefix) = env::var("TESSDATA_PREFIX")
        && !prefix.trim().is_empty()
    {
        return Some(PathBuf::from(prefix));
    }

    FALLBACK_TESSDATA_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
