//! Packaging of pipeline outputs into a [`ProcessingResult`].

use std::time::Duration;

use crate::confidence::{ConfidenceReport, finite_mean};
use crate::extraction::{Extraction, FieldData};
use crate::image::NormalizedImage;
use crate::types::{
    FieldGroup, MethodParameters, PeakRecord, ProcessingDiagnostics, ProcessingResult, SCHEMA_VERSION, SampleInfo,
    TextRegion,
};

/// Everything the pipeline learned about one image.
#[derive(Debug)]
pub struct AssemblyInput<'a> {
    pub image: &'a NormalizedImage,
    pub engine: &'a str,
    pub source_fingerprint: String,
    pub regions: Vec<TextRegion>,
    pub extractions: Vec<Extraction>,
    pub confidence: ConfidenceReport,
    pub elapsed: Duration,
}

/// Builds results; applies no validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    /// Warnings keep emission order: normalizer first, then extractors in composition order.
    pub fn assemble(&self, input: AssemblyInput<'_>) -> ProcessingResult {
        let mut warnings = input.image.warnings.clone();
        let mut peaks: Vec<PeakRecord> = Vec::new();
        let mut method_parameters = MethodParameters::new();
        let mut sample_info = SampleInfo::new();

        for extraction in input.extractions {
            warnings.extend(extraction.warnings);
            match (extraction.group, extraction.data) {
                (FieldGroup::PeakTable, FieldData::Peaks(found)) => peaks.extend(found),
                (FieldGroup::MethodParameters, FieldData::Fields(fields)) => {
                    for (name, value) in fields {
                        method_parameters.entry(name).or_insert(value);
                    }
                }
                (FieldGroup::SampleInfo, FieldData::Fields(fields)) => {
                    for (name, value) in fields {
                        sample_info.entry(name).or_insert(value);
                    }
                }
                (group, data) => {
                    tracing::warn!(group = %group, empty = data.is_empty(), "Extraction data does not match its group");
                    warnings.push(format!("Discarded {} extraction with mismatched data", group));
                }
            }
        }

        let mean_region_confidence = finite_mean(input.regions.iter().map(|r| r.confidence));

        ProcessingResult {
            schema_version: SCHEMA_VERSION,
            text_regions: input.regions,
            peaks,
            method_parameters,
            sample_info,
            overall_confidence: input.confidence.overall,
            per_field_confidence: input.confidence.per_group,
            processing_time_ms: input.elapsed.as_millis().min(u64::MAX as u128) as u64,
            warnings,
            diagnostics: ProcessingDiagnostics {
                image_width: input.image.width,
                image_height: input.image.height,
                skew_angle: input.image.skew_angle,
                rotation_applied: input.image.rotation_applied,
                deskew_method: input.image.deskew_method,
                engine: input.engine.to_string(),
                source_fingerprint: input.source_fingerprint,
                mean_region_confidence,
            },
        }
    }
}
