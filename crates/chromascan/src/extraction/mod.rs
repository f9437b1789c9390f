//! Field extraction over recognized text regions.
//!
//! Every extractor reads the same immutable region slice and never fails: fields it cannot
//! read are omitted and explained by a warning. The pipeline composes a fixed set of
//! extractors (peak table, method parameters, sample info); the assembler does not care which.

pub mod dictionary;
pub mod labeled;
pub mod peaks;
pub mod rows;
pub mod values;

use std::sync::Arc;

use crate::core::config::ExtractionSettings;
use crate::error::Result;
use crate::types::{FieldGroup, FieldMap, PeakRecord, TextRegion};

pub use dictionary::{FieldSpec, LabelDictionary, ValueKind};
pub use labeled::LabeledFieldExtractor;
pub use peaks::PeakTableExtractor;

/// What an extractor produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Peaks(Vec<PeakRecord>),
    Fields(FieldMap),
}

impl FieldData {
    /// Whether anything was extracted.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldData::Peaks(peaks) => peaks.is_empty(),
            FieldData::Fields(fields) => fields.is_empty(),
        }
    }
}

/// Output of one extractor run.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub group: FieldGroup,
    pub data: FieldData,
    pub warnings: Vec<String>,
    /// Indices of the regions the data was read from
    pub evidence: Vec<usize>,
    /// Share of the group that could be read, in `[0, 1]`
    pub completeness: f64,
}

/// Reads one field group from text regions.
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn group(&self) -> FieldGroup;

    fn extract(&self, regions: &[TextRegion]) -> Extraction;
}

/// The standard extractor set, in composition order: peak table, method parameters, sample info.
///
/// Each labeled extractor treats the other's labels as value boundaries.
pub fn default_extractors(settings: &ExtractionSettings) -> Result<Vec<Arc<dyn FieldExtractor>>> {
    let method = settings.method_dictionary()?;
    let sample = settings.sample_dictionary()?;

    let method_extractor = LabeledFieldExtractor::method_parameters(method.clone(), settings.row_tolerance)
        .with_boundary_labels(sample.labels());
    let sample_extractor =
        LabeledFieldExtractor::sample_info(sample, settings.row_tolerance).with_boundary_labels(method.labels());

    Ok(vec![
        Arc::new(PeakTableExtractor::new(settings.row_tolerance)),
        Arc::new(method_extractor),
        Arc::new(sample_extractor),
    ])
}
