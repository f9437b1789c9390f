//! Data types produced and exchanged by the pipeline.
//!
//! Everything here serializes with fixed snake_case field names. `ProcessingResult` and
//! `AnalysisRequest` carry a `schema_version` so downstream consumers can detect layout changes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// Current layout version of serialized results and analysis requests.
pub const SCHEMA_VERSION: u32 = 1;

/// Source tag stamped on every analysis request.
pub const ANALYSIS_SOURCE: &str = "chromatogram-ocr";

/// Axis-aligned box in normalized-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }
}

/// A piece of recognized text with its location and the engine's confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    pub bounding_box: BoundingBox,
    pub confidence: f64,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox, confidence: f64) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            confidence,
        }
    }
}

/// One row of a chromatogram peak table.
///
/// At least one of `area` / `height` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// Retention time in the report's time unit (usually minutes).
    pub retention_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Integration type code as printed (e.g. `BB`, `VV`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_flags: Option<String>,
    /// Peak number as printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Mean recognition confidence of the row's cells.
    pub confidence: f64,
    /// Retention time is lower than the preceding peak's.
    #[serde(default)]
    pub out_of_order: bool,
}

/// A typed value read from a labeled report field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldValue {
    Quantity {
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Text {
        value: String,
    },
    DateTime {
        value: NaiveDateTime,
    },
    Date {
        value: NaiveDate,
    },
    Ratio {
        numerator: f64,
        denominator: f64,
    },
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Quantity { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text { value } => Some(value),
            _ => None,
        }
    }
}

/// Ordered mapping of canonical field name to value.
pub type FieldMap = IndexMap<String, FieldValue>;

/// Instrument method settings (column, flow, temperatures, ...).
pub type MethodParameters = FieldMap;

/// Sample metadata (sample id, operator, injection date, ...).
pub type SampleInfo = FieldMap;

/// The field groups an extraction can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    PeakTable,
    MethodParameters,
    SampleInfo,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 3] = [FieldGroup::PeakTable, FieldGroup::MethodParameters, FieldGroup::SampleInfo];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldGroup::PeakTable => "peak_table",
            FieldGroup::MethodParameters => "method_parameters",
            FieldGroup::SampleInfo => "sample_info",
        }
    }
}

impl std::fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the normalizer estimated skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeskewMethod {
    LineBased,
    ContourBased,
}

/// Facts about how a result was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDiagnostics {
    pub image_width: u32,
    pub image_height: u32,
    /// Estimated skew in degrees, when it could be estimated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_angle: Option<f32>,
    pub rotation_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deskew_method: Option<DeskewMethod>,
    pub engine: String,
    /// Hex digest of the raw image bytes.
    pub source_fingerprint: String,
    pub mean_region_confidence: f64,
}

/// Complete output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub schema_version: u32,
    pub text_regions: Vec<TextRegion>,
    pub peaks: Vec<PeakRecord>,
    pub method_parameters: MethodParameters,
    pub sample_info: SampleInfo,
    pub overall_confidence: f64,
    pub per_field_confidence: BTreeMap<FieldGroup, f64>,
    pub processing_time_ms: u64,
    pub warnings: Vec<String>,
    pub diagnostics: ProcessingDiagnostics,
}

impl ProcessingResult {
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether any peak was flagged as out of elution order.
    pub fn has_out_of_order_peaks(&self) -> bool {
        self.peaks.iter().any(|p| p.out_of_order)
    }
}

/// Payload handed to the downstream analysis engine.
///
/// Only ever built from a result that passed validation; `extraction` is carried unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub schema_version: u32,
    pub request_id: Uuid,
    pub source: String,
    pub extracted_at: DateTime<Utc>,
    pub confidence_carried_forward: bool,
    pub extraction: ProcessingResult,
}

impl AnalysisRequest {
    pub(crate) fn from_validated(result: &ProcessingResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            request_id: Uuid::new_v4(),
            source: ANALYSIS_SOURCE.to_string(),
            extracted_at: Utc::now(),
            confidence_carried_forward: true,
            extraction: result.clone(),
        }
    }
}

/// Outcome of applying the quality policy to a result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Serializable summary of a per-image failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&crate::ChromascanError> for BatchError {
    fn from(err: &crate::ChromascanError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What happened to one image of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Accepted {
        result: Box<ProcessingResult>,
        request: Box<AnalysisRequest>,
    },
    Rejected {
        result: Box<ProcessingResult>,
        validation: ValidationOutcome,
    },
    Failed {
        error: BatchError,
    },
}

impl BatchOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            BatchOutcome::Accepted { .. } => "accepted",
            BatchOutcome::Rejected { .. } => "rejected",
            BatchOutcome::Failed { .. } => "failed",
        }
    }
}

/// One entry of a batch response, tagged with its input position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    pub outcome: BatchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_centers() {
        let bbox = BoundingBox::new(10, 20, 30, 10);
        assert_eq!(bbox.center_x(), 25.0);
        assert_eq!(bbox.center_y(), 25.0);
        assert_eq!(bbox.right(), 40);
    }

    #[test]
    fn test_field_value_tagged_serialization() {
        let value = FieldValue::Quantity {
            value: 1.5,
            unit: Some("mL/min".to_string()),
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "quantity");
        assert_eq!(json["value"], 1.5);
        assert_eq!(json["unit"], "mL/min");
    }

    #[test]
    fn test_field_group_as_map_key() {
        let mut map = BTreeMap::new();
        map.insert(FieldGroup::SampleInfo, 0.4);
        map.insert(FieldGroup::PeakTable, 0.9);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"peak_table":0.9,"sample_info":0.4}"#);
    }

    #[test]
    fn test_peak_record_skips_absent_optionals() {
        let peak = PeakRecord {
            retention_time: 1.23,
            area: Some(100.0),
            height: None,
            area_percent: None,
            name: None,
            integration_flags: None,
            index: None,
            confidence: 0.9,
            out_of_order: false,
        };
        let json = serde_json::to_value(&peak).unwrap();
        assert!(json.get("height").is_none());
        assert_eq!(json["area"], 100.0);
    }

    #[test]
    fn test_batch_outcome_status_tag() {
        let outcome = BatchOutcome::Failed {
            error: BatchError {
                kind: ErrorKind::ImageDecode,
                message: "bad bytes".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "image_decode");
        assert_eq!(outcome.status(), "failed");
    }
}
