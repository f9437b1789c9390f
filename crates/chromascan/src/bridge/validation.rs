use serde::{Deserialize, Serialize};

use crate::error::{ChromascanError, Result};
use crate::types::{AnalysisRequest, ProcessingResult, ValidationOutcome};

/// Minimum quality a result must meet before it is forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Results below this overall confidence are rejected
    #[serde(default = "default_min_overall_confidence")]
    pub min_overall_confidence: f64,

    /// Results with fewer peaks are rejected
    #[serde(default = "default_min_peaks")]
    pub min_peaks: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_overall_confidence: default_min_overall_confidence(),
            min_peaks: default_min_peaks(),
        }
    }
}

fn default_min_overall_confidence() -> f64 {
    0.5
}

fn default_min_peaks() -> usize {
    1
}

impl ValidationPolicy {
    pub fn validate(&self) -> Result<()> {
        if !self.min_overall_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_overall_confidence) {
            return Err(ChromascanError::validation(format!(
                "validation.min_overall_confidence must be within [0, 1], got {}",
                self.min_overall_confidence
            )));
        }
        if self.min_peaks == 0 {
            return Err(ChromascanError::validation("validation.min_peaks must be at least 1"));
        }
        Ok(())
    }
}

/// Verdict plus the request built from an accepted result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeOutcome {
    pub validation: ValidationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AnalysisRequest>,
}

impl BridgeOutcome {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }
}

/// Apply `policy` to `result` and build an [`AnalysisRequest`] when it passes.
///
/// Every check runs; issues are listed in evaluation order. Out-of-order peaks only add a
/// recommendation. The result is never modified.
pub fn validate_and_bridge(result: &ProcessingResult, policy: &ValidationPolicy) -> BridgeOutcome {
    let mut outcome = ValidationOutcome::default();

    // NaN never meets the floor.
    if result.overall_confidence.is_nan() || result.overall_confidence < policy.min_overall_confidence {
        outcome.issues.push(format!(
            "Low overall OCR confidence ({:.3} below minimum {:.3})",
            result.overall_confidence, policy.min_overall_confidence
        ));
        outcome
            .recommendations
            .push("Re-process the image with improved preprocessing (rescan, better lighting or higher resolution)".to_string());
    }

    if result.peaks.len() < policy.min_peaks {
        if result.peaks.is_empty() {
            outcome.issues.push("No peak data extracted".to_string());
        } else {
            outcome.issues.push(format!(
                "Too few peaks extracted ({} below minimum {})",
                result.peaks.len(),
                policy.min_peaks
            ));
        }
        outcome
            .recommendations
            .push("Verify that the image contains a peak table".to_string());
    }

    if result.has_out_of_order_peaks() {
        outcome.recommendations.push(
            "Review peak retention times: some rows are out of order and may have been misread".to_string(),
        );
    }

    outcome.is_valid = outcome.issues.is_empty();

    let request = if outcome.is_valid {
        Some(AnalysisRequest::from_validated(result))
    } else {
        tracing::warn!(issues = ?outcome.issues, "Result rejected by validation policy");
        None
    };

    BridgeOutcome {
        validation: outcome,
        request,
    }
}
