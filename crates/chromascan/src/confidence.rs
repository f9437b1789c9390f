//! Confidence aggregation.
//!
//! A group's confidence is the mean recognition confidence of the regions it was read from,
//! scaled by how complete the group is. The overall score is a weighted average over every
//! group, summed in a fixed group order, so it follows from the per-group scores alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ChromascanError, Result};
use crate::extraction::Extraction;
use crate::types::{FieldGroup, TextRegion};

/// Relative weight of each field group in the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    #[serde(default = "default_peak_table_weight")]
    pub peak_table: f64,
    #[serde(default = "default_method_parameters_weight")]
    pub method_parameters: f64,
    #[serde(default = "default_sample_info_weight")]
    pub sample_info: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            peak_table: default_peak_table_weight(),
            method_parameters: default_method_parameters_weight(),
            sample_info: default_sample_info_weight(),
        }
    }
}

fn default_peak_table_weight() -> f64 {
    0.6
}

fn default_method_parameters_weight() -> f64 {
    0.25
}

fn default_sample_info_weight() -> f64 {
    0.15
}

impl ConfidenceWeights {
    pub fn weight(&self, group: FieldGroup) -> f64 {
        match group {
            FieldGroup::PeakTable => self.peak_table,
            FieldGroup::MethodParameters => self.method_parameters,
            FieldGroup::SampleInfo => self.sample_info,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [self.peak_table, self.method_parameters, self.sample_info];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ChromascanError::validation("confidence weights must be finite and non-negative"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ChromascanError::validation("at least one confidence weight must be positive"));
        }
        Ok(())
    }
}

/// Field-level and overall confidence of one result.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceReport {
    pub overall: f64,
    pub per_group: BTreeMap<FieldGroup, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceAggregator {
    weights: ConfidenceWeights,
}

impl ConfidenceAggregator {
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ConfidenceWeights {
        &self.weights
    }

    /// Score each extraction and combine them.
    ///
    /// Every group appears in `per_group`, scoring 0 when it was not extracted. `overall` is
    /// [`ConfidenceAggregator::overall`] of `per_group`.
    pub fn aggregate(&self, regions: &[TextRegion], extractions: &[Extraction]) -> ConfidenceReport {
        let mut per_group: BTreeMap<FieldGroup, f64> = FieldGroup::ALL.iter().map(|group| (*group, 0.0)).collect();
        for extraction in extractions {
            per_group.insert(extraction.group, group_confidence(regions, extraction));
        }

        let overall = self.overall(&per_group);
        ConfidenceReport { overall, per_group }
    }

    /// Weighted average of the group scores, weights normalized by their total.
    ///
    /// Groups missing from `per_group` score 0.
    pub fn overall(&self, per_group: &BTreeMap<FieldGroup, f64>) -> f64 {
        // Fixed group order keeps the summation deterministic.
        let (weighted, total_weight) = FieldGroup::ALL.iter().fold((0.0, 0.0), |(sum, total), group| {
            let weight = self.weights.weight(*group);
            let score = per_group.get(group).copied().filter(|s| s.is_finite()).unwrap_or(0.0);
            (sum + weight * score, total + weight)
        });

        if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Mean confidence of the evidence regions times completeness; 0 without evidence.
pub fn group_confidence(regions: &[TextRegion], extraction: &Extraction) -> f64 {
    let mean = finite_mean(
        extraction
            .evidence
            .iter()
            .filter_map(|&i| regions.get(i))
            .map(|r| r.confidence),
    );
    (mean * extraction.completeness).clamp(0.0, 1.0)
}

/// Mean of the finite values; 0 when there are none.
pub fn finite_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
