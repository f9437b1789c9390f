//! Declarative label dictionaries for labeled-field extraction.
//!
//! A dictionary lists canonical fields, the printed label variants that introduce each one,
//! and how its value should be read. Built-in tables cover common HPLC/GC report layouts;
//! replacements can be loaded from TOML, YAML or JSON:
//!
//! ```toml
//! [[fields]]
//! name = "flow_rate"
//! labels = ["Flow Rate", "Flow"]
//! kind = "quantity"
//! unit = "mL/min"
//! expected = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChromascanError, Result};

/// How a field's value text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Number with an optional unit; the field's `unit` applies when none is printed
    Quantity,
    Text,
    DateTime,
    /// `a:b` or a plain number
    Ratio,
}

/// One canonical field and the labels that introduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub labels: Vec<String>,
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Missing expected fields are reported and lower completeness
    #[serde(default)]
    pub expected: bool,
}

impl FieldSpec {
    fn new(name: &str, labels: &[&str], kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            kind,
            unit: None,
            expected: false,
        }
    }

    fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    fn expected(mut self) -> Self {
        self.expected = true;
        self
    }
}

/// Ordered set of field specifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDictionary {
    pub fields: Vec<FieldSpec>,
}

impl LabelDictionary {
    /// Built-in method-parameter table.
    pub fn method_parameters() -> Self {
        use ValueKind::*;
        Self {
            fields: vec![
                FieldSpec::new(
                    "method_name",
                    &["Method", "Method Name", "Acq. Method", "Acquisition Method", "Instrument Method"],
                    Text,
                ),
                FieldSpec::new("instrument", &["Instrument", "Instrument Name", "System"], Text),
                FieldSpec::new("column", &["Column", "Column Name", "Column Type"], Text).expected(),
                FieldSpec::new("flow_rate", &["Flow Rate", "Flow", "Column Flow"], Quantity)
                    .unit("mL/min")
                    .expected(),
                FieldSpec::new(
                    "injection_volume",
                    &["Injection Volume", "Inj Volume", "Inj. Volume", "Inj Vol", "Inj. Vol.", "Injection Vol"],
                    Quantity,
                )
                .unit("µL")
                .expected(),
                FieldSpec::new(
                    "column_temperature",
                    &[
                        "Column Temperature",
                        "Column Temp",
                        "Column Temp.",
                        "Oven Temperature",
                        "Oven Temp",
                        "Temperature",
                    ],
                    Quantity,
                )
                .unit("°C"),
                FieldSpec::new("detector", &["Detector", "Detector Type"], Text),
                FieldSpec::new("wavelength", &["Wavelength", "Detection Wavelength", "Lambda"], Quantity).unit("nm"),
                FieldSpec::new("mobile_phase", &["Mobile Phase", "Eluent"], Text),
                FieldSpec::new("run_time", &["Run Time", "Runtime", "Stop Time"], Quantity).unit("min"),
                FieldSpec::new("split_ratio", &["Split Ratio", "Split"], Ratio),
            ],
        }
    }

    /// Built-in sample-information table.
    pub fn sample_info() -> Self {
        use ValueKind::*;
        Self {
            fields: vec![
                FieldSpec::new("sample_name", &["Sample Name", "Sample"], Text).expected(),
                FieldSpec::new(
                    "sample_id",
                    &["Sample ID", "Sample Id", "Sample No", "Sample No.", "Sample Number"],
                    Text,
                ),
                FieldSpec::new(
                    "operator",
                    &["Operator", "Acq. Operator", "Analyst", "Injected By"],
                    Text,
                ),
                FieldSpec::new(
                    "injection_date",
                    &[
                        "Injection Date",
                        "Inj. Date",
                        "Acquired",
                        "Acquisition Date",
                        "Date Acquired",
                        "Date",
                    ],
                    DateTime,
                )
                .expected(),
                FieldSpec::new("vial", &["Vial", "Vial Position", "Location"], Text),
                FieldSpec::new("sequence", &["Sequence", "Sequence Name", "Batch"], Text),
                FieldSpec::new("dilution_factor", &["Dilution", "Dilution Factor"], Quantity),
                FieldSpec::new("data_file", &["Data File", "Data Filename", "File Name"], Text),
            ],
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let dictionary: Self = toml::from_str(content)
            .map_err(|e| ChromascanError::validation(format!("Invalid TOML dictionary: {}", e)))?;
        dictionary.validate()?;
        Ok(dictionary)
    }

    /// Load a dictionary, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChromascanError::validation(format!("Failed to read dictionary file {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let dictionary: Self = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ChromascanError::validation(format!("Invalid TOML in {}: {}", path.display(), e)))?,
            Some("yaml") | Some("yml") => serde_yaml_ng::from_str(&content)
                .map_err(|e| ChromascanError::validation(format!("Invalid YAML in {}: {}", path.display(), e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ChromascanError::validation(format!("Invalid JSON in {}: {}", path.display(), e)))?,
            _ => {
                return Err(ChromascanError::validation(format!(
                    "Unsupported dictionary file format: {}. Use .toml, .yaml, .yml or .json",
                    path.display()
                )));
            }
        };

        dictionary.validate()?;
        Ok(dictionary)
    }

    /// Every field needs a unique name and at least one non-empty label.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ChromascanError::validation("dictionary field name must not be empty"));
            }
            if !names.insert(field.name.as_str()) {
                return Err(ChromascanError::validation(format!(
                    "dictionary field '{}' is defined more than once",
                    field.name
                )));
            }
            if field.labels.is_empty() || field.labels.iter().any(|l| l.trim().is_empty()) {
                return Err(ChromascanError::validation(format!(
                    "dictionary field '{}' needs at least one non-empty label",
                    field.name
                )));
            }
        }
        Ok(())
    }

    pub fn expected_count(&self) -> usize {
        self.fields.iter().filter(|f| f.expected).count()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().flat_map(|f| f.labels.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_dictionaries_are_valid() {
        assert!(LabelDictionary::method_parameters().validate().is_ok());
        assert!(LabelDictionary::sample_info().validate().is_ok());
        assert_eq!(LabelDictionary::method_parameters().expected_count(), 3);
        assert_eq!(LabelDictionary::sample_info().expected_count(), 2);
    }

    #[test]
    fn test_from_toml_str() {
        let dictionary = LabelDictionary::from_toml_str(
            r#"
[[fields]]
name = "carrier_gas"
labels = ["Carrier Gas", "Carrier"]
kind = "text"
expected = true

[[fields]]
name = "inlet_temperature"
labels = ["Inlet Temp"]
kind = "quantity"
unit = "°C"
"#,
        )
        .unwrap();

        assert_eq!(dictionary.fields.len(), 2);
        assert_eq!(dictionary.fields[0].kind, ValueKind::Text);
        assert!(dictionary.fields[0].expected);
        assert_eq!(dictionary.fields[1].unit.as_deref(), Some("°C"));
        assert!(!dictionary.fields[1].expected);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.yaml");
        fs::write(
            &path,
            r#"
fields:
  - name: batch_id
    labels: ["Batch ID", "Lot"]
    kind: text
    expected: true
"#,
        )
        .unwrap();

        let dictionary = LabelDictionary::from_file(&path).unwrap();
        assert_eq!(dictionary.fields[0].name, "batch_id");
        assert_eq!(dictionary.labels().collect::<Vec<_>>(), vec!["Batch ID", "Lot"]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = LabelDictionary::from_toml_str(
            r#"
[[fields]]
name = "column"
labels = ["Column"]
kind = "text"

[[fields]]
name = "column"
labels = ["Col"]
kind = "text"
"#,
        );
        assert!(matches!(result, Err(ChromascanError::Validation { .. })));
    }

    #[test]
    fn test_empty_labels_rejected() {
        let dictionary = LabelDictionary {
            fields: vec![FieldSpec::new("x", &[], ValueKind::Text)],
        };
        assert!(dictionary.validate().is_err());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dictionary.txt");
        fs::write(&path, "").unwrap();
        assert!(LabelDictionary::from_file(&path).is_err());
    }
}
