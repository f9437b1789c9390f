//! Configuration file loading tests.

use std::fs;
use std::sync::Arc;

use chromascan::{ChromascanConfig, ChromascanError, FieldValue, Pipeline};
use tempfile::tempdir;

mod helpers;
use helpers::{FakeEngine, blank_page, text_line};

#[test]
fn test_load_all_formats_agree() {
    let dir = tempdir().unwrap();

    let toml_path = dir.path().join("chromascan.toml");
    fs::write(
        &toml_path,
        r#"
[recognition]
language = "deu"
psm = 4

[validation]
min_overall_confidence = 0.65
min_peaks = 2

[batch]
max_concurrent = 3
timeout_ms = 30000
"#,
    )
    .unwrap();

    let yaml_path = dir.path().join("chromascan.yaml");
    fs::write(
        &yaml_path,
        r#"
recognition:
  language: deu
  psm: 4
validation:
  min_overall_confidence: 0.65
  min_peaks: 2
batch:
  max_concurrent: 3
  timeout_ms: 30000
"#,
    )
    .unwrap();

    let json_path = dir.path().join("chromascan.json");
    fs::write(
        &json_path,
        r#"{
  "recognition": {"language": "deu", "psm": 4},
  "validation": {"min_overall_confidence": 0.65, "min_peaks": 2},
  "batch": {"max_concurrent": 3, "timeout_ms": 30000}
}"#,
    )
    .unwrap();

    let from_toml = ChromascanConfig::from_file(&toml_path).unwrap();
    let from_yaml = ChromascanConfig::from_file(&yaml_path).unwrap();
    let from_json = ChromascanConfig::from_file(&json_path).unwrap();

    assert_eq!(from_toml, from_yaml);
    assert_eq!(from_toml, from_json);
    assert_eq!(from_toml.recognition.language, "deu");
    assert_eq!(from_toml.batch.max_concurrent, Some(3));
    assert_eq!(from_toml.extraction.row_tolerance, 0.5);
}

#[test]
fn test_out_of_range_values_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[validation]\nmin_overall_confidence = 2.0\n").unwrap();

    let err = ChromascanConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ChromascanError::Validation { .. }));
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chromascan.ini");
    fs::write(&path, "psm=6").unwrap();
    assert!(ChromascanConfig::from_file(&path).is_err());
}

#[test]
fn test_custom_method_dictionary_drives_extraction() {
    let dir = tempdir().unwrap();
    let dictionary_path = dir.path().join("gc_method.toml");
    fs::write(
        &dictionary_path,
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

    let config_path = dir.path().join("chromascan.toml");
    fs::write(
        &config_path,
        format!(
            "[preprocessing.deskew]\nenabled = false\n\n[extraction]\nmethod_dictionary = {:?}\n",
            dictionary_path.to_string_lossy()
        ),
    )
    .unwrap();

    let config = ChromascanConfig::from_file(&config_path).unwrap();
    assert!(!config.preprocessing.deskew.enabled);

    let mut regions = Vec::new();
    text_line(&mut regions, 0, "Carrier Gas: Helium Inlet Temp: 250", 0.9);
    text_line(&mut regions, 1, "Sample Name: Blank", 0.9);

    let pipeline = Pipeline::with_engine(Arc::new(FakeEngine::new().script(480, regions)), &config).unwrap();
    let result = pipeline.process(blank_page(480, 480), &config.preprocessing).unwrap();

    assert_eq!(result.method_parameters["carrier_gas"].as_text(), Some("Helium"));
    assert_eq!(
        result.method_parameters["inlet_temperature"],
        FieldValue::Quantity {
            value: 250.0,
            unit: Some("°C".to_string())
        }
    );
    assert!(!result.method_parameters.contains_key("column"));
    assert_eq!(result.sample_info["sample_name"].as_text(), Some("Blank"));
}

#[test]
fn test_missing_dictionary_file_fails_pipeline_construction() {
    let mut config = ChromascanConfig::default();
    config.extraction.method_dictionary = Some("/nonexistent/dictionary.toml".into());

    let err = Pipeline::with_engine(Arc::new(FakeEngine::new()), &config).unwrap_err();
    assert!(matches!(err, ChromascanError::Validation { .. }));
}
