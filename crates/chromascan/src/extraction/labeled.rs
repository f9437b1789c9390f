//! Labeled-field extraction driven by a [`LabelDictionary`].
//!
//! Labels are matched as whole words, longest variant first, either at the start of a row or
//! when followed by `:` / `=`. A value runs until the next label (own, boundary, or any
//! unknown `Word:`), or the end of the row.

use super::dictionary::{FieldSpec, LabelDictionary, ValueKind};
use super::rows::{Row, build_rows};
use super::values::{ParsedDate, parse_date, parse_ratio, split_quantity};
use super::{Extraction, FieldData, FieldExtractor};
use crate::types::{FieldGroup, FieldMap, FieldValue, TextRegion};

#[derive(Debug, Clone)]
struct Token {
    raw: String,
    key: String,
    terminated: bool,
    region: usize,
}

#[derive(Debug, Clone)]
struct LabelPattern {
    words: Vec<String>,
    /// Index into the dictionary, `None` for boundary-only labels
    field: Option<usize>,
}

struct LabelMatch {
    field: Option<usize>,
    start: usize,
    len: usize,
}

/// Extracts one field group (method parameters or sample info) from labeled report lines.
#[derive(Debug, Clone)]
pub struct LabeledFieldExtractor {
    name: String,
    group: FieldGroup,
    dictionary: LabelDictionary,
    patterns: Vec<LabelPattern>,
    row_tolerance: f64,
}

impl LabeledFieldExtractor {
    pub fn new(name: impl Into<String>, group: FieldGroup, dictionary: LabelDictionary, row_tolerance: f64) -> Self {
        let mut extractor = Self {
            name: name.into(),
            group,
            dictionary,
            patterns: Vec::new(),
            row_tolerance,
        };
        extractor.rebuild_patterns(Vec::new());
        extractor
    }

    /// Method-parameter extractor using `dictionary`.
    pub fn method_parameters(dictionary: LabelDictionary, row_tolerance: f64) -> Self {
        Self::new("method_parameters", FieldGroup::MethodParameters, dictionary, row_tolerance)
    }

    /// Sample-info extractor using `dictionary`.
    pub fn sample_info(dictionary: LabelDictionary, row_tolerance: f64) -> Self {
        Self::new("sample_info", FieldGroup::SampleInfo, dictionary, row_tolerance)
    }

    /// Labels that end a value without being extracted themselves.
    ///
    /// Typically the labels of the other field groups printed on the same lines.
    pub fn with_boundary_labels<'a>(mut self, labels: impl IntoIterator<Item = &'a str>) -> Self {
        let boundaries = labels.into_iter().map(label_words).collect();
        self.rebuild_patterns(boundaries);
        self
    }

    pub fn dictionary(&self) -> &LabelDictionary {
        &self.dictionary
    }

    fn rebuild_patterns(&mut self, boundaries: Vec<Vec<String>>) {
        let mut patterns: Vec<LabelPattern> = self
            .dictionary
            .fields
            .iter()
            .enumerate()
            .flat_map(|(index, field)| {
                field.labels.iter().map(move |label| LabelPattern {
                    words: label_words(label),
                    field: Some(index),
                })
            })
            .filter(|pattern| !pattern.words.is_empty())
            .collect();

        patterns.extend(
            boundaries
                .into_iter()
                .filter(|words| !words.is_empty())
                .map(|words| LabelPattern { words, field: None }),
        );

        // Longest first; own labels win ties against boundary labels.
        patterns.sort_by(|a, b| {
            b.words
                .len()
                .cmp(&a.words.len())
                .then_with(|| char_len(&b.words).cmp(&char_len(&a.words)))
                .then_with(|| b.field.is_some().cmp(&a.field.is_some()))
        });
        self.patterns = patterns;
    }

    fn match_at(&self, tokens: &[Token], position: usize, require_terminator: bool) -> Option<LabelMatch> {
        self.patterns.iter().find_map(|pattern| {
            let len = pattern.words.len();
            if position + len > tokens.len() {
                return None;
            }
            let window = &tokens[position..position + len];
            let words_match = window.iter().zip(&pattern.words).all(|(token, word)| token.key == *word);
            let inner_clear = window[..len - 1].iter().all(|token| !token.terminated);
            if !words_match || !inner_clear {
                return None;
            }
            if require_terminator && !window[len - 1].terminated {
                return None;
            }
            Some(LabelMatch {
                field: pattern.field,
                start: position,
                len,
            })
        })
    }

    /// Find every `(field, label + value tokens)` occurrence in a row.
    fn scan_row(&self, tokens: &[Token]) -> Vec<(usize, Vec<usize>, String)> {
        let mut found = Vec::new();
        let mut position = 0;

        while position < tokens.len() {
            let Some(label) = self.match_at(tokens, position, position != 0) else {
                position += 1;
                continue;
            };

            let value_start = label.start + label.len;
            let mut value_end = value_start;
            while value_end < tokens.len() {
                if self.match_at(tokens, value_end, true).is_some() {
                    break;
                }
                let token = &tokens[value_end];
                if value_end > value_start && token.terminated && token.key.chars().any(char::is_alphabetic) {
                    break;
                }
                value_end += 1;
            }

            if let Some(field) = label.field {
                let evidence = tokens[label.start..value_end].iter().map(|t| t.region).collect();
                let value = tokens[value_start..value_end]
                    .iter()
                    .map(|t| t.raw.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                found.push((field, evidence, value));
            }

            position = value_end.max(label.start + 1);
        }

        found
    }

    fn describe(&self) -> &'static str {
        match self.group {
            FieldGroup::MethodParameters => "method parameter",
            FieldGroup::SampleInfo => "sample info field",
            FieldGroup::PeakTable => "peak table field",
        }
    }
}

impl FieldExtractor for LabeledFieldExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn group(&self) -> FieldGroup {
        self.group
    }

    fn extract(&self, regions: &[TextRegion]) -> Extraction {
        let rows = build_rows(regions, self.row_tolerance);
        let mut fields = FieldMap::new();
        let mut evidence = Vec::new();
        let mut warnings = Vec::new();

        for row in &rows {
            let tokens = tokenize(row);
            for (field_index, field_evidence, raw_value) in self.scan_row(&tokens) {
                let spec = &self.dictionary.fields[field_index];
                if fields.contains_key(&spec.name) {
                    warnings.push(format!(
                        "Duplicate {} '{}' ignored (kept first occurrence)",
                        self.describe(),
                        spec.name
                    ));
                    continue;
                }

                match parse_value(spec, &raw_value) {
                    Some(value) => {
                        fields.insert(spec.name.clone(), value);
                        evidence.extend(field_evidence);
                    }
                    None => {
                        warnings.push(format!(
                            "Could not parse {} '{}' from \"{}\"",
                            self.describe(),
                            spec.name,
                            raw_value
                        ));
                    }
                }
            }
        }

        for spec in self.dictionary.fields.iter().filter(|f| f.expected) {
            if !fields.contains_key(&spec.name) {
                warnings.push(format!("Expected {} '{}' not found", self.describe(), spec.name));
            }
        }

        evidence.sort_unstable();
        evidence.dedup();

        let expected = self.dictionary.expected_count();
        let completeness = if expected > 0 {
            let found = self
                .dictionary
                .fields
                .iter()
                .filter(|f| f.expected && fields.contains_key(&f.name))
                .count();
            found as f64 / expected as f64
        } else if fields.is_empty() {
            0.0
        } else {
            1.0
        };

        for warning in &warnings {
            tracing::debug!(extractor = %self.name, "{}", warning);
        }

        Extraction {
            group: self.group,
            data: FieldData::Fields(fields),
            warnings,
            evidence,
            completeness,
        }
    }
}

fn parse_value(spec: &FieldSpec, raw: &str) -> Option<FieldValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match spec.kind {
        ValueKind::Text => Some(FieldValue::Text { value: raw.to_string() }),
        ValueKind::Quantity => split_quantity(raw).map(|(value, unit)| FieldValue::Quantity {
            value,
            unit: unit.or_else(|| spec.unit.clone()),
        }),
        ValueKind::DateTime => parse_date(raw).map(|parsed| match parsed {
            ParsedDate::DateTime(value) => FieldValue::DateTime { value },
            ParsedDate::Date(value) => FieldValue::Date { value },
        }),
        ValueKind::Ratio => parse_ratio(raw).map(|(numerator, denominator)| FieldValue::Ratio {
            numerator,
            denominator,
        }),
    }
}

fn label_words(label: &str) -> Vec<String> {
    label
        .split_whitespace()
        .map(normalize_key)
        .filter(|word| !word.is_empty())
        .collect()
}

fn char_len(words: &[String]) -> usize {
    words.iter().map(|w| w.chars().count()).sum()
}

fn normalize_key(word: &str) -> String {
    word.trim_end_matches([':', '=']).to_lowercase()
}

/// Split row cells into tokens, detaching `Label:value` pairs glued together by recognition.
///
/// A standalone `:` or `=` marks the preceding token as a terminated label.
fn tokenize(row: &Row<'_>) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for cell in &row.cells {
        for piece in split_glued(cell.text) {
            if piece == ":" || piece == "=" {
                if let Some(previous) = tokens.last_mut() {
                    previous.terminated = true;
                }
                continue;
            }
            tokens.push(Token {
                key: normalize_key(piece),
                terminated: piece.ends_with(':') || piece.ends_with('='),
                raw: piece.to_string(),
                region: cell.index,
            });
        }
    }

    tokens
}

/// `"Vial:12"` becomes `["Vial:", "12"]`; `"10:30"` and `"1:10"` are left whole.
fn split_glued(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut previous: Option<char> = None;

    for (offset, c) in text.char_indices() {
        let after = offset + c.len_utf8();
        let glued = (c == ':' || c == '=')
            && after < text.len()
            && previous.is_some_and(|p| p.is_alphabetic() || p == '.' || p == ')' || p == ']');
        if glued {
            pieces.push(&text[start..after]);
            start = after;
        }
        previous = Some(c);
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
