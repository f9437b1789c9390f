//! Peak-table extraction.
//!
//! The extractor looks for a header row naming at least a retention-time column and an
//! area or height column. Header words that sit close together are merged into phrases
//! ("Ret Time", "Area %") and each data cell is assigned to the column whose header center is
//! nearest. Without a header, columns are inferred from position in rows that are mostly
//! numeric.

use super::rows::{Cell, Row, build_rows};
use super::values::{is_integer_token, parse_number, parse_positive};
use super::{Extraction, FieldData, FieldExtractor};
use crate::types::{FieldGroup, PeakRecord, TextRegion};

/// Header words closer than this many row heights belong to one phrase.
const PHRASE_GAP_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    RetentionTime,
    Area,
    Height,
    AreaPercent,
    Name,
    Flags,
    Index,
    /// Recognized report columns this extractor does not keep (width, symmetry, ...)
    Ignored,
    Unknown,
}

#[derive(Debug, Clone)]
struct HeaderColumn {
    kind: Column,
    center: f64,
}

#[derive(Debug, Clone)]
struct Phrase {
    text: String,
    left: f64,
    right: f64,
    kind: Column,
}

/// Extracts the peak table in printed elution order.
#[derive(Debug, Clone)]
pub struct PeakTableExtractor {
    row_tolerance: f64,
}

impl PeakTableExtractor {
    pub fn new(row_tolerance: f64) -> Self {
        Self { row_tolerance }
    }
}

impl Default for PeakTableExtractor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Mutable state while walking table rows.
#[derive(Default)]
struct TableBuilder {
    peaks: Vec<PeakRecord>,
    evidence: Vec<usize>,
    warnings: Vec<String>,
    dropped: usize,
}

impl TableBuilder {
    fn accept(&mut self, row: &Row<'_>, mut peak: PeakRecord) {
        if let Some(previous) = self.peaks.last()
            && peak.retention_time < previous.retention_time
        {
            peak.out_of_order = true;
            self.warnings.push(format!(
                "Peak {} retention time {} is earlier than the preceding peak ({}); kept and flagged as out of order",
                self.peaks.len() + 1,
                peak.retention_time,
                previous.retention_time
            ));
        }
        self.evidence.extend(row.indices());
        self.peaks.push(peak);
    }

    fn drop_row(&mut self, row: &Row<'_>, reason: &str) {
        self.dropped += 1;
        self.warnings
            .push(format!("Dropped peak table row \"{}\": {}", row.text(), reason));
    }

    fn finish(mut self) -> Extraction {
        let attempted = self.peaks.len() + self.dropped;
        let completeness = if attempted == 0 {
            0.0
        } else {
            self.peaks.len() as f64 / attempted as f64
        };
        self.evidence.sort_unstable();
        self.evidence.dedup();

        Extraction {
            group: FieldGroup::PeakTable,
            data: FieldData::Peaks(self.peaks),
            warnings: self.warnings,
            evidence: self.evidence,
            completeness,
        }
    }
}

impl FieldExtractor for PeakTableExtractor {
    fn name(&self) -> &str {
        "peak_table"
    }

    fn group(&self) -> FieldGroup {
        FieldGroup::PeakTable
    }

    fn extract(&self, regions: &[TextRegion]) -> Extraction {
        let rows = build_rows(regions, self.row_tolerance);
        let mut builder = TableBuilder::default();

        match find_header(&rows) {
            Some((header_row, columns)) => {
                tracing::debug!(row = header_row, columns = columns.len(), "Peak table header found");
                read_with_header(&rows[header_row + 1..], &columns, &mut builder);
                if builder.peaks.is_empty() {
                    builder
                        .warnings
                        .push("Peak table header found but no readable peak rows".to_string());
                }
            }
            None => {
                let start = rows.iter().position(is_numeric_row);
                match start {
                    Some(start) => {
                        builder
                            .warnings
                            .push("Peak table header not found; columns inferred from position".to_string());
                        read_positional(&rows[start..], &mut builder);
                    }
                    None => builder.warnings.push("No peak table found".to_string()),
                }
            }
        }

        for warning in &builder.warnings {
            tracing::debug!("{}", warning);
        }
        builder.finish()
    }
}

fn read_with_header(rows: &[Row<'_>], columns: &[HeaderColumn], builder: &mut TableBuilder) {
    for row in rows {
        if is_total_row(row) {
            break;
        }
        let numeric = numeric_cells(row);
        if numeric == 0 {
            if builder.peaks.is_empty() {
                continue;
            }
            break;
        }

        let mut assigned: Vec<(Column, Vec<Cell<'_>>)> = columns.iter().map(|c| (c.kind, Vec::new())).collect();
        for cell in &row.cells {
            let center = cell.bounding_box.center_x();
            let nearest = columns
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (a.center - center).abs().total_cmp(&(b.center - center).abs()))
                .map(|(i, _)| i);
            if let Some(i) = nearest {
                assigned[i].1.push(*cell);
            }
        }

        let joined = |kind: Column, separator: &str| -> Option<String> {
            let texts: Vec<&str> = assigned
                .iter()
                .filter(|(k, _)| *k == kind)
                .flat_map(|(_, cells)| cells.iter().map(|c| c.text))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join(separator))
            }
        };

        let Some(retention_time) = joined(Column::RetentionTime, "").as_deref().and_then(parse_positive) else {
            builder.drop_row(row, "retention time unreadable");
            continue;
        };
        let area = joined(Column::Area, "").as_deref().and_then(parse_positive);
        let height = joined(Column::Height, "").as_deref().and_then(parse_positive);
        if area.is_none() && height.is_none() {
            builder.drop_row(row, "no readable area or height");
            continue;
        }

        let peak = PeakRecord {
            retention_time,
            area,
            height,
            area_percent: joined(Column::AreaPercent, "")
                .as_deref()
                .and_then(parse_number)
                .filter(|v| *v >= 0.0),
            name: joined(Column::Name, " "),
            integration_flags: joined(Column::Flags, " "),
            index: joined(Column::Index, "").as_deref().and_then(parse_index),
            confidence: row.mean_confidence(),
            out_of_order: false,
        };
        builder.accept(row, peak);
    }
}

fn read_positional(rows: &[Row<'_>], builder: &mut TableBuilder) {
    for row in rows {
        if is_total_row(row) {
            break;
        }
        if !is_numeric_row(row) {
            if builder.peaks.is_empty() {
                continue;
            }
            break;
        }

        let mut numbers: Vec<&str> = Vec::new();
        let mut flags: Vec<&str> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        for cell in &row.cells {
            if parse_number(cell.text).is_some() {
                numbers.push(cell.text);
            } else if looks_like_flags(cell.text) {
                flags.push(cell.text);
            } else {
                names.push(cell.text);
            }
        }

        let mut index = None;
        if numbers.len() >= 3 && is_integer_token(numbers[0]) && !is_integer_token(numbers[1]) {
            index = parse_index(numbers[0]);
            numbers.remove(0);
        }

        let Some(retention_time) = numbers.first().copied().and_then(parse_positive) else {
            builder.drop_row(row, "retention time unreadable");
            continue;
        };
        let area = numbers.get(1).copied().and_then(parse_positive);
        let height = numbers.get(2).copied().and_then(parse_positive);
        if area.is_none() && height.is_none() {
            builder.drop_row(row, "no readable area or height");
            continue;
        }

        let peak = PeakRecord {
            retention_time,
            area,
            height,
            area_percent: numbers.get(3).copied().and_then(parse_number).filter(|v| *v >= 0.0),
            name: (!names.is_empty()).then(|| names.join(" ")),
            integration_flags: (!flags.is_empty()).then(|| flags.join(" ")),
            index,
            confidence: row.mean_confidence(),
            out_of_order: false,
        };
        builder.accept(row, peak);
    }
}

/// First row naming a retention-time column and an area or height column.
fn find_header(rows: &[Row<'_>]) -> Option<(usize, Vec<HeaderColumn>)> {
    rows.iter().enumerate().find_map(|(index, row)| {
        let phrases = merge_phrases(row);
        let has = |kind: Column| phrases.iter().any(|p| p.kind == kind);
        if has(Column::RetentionTime) && (has(Column::Area) || has(Column::Height)) {
            let columns = phrases
                .iter()
                .map(|p| HeaderColumn {
                    kind: p.kind,
                    center: (p.left + p.right) / 2.0,
                })
                .collect();
            Some((index, columns))
        } else {
            None
        }
    })
}

/// Merge adjacent header words into column titles.
///
/// Words join the current phrase when the gap is small and they do not name a different
/// column (a lone `%` always joins, turning "Area" into "Area %").
fn merge_phrases(row: &Row<'_>) -> Vec<Phrase> {
    let max_gap = row.median_height() * PHRASE_GAP_FACTOR;
    let mut phrases: Vec<Phrase> = Vec::new();

    for cell in &row.cells {
        let left = cell.bounding_box.x as f64;
        let right = cell.bounding_box.right() as f64;
        let kind = classify(cell.text);

        if let Some(current) = phrases.last_mut() {
            let close = left - current.right < max_gap;
            let compatible = kind == Column::Unknown
                || current.kind == Column::Unknown
                || (kind == current.kind && kind != Column::Ignored)
                || cell.text.trim() == "%";
            if close && compatible {
                current.text.push(' ');
                current.text.push_str(cell.text);
                current.right = right;
                current.kind = classify(&current.text);
                continue;
            }
        }

        phrases.push(Phrase {
            text: cell.text.to_string(),
            left,
            right,
            kind,
        });
    }

    phrases
}

fn classify(title: &str) -> Column {
    let compact: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bare = compact.trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')' | ':' | '.'));

    if compact.contains('%') || compact.contains("percent") {
        Column::AreaPercent
    } else if bare.starts_with("area") {
        Column::Area
    } else if bare.starts_with("height") || bare.starts_with("hgt") || bare == "ht" {
        Column::Height
    } else if bare.contains("time") || bare.starts_with("ret") || bare == "rt" || bare.starts_with("rt[") || bare == "r.t" {
        Column::RetentionTime
    } else if ["name", "compound", "component", "analyte", "peakname"]
        .iter()
        .any(|k| bare.starts_with(k))
    {
        Column::Name
    } else if ["type", "flag", "inttype", "int.type"].iter().any(|k| bare.starts_with(k)) {
        Column::Flags
    } else if ["#", "peak", "pk", "no", "nr"].contains(&bare) || bare.starts_with("peak#") || bare.starts_with("pk#") {
        Column::Index
    } else if [
        "width",
        "symmetry",
        "tailing",
        "plates",
        "resolution",
        "amount",
        "conc",
        "units",
        "asym",
        "s/n",
    ]
    .iter()
    .any(|k| bare.starts_with(k))
    {
        Column::Ignored
    } else {
        Column::Unknown
    }
}

fn numeric_cells(row: &Row<'_>) -> usize {
    row.cells.iter().filter(|c| parse_number(c.text).is_some()).count()
}

/// At least two numbers making up at least half of the row.
fn is_numeric_row(row: &Row<'_>) -> bool {
    let numeric = numeric_cells(row);
    numeric >= 2 && numeric * 2 >= row.cells.len()
}

fn is_total_row(row: &Row<'_>) -> bool {
    row.cells.first().is_some_and(|cell| {
        let lower = cell.text.to_lowercase();
        lower.starts_with("total") || lower.starts_with("sum")
    })
}

/// Integration codes such as `BB`, `VV`, `BV`, `MM`.
fn looks_like_flags(text: &str) -> bool {
    let trimmed = text.trim();
    (1..=4).contains(&trimmed.len()) && trimmed.chars().all(|c| c.is_ascii_uppercase())
}

fn parse_index(text: &str) -> Option<u32> {
    parse_number(text)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}
