use crate::types::{BoundingBox, TextRegion};

/// Tesseract TSV rows carry 12 tab-separated fields.
const TSV_MIN_FIELDS: usize = 12;
/// Word rows have level 5 (page, block, paragraph and line rows come first).
const TSV_WORD_LEVEL: u32 = 5;

/// Extract word-level text regions from Tesseract TSV output.
///
/// Confidences are rescaled from Tesseract's 0-100 range to `[0, 1]`. Rows without text are
/// skipped, as are rows with a negative or non-numeric confidence.
pub fn parse_tsv_regions(tsv_data: &str) -> Vec<TextRegion> {
    let mut regions = Vec::new();

    for (line_num, line) in tsv_data.lines().enumerate() {
        if line_num == 0 {
            continue;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }

        let level = fields[0].trim().parse::<u32>().unwrap_or(0);
        if level != TSV_WORD_LEVEL {
            continue;
        }

        let conf = fields[10].trim().parse::<f64>().unwrap_or(-1.0);
        if !conf.is_finite() || conf < 0.0 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let bounding_box = BoundingBox {
            x: fields[6].trim().parse().unwrap_or(0),
            y: fields[7].trim().parse().unwrap_or(0),
            width: fields[8].trim().parse().unwrap_or(0),
            height: fields[9].trim().parse().unwrap_or(0),
        };

        regions.push(TextRegion {
            text: text.to_string(),
            bounding_box,
            confidence: (conf / 100.0).clamp(0.0, 1.0),
        });
    }

    regions
}
