//! Shared fixtures for integration tests.
//!
//! Images are generated in memory; recognition is replaced by [`FakeEngine`], which returns
//! scripted regions chosen by the normalized image width.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use chromascan::image::NormalizedImage;
use chromascan::{BoundingBox, ChromascanConfig, Pipeline, RawImage, RecognitionEngine, Result, TextRegion};
use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Column x positions of the synthetic peak table.
const TABLE_COLUMNS: [u32; 4] = [40, 160, 300, 440];
const ROW_PITCH: u32 = 40;
const WORD_HEIGHT: u32 = 20;

/// Recognition stand-in keyed by image width.
#[derive(Default)]
pub struct FakeEngine {
    scripts: HashMap<u32, Vec<TextRegion>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, width: u32, regions: Vec<TextRegion>) -> Self {
        self.scripts.insert(width, regions);
        self
    }
}

impl RecognitionEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<Vec<TextRegion>> {
        Ok(self.scripts.get(&image.width).cloned().unwrap_or_default())
    }
}

/// Default config with deskew off, since fixture pages are blank.
pub fn test_config() -> ChromascanConfig {
    let mut config = ChromascanConfig::default();
    config.preprocessing.deskew.enabled = false;
    config
}

pub fn pipeline_with(engine: FakeEngine) -> Pipeline {
    Pipeline::with_engine(Arc::new(engine), &test_config()).expect("test config should be valid")
}

pub fn encode_png(image: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding should succeed");
    bytes
}

/// White page of the given size, PNG-encoded.
pub fn blank_page(width: u32, height: u32) -> RawImage {
    RawImage::with_format(encode_png(&GrayImage::from_pixel(width, height, Luma([255]))), "png")
}

/// Page with dark horizontal bars standing in for text lines.
pub fn ruled_page(width: u32, height: u32) -> GrayImage {
    let mut page = GrayImage::from_pixel(width, height, Luma([255]));
    let margin = width / 10;
    let mut y = 50;
    while y + 6 < height.saturating_sub(40) {
        draw_filled_rect_mut(&mut page, Rect::at(margin as i32, y as i32).of_size(width - 2 * margin, 6), Luma([0]));
        y += 55;
    }
    page
}

/// Lay words out left to right on the given row.
pub fn text_line(out: &mut Vec<TextRegion>, row: u32, line: &str, confidence: f64) {
    let mut x = 20;
    for word in line.split_whitespace() {
        let width = 12 * word.chars().count() as u32;
        out.push(TextRegion::new(word, BoundingBox::new(x, 40 + ROW_PITCH * row, width, WORD_HEIGHT), confidence));
        x += width + 8;
    }
}

/// Put one word per table column on the given row.
pub fn table_line(out: &mut Vec<TextRegion>, row: u32, cells: [&str; 4], confidence: f64) {
    for (text, x) in cells.iter().zip(TABLE_COLUMNS) {
        let width = 11 * text.chars().count() as u32;
        out.push(TextRegion::new(*text, BoundingBox::new(x, 40 + ROW_PITCH * row, width, WORD_HEIGHT), confidence));
    }
}

/// Method and sample header block, five rows.
pub fn report_header(out: &mut Vec<TextRegion>, confidence: f64) {
    text_line(out, 0, "Method: Caffeine_Assay", confidence);
    text_line(out, 1, "Column: Zorbax C18 Flow Rate: 1.0 mL/min", confidence);
    text_line(out, 2, "Injection Volume: 10 µL", confidence);
    text_line(out, 3, "Sample Name: Std-1 Operator: JD", confidence);
    text_line(out, 4, "Injection Date: 2024-03-15 10:22:05", confidence);
}

/// Retention times used for synthetic peak rows.
pub fn retention_times(peaks: usize) -> Vec<f64> {
    (0..peaks).map(|i| 1.25 + 0.75 * i as f64).collect()
}

/// Full report: header block followed by a peak table with `peaks` rows.
pub fn report_regions(peaks: usize, confidence: f64) -> Vec<TextRegion> {
    let rows: Vec<(String, String)> = retention_times(peaks)
        .into_iter()
        .enumerate()
        .map(|(i, rt)| (format!("{:.3}", rt), format!("{}", 1500 + 250 * i)))
        .collect();
    report_with_rows(&rows, confidence)
}

/// Full report with explicit `(retention time, area)` cell text.
pub fn report_with_rows(rows: &[(String, String)], confidence: f64) -> Vec<TextRegion> {
    let mut out = Vec::new();
    report_header(&mut out, confidence);
    table_line(&mut out, 6, ["Peak", "RT", "Area", "Height"], confidence);
    for (i, (rt, area)) in rows.iter().enumerate() {
        let index = (i + 1).to_string();
        let height = (100 + 10 * i).to_string();
        table_line(&mut out, 7 + i as u32, [index.as_str(), rt.as_str(), area.as_str(), height.as_str()], confidence);
    }
    out
}

/// Header block only; no peak table.
pub fn report_without_table(confidence: f64) -> Vec<TextRegion> {
    let mut out = Vec::new();
    report_header(&mut out, confidence);
    out
}
