//! Row model shared by all extractors.

use crate::confidence::finite_mean;
use crate::ocr::group_rows;
use crate::types::{BoundingBox, TextRegion};

/// One recognized word, tagged with its position in the region slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell<'a> {
    pub index: usize,
    pub text: &'a str,
    pub bounding_box: BoundingBox,
    pub confidence: f64,
}

/// Words whose vertical centers align, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub cells: Vec<Cell<'a>>,
}

impl<'a> Row<'a> {
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.text).collect::<Vec<_>>().join(" ")
    }

    pub fn mean_confidence(&self) -> f64 {
        mean_confidence(&self.cells)
    }

    pub fn median_height(&self) -> f64 {
        let mut heights: Vec<u32> = self.cells.iter().map(|c| c.bounding_box.height).collect();
        if heights.is_empty() {
            return 0.0;
        }
        heights.sort_unstable();
        heights[heights.len() / 2] as f64
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().map(|c| c.index)
    }
}

pub fn mean_confidence(cells: &[Cell<'_>]) -> f64 {
    finite_mean(cells.iter().map(|c| c.confidence))
}

/// Group regions into rows using `tolerance x median region height` as the vertical band.
pub fn build_rows(regions: &[TextRegion], tolerance: f64) -> Vec<Row<'_>> {
    group_rows(regions, tolerance)
        .into_iter()
        .map(|indices| Row {
            cells: indices
                .into_iter()
                .map(|index| {
                    let region = &regions[index];
                    Cell {
                        index,
                        text: region.text.as_str(),
                        bounding_box: region.bounding_box,
                        confidence: region.confidence,
                    }
                })
                .collect(),
        })
        .collect()
}
