//! Reading-order and row grouping over positioned text.

use crate::types::TextRegion;

/// Group regions into visual rows.
///
/// Regions are taken in order of vertical center; a region joins the current row when its
/// center lies within `tolerance x median height` of the row's mean center. Rows are returned
/// top to bottom, each holding region indices sorted left to right.
pub fn group_rows(regions: &[TextRegion], tolerance: f64) -> Vec<Vec<usize>> {
    if regions.is_empty() {
        return Vec::new();
    }

    let band = (median_height(regions) * tolerance).max(1.0);
    let mut order: Vec<usize> = (0..regions.len()).collect();
    order.sort_by(|&a, &b| {
        let ya = regions[a].bounding_box.center_y();
        let yb = regions[b].bounding_box.center_y();
        ya.total_cmp(&yb)
            .then(regions[a].bounding_box.x.cmp(&regions[b].bounding_box.x))
            .then(a.cmp(&b))
    });

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut row_center = 0.0;
    for index in order {
        let center = regions[index].bounding_box.center_y();
        match rows.last_mut() {
            Some(row) if (center - row_center).abs() <= band => {
                row.push(index);
                row_center = row
                    .iter()
                    .map(|&i| regions[i].bounding_box.center_y())
                    .sum::<f64>()
                    / row.len() as f64;
            }
            _ => {
                rows.push(vec![index]);
                row_center = center;
            }
        }
    }

    for row in &mut rows {
        row.sort_by_key(|&i| (regions[i].bounding_box.x, i));
    }
    rows
}

/// Reorder regions top-to-bottom, then left-to-right within each row.
pub fn sort_reading_order(regions: Vec<TextRegion>, tolerance: f64) -> Vec<TextRegion> {
    let rows = group_rows(&regions, tolerance);
    let mut slots: Vec<Option<TextRegion>> = regions.into_iter().map(Some).collect();
    rows.into_iter()
        .flatten()
        .filter_map(|index| slots[index].take())
        .collect()
}

fn median_height(regions: &[TextRegion]) -> f64 {
    let mut heights: Vec<u32> = regions
        .iter()
        .map(|r| r.bounding_box.height)
        .filter(|&h| h > 0)
        .collect();
    if heights.is_empty() {
        return 1.0;
    }
    heights.sort_unstable();
    heights[heights.len() / 2] as f64
}
