//! Speck removal on binarized images.

use image::GrayImage;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// Clear ink pixels that have no ink among their 8 neighbours.
///
/// Connected strokes, including 1-pixel gridlines, are untouched. Returns the number of
/// pixels cleared.
pub fn remove_specks(image: &mut GrayImage) -> usize {
    let (width, height) = image.dimensions();
    let mut isolated = Vec::new();

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[0] != INK {
            continue;
        }
        let has_neighbour = neighbours(x, y, width, height).any(|(nx, ny)| image.get_pixel(nx, ny)[0] == INK);
        if !has_neighbour {
            isolated.push((x, y));
        }
    }

    for &(x, y) in &isolated {
        image.get_pixel_mut(x, y)[0] = PAPER;
    }
    isolated.len()
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    (-1i64..=1)
        .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                Some((nx as u32, ny as u32))
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_isolated_speck_removed() {
        let mut image = GrayImage::from_pixel(10, 10, Luma([PAPER]));
        image.put_pixel(5, 5, Luma([INK]));
        assert_eq!(remove_specks(&mut image), 1);
        assert_eq!(image.get_pixel(5, 5)[0], PAPER);
    }

    #[test]
    fn test_gridline_kept() {
        let mut image = GrayImage::from_pixel(20, 10, Luma([PAPER]));
        for x in 0..20 {
            image.put_pixel(x, 4, Luma([INK]));
        }
        image.put_pixel(10, 8, Luma([INK]));

        assert_eq!(remove_specks(&mut image), 1);
        assert!((0..20).all(|x| image.get_pixel(x, 4)[0] == INK));
    }

    #[test]
    fn test_corner_speck_removed() {
        let mut image = GrayImage::from_pixel(5, 5, Luma([PAPER]));
        image.put_pixel(0, 0, Luma([INK]));
        assert_eq!(remove_specks(&mut image), 1);
    }
}
