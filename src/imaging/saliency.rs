//! Content-aware crop selection.
//!
//! Scores every pixel of a downscaled analysis copy by local detail
//! (luma Laplacian) and colourfulness (saturation), then slides a window of
//! the requested aspect over a summed-area table and keeps the highest
//! scoring position. A small centre bias breaks ties, so featureless images
//! get a centred crop.

use super::backend::BackendError;
use crate::types::Rect;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Longest edge of the analysis copy.
const ANALYSIS_EDGE: u32 = 256;
const SATURATION_WEIGHT: f64 = 0.3;
/// Per-pixel score granted to a window centred on the image, decaying
/// linearly to zero at the farthest possible offset.
const CENTER_WEIGHT: f64 = 0.02;

/// Choose the most salient `width`×`height` rectangle in `image`.
///
/// The result is expressed in the image's own pixel space and always lies
/// inside it.
pub fn find_best_crop(image: &DynamicImage, width: u32, height: u32) -> Result<Rect, BackendError> {
    let (img_w, img_h) = (image.width(), image.height());

    if width == 0 || height == 0 {
        return Err(BackendError::ProcessingFailed(
            "saliency crop target has no area".into(),
        ));
    }
    if width > img_w || height > img_h {
        return Err(BackendError::ProcessingFailed(format!(
            "saliency crop {width}x{height} exceeds image {img_w}x{img_h}"
        )));
    }
    if width == img_w && height == img_h {
        return Ok(Rect::from_size(img_w, img_h));
    }

    let scale = (ANALYSIS_EDGE as f64 / img_w.max(img_h) as f64).min(1.0);
    let analysis_w = ((img_w as f64 * scale).round() as u32).max(1);
    let analysis_h = ((img_h as f64 * scale).round() as u32).max(1);
    let small = if scale < 1.0 {
        image
            .resize_exact(analysis_w, analysis_h, FilterType::Triangle)
            .to_rgb8()
    } else {
        image.to_rgb8()
    };

    let table = SummedArea::new(&energy_map(&small), analysis_w, analysis_h);

    let window_w = ((width as f64 * scale).round() as u32).clamp(1, analysis_w);
    let window_h = ((height as f64 * scale).round() as u32).clamp(1, analysis_h);
    let area = (window_w * window_h) as f64;

    let max_dx = (analysis_w - window_w) as f64 / 2.0;
    let max_dy = (analysis_h - window_h) as f64 / 2.0;
    let max_dist = (max_dx * max_dx + max_dy * max_dy).sqrt();

    let mut best = (f64::MIN, 0u32, 0u32);
    for y in 0..=(analysis_h - window_h) {
        for x in 0..=(analysis_w - window_w) {
            let dx = x as f64 - max_dx;
            let dy = y as f64 - max_dy;
            let centrality = if max_dist > 0.0 {
                1.0 - (dx * dx + dy * dy).sqrt() / max_dist
            } else {
                1.0
            };
            let score = table.sum(x, y, window_w, window_h) + CENTER_WEIGHT * area * centrality;
            if score > best.0 {
                best = (score, x, y);
            }
        }
    }

    let (_, best_x, best_y) = best;
    let x = ((best_x as f64 / scale).round() as u32).min(img_w - width);
    let y = ((best_y as f64 / scale).round() as u32).min(img_h - height);
    Ok(Rect::new(x, y, width, height))
}

/// Per-pixel saliency: edge strength plus weighted saturation.
fn energy_map(img: &RgbImage) -> Vec<f64> {
    let (w, h) = img.dimensions();
    let luma: Vec<f64> = img
        .pixels()
        .map(|p| (0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64) / 255.0)
        .collect();
    let at = |x: i64, y: i64| -> f64 {
        let cx = x.clamp(0, w as i64 - 1) as usize;
        let cy = y.clamp(0, h as i64 - 1) as usize;
        luma[cy * w as usize + cx]
    };

    let mut energy = Vec::with_capacity((w * h) as usize);
    for (x, y, p) in img.enumerate_pixels() {
        let (xi, yi) = (x as i64, y as i64);
        let laplacian = 4.0 * at(xi, yi) - at(xi - 1, yi) - at(xi + 1, yi) - at(xi, yi - 1)
            - at(xi, yi + 1);

        let max = p.0.iter().copied().max().unwrap_or(0) as f64;
        let min = p.0.iter().copied().min().unwrap_or(0) as f64;
        let saturation = if max > 0.0 { (max - min) / max } else { 0.0 };

        energy.push(laplacian.abs() + SATURATION_WEIGHT * saturation);
    }
    energy
}

/// Summed-area table over a `w`×`h` grid, with a zero row and column.
struct SummedArea {
    stride: usize,
    sums: Vec<f64>,
}

impl SummedArea {
    fn new(values: &[f64], w: u32, h: u32) -> Self {
        let stride = w as usize + 1;
        let mut sums = vec![0.0; stride * (h as usize + 1)];
        for y in 0..h as usize {
            let mut row = 0.0;
            for x in 0..w as usize {
                row += values[y * w as usize + x];
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        self.sums[y1 * self.stride + x1] - self.sums[y0 * self.stride + x1]
            - self.sums[y1 * self.stride + x0]
            + self.sums[y0 * self.stride + x0]
    }
}
