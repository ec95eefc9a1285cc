//! Pure geometry for crops and thumbnails.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::{CropRequest, Rect};

/// Clamp a requested crop rectangle so it lies fully inside `bounds`.
///
/// Width and height are first capped to the bounds' size. On each axis, a
/// negative (out of bounds) origin is moved to the bounds' edge and the far
/// edge is pushed out by the same amount, but only when the pushed edge
/// still fits; otherwise the overflow is dropped and the rectangle shrinks.
/// It is never grown beyond the source.
///
/// # Examples
/// ```
/// # use postwall::imaging::clamp_crop_rect;
/// # use postwall::types::{CropRequest, Rect};
/// let bounds = Rect::from_size(2000, 1000);
/// let crop = clamp_crop_rect(CropRequest::new(-50, 0, 1800, 900), bounds);
/// assert_eq!(crop, Rect::new(0, 0, 1800, 900));
/// ```
pub fn clamp_crop_rect(requested: CropRequest, bounds: Rect) -> Rect {
    let width = requested.width.clamp(0, bounds.width as i64);
    let height = requested.height.clamp(0, bounds.height as i64);

    let (x0, x1) = clamp_axis(requested.x, width, bounds.x as i64, bounds.right() as i64);
    let (y0, y1) = clamp_axis(requested.y, height, bounds.y as i64, bounds.bottom() as i64);

    Rect::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
}

/// Clamp the span `[origin, origin + len)` into `[lo, hi]`.
///
/// Works in `i128` so any `i64` origin and length are handled exactly.
fn clamp_axis(origin: i64, len: i64, lo: i64, hi: i64) -> (i64, i64) {
    let (lo, hi) = (i128::from(lo), i128::from(hi));
    let mut start = i128::from(origin);
    let mut end = start + i128::from(len);

    if start < lo {
        let overflow = lo - start;
        start = lo;
        if end + overflow <= hi {
            end += overflow;
        }
    }

    let start = start.min(hi);
    let end = end.clamp(start, hi);
    // Both lie in [lo, hi], which came from i64
    (start as i64, end as i64)
}

/// Whether a (clamped) crop is a no-op and the original should be shown.
///
/// True when the crop has no area, or when it spans the whole image on
/// both axes.
pub fn disable_crop_condition(rect: Rect, bounds: Rect) -> bool {
    rect.is_empty() || (rect.width >= bounds.width && rect.height >= bounds.height)
}

/// Largest `(width, height)` with aspect `ratio` (w:h) that fits in `bounds`.
///
/// Constrains by width first; if the resulting height overflows the
/// source, constrains by height instead. Fractions are truncated.
///
/// # Examples
/// ```
/// # use postwall::imaging::target_ratio_fit;
/// # use postwall::types::Rect;
/// // Wide image: height-constrained
/// assert_eq!(target_ratio_fit(Rect::from_size(2000, 1000), (4, 3)), (1333, 1000));
/// // Tall image: width-constrained
/// assert_eq!(target_ratio_fit(Rect::from_size(900, 1600), (4, 3)), (900, 675));
/// ```
pub fn target_ratio_fit(bounds: Rect, ratio: (u32, u32)) -> (u32, u32) {
    let (ratio_w, ratio_h) = ratio;
    if ratio_w == 0 || ratio_h == 0 {
        return (bounds.width, bounds.height);
    }
    let ratio = ratio_w as f64 / ratio_h as f64;

    let mut w = bounds.width as f64;
    let mut h = w / ratio;

    if h as u32 > bounds.height {
        h = bounds.height as f64;
        w = h * ratio;
    }

    (w as u32, h as u32)
}

/// Dimensions of a thumbnail that fits inside a `max_edge` square.
///
/// Aspect ratio is preserved and images that already fit are left at
/// their original size (no upscaling).
pub fn calculate_thumbnail_dimensions(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w <= max_edge && src_h <= max_edge {
        return (src_w, src_h);
    }

    if src_w >= src_h {
        let h = (src_h as f64 * max_edge as f64 / src_w as f64).round() as u32;
        (max_edge, h.max(1))
    } else {
        let w = (src_w as f64 * max_edge as f64 / src_h as f64).round() as u32;
        (w.max(1), max_edge)
    }
}
