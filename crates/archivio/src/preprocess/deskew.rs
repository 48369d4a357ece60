//! Skew estimation and correction.
//!
//! Scanned pages are rarely perfectly level. Skew is estimated from the
//! dominant near-horizontal line structure (text baselines, ruled lines) via
//! a Hough transform over Canny edges, and corrected by rotating about the
//! image center. Estimates at or below the configured threshold are left
//! alone; a sub-half-degree rotation costs more in interpolation blur than
//! it buys in recognition accuracy.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions};

const CANNY_LOW_THRESHOLD: f32 = 50.0;
const CANNY_HIGH_THRESHOLD: f32 = 100.0;

/// Lines steeper than this are vertical page structure (margins, column
/// rules) and say nothing about text-baseline skew.
const MAX_LINE_DEVIATION_DEGREES: f32 = 45.0;

/// Estimate page skew in degrees, positive meaning the text descends to the
/// right. Returns `None` when no usable line structure is found.
///
/// The median over detected line angles is used rather than the mean, so a
/// few stray diagonals (fold creases, stamps) cannot drag the estimate.
pub fn estimate_skew(img: &GrayImage) -> Option<f32> {
    let (width, height) = img.dimensions();
    if width < 16 || height < 16 {
        return None;
    }

    let edges = canny(img, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
    let options = LineDetectionOptions {
        vote_threshold: (width.min(height) / 4).max(60),
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);

    // A polar line's normal angle is 90 degrees off its direction, so a
    // level line reports 90 and the offset from 90 is the skew
    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| line.angle_in_degrees as f32 - 90.0)
        .filter(|angle| angle.abs() <= MAX_LINE_DEVIATION_DEGREES)
        .collect();
    if angles.is_empty() {
        return None;
    }

    angles.sort_by(|a, b| a.total_cmp(b));
    let mid = angles.len() / 2;
    let median = if angles.len() % 2 == 0 {
        (angles[mid - 1] + angles[mid]) / 2.0
    } else {
        angles[mid]
    };
    Some(median)
}

/// Correct page skew when the estimate exceeds `threshold_degrees`.
///
/// Below the threshold (or when no estimate is possible) the input is
/// returned unchanged.
pub fn deskew(img: &GrayImage, threshold_degrees: f32) -> GrayImage {
    match estimate_skew(img) {
        Some(skew) if skew.abs() > threshold_degrees => {
            tracing::debug!(skew_degrees = skew, "correcting page skew");
            rotate_edge_extend(img, (-skew).to_radians())
        }
        _ => img.clone(),
    }
}

/// Rotate clockwise by `theta` radians about the image center, keeping the
/// original dimensions. Samples that fall outside the source are taken from
/// the nearest border pixel, so no fill color is introduced into the page.
fn rotate_edge_extend(img: &GrayImage, theta: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let (sin, cos) = theta.sin_cos();

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        // Inverse map: where in the source does this output pixel come from
        let sx = cos * dx + sin * dy + cx;
        let sy = -sin * dx + cos * dy + cy;
        Luma([sample_bilinear_clamped(img, sx, sy)])
    })
}

fn sample_bilinear_clamped(img: &GrayImage, x: f32, y: f32) -> u8 {
    let (width, height) = img.dimensions();
    let at = |xi: i64, yi: i64| -> f32 {
        let cx = xi.clamp(0, width as i64 - 1) as u32;
        let cy = yi.clamp(0, height as i64 - 1) as u32;
        img.get_pixel(cx, cy)[0] as f32
    };

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}
