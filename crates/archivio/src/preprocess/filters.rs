//! Per-stage image filters for the enhancement pipeline.
//!
//! Each filter targets one degradation mode of old scanned documents: film
//! grain, faded ink, uneven illumination, soft glyph edges, and low scan
//! resolution. Stage order matters and is owned by the
//! [`Preprocessor`](super::Preprocessor); the functions here are pure
//! image-to-image transforms.

use image::imageops::FilterType;
use image::{GrayImage, Luma};
use imageproc::filter::{filter3x3, gaussian_blur_f32};

/// Non-local-means style denoising tuned for scanned-document grain.
///
/// Each pixel is replaced by a patch-similarity-weighted average over a
/// bounded search window. The small window keeps the filter tractable on
/// full pages; grain is uncorrelated at this scale so a wider search buys
/// little.
pub fn denoise(img: &GrayImage, strength: f32) -> GrayImage {
    const PATCH_RADIUS: i32 = 1;
    const SEARCH_RADIUS: i32 = 2;
    const PATCH_AREA: f32 = ((2 * PATCH_RADIUS + 1) * (2 * PATCH_RADIUS + 1)) as f32;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let h2 = strength * strength;

    let pixel = |x: i32, y: i32| -> f32 {
        let cx = x.clamp(0, width as i32 - 1) as u32;
        let cy = y.clamp(0, height as i32 - 1) as u32;
        img.get_pixel(cx, cy)[0] as f32
    };

    let patch_distance = |ax: i32, ay: i32, bx: i32, by: i32| -> f32 {
        let mut sum = 0.0;
        for dy in -PATCH_RADIUS..=PATCH_RADIUS {
            for dx in -PATCH_RADIUS..=PATCH_RADIUS {
                let d = pixel(ax + dx, ay + dy) - pixel(bx + dx, by + dy);
                sum += d * d;
            }
        }
        sum / PATCH_AREA
    };

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as i32, y as i32);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
            for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
                let weight = (-patch_distance(x, y, x + dx, y + dy) / h2).exp();
                weight_sum += weight;
                value_sum += weight * pixel(x + dx, y + dy);
            }
        }
        Luma([(value_sum / weight_sum).round().clamp(0.0, 255.0) as u8])
    })
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tile_grid` x `tile_grid` grid; each tile gets
/// a clipped-histogram equalization lookup table, and output values are
/// bilinearly interpolated between the four surrounding tile tables. Local
/// equalization recovers faded ink against background without blowing out
/// page regions that are already well exposed.
pub fn clahe(img: &GrayImage, tile_grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let grid = tile_grid.clamp(1, width.min(height).max(1));

    let tile_bounds = |index: u32, extent: u32| -> (u32, u32) {
        let start = (index as u64 * extent as u64 / grid as u64) as u32;
        let end = ((index as u64 + 1) * extent as u64 / grid as u64) as u32;
        (start, end)
    };

    let mut luts = vec![[0u8; 256]; (grid * grid) as usize];
    for ty in 0..grid {
        for tx in 0..grid {
            let (x0, x1) = tile_bounds(tx, width);
            let (y0, y1) = tile_bounds(ty, height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let count = ((x1 - x0) * (y1 - y0)) as u32;
            if count == 0 {
                continue;
            }

            // Clip bins at the limit and hand the excess back uniformly, so
            // flat regions cannot be amplified into noise
            let limit = ((clip_limit * count as f32 / 256.0).max(1.0)) as u32;
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            let remainder = (excess % 256) as usize;
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += bonus + u32::from(i < remainder);
            }

            let lut = &mut luts[(ty * grid + tx) as usize];
            let mut cdf = 0u32;
            for (value, bin) in hist.iter().enumerate() {
                cdf += *bin;
                lut[value] = ((cdf as f32 * 255.0) / count as f32).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y)[0] as usize;

        // Fractional tile coordinates relative to tile centers
        let gx = ((x as f32 + 0.5) * grid as f32 / width as f32 - 0.5).clamp(0.0, (grid - 1) as f32);
        let gy = ((y as f32 + 0.5) * grid as f32 / height as f32 - 0.5).clamp(0.0, (grid - 1) as f32);
        let tx0 = gx.floor() as u32;
        let ty0 = gy.floor() as u32;
        let tx1 = (tx0 + 1).min(grid - 1);
        let ty1 = (ty0 + 1).min(grid - 1);
        let wx = gx - tx0 as f32;
        let wy = gy - ty0 as f32;

        let at = |tx: u32, ty: u32| luts[(ty * grid + tx) as usize][value] as f32;
        let top = at(tx0, ty0) * (1.0 - wx) + at(tx1, ty0) * wx;
        let bottom = at(tx0, ty1) * (1.0 - wx) + at(tx1, ty1) * wx;
        Luma([(top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8])
    })
}

/// Gaussian-adaptive thresholding to black/white.
///
/// A pixel is white when it exceeds the Gaussian-weighted mean of its
/// `block_size` neighborhood minus `offset`; per-neighborhood thresholds are
/// robust to uneven illumination across a page.
pub fn binarize_adaptive(img: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    // Sigma matching OpenCV's derived kernel for the given block size
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(img, sigma);

    GrayImage::from_fn(width, height, |x, y| {
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - offset;
        if img.get_pixel(x, y)[0] as i16 > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Laplacian-boost sharpening to restore glyph edges blurred by binarization.
pub fn sharpen(img: &GrayImage) -> GrayImage {
    let kernel: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
    filter3x3::<Luma<u8>, f32, u8>(img, &kernel)
}

/// Cubic upscale so the page is at least `min_height` pixels tall.
///
/// OCR accuracy degrades sharply below ~1000px page height for small serif
/// fonts; taller images pass through unchanged.
pub fn upscale_to_height(img: &GrayImage, min_height: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if height == 0 || height >= min_height {
        return img.clone();
    }
    let scale = min_height as f32 / height as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    image::imageops::resize(img, new_width, min_height, FilterType::CatmullRom)
}
