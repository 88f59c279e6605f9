use crate::foundation::core::RegionRect;

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Linear blend `a*(255-w) + b*w` in 8-bit fixed point.
pub(crate) fn lerp_u8(a: u8, b: u8, w: u8) -> u8 {
    let w = u16::from(w);
    let inv = 255 - w;
    let v = mul_div255_u16(u16::from(a), inv) + mul_div255_u16(u16::from(b), w);
    v.min(255) as u8
}

/// Rec. 601 luma in 0..=255, integer rounded.
pub fn luma_u8(px: [u8; 3]) -> u8 {
    let [r, g, b] = px.map(u32::from);
    ((r * 299 + g * 587 + b * 114 + 500) / 1000) as u8
}

/// Mean and population standard deviation of normalized luma (0..1) over `region`.
///
/// Summation runs row-major in integer space so the result is bit-stable across
/// runs. An empty region yields `(0.0, 0.0)`.
pub fn luma_stats(img: &image::RgbImage, region: RegionRect) -> (f64, f64) {
    let region = region.clamp_to(crate::foundation::core::Canvas {
        width: img.width(),
        height: img.height(),
    });
    if region.is_empty() {
        return (0.0, 0.0);
    }

    let mut sum: u64 = 0;
    let mut sum_sq: u64 = 0;
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            let l = u64::from(luma_u8(img.get_pixel(x, y).0));
            sum += l;
            sum_sq += l * l;
        }
    }
    stats_from_sums(sum, sum_sq, region.width as u64 * region.height as u64)
}

pub(crate) fn stats_from_sums(sum: u64, sum_sq: u64, n: u64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let mean = sum as f64 / n;
    let var = (sum_sq as f64 / n - mean * mean).max(0.0);
    (mean / 255.0, var.sqrt() / 255.0)
}

/// RMS contrast: standard deviation of normalized luma over `region`.
pub fn rms_contrast(img: &image::RgbImage, region: RegionRect) -> f64 {
    luma_stats(img, region).1
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
