//! Exponential gradient floor.
//!
//! The overlay spans the full canvas width across a vertical band centered on
//! the title region. Its opacity peaks at the band center and decays
//! exponentially with distance, reaching exactly zero at the band boundary so
//! no edge is visible where the overlay stops.

use crate::foundation::core::{Canvas, RegionRect};
use crate::foundation::math::lerp_u8;

/// Direction of the overlay: toward black for light backdrops, toward white for dark ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayTone {
    Darken,
    Lighten,
}

impl OverlayTone {
    /// Darken backdrops whose mean luma (0..1) is at least one half, lighten the rest.
    pub fn for_mean_luma(mean: f64) -> Self {
        if mean >= 0.5 { Self::Darken } else { Self::Lighten }
    }

    pub fn target(self) -> [u8; 3] {
        match self {
            Self::Darken => [0, 0, 0],
            Self::Lighten => [255, 255, 255],
        }
    }
}

/// Band extends this many title-region heights above and below the region center.
pub const BAND_HALF_EXTENT: f64 = 1.0;

const DECAY_LADDER: [f64; 3] = [4.0, 2.5, 1.0];
const PEAK_LADDER: [f64; 6] = [0.35, 0.5, 0.65, 0.8, 0.9, 1.0];

/// One concrete overlay: tone, peak opacity and exponential decay rate.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientParams {
    pub tone: OverlayTone,
    pub peak: f64,
    pub decay: f64,
    pub center_y: f64,
    pub half_extent: f64,
}

impl GradientParams {
    /// Center the band on `region`.
    pub fn around(region: RegionRect, tone: OverlayTone, peak: f64, decay: f64) -> Self {
        Self {
            tone,
            peak: peak.clamp(0.0, 1.0),
            decay: decay.max(1e-3),
            center_y: f64::from(region.y) + f64::from(region.height) * 0.5,
            half_extent: (f64::from(region.height) * BAND_HALF_EXTENT).max(1.0),
        }
    }

    /// Opacity (0..1) at normalized distance `d` (0 = center, 1 = band edge).
    ///
    /// `peak * (e^{-k d} - e^{-k}) / (1 - e^{-k})`: exponential in `d`, equal to
    /// `peak` at the center and exactly zero at and beyond the edge.
    pub fn weight_at(&self, d: f64) -> f64 {
        if d >= 1.0 {
            return 0.0;
        }
        let tail = (-self.decay).exp();
        self.peak * ((-self.decay * d).exp() - tail) / (1.0 - tail)
    }

    /// Quantized opacity for pixel row `y`.
    pub fn row_weight(&self, y: u32) -> u8 {
        let d = ((f64::from(y) + 0.5) - self.center_y).abs() / self.half_extent;
        (self.weight_at(d) * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Rows touched by the overlay, clipped to the canvas.
    pub fn band(&self, canvas: Canvas) -> RegionRect {
        let top = (self.center_y - self.half_extent).floor().max(0.0) as u32;
        let bottom = ((self.center_y + self.half_extent).ceil() as u32).min(canvas.height);
        RegionRect::new(0, top.min(bottom), canvas.width, bottom - top.min(bottom))
    }

    /// Blend one pixel on row `y` toward the overlay target.
    pub fn blend(&self, px: [u8; 3], row_weight: u8) -> [u8; 3] {
        let t = self.tone.target();
        [
            lerp_u8(px[0], t[0], row_weight),
            lerp_u8(px[1], t[1], row_weight),
            lerp_u8(px[2], t[2], row_weight),
        ]
    }

    pub fn apply(&self, img: &mut image::RgbImage) {
        let band = self.band(Canvas {
            width: img.width(),
            height: img.height(),
        });
        for y in band.y..band.bottom() {
            let w = self.row_weight(y);
            if w == 0 {
                continue;
            }
            for x in 0..img.width() {
                let px = img.get_pixel(x, y).0;
                img.put_pixel(x, y, image::Rgb(self.blend(px, w)));
            }
        }
    }
}

/// Candidate overlays in the order they are tried: gentlest first.
///
/// The steep decay rates come first so the overlay stays concentrated near the
/// text; flatter rates are only reached when the steep ones cannot lift the
/// region above the floor.
pub fn search_ladder(region: RegionRect, tone: OverlayTone) -> Vec<GradientParams> {
    DECAY_LADDER
        .iter()
        .flat_map(|&decay| {
            PEAK_LADDER
                .iter()
                .map(move |&peak| GradientParams::around(region, tone, peak, decay))
        })
        .collect()
}

/// Walk the ladder and return the first candidate whose evaluated contrast reaches
/// `floor`, or the strongest candidate (and its contrast) if none does.
pub fn search(
    ladder: &[GradientParams],
    floor: f64,
    mut evaluate: impl FnMut(&GradientParams) -> f64,
) -> Option<(GradientParams, f64)> {
    let mut last = None;
    for params in ladder {
        let c = evaluate(params);
        if c >= floor {
            return Some((*params, c));
        }
        last = Some((*params, c));
    }
    last
}

#[cfg(test)]
#[path = "../../tests/unit/composite/gradient.rs"]
mod tests;
