use std::sync::Arc;

use crate::composite::gradient::{GradientParams, OverlayTone, search, search_ladder};
use crate::composite::layout::{SafeMargins, SizeBounds, fit_font_size, place_title, wrap_title};
use crate::composite::text::{GlyphMask, TextTone, TitleRasterizer};
use crate::foundation::core::{Background, Canvas, RegionRect};
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::foundation::math::{lerp_u8, luma_stats, luma_u8, stats_from_sums};

/// Fixed layout and contrast policy for one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositorSettings {
    pub canvas: Canvas,
    pub margins: SafeMargins,
    pub contrast_floor: f64,
    /// Characters per title line before wrapping.
    pub wrap_width: usize,
    /// Share of the safe area's height the title block may occupy.
    pub max_title_height_frac: f64,
    pub size_bounds: SizeBounds,
    pub base_stroke_px: u32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            canvas: Canvas::THUMBNAIL,
            margins: SafeMargins::default(),
            contrast_floor: 0.15,
            wrap_width: 14,
            max_title_height_frac: 0.45,
            size_bounds: SizeBounds::default(),
            base_stroke_px: 4,
        }
    }
}

/// Per-attempt typography knobs the orchestrator may escalate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TitleStyle {
    pub stroke_px: u32,
}

impl TitleStyle {
    pub const STROKE_STEP_PX: u32 = 2;

    /// Base outline widened by `boost` escalation steps.
    pub fn escalated(settings: &CompositorSettings, boost: u8) -> Self {
        Self {
            stroke_px: settings.base_stroke_px + u32::from(boost) * Self::STROKE_STEP_PX,
        }
    }
}

/// Background plus gradient floor plus rendered title, with the metadata
/// validators need to re-check it.
#[derive(Clone, Debug)]
pub struct Composite {
    pub image: image::RgbImage,
    pub background: Background,
    pub title: String,
    pub lines: Vec<String>,
    pub title_region: RegionRect,
    pub font_size_px: f32,
    pub stroke_px: u32,
    pub text_tone: TextTone,
    pub gradient: Option<GradientParams>,
    /// RMS contrast of the title region before anything was drawn.
    pub contrast_before: f64,
    /// RMS contrast of the title region in the final image.
    pub contrast: f64,
}

/// Deterministic title compositor. Holds no mutable state; one instance may be
/// shared across attempts and threads.
#[derive(Clone, Debug)]
pub struct Compositor {
    settings: CompositorSettings,
    rasterizer: Arc<dyn TitleRasterizer>,
}

/// Fill and outline coverage placed at the title region.
struct TitleInk<'a> {
    fill: &'a GlyphMask,
    outline: &'a GlyphMask,
    tone: TextTone,
}

impl TitleInk<'_> {
    fn over(&self, px: [u8; 3], mx: u32, my: u32) -> [u8; 3] {
        let o = self.outline.at(mx, my);
        let f = self.fill.at(mx, my);
        let oc = self.tone.outline();
        let fc = self.tone.fill();
        let mut out = px;
        for c in 0..3 {
            out[c] = lerp_u8(out[c], oc[c], o);
            out[c] = lerp_u8(out[c], fc[c], f);
        }
        out
    }
}

impl Compositor {
    pub fn new(settings: CompositorSettings, rasterizer: Arc<dyn TitleRasterizer>) -> Self {
        Self {
            settings,
            rasterizer,
        }
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn compose(&self, background: &Background, title: &str) -> ThumbResult<Composite> {
        self.compose_styled(
            background,
            title,
            TitleStyle::escalated(&self.settings, 0),
        )
    }

    #[tracing::instrument(skip(self, background), fields(stroke_px = style.stroke_px))]
    pub fn compose_styled(
        &self,
        background: &Background,
        title: &str,
        style: TitleStyle,
    ) -> ThumbResult<Composite> {
        let s = &self.settings;
        if background.canvas() != s.canvas {
            return Err(ThumbError::composition(format!(
                "background is {}x{}, compositor canvas is {}x{}",
                background.canvas().width,
                background.canvas().height,
                s.canvas.width,
                s.canvas.height
            )));
        }
        let lines = wrap_title(title, s.wrap_width);
        if lines.is_empty() {
            return Err(ThumbError::composition("title is empty"));
        }

        let safe = s.margins.safe_rect(s.canvas);
        let max_h = (f64::from(safe.height) * s.max_title_height_frac).floor() as u32;
        let pad = style.stroke_px;
        let font_size_px = fit_font_size(
            |size| {
                let m = self.rasterizer.rasterize(&lines, size)?;
                Ok((m.width + 2 * pad, m.height + 2 * pad))
            },
            safe.width,
            max_h,
            s.size_bounds,
        )?;

        let fill = self.rasterizer.rasterize(&lines, font_size_px)?.padded(pad);
        let outline = fill.dilated(pad);
        let region = place_title(safe, fill.width, fill.height)?;
        debug_assert!(safe.contains_rect(region));

        let bg = background.pixels();
        let (mean_before, contrast_before) = luma_stats(bg, region);
        tracing::debug!(
            font_size_px,
            ?region,
            mean_before,
            contrast_before,
            "title placed"
        );

        let evaluate = |gradient: Option<&GradientParams>| {
            let tone = TextTone::against(region_mean(bg, region, gradient));
            let ink = TitleInk {
                fill: &fill,
                outline: &outline,
                tone,
            };
            (final_contrast(bg, region, gradient, &ink), tone)
        };

        let mut chosen: Option<GradientParams> = None;
        let (mut contrast, mut text_tone) = evaluate(None);
        if contrast_before < s.contrast_floor || contrast < s.contrast_floor {
            let ladder = search_ladder(region, OverlayTone::for_mean_luma(mean_before));
            if let Some((params, c)) =
                search(&ladder, s.contrast_floor, |p| evaluate(Some(p)).0)
            {
                if c < s.contrast_floor {
                    tracing::warn!(
                        contrast = c,
                        floor = s.contrast_floor,
                        "strongest gradient misses the contrast floor"
                    );
                }
                chosen = Some(params);
                (contrast, text_tone) = evaluate(Some(&params));
            }
        }

        let mut image = bg.clone();
        if let Some(g) = &chosen {
            g.apply(&mut image);
        }
        let ink = TitleInk {
            fill: &fill,
            outline: &outline,
            tone: text_tone,
        };
        for my in 0..region.height {
            for mx in 0..region.width {
                let (x, y) = (region.x + mx, region.y + my);
                let px = ink.over(image.get_pixel(x, y).0, mx, my);
                image.put_pixel(x, y, image::Rgb(px));
            }
        }

        tracing::debug!(
            contrast,
            gradient = chosen.is_some(),
            ?text_tone,
            "title composited"
        );

        Ok(Composite {
            image,
            background: background.clone(),
            title: title.to_string(),
            lines,
            title_region: region,
            font_size_px,
            stroke_px: style.stroke_px,
            text_tone,
            gradient: chosen,
            contrast_before,
            contrast,
        })
    }
}

fn shaded(bg: &image::RgbImage, x: u32, y: u32, gradient: Option<(&GradientParams, u8)>) -> [u8; 3] {
    let px = bg.get_pixel(x, y).0;
    match gradient {
        Some((g, w)) if w > 0 => g.blend(px, w),
        _ => px,
    }
}

/// Mean luma (0..1) of `region` after the gradient, before the title.
fn region_mean(bg: &image::RgbImage, region: RegionRect, gradient: Option<&GradientParams>) -> f64 {
    let mut sum = 0u64;
    for y in region.y..region.bottom() {
        let g = gradient.map(|g| (g, g.row_weight(y)));
        for x in region.x..region.right() {
            sum += u64::from(luma_u8(shaded(bg, x, y, g)));
        }
    }
    let n = u64::from(region.width) * u64::from(region.height);
    if n == 0 {
        return 0.0;
    }
    sum as f64 / n as f64 / 255.0
}

/// RMS contrast of `region` exactly as the final render will produce it.
fn final_contrast(
    bg: &image::RgbImage,
    region: RegionRect,
    gradient: Option<&GradientParams>,
    ink: &TitleInk<'_>,
) -> f64 {
    let (mut sum, mut sum_sq) = (0u64, 0u64);
    for y in region.y..region.bottom() {
        let g = gradient.map(|g| (g, g.row_weight(y)));
        for x in region.x..region.right() {
            let px = ink.over(shaded(bg, x, y, g), x - region.x, y - region.y);
            let l = u64::from(luma_u8(px));
            sum += l;
            sum_sq += l * l;
        }
    }
    stats_from_sums(
        sum,
        sum_sq,
        u64::from(region.width) * u64::from(region.height),
    )
    .1
}
