use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::foundation::error::{ThumbError, ThumbResult};

/// 8-bit coverage mask of rendered title glyphs, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn new(width: u32, height: u32, coverage: Vec<u8>) -> ThumbResult<Self> {
        if coverage.len() != width as usize * height as usize {
            return Err(ThumbError::composition(
                "glyph mask coverage length does not match width*height",
            ));
        }
        Ok(Self {
            width,
            height,
            coverage,
        })
    }

    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.coverage[(y * self.width + x) as usize]
    }

    /// Copy into a larger canvas with `pad` transparent pixels on every side.
    pub fn padded(&self, pad: u32) -> Self {
        let width = self.width + 2 * pad;
        let height = self.height + 2 * pad;
        let mut coverage = vec![0u8; width as usize * height as usize];
        for y in 0..self.height {
            let src = (y * self.width) as usize;
            let dst = ((y + pad) * width + pad) as usize;
            coverage[dst..dst + self.width as usize]
                .copy_from_slice(&self.coverage[src..src + self.width as usize]);
        }
        Self {
            width,
            height,
            coverage,
        }
    }

    /// Square max-filter of `radius`, run as two separable passes.
    pub fn dilated(&self, radius: u32) -> Self {
        if radius == 0 {
            return self.clone();
        }
        let (w, h) = (self.width as i64, self.height as i64);
        let r = i64::from(radius);
        let mut tmp = vec![0u8; self.coverage.len()];
        for y in 0..h {
            for x in 0..w {
                let mut m = 0u8;
                for sx in (x - r).max(0)..=(x + r).min(w - 1) {
                    m = m.max(self.coverage[(y * w + sx) as usize]);
                }
                tmp[(y * w + x) as usize] = m;
            }
        }
        let mut out = vec![0u8; self.coverage.len()];
        for y in 0..h {
            for x in 0..w {
                let mut m = 0u8;
                for sy in (y - r).max(0)..=(y + r).min(h - 1) {
                    m = m.max(tmp[(sy * w + x) as usize]);
                }
                out[(y * w + x) as usize] = m;
            }
        }
        Self {
            width: self.width,
            height: self.height,
            coverage: out,
        }
    }

    pub fn covered_fraction(&self) -> f64 {
        if self.coverage.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.coverage.iter().map(|&c| u64::from(c)).sum();
        sum as f64 / (255.0 * self.coverage.len() as f64)
    }
}

/// Turns wrapped title lines into a coverage mask at a given font size.
///
/// Implementations must be deterministic: the same lines and size always yield
/// the same mask. Lines are centered horizontally within the block.
pub trait TitleRasterizer: Send + Sync + std::fmt::Debug {
    fn rasterize(&self, lines: &[String], size_px: f32) -> ThumbResult<GlyphMask>;
}

/// Whether the title is drawn light-on-dark or dark-on-light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTone {
    Light,
    Dark,
}

impl TextTone {
    /// Pick the tone that stands out against a backdrop of the given mean luma (0..1).
    pub fn against(mean_luma: f64) -> Self {
        if mean_luma < 0.5 { Self::Light } else { Self::Dark }
    }

    pub fn fill(self) -> [u8; 3] {
        match self {
            Self::Light => [255, 255, 255],
            Self::Dark => [16, 16, 16],
        }
    }

    pub fn outline(self) -> [u8; 3] {
        match self {
            Self::Light => [0, 0, 0],
            Self::Dark => [255, 255, 255],
        }
    }
}

/// Raw font file plus the face index inside it (non-zero only for collections).
#[derive(Clone)]
pub struct FontSource {
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSource")
            .field("bytes_len", &self.bytes.len())
            .field("index", &self.index)
            .finish()
    }
}

impl FontSource {
    pub fn from_file(path: &Path) -> ThumbResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font file '{}'", path.display()))?;
        Ok(Self {
            bytes: Arc::new(bytes),
            index: 0,
        })
    }

    /// Find a bold sans-serif face among installed system fonts.
    pub fn discover_system() -> ThumbResult<Self> {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();

        let families = [
            usvg::fontdb::Family::Name("DejaVu Sans"),
            usvg::fontdb::Family::Name("Arial"),
            usvg::fontdb::Family::Name("Helvetica"),
            usvg::fontdb::Family::Name("Liberation Sans"),
            usvg::fontdb::Family::SansSerif,
        ];
        let query = usvg::fontdb::Query {
            families: &families,
            weight: usvg::fontdb::Weight::BOLD,
            stretch: usvg::fontdb::Stretch::Normal,
            style: usvg::fontdb::Style::Normal,
        };

        let id = db
            .query(&query)
            .or_else(|| db.faces().next().map(|f| f.id))
            .ok_or_else(|| ThumbError::composition("no system fonts available"))?;

        db.with_face_data(id, |data, index| Self {
            bytes: Arc::new(data.to_vec()),
            index,
        })
        .ok_or_else(|| ThumbError::composition("system font data could not be loaded"))
    }

    /// Use `path` when given, otherwise discover a system face.
    pub fn resolve(path: Option<&Path>) -> ThumbResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::discover_system(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct CoverageBrush;

/// Family, weight and style Parley must request to land on `FontSource::index`.
#[derive(Clone, Debug)]
struct FaceSelector {
    family: String,
    weight: parley::style::FontWeight,
    style: parley::style::FontStyle,
}

struct ShapingContexts {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CoverageBrush>,
}

/// Shapes with Parley and rasterizes glyph outlines with `vello_cpu`.
///
/// Font registration happens once in [`ParleyRasterizer::new`]; the shaping
/// contexts are reused across calls.
pub struct ParleyRasterizer {
    font: FontSource,
    face: FaceSelector,
    render_font: vello_cpu::peniko::FontData,
    contexts: Mutex<ShapingContexts>,
}

impl std::fmt::Debug for ParleyRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyRasterizer")
            .field("font", &self.font)
            .field("face", &self.face)
            .finish_non_exhaustive()
    }
}

impl ParleyRasterizer {
    pub fn new(font: FontSource) -> ThumbResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::new(font.bytes.clone()), None);

        let (family_id, info) = families
            .iter()
            .find_map(|(id, fonts)| {
                fonts
                    .iter()
                    .find(|info| info.index() == font.index)
                    .map(|info| (*id, info.clone()))
            })
            .ok_or_else(|| {
                ThumbError::composition(format!(
                    "font bytes contain no face with index {}",
                    font.index
                ))
            })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ThumbError::composition("registered font family has no name"))?
            .to_string();

        let render_font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::new(font.bytes.clone()),
            font.index,
        );
        Ok(Self {
            face: FaceSelector {
                family,
                weight: info.weight(),
                style: info.style(),
            },
            render_font,
            contexts: Mutex::new(ShapingContexts {
                font_ctx,
                layout_ctx: parley::LayoutContext::new(),
            }),
            font,
        })
    }

    fn layout(&self, text: &str, size_px: f32) -> ThumbResult<parley::Layout<CoverageBrush>> {
        let mut guard = self
            .contexts
            .lock()
            .map_err(|_| ThumbError::composition("text shaping context poisoned"))?;
        let ShapingContexts {
            font_ctx,
            layout_ctx,
        } = &mut *guard;

        let mut builder = layout_ctx.ranged_builder(font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Borrowed(self.face.family.as_str())),
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(self.face.weight));
        builder.push_default(parley::style::StyleProperty::FontStyle(self.face.style));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(CoverageBrush));

        let mut layout: parley::Layout<CoverageBrush> = builder.build(text);
        layout.break_all_lines(None);
        let width = layout.width();
        layout.align(
            Some(width),
            parley::Alignment::Center,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}

impl TitleRasterizer for ParleyRasterizer {
    fn rasterize(&self, lines: &[String], size_px: f32) -> ThumbResult<GlyphMask> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ThumbError::composition(
                "title size_px must be finite and > 0",
            ));
        }
        let text = lines.join("\n");
        let layout = self.layout(&text, size_px)?;

        let width = (layout.width().ceil() as u32).max(1);
        let height = (layout.height().ceil() as u32).max(1);
        let w16: u16 = width
            .try_into()
            .map_err(|_| ThumbError::composition("title layout width exceeds u16"))?;
        let h16: u16 = height
            .try_into()
            .map_err(|_| ThumbError::composition("title layout height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.render_font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);
        let coverage = pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .map(|px| px[3])
            .collect();
        GlyphMask::new(width, height, coverage)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/text.rs"]
mod tests;
