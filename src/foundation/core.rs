use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{ThumbError, ThumbResult};

pub use kurbo::Rect;

/// Fixed output canvas; every background and composite has exactly these dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const THUMBNAIL: Canvas = Canvas {
        width: 1280,
        height: 720,
    };

    pub fn new(width: u32, height: u32) -> ThumbResult<Self> {
        if width == 0 || height == 0 {
            return Err(ThumbError::config("canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::THUMBNAIL
    }
}

/// Integer pixel rectangle (x, y is the top-left corner; right/bottom exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RegionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains_rect(self, other: RegionRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Clamp into `canvas`, never producing a rect that extends past its edges.
    pub fn clamp_to(self, canvas: Canvas) -> Self {
        let x = self.x.min(canvas.width);
        let y = self.y.min(canvas.height);
        let right = self.right().min(canvas.width);
        let bottom = self.bottom().min(canvas.height);
        Self::new(x, y, right - x, bottom - y)
    }
}

/// External boundaries the pipeline talks to. Each one has its own deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Decomposition,
    Synthesis,
    Ocr,
    Vision,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Decomposition => "text decomposition",
            Self::Synthesis => "image synthesis",
            Self::Ocr => "ocr",
            Self::Vision => "vision judge",
        };
        f.write_str(s)
    }
}

/// A synthesized background, always exactly canvas-sized RGB8.
///
/// Owned by a single attempt; cheap to clone because pixels sit behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Background {
    pixels: Arc<image::RgbImage>,
}

impl Background {
    /// Wrap already-decoded pixels. Dimensions must match `canvas` exactly.
    pub fn from_rgb(pixels: image::RgbImage, canvas: Canvas) -> ThumbResult<Self> {
        if pixels.dimensions() != (canvas.width, canvas.height) {
            return Err(ThumbError::synthesis(format!(
                "background is {}x{}, expected {}x{}",
                pixels.width(),
                pixels.height(),
                canvas.width,
                canvas.height
            )));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
        })
    }

    /// Decode encoded image bytes, sanity check them and normalize to `canvas`.
    ///
    /// Rejects empty payloads, undecodable data and images without 8-bit color
    /// channels. Anything else is converted to RGB8 and resized with Lanczos3.
    pub fn from_encoded(bytes: &[u8], canvas: Canvas) -> ThumbResult<Self> {
        if bytes.is_empty() {
            return Err(ThumbError::synthesis("image service returned an empty payload"));
        }
        let decoded = image::load_from_memory(bytes)
            .context("decode synthesized background")
            .map_err(|e| ThumbError::synthesis(format!("{e:#}")))?;

        let color = decoded.color();
        if !color.has_color() || color.bytes_per_pixel() / color.channel_count() != 1 {
            return Err(ThumbError::synthesis(format!(
                "background has unsupported color type {color:?}; expected 8-bit color"
            )));
        }
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ThumbError::synthesis("background has zero dimensions"));
        }

        let rgb = decoded.to_rgb8();
        let rgb = if rgb.dimensions() == (canvas.width, canvas.height) {
            rgb
        } else {
            image::imageops::resize(
                &rgb,
                canvas.width,
                canvas.height,
                image::imageops::FilterType::Lanczos3,
            )
        };
        Self::from_rgb(rgb, canvas)
    }

    /// Flat single-color background.
    pub fn solid(canvas: Canvas, rgb: [u8; 3]) -> Self {
        Self {
            pixels: Arc::new(image::RgbImage::from_pixel(
                canvas.width,
                canvas.height,
                image::Rgb(rgb),
            )),
        }
    }

    pub fn pixels(&self) -> &image::RgbImage {
        &self.pixels
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
