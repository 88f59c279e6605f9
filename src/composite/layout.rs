use crate::foundation::core::{Canvas, Rect, RegionRect};
use crate::foundation::error::{ThumbError, ThumbResult};

/// Fractional borders (of canvas width/height) that title text must stay inside.
///
/// Approximates the areas platforms cover with duration badges, progress bars
/// and hover controls.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SafeMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for SafeMargins {
    fn default() -> Self {
        Self {
            left: 0.06,
            right: 0.06,
            top: 0.08,
            bottom: 0.10,
        }
    }
}

impl SafeMargins {
    pub fn validate(&self) -> ThumbResult<()> {
        for (name, v) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            if !v.is_finite() || !(0.0..0.5).contains(&v) {
                return Err(ThumbError::config(format!(
                    "safe margin {name} must be in [0, 0.5), got {v}"
                )));
            }
        }
        if self.left + self.right >= 1.0 || self.top + self.bottom >= 1.0 {
            return Err(ThumbError::config("safe margins leave no usable area"));
        }
        Ok(())
    }

    /// Safe rectangle snapped inward to whole pixels.
    pub fn safe_rect(&self, canvas: Canvas) -> RegionRect {
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        let r = Rect::new(
            w * self.left,
            h * self.top,
            w * (1.0 - self.right),
            h * (1.0 - self.bottom),
        );
        let x0 = r.x0.ceil().max(0.0) as u32;
        let y0 = r.y0.ceil().max(0.0) as u32;
        let x1 = (r.x1.floor() as u32).min(canvas.width).max(x0);
        let y1 = (r.y1.floor() as u32).min(canvas.height).max(y0);
        RegionRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Upper-case the title and greedily wrap on word boundaries at `width` characters.
///
/// Words longer than `width` keep a line to themselves rather than being split.
pub fn wrap_title(title: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::<String>::new();
    let mut current = String::new();
    for word in title.split_whitespace() {
        let word = word.to_uppercase();
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Center a `width` x `height` block horizontally in `safe` and anchor it to the
/// bottom of `safe`. Errors when the block is larger than the safe area.
pub fn place_title(safe: RegionRect, width: u32, height: u32) -> ThumbResult<RegionRect> {
    if width > safe.width || height > safe.height {
        return Err(ThumbError::composition(format!(
            "title block {width}x{height} exceeds safe area {}x{}",
            safe.width, safe.height
        )));
    }
    let x = safe.x + (safe.width - width) / 2;
    let y = safe.bottom() - height;
    Ok(RegionRect::new(x, y, width, height))
}

/// Font size search bounds in pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SizeBounds {
    pub min_px: f32,
    pub max_px: f32,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min_px: 18.0,
            max_px: 160.0,
        }
    }
}

const REFERENCE_SIZE_PX: f32 = 100.0;
const SEARCH_STEPS: usize = 12;
const SEARCH_RESOLUTION_PX: f32 = 0.5;

/// Largest font size whose measured block fits `max_w` x `max_h`.
///
/// Starts from a proportional estimate taken at a reference size, then
/// bisects between the bounds. `measure` returns the rendered block size at a
/// given font size and must be deterministic.
pub fn fit_font_size(
    mut measure: impl FnMut(f32) -> ThumbResult<(u32, u32)>,
    max_w: u32,
    max_h: u32,
    bounds: SizeBounds,
) -> ThumbResult<f32> {
    if !(bounds.min_px > 0.0 && bounds.min_px <= bounds.max_px) {
        return Err(ThumbError::config("font size bounds must satisfy 0 < min <= max"));
    }

    let (rw, rh) = measure(REFERENCE_SIZE_PX)?;
    if rw == 0 || rh == 0 {
        return Err(ThumbError::composition("title measured as an empty block"));
    }

    let mut fits = |size: f32| -> ThumbResult<bool> {
        let (w, h) = measure(size)?;
        Ok(w <= max_w && h <= max_h)
    };

    let scale = (f64::from(max_w) / f64::from(rw)).min(f64::from(max_h) / f64::from(rh));
    let guess = ((REFERENCE_SIZE_PX as f64 * scale) as f32).clamp(bounds.min_px, bounds.max_px);

    let (mut lo, mut hi, mut lo_fits) = (bounds.min_px, bounds.max_px, false);
    if fits(guess)? {
        lo = guess;
        lo_fits = true;
    } else {
        hi = guess;
    }

    for _ in 0..SEARCH_STEPS {
        if hi - lo < SEARCH_RESOLUTION_PX {
            break;
        }
        let mid = (lo + hi) * 0.5;
        if fits(mid)? {
            lo = mid;
            lo_fits = true;
        } else {
            hi = mid;
        }
    }

    if !lo_fits && !fits(lo)? {
        return Err(ThumbError::composition(format!(
            "title does not fit the safe area even at {}px",
            bounds.min_px
        )));
    }
    Ok(lo)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/layout.rs"]
mod tests;
