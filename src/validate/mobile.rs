use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::composite::compositor::Composite;
use crate::foundation::core::ServiceKind;
use crate::services::{OcrEngine, joined_text, with_timeout};
use crate::validate::similarity::similarity;
use crate::validate::{ValidationResult, Validator};

/// OCR on a phone-sized preview must still recover the title.
pub struct MobileReadability {
    ocr: Arc<dyn OcrEngine>,
    timeout: Duration,
    max_width: u32,
    threshold: f64,
}

impl MobileReadability {
    pub const NAME: &'static str = "mobile_readability";

    pub fn new(ocr: Arc<dyn OcrEngine>, timeout: Duration, max_width: u32, threshold: f64) -> Self {
        Self {
            ocr,
            timeout,
            max_width: max_width.max(1),
            threshold,
        }
    }
}

/// Downsample to at most `max_width` wide, keeping aspect ratio.
pub(crate) fn mobile_preview(img: &image::RgbImage, max_width: u32) -> image::RgbImage {
    let (w, h) = img.dimensions();
    if w <= max_width {
        return img.clone();
    }
    let height = ((u64::from(h) * u64::from(max_width)) / u64::from(w)).max(1) as u32;
    image::imageops::resize(img, max_width, height, image::imageops::FilterType::Triangle)
}

#[async_trait]
impl Validator for MobileReadability {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self, composite: Arc<Composite>, expected_title: &str) -> ValidationResult {
        let preview = mobile_preview(&composite.image, self.max_width);
        let recognized =
            with_timeout(ServiceKind::Ocr, self.timeout, self.ocr.recognize(&preview)).await;
        let spans = match recognized {
            Ok(s) => s,
            Err(e) => {
                return ValidationResult::from_error(Self::NAME, &e)
                    .with_intermediate("mobile_preview", preview);
            }
        };

        let detected = joined_text(&spans);
        let score = similarity(expected_title, &detected);
        tracing::debug!(
            width = preview.width(),
            height = preview.height(),
            detected = %detected,
            score,
            "mobile preview ocr"
        );

        let result = if score > self.threshold {
            ValidationResult::pass(Self::NAME)
        } else {
            ValidationResult::fail(
                Self::NAME,
                format!(
                    "at {}x{} ocr read {detected:?}, similarity {score:.3} is not above {}",
                    preview.width(),
                    preview.height(),
                    self.threshold
                ),
            )
        };
        result.with_score(score).with_intermediate("mobile_preview", preview)
    }
}
