use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::composite::compositor::Composite;
use crate::composite::text::TextTone;
use crate::foundation::core::ServiceKind;
use crate::foundation::math::luma_u8;
use crate::services::{OcrEngine, joined_text, with_timeout};
use crate::validate::similarity::similarity;
use crate::validate::{ValidationResult, Validator};

const LIGHT_TEXT_THRESHOLD: u8 = 200;
const DARK_TEXT_THRESHOLD: u8 = 55;

/// Full-frame OCR must reproduce the expected title.
pub struct TextFidelity {
    ocr: Arc<dyn OcrEngine>,
    timeout: Duration,
    threshold: f64,
}

impl TextFidelity {
    pub const NAME: &'static str = "text_fidelity";

    pub fn new(ocr: Arc<dyn OcrEngine>, timeout: Duration, threshold: f64) -> Self {
        Self {
            ocr,
            timeout,
            threshold,
        }
    }
}

/// Title-tone pixels become white, everything else black.
pub(crate) fn ocr_mask(img: &image::RgbImage, tone: TextTone) -> image::RgbImage {
    image::RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let l = luma_u8(img.get_pixel(x, y).0);
        let ink = match tone {
            TextTone::Light => l >= LIGHT_TEXT_THRESHOLD,
            TextTone::Dark => l <= DARK_TEXT_THRESHOLD,
        };
        image::Rgb(if ink { [255; 3] } else { [0; 3] })
    })
}

#[async_trait]
impl Validator for TextFidelity {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self, composite: Arc<Composite>, expected_title: &str) -> ValidationResult {
        let mask = ocr_mask(&composite.image, composite.text_tone);
        let recognized = with_timeout(ServiceKind::Ocr, self.timeout, self.ocr.recognize(&mask)).await;
        let spans = match recognized {
            Ok(s) => s,
            Err(e) => {
                return ValidationResult::from_error(Self::NAME, &e)
                    .with_intermediate("ocr_mask", mask);
            }
        };

        let detected = joined_text(&spans);
        let score = similarity(expected_title, &detected);
        tracing::debug!(expected = expected_title, detected = %detected, score, "full-frame ocr");

        let result = if score > self.threshold {
            ValidationResult::pass(Self::NAME)
        } else {
            ValidationResult::fail(
                Self::NAME,
                format!(
                    "ocr read {detected:?}, similarity {score:.3} to {expected_title:?} is not above {}",
                    self.threshold
                ),
            )
        };
        result.with_score(score).with_intermediate("ocr_mask", mask)
    }
}
