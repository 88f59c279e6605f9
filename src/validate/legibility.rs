use std::sync::Arc;

use async_trait::async_trait;

use crate::composite::compositor::Composite;
use crate::foundation::math::rms_contrast;
use crate::validate::{ValidationResult, Validator};

/// Independent re-measurement of RMS contrast over the title region.
#[derive(Clone, Copy, Debug)]
pub struct Legibility {
    floor: f64,
}

impl Legibility {
    pub const NAME: &'static str = "legibility";

    pub fn new(floor: f64) -> Self {
        Self { floor }
    }
}

#[async_trait]
impl Validator for Legibility {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self, composite: Arc<Composite>, _expected_title: &str) -> ValidationResult {
        let contrast = rms_contrast(&composite.image, composite.title_region);
        let result = if contrast >= self.floor {
            ValidationResult::pass(Self::NAME)
        } else {
            ValidationResult::fail(
                Self::NAME,
                format!(
                    "rms contrast {contrast:.4} in title region is below {}",
                    self.floor
                ),
            )
        };
        result.with_score(contrast)
    }
}
