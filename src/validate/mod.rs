//! Independent checks that accept or reject one composite.
//!
//! Every check implements [`Validator`]. A [`ValidatorSuite`] dispatches all of
//! them concurrently against the same immutable composite and only returns once
//! every result is in, in registration order.

mod legibility;
mod mobile;
pub mod similarity;
mod text_fidelity;
mod visual_integrity;

use std::sync::Arc;

use async_trait::async_trait;

use crate::composite::compositor::Composite;
use crate::foundation::error::{ThumbError, ThumbResult};

pub use legibility::Legibility;
pub use mobile::MobileReadability;
pub use text_fidelity::TextFidelity;
pub use visual_integrity::{AUDIT_INSTRUCTION, VisualIntegrity};

/// Image a check produced on the way to its verdict (OCR mask, mobile preview).
#[derive(Clone, Debug)]
pub struct Intermediate {
    pub name: &'static str,
    pub image: Arc<image::RgbImage>,
}

/// Outcome of one check. `reason` is present exactly when the check failed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    check_name: String,
    passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(skip)]
    intermediate: Option<Intermediate>,
}

impl ValidationResult {
    pub fn pass(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: true,
            reason: None,
            score: None,
            intermediate: None,
        }
    }

    pub fn fail(check_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: false,
            reason: Some(reason.into()),
            score: None,
            intermediate: None,
        }
    }

    /// Failed result carrying the error that prevented the check from running.
    pub fn from_error(check_name: impl Into<String>, err: &ThumbError) -> Self {
        Self::fail(check_name, format!("{}: {err}", err.kind()))
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_intermediate(mut self, name: &'static str, image: image::RgbImage) -> Self {
        self.intermediate = Some(Intermediate {
            name,
            image: Arc::new(image),
        });
        self
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn intermediate(&self) -> Option<&Intermediate> {
        self.intermediate.as_ref()
    }

    /// As a `ValidationError` naming this check; `None` for passing results.
    pub fn to_error(&self) -> Option<ThumbError> {
        self.reason
            .as_ref()
            .map(|r| ThumbError::validation(self.check_name.clone(), r.clone()))
    }
}

/// A single accept/reject check over a composite and the title it should show.
///
/// Implementations never return errors: a check that cannot reach a verdict
/// (service down, timeout) reports a failed result with the cause as reason.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, composite: Arc<Composite>, expected_title: &str) -> ValidationResult;
}

/// Ordered set of uniquely named validators.
#[derive(Clone, Default)]
pub struct ValidatorSuite {
    validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for ValidatorSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}

impl ValidatorSuite {
    pub fn new(validators: Vec<Arc<dyn Validator>>) -> ThumbResult<Self> {
        let mut suite = Self::default();
        for v in validators {
            suite.push(v)?;
        }
        Ok(suite)
    }

    pub fn push(&mut self, validator: Arc<dyn Validator>) -> ThumbResult<()> {
        if self.validators.iter().any(|v| v.name() == validator.name()) {
            return Err(ThumbError::config(format!(
                "duplicate validator name '{}'",
                validator.name()
            )));
        }
        self.validators.push(validator);
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every check concurrently and wait for all of them.
    #[tracing::instrument(skip_all, fields(checks = self.validators.len()))]
    pub async fn run(&self, composite: Arc<Composite>, expected_title: &str) -> Vec<ValidationResult> {
        let checks = self
            .validators
            .iter()
            .map(|v| v.check(Arc::clone(&composite), expected_title));
        let results = futures::future::join_all(checks).await;
        for r in &results {
            match r.to_error() {
                None => tracing::info!(check = r.check_name(), score = ?r.score(), "check passed"),
                Some(e) => tracing::info!(score = ?r.score(), error = %e, "check failed"),
            }
        }
        results
    }
}

/// Logical AND over a complete result set. An empty set never passes.
pub fn overall_pass(results: &[ValidationResult]) -> bool {
    !results.is_empty() && results.iter().all(ValidationResult::passed)
}

#[cfg(test)]
#[path = "../../tests/unit/validate/suite.rs"]
mod tests;
