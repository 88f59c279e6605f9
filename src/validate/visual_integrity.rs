use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::composite::compositor::Composite;
use crate::foundation::core::ServiceKind;
use crate::services::{Finding, FindingCategory, VisionJudge, with_timeout};
use crate::validate::{ValidationResult, Validator};

/// Fixed audit prompt sent with every background.
pub const AUDIT_INSTRUCTION: &str = "You are a strict QA auditor for background images. \
Report every occurrence of: human faces; hands or other body parts; recognizable printed text, \
letters, numbers, watermarks or symbols. Give each a confidence between 0 and 1.";

/// Semantic audit of the untouched background for faces, hands and stray text.
pub struct VisualIntegrity {
    judge: Arc<dyn VisionJudge>,
    timeout: Duration,
    threshold: f64,
}

impl VisualIntegrity {
    pub const NAME: &'static str = "visual_integrity";

    pub fn new(judge: Arc<dyn VisionJudge>, timeout: Duration, threshold: f64) -> Self {
        Self {
            judge,
            timeout,
            threshold,
        }
    }

    fn is_banned(&self, f: &Finding) -> bool {
        matches!(
            f.category,
            FindingCategory::Face | FindingCategory::Hand | FindingCategory::PrintedText
        ) && f.confidence > self.threshold
    }
}

#[async_trait]
impl Validator for VisualIntegrity {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self, composite: Arc<Composite>, _expected_title: &str) -> ValidationResult {
        let background = composite.background.pixels();
        let findings = match with_timeout(
            ServiceKind::Vision,
            self.timeout,
            self.judge.audit(background, AUDIT_INSTRUCTION),
        )
        .await
        {
            Ok(f) => f,
            Err(e) => return ValidationResult::from_error(Self::NAME, &e),
        };

        let banned: Vec<&Finding> = findings.iter().filter(|f| self.is_banned(f)).collect();
        let worst = banned.iter().map(|f| f.confidence).fold(0.0, f64::max);
        if banned.is_empty() {
            return ValidationResult::pass(Self::NAME).with_score(worst);
        }
        let listed = banned
            .iter()
            .map(|f| format!("{:?} ({:.2})", f.category, f.confidence))
            .collect::<Vec<_>>()
            .join(", ");
        ValidationResult::fail(
            Self::NAME,
            format!("background contains {listed} above confidence {}", self.threshold),
        )
        .with_score(worst)
    }
}
