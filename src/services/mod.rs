//! External boundaries: text decomposition, image synthesis, OCR and the vision judge.
//!
//! The pipeline only sees the traits below. HTTP implementations talking to an
//! OpenAI-compatible gateway live in the submodules; tests plug in fakes.

mod decomposer;
mod gateway;
mod ocr;
mod synthesizer;
mod vision;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::foundation::core::{Background, ServiceKind};
use crate::foundation::error::{ThumbError, ThumbResult};

pub use decomposer::{HttpDecomposer, parse_decomposition};
pub use gateway::{GatewayClient, GatewayConfig};
pub use ocr::HttpOcrEngine;
pub use synthesizer::{BASE_NEGATIVE_PROMPT, HttpSynthesizer, negative_prompt};
pub use vision::{HttpVisionJudge, parse_findings};

/// Text-free visual metaphor plus the literal title to print over it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Decomposition {
    pub metaphor: String,
    pub title: String,
}

#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Must be stateless across calls. Errors map to `DecompositionError`.
    async fn decompose(&self, topic: &str, restriction: &str) -> ThumbResult<Decomposition>;
}

#[async_trait]
pub trait BackgroundSynthesizer: Send + Sync {
    /// `restriction` is appended to the fixed negative prompt. The result is
    /// always canvas-sized.
    async fn synthesize(&self, metaphor: &str, restriction: &str) -> ThumbResult<Background>;
}

/// One run of recognized text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextSpan {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Joined span text in reading order.
pub fn joined_text(spans: &[TextSpan]) -> String {
    spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &image::RgbImage) -> ThumbResult<Vec<TextSpan>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Face,
    Hand,
    PrintedText,
    #[serde(other)]
    Other,
}

/// Something the vision judge spotted, with its confidence in `0..=1`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub confidence: f64,
}

#[async_trait]
pub trait VisionJudge: Send + Sync {
    async fn audit(&self, image: &image::RgbImage, instruction: &str) -> ThumbResult<Vec<Finding>>;
}

/// Per-boundary deadlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceTimeouts {
    pub decomposition: Duration,
    pub synthesis: Duration,
    pub ocr: Duration,
    pub vision: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            decomposition: Duration::from_secs(30),
            synthesis: Duration::from_secs(90),
            ocr: Duration::from_secs(30),
            vision: Duration::from_secs(45),
        }
    }
}

/// The four external collaborators one orchestrator talks to.
#[derive(Clone)]
pub struct Services {
    pub decomposer: Arc<dyn Decomposer>,
    pub synthesizer: Arc<dyn BackgroundSynthesizer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub vision: Arc<dyn VisionJudge>,
}

/// Run `fut` under a deadline; elapsing yields `ServiceTimeout` for `service`.
pub async fn with_timeout<T>(
    service: ServiceKind,
    after: Duration,
    fut: impl Future<Output = ThumbResult<T>>,
) -> ThumbResult<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(%service, after_ms = after.as_millis() as u64, "service call timed out");
            Err(ThumbError::timeout(service, after))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/mod.rs"]
mod tests;
