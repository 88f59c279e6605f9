use std::path::PathBuf;
use std::sync::Arc;

use crate::composite::compositor::Composite;
use crate::foundation::core::ServiceKind;
use crate::foundation::error::{ErrorKind, ThumbError};
use crate::pipeline::constraints::AttemptConstraints;
use crate::pipeline::state::Stage;
use crate::validate::ValidationResult;

/// Where a persisted image can be found.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRef {
    Path(PathBuf),
    /// Held in memory only (in-memory store, or a write that failed).
    Memory(String),
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Memory(name) => write!(f, "memory:{name}"),
        }
    }
}

/// Error that ended an attempt before validation could decide it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttemptError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceKind>,
    pub message: String,
}

impl From<&ThumbError> for AttemptError {
    fn from(err: &ThumbError) -> Self {
        Self {
            kind: err.kind(),
            service: err.service(),
            message: err.to_string(),
        }
    }
}

/// One loop iteration, frozen once appended to the history.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AttemptRecord {
    /// 1-based.
    pub index: u32,
    pub constraints: AttemptConstraints,
    #[serde(skip)]
    pub composite: Option<Arc<Composite>>,
    pub results: Vec<ValidationResult>,
    pub overall_pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AttemptError>,
    /// Stage the attempt ended in: `accepted`, `retrying` or `exhausted`.
    pub outcome: Stage,
}

impl AttemptRecord {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed())
            .map(ValidationResult::check_name)
            .collect()
    }

    /// Validation ran to completion for this attempt.
    pub fn reached_validation(&self) -> bool {
        !self.results.is_empty()
    }

    /// `check: reason` lines, or the attempt error.
    pub fn summary(&self) -> String {
        if let Some(e) = &self.error {
            return format!("{}: {}", e.kind, e.message);
        }
        self.results
            .iter()
            .filter_map(|r| r.reason().map(|reason| format!("{}: {reason}", r.check_name())))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Terminal value of one orchestrator run.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Success {
        #[serde(skip)]
        composite: Arc<Composite>,
        image: ArtifactRef,
        /// Index of the first passing attempt.
        attempts: u32,
        /// Attempts that failed before the accepted one.
        failure_log: Vec<AttemptRecord>,
    },
    Failed {
        error_type: ErrorKind,
        message: String,
        failure_log: Vec<AttemptRecord>,
        fallback_image: ArtifactRef,
        #[serde(skip)]
        fallback_pixels: Arc<image::RgbImage>,
    },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Attempts consumed by the run.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } => *attempts,
            Self::Failed { failure_log, .. } => failure_log.len() as u32,
        }
    }

    pub fn failure_log(&self) -> &[AttemptRecord] {
        match self {
            Self::Success { failure_log, .. } | Self::Failed { failure_log, .. } => failure_log,
        }
    }

    /// Accepted composite or fallback pixels, whichever this result carries.
    pub fn final_image(&self) -> &image::RgbImage {
        match self {
            Self::Success { composite, .. } => &composite.image,
            Self::Failed {
                fallback_pixels, ..
            } => fallback_pixels,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/record.rs"]
mod tests;
