use std::time::Duration;

use crate::foundation::core::ServiceKind;

/// Convenience result type used across thumbforge.
pub type ThumbResult<T> = Result<T, ThumbError>;

/// Top-level error taxonomy for the generation pipeline.
///
/// Single-attempt errors never escape the orchestrator; they are folded into an
/// attempt record and consume one unit of the retry budget.
#[derive(thiserror::Error, Debug)]
pub enum ThumbError {
    /// The text model could not produce a usable metaphor/title pair.
    #[error("decomposition error: {0}")]
    Decomposition(String),

    /// The image model failed or returned an unusable background.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// A single validator rejected the composite.
    #[error("validation error: {check}: {reason}")]
    Validation {
        /// Name of the failing check.
        check: String,
        /// Why it failed.
        reason: String,
    },

    /// Every attempt was exhausted with at least one validator failing.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// An external boundary exceeded its deadline.
    #[error("service timeout: {service} exceeded {}ms", after.as_millis())]
    ServiceTimeout {
        /// Boundary that timed out.
        service: ServiceKind,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// Deterministic compositing could not complete (font, layout, buffer sizes).
    #[error("composition error: {0}")]
    Composition(String),

    /// Reading or writing persisted artifacts failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid pipeline configuration or request.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Serializable classification of a [`ThumbError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// See [`ThumbError::Decomposition`].
    DecompositionError,
    /// See [`ThumbError::Synthesis`].
    SynthesisError,
    /// See [`ThumbError::Validation`].
    ValidationError,
    /// See [`ThumbError::ConstraintViolation`].
    ConstraintViolation,
    /// See [`ThumbError::ServiceTimeout`].
    ServiceTimeout,
    /// See [`ThumbError::Composition`].
    CompositionError,
    /// See [`ThumbError::Storage`].
    StorageError,
    /// See [`ThumbError::Config`].
    ConfigError,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DecompositionError => "DecompositionError",
            Self::SynthesisError => "SynthesisError",
            Self::ValidationError => "ValidationError",
            Self::ConstraintViolation => "ConstraintViolation",
            Self::ServiceTimeout => "ServiceTimeout",
            Self::CompositionError => "CompositionError",
            Self::StorageError => "StorageError",
            Self::ConfigError => "ConfigError",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

impl ThumbError {
    /// Build a [`ThumbError::Decomposition`] value.
    pub fn decomposition(msg: impl Into<String>) -> Self {
        Self::Decomposition(msg.into())
    }

    /// Build a [`ThumbError::Synthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Build a [`ThumbError::Validation`] value.
    pub fn validation(check: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            check: check.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ThumbError::ConstraintViolation`] value.
    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Build a [`ThumbError::ServiceTimeout`] value.
    pub fn timeout(service: ServiceKind, after: Duration) -> Self {
        Self::ServiceTimeout { service, after }
    }

    /// Build a [`ThumbError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`ThumbError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`ThumbError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classification carried by attempt records and failed results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decomposition(_) => ErrorKind::DecompositionError,
            Self::Synthesis(_) => ErrorKind::SynthesisError,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::ServiceTimeout { .. } => ErrorKind::ServiceTimeout,
            Self::Composition(_) => ErrorKind::CompositionError,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// The external boundary involved, when the error came from one.
    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            Self::ServiceTimeout { service, .. } => Some(*service),
            Self::Decomposition(_) => Some(ServiceKind::Decomposition),
            Self::Synthesis(_) => Some(ServiceKind::Synthesis),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
