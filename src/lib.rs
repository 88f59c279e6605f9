//! Thumbforge turns a topic into a 1280x720 thumbnail through a closed loop.
//!
//! # Pipeline overview
//!
//! 1. **Decompose**: topic -> text-free visual metaphor + short title (text model)
//! 2. **Synthesize**: metaphor + negative constraints -> background (image model)
//! 3. **Composite**: background + title -> thumbnail, deterministically, with a
//!    gradient floor that guarantees the title region's contrast
//! 4. **Validate**: text fidelity, legibility, mobile readability and visual
//!    integrity run concurrently against the same composite
//! 5. **Retry**: failures escalate constraints for the next attempt; after three
//!    failed attempts a locally rendered fallback is returned
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic compositing**: identical background, title and style
//!   always produce byte-identical pixels.
//! - **Injected boundaries**: every external model sits behind a trait
//!   and every call runs under a deadline.
//! - **Never panics on bad input**: single-attempt failures become attempt
//!   records; the orchestrator always returns a [`PipelineResult`].
#![forbid(unsafe_code)]

mod foundation {
    pub mod core;
    pub mod error;
    pub mod math;
}

mod composite {
    pub mod compositor;
    pub mod gradient;
    pub mod layout;
    pub mod text;
}

mod config;
mod pipeline;
mod services;
mod validate;

pub use composite::compositor::{Composite, Compositor, CompositorSettings, TitleStyle};
pub use composite::gradient::{
    BAND_HALF_EXTENT, GradientParams, OverlayTone, search as search_gradient, search_ladder,
};
pub use composite::layout::{SafeMargins, SizeBounds, fit_font_size, place_title, wrap_title};
pub use composite::text::{FontSource, GlyphMask, ParleyRasterizer, TextTone, TitleRasterizer};
pub use config::{ENV_PREFIX, PipelineConfig, TimeoutSecs};
pub use foundation::core::{Background, Canvas, Rect, RegionRect, ServiceKind};
pub use foundation::error::{ErrorKind, ThumbError, ThumbResult};
pub use foundation::math::{luma_stats, luma_u8, rms_contrast};
pub use pipeline::{
    ArtifactKind, ArtifactRef, ArtifactStore, AttemptConstraints, AttemptError, AttemptRecord,
    BatchDirs, Budget, Event, FALLBACK_RGB, FsArtifactStore, GenerationRequest, LOG_FILE_NAME,
    MAX_ATTEMPTS, MemoryArtifactStore, Orchestrator, OrchestratorSettings, PipelineResult, Stage,
    fallback_image, topic_slug,
};
pub use services::{
    BASE_NEGATIVE_PROMPT, BackgroundSynthesizer, Decomposer, Decomposition, Finding,
    FindingCategory, GatewayClient, GatewayConfig, HttpDecomposer, HttpOcrEngine,
    HttpSynthesizer, HttpVisionJudge, OcrEngine, ServiceTimeouts, Services, TextSpan,
    VisionJudge, joined_text, negative_prompt, parse_decomposition, parse_findings, with_timeout,
};
pub use validate::similarity;
pub use validate::{
    AUDIT_INSTRUCTION, Intermediate, Legibility, MobileReadability, TextFidelity,
    ValidationResult, Validator, ValidatorSuite, VisualIntegrity, overall_pass,
};
