//! Closed-loop attempt orchestration.

mod constraints;
mod orchestrator;
mod record;
mod state;
mod storage;

pub use constraints::AttemptConstraints;
pub use orchestrator::{GenerationRequest, MAX_ATTEMPTS, Orchestrator, OrchestratorSettings};
pub use record::{ArtifactRef, AttemptError, AttemptRecord, PipelineResult};
pub use state::{Budget, Event, Stage};
pub use storage::{
    ArtifactKind, ArtifactStore, BatchDirs, FALLBACK_RGB, FsArtifactStore, LOG_FILE_NAME,
    MemoryArtifactStore, fallback_image, topic_slug,
};
