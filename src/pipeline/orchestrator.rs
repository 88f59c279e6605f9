use std::sync::Arc;

use crate::composite::compositor::{Composite, Compositor, TitleStyle};
use crate::foundation::core::{Background, ServiceKind};
use crate::foundation::error::{ErrorKind, ThumbError, ThumbResult};
use crate::pipeline::constraints::AttemptConstraints;
use crate::pipeline::record::{ArtifactRef, AttemptError, AttemptRecord, PipelineResult};
use crate::pipeline::state::{Budget, Event, Stage};
use crate::pipeline::storage::{ArtifactKind, ArtifactStore, fallback_image};
use crate::services::{Decomposition, ServiceTimeouts, Services, with_timeout};
use crate::validate::{ValidationResult, ValidatorSuite, overall_pass};

/// Hard ceiling on attempts per request.
pub const MAX_ATTEMPTS: u32 = 3;

/// Immutable input of one run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerationRequest {
    topic: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> ThumbResult<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(ThumbError::config("topic must be non-empty"));
        }
        Ok(Self { topic })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub max_attempts: u32,
    pub timeouts: ServiceTimeouts,
    /// Also write `attempt_<n>_*` copies next to the rolling artifacts.
    pub keep_attempt_artifacts: bool,
    /// Ask the decomposer again on every retry instead of reusing the first plan.
    pub redecompose_on_retry: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            timeouts: ServiceTimeouts::default(),
            keep_attempt_artifacts: false,
            redecompose_on_retry: false,
        }
    }
}

/// Drives decompose, synthesize, composite and validate attempts for one topic.
///
/// Holds no state across runs; the attempt history lives on the stack of
/// [`Orchestrator::run`]. Use one instance per topic when processing batches.
pub struct Orchestrator {
    settings: OrchestratorSettings,
    services: Services,
    compositor: Arc<Compositor>,
    suite: ValidatorSuite,
    store: Arc<dyn ArtifactStore>,
}

/// Working state of the attempt in flight.
#[derive(Default)]
struct AttemptScratch {
    background: Option<Background>,
    composite: Option<Arc<Composite>>,
    thumbnail_ref: Option<ArtifactRef>,
    results: Vec<ValidationResult>,
    error: Option<ThumbError>,
}

impl Orchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        services: Services,
        compositor: Arc<Compositor>,
        suite: ValidatorSuite,
        store: Arc<dyn ArtifactStore>,
    ) -> ThumbResult<Self> {
        if !(1..=MAX_ATTEMPTS).contains(&settings.max_attempts) {
            return Err(ThumbError::config(format!(
                "max_attempts must be in 1..={MAX_ATTEMPTS}, got {}",
                settings.max_attempts
            )));
        }
        if suite.is_empty() {
            return Err(ThumbError::config("validator suite is empty"));
        }
        Ok(Self {
            settings,
            services,
            compositor,
            suite,
            store,
        })
    }

    /// Run attempts until one passes every check or the budget is spent.
    ///
    /// Never fails: single-attempt errors are folded into the attempt log and
    /// exhaustion yields a locally rendered fallback.
    #[tracing::instrument(skip_all, fields(topic = %request.topic()))]
    pub async fn run(&self, request: &GenerationRequest) -> PipelineResult {
        let max = self.settings.max_attempts;
        let mut history: Vec<AttemptRecord> = Vec::with_capacity(max as usize);
        let mut constraints = AttemptConstraints::baseline();
        let mut plan: Option<Decomposition> = None;
        let mut entry = Stage::Decomposing;

        for index in 1..=max {
            let budget = Budget {
                attempt: index,
                max_attempts: max,
            };
            tracing::info!(
                attempt = index,
                strength = constraints.negative_prompt_strength,
                "attempt started"
            );
            let (record, thumbnail_ref) = self
                .attempt(request.topic(), budget, entry, &constraints, &mut plan)
                .await;
            let outcome = record.outcome;
            let failed = record
                .failed_checks()
                .into_iter()
                .map(str::to_owned)
                .collect::<Vec<_>>();
            history.push(record);
            if let Err(e) = self.store.put_log(&history) {
                tracing::warn!(error = %e, "could not persist attempt log");
            }

            match outcome {
                Stage::Accepted => {
                    let Some(composite) = history.last().and_then(|r| r.composite.clone()) else {
                        break;
                    };
                    history.pop();
                    tracing::info!(attempt = index, "thumbnail accepted");
                    return PipelineResult::Success {
                        composite,
                        image: thumbnail_ref
                            .unwrap_or_else(|| ArtifactRef::Memory(ArtifactKind::Thumbnail.file_name())),
                        attempts: index,
                        failure_log: history,
                    };
                }
                Stage::Retrying => {
                    let failed: Vec<&str> = failed.iter().map(String::as_str).collect();
                    constraints = constraints.escalate(&failed);
                    tracing::info!(
                        strength = constraints.negative_prompt_strength,
                        stroke_boost = constraints.stroke_boost,
                        ?failed,
                        "constraints escalated"
                    );
                    let reuse_plan = plan.is_some() && !self.settings.redecompose_on_retry;
                    entry = Stage::Retrying
                        .next(Event::Retry { reuse_plan }, budget)
                        .unwrap_or(Stage::Decomposing);
                }
                _ => break,
            }
        }

        self.exhausted(history)
    }

    /// One pass through the stages, ending in `Accepted`, `Retrying` or `Exhausted`.
    async fn attempt(
        &self,
        topic: &str,
        budget: Budget,
        entry: Stage,
        constraints: &AttemptConstraints,
        plan: &mut Option<Decomposition>,
    ) -> (AttemptRecord, Option<ArtifactRef>) {
        let restriction = constraints.semantic_restriction_text();
        let style = TitleStyle::escalated(self.compositor.settings(), constraints.stroke_boost);
        let mut scratch = AttemptScratch::default();
        let mut stage = entry;

        while !stage.ends_attempt() {
            tracing::debug!(attempt = budget.attempt, ?stage, "stage entered");
            let event = match self
                .step(stage, topic, &restriction, style, budget.attempt, plan, &mut scratch)
                .await
            {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(attempt = budget.attempt, ?stage, error = %e, "stage failed");
                    scratch.error = Some(e);
                    Event::Failed
                }
            };
            stage = stage.next(event, budget).unwrap_or(if budget.is_spent() {
                Stage::Exhausted
            } else {
                Stage::Retrying
            });
        }

        let record = AttemptRecord {
            index: budget.attempt,
            constraints: constraints.clone(),
            composite: scratch.composite,
            overall_pass: stage == Stage::Accepted,
            results: scratch.results,
            error: scratch.error.as_ref().map(AttemptError::from),
            outcome: stage,
        };
        (record, scratch.thumbnail_ref)
    }

    #[allow(clippy::too_many_arguments)]
    async fn step(
        &self,
        stage: Stage,
        topic: &str,
        restriction: &str,
        style: TitleStyle,
        index: u32,
        plan: &mut Option<Decomposition>,
        scratch: &mut AttemptScratch,
    ) -> ThumbResult<Event> {
        let timeouts = &self.settings.timeouts;
        match stage {
            Stage::Decomposing => {
                let d = with_timeout(
                    ServiceKind::Decomposition,
                    timeouts.decomposition,
                    self.services.decomposer.decompose(topic, restriction),
                )
                .await?;
                tracing::info!(title = %d.title, metaphor = %d.metaphor, "topic decomposed");
                *plan = Some(d);
                Ok(Event::Decomposed)
            }
            Stage::Synthesizing => {
                let metaphor = plan
                    .as_ref()
                    .map(|d| d.metaphor.clone())
                    .ok_or_else(|| ThumbError::decomposition("no metaphor available to synthesize"))?;
                let bg = with_timeout(
                    ServiceKind::Synthesis,
                    timeouts.synthesis,
                    self.services.synthesizer.synthesize(&metaphor, restriction),
                )
                .await?;
                self.persist(&ArtifactKind::Background, bg.pixels());
                if self.settings.keep_attempt_artifacts {
                    self.persist(&ArtifactKind::AttemptBackground(index), bg.pixels());
                }
                scratch.background = Some(bg);
                Ok(Event::Synthesized)
            }
            Stage::Compositing => {
                let bg = scratch
                    .background
                    .clone()
                    .ok_or_else(|| ThumbError::composition("no background to composite"))?;
                let title = plan
                    .as_ref()
                    .map(|d| d.title.clone())
                    .ok_or_else(|| ThumbError::composition("no title to composite"))?;
                let compositor = Arc::clone(&self.compositor);
                let composite = tokio::task::spawn_blocking(move || {
                    compositor.compose_styled(&bg, &title, style)
                })
                .await
                .map_err(|e| ThumbError::composition(format!("compositor task failed: {e}")))??;

                scratch.thumbnail_ref = self.persist(&ArtifactKind::Thumbnail, &composite.image);
                if self.settings.keep_attempt_artifacts {
                    self.persist(&ArtifactKind::AttemptThumbnail(index), &composite.image);
                }
                scratch.composite = Some(Arc::new(composite));
                Ok(Event::Composited)
            }
            Stage::Validating => {
                let composite = scratch
                    .composite
                    .clone()
                    .ok_or_else(|| ThumbError::composition("no composite to validate"))?;
                let expected = composite.title.clone();
                let results = self.suite.run(composite, &expected).await;
                for r in &results {
                    if let Some(i) = r.intermediate() {
                        self.persist(&ArtifactKind::Intermediate(i.name.to_string()), &i.image);
                    }
                }
                let passed = overall_pass(&results);
                scratch.results = results;
                Ok(Event::Validated { passed })
            }
            Stage::Accepted | Stage::Retrying | Stage::Exhausted => Err(ThumbError::Other(
                anyhow::anyhow!("attempt stepped from finished stage {stage:?}"),
            )),
        }
    }

    /// Best-effort write; storage trouble never fails an attempt.
    fn persist(&self, kind: &ArtifactKind, image: &image::RgbImage) -> Option<ArtifactRef> {
        match self.store.put_image(kind, image) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(artifact = %kind.file_name(), error = %e, "could not persist artifact");
                None
            }
        }
    }

    /// `ConstraintViolation` only when every attempt reached a verdict; otherwise
    /// the most recent error that cut an attempt short.
    fn exhausted(&self, history: Vec<AttemptRecord>) -> PipelineResult {
        let attempts = history.len();
        let all_validated =
            !history.is_empty() && history.iter().all(AttemptRecord::reached_validation);
        let (error_type, message) = if all_validated {
            let last = history.last().map(AttemptRecord::summary).unwrap_or_default();
            let err = ThumbError::constraint_violation(format!(
                "all {attempts} attempts failed validation; last failures: {last}"
            ));
            (err.kind(), err.to_string())
        } else {
            match history.iter().rev().find_map(|r| r.error.clone()) {
                Some(e) => (
                    e.kind,
                    format!("all {attempts} attempts failed; last error: {}", e.message),
                ),
                None => (ErrorKind::Other, "no attempt was made".to_string()),
            }
        };

        let pixels = Arc::new(fallback_image(self.compositor.settings().canvas));
        let fallback_ref = self
            .persist(&ArtifactKind::Fallback, &pixels)
            .unwrap_or_else(|| ArtifactRef::Memory(ArtifactKind::Fallback.file_name()));

        tracing::warn!(
            attempts = history.len(),
            %error_type,
            fallback = %fallback_ref,
            "attempt budget exhausted"
        );
        PipelineResult::Failed {
            error_type,
            message,
            failure_log: history,
            fallback_image: fallback_ref,
            fallback_pixels: pixels,
        }
    }
}
