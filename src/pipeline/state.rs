//! Attempt state machine.
//!
//! Stages advance on events; any stage failure routes to `Retrying` while
//! budget remains and to `Exhausted` once it is spent. `Accepted` and
//! `Exhausted` are terminal.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decomposing,
    Synthesizing,
    Compositing,
    Validating,
    Accepted,
    Retrying,
    Exhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Decomposed,
    Synthesized,
    Composited,
    Validated { passed: bool },
    /// The current stage could not complete.
    Failed,
    /// Start the next attempt; `reuse_plan` skips decomposition.
    Retry { reuse_plan: bool },
}

/// Position in the attempt budget (1-based attempt index).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Budget {
    pub fn is_spent(self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }

    /// Whether the attempt has left the working stages.
    pub fn ends_attempt(self) -> bool {
        matches!(self, Self::Accepted | Self::Retrying | Self::Exhausted)
    }

    /// Next stage, or `None` if `event` is not valid in this stage.
    pub fn next(self, event: Event, budget: Budget) -> Option<Stage> {
        let give_up = if budget.is_spent() {
            Stage::Exhausted
        } else {
            Stage::Retrying
        };
        match (self, event) {
            (Self::Decomposing, Event::Decomposed) => Some(Self::Synthesizing),
            (Self::Synthesizing, Event::Synthesized) => Some(Self::Compositing),
            (Self::Compositing, Event::Composited) => Some(Self::Validating),
            (Self::Validating, Event::Validated { passed: true }) => Some(Self::Accepted),
            (Self::Validating, Event::Validated { passed: false }) => Some(give_up),
            (
                Self::Decomposing | Self::Synthesizing | Self::Compositing | Self::Validating,
                Event::Failed,
            ) => Some(give_up),
            (Self::Retrying, Event::Retry { reuse_plan: true }) => Some(Self::Synthesizing),
            (Self::Retrying, Event::Retry { reuse_plan: false }) => Some(Self::Decomposing),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
