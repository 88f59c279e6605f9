//! Escalating generation constraints.
//!
//! Each retry appends exclusion phrases; nothing is ever removed, so the
//! restriction text of attempt `n + 1` always starts with that of attempt `n`.

use crate::validate::{Legibility, MobileReadability, TextFidelity, VisualIntegrity};

/// Restriction rungs, applied in order as retries accumulate.
const RUNGS: [&str; 4] = [
    "Abstract geometric shapes and tech patterns only. Strictly NO people or faces.",
    "Minimalist solid color gradient. Completely abstract. Zero human subjects or silhouettes.",
    "Focus on high-contrast negative space for text.",
    "Solid minimalist background, extreme high contrast.",
];

const NO_FIGURES: &str = "Absolutely no faces, hands, body parts or figure-like shapes anywhere.";
const NO_GLYPHS: &str = "No letters, signage, labels or glyph-like marks of any kind.";
const CALM_TITLE_BAND: &str = "Keep the lower third calm and uncluttered behind the title.";
const EVEN_TONES: &str = "Use broad, even tones with little fine detail.";

/// Constraints for one attempt. Only ever grows across attempts.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttemptConstraints {
    /// Number of escalations applied so far.
    pub negative_prompt_strength: u8,
    /// Exclusion phrases in the order they were added.
    pub exclusions: Vec<String>,
    /// Extra outline steps for the title.
    pub stroke_boost: u8,
}

impl AttemptConstraints {
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn semantic_restriction_text(&self) -> String {
        self.exclusions.join(" ")
    }

    /// Next attempt's constraints given the checks that failed this attempt.
    ///
    /// Always adds at least one phrase: the next rung of the ladder, numbered
    /// once the ladder runs out. Check-specific phrases follow; typography
    /// failures also widen the title outline.
    pub fn escalate(&self, failed_checks: &[&str]) -> Self {
        let mut next = self.clone();
        next.negative_prompt_strength = self.negative_prompt_strength.saturating_add(1);

        let rung = match RUNGS.get(usize::from(self.negative_prompt_strength)) {
            Some(r) => (*r).to_string(),
            None => format!(
                "{} Restriction level {}.",
                RUNGS[RUNGS.len() - 1],
                next.negative_prompt_strength
            ),
        };
        next.push_unique(rung);

        for check in failed_checks {
            match *check {
                VisualIntegrity::NAME => {
                    next.push_unique(NO_FIGURES.to_string());
                    next.push_unique(NO_GLYPHS.to_string());
                }
                TextFidelity::NAME | MobileReadability::NAME => {
                    next.stroke_boost = next.stroke_boost.saturating_add(1);
                    next.push_unique(CALM_TITLE_BAND.to_string());
                }
                Legibility::NAME => next.push_unique(EVEN_TONES.to_string()),
                _ => {}
            }
        }
        next
    }

    fn push_unique(&mut self, phrase: String) {
        if !self.exclusions.contains(&phrase) {
            self.exclusions.push(phrase);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/constraints.rs"]
mod tests;
