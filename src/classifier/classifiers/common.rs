//! Shared helpers for the rule-based classifiers.

use crate::classifier::candidate::ScoreComponent;
use crate::core::blocks::{Block, BlockId, PageData};

/// Accumulates weighted score components the way the rule-based
/// classifiers combine them: the final score is the weighted average of
/// the contributing components.
#[derive(Debug, Default)]
pub struct WeightedScore {
    components: Vec<ScoreComponent>,
    weighted_sum: f64,
    total_weight: f64,
    failed: bool,
}

impl WeightedScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component. Zero-weight components are recorded for
    /// diagnostics but do not affect the final score.
    pub fn add(&mut self, name: &str, score: f64, weight: f64) -> &mut Self {
        self.components.push(ScoreComponent::new(name, score));
        if weight > 0.0 {
            self.weighted_sum += score * weight;
            self.total_weight += weight;
        }
        self
    }

    /// Marks a required component as failed; the candidate is discarded.
    pub fn fail(&mut self) -> &mut Self {
        self.failed = true;
        self
    }

    /// Whether a required component failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// The weighted-average score.
    pub fn value(&self) -> f64 {
        if self.failed || self.total_weight <= 0.0 {
            return 0.0;
        }
        (self.weighted_sum / self.total_weight).clamp(0.0, 1.0)
    }

    /// Consumes the accumulator, returning the recorded components.
    pub fn into_components(self) -> Vec<ScoreComponent> {
        self.components
    }
}

/// Finds text outline effects for a block: duplicate text blocks drawn at
/// (almost) the same position as stroke outlines of the primary glyphs.
///
/// These duplicates carry no independent meaning; absorbing them into the
/// primary candidate's source blocks keeps them out of the unprocessed
/// set.
pub fn text_outline_effects(page: &PageData, primary: &Block) -> Vec<BlockId> {
    let Some(text) = primary.text() else {
        return Vec::new();
    };
    page.text_blocks()
        .filter(|other| other.id() != primary.id())
        .filter(|other| other.text() == Some(text))
        .filter(|other| other.bbox().iou(&primary.bbox()) >= 0.9)
        .map(|other| other.id())
        .collect()
}
