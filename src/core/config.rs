//! Configuration for the classifier pipeline and the constraint solver.
//!
//! Configuration follows the validate-early pattern: plain data structs
//! with `Default` implementations and a `validate()` method that surfaces
//! bad values as configuration errors before any page is processed.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;

/// Weights and thresholds for one text-pattern classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLabelConfig {
    /// Candidates scoring below this are not created.
    pub min_score: f64,
    /// Weight of the text-pattern component.
    pub text_weight: f64,
    /// Weight of the position component.
    pub position_weight: f64,
    /// Weight of the font-size proximity component.
    pub font_size_weight: f64,
}

impl TextLabelConfig {
    fn validate(&self, label: &str) -> ClassifyResult<()> {
        for (name, value) in [
            ("min_score", self.min_score),
            ("text_weight", self.text_weight),
            ("position_weight", self.position_weight),
            ("font_size_weight", self.font_size_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassifyError::config_error_with_context(
                    &format!("{}.{}", label, name),
                    &value.to_string(),
                    "must be within [0.0, 1.0]",
                ));
            }
        }
        Ok(())
    }
}

impl Default for TextLabelConfig {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            text_weight: 0.7,
            position_weight: 0.2,
            font_size_weight: 0.1,
        }
    }
}

/// Configuration for the classifier pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Page number scoring knobs.
    pub page_number: TextLabelConfig,
    /// Weight of the page-index preference for page numbers.
    pub page_number_value_weight: f64,
    /// Distance scale (points) for the bottom-corner preference.
    pub page_number_position_scale: f64,
    /// Step number scoring knobs.
    pub step_number: TextLabelConfig,
    /// Substep number scoring knobs.
    pub substep_number: TextLabelConfig,
    /// Part count scoring knobs.
    pub part_count: TextLabelConfig,
    /// Part number scoring knobs.
    pub part_number: TextLabelConfig,
    /// Piece length scoring knobs.
    pub piece_length: TextLabelConfig,
    /// Bag number scoring knobs.
    pub bag_number: TextLabelConfig,
    /// Parts lists larger than this fraction of the page area are rejected
    /// as page backgrounds.
    pub parts_list_max_area_ratio: f64,
    /// Minimum score for parts list candidates.
    pub parts_list_min_score: f64,
    /// Horizontal alignment tolerance for part pairing, as a fraction of
    /// the page width.
    pub part_alignment_ratio: f64,
    /// Maximum vertical gap (points) between a part image and its count.
    pub part_max_gap: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            page_number: TextLabelConfig {
                min_score: 0.5,
                text_weight: 0.6,
                position_weight: 0.3,
                font_size_weight: 0.1,
            },
            page_number_value_weight: 1.0,
            page_number_position_scale: 50.0,
            step_number: TextLabelConfig {
                min_score: 0.5,
                text_weight: 0.7,
                position_weight: 0.0,
                font_size_weight: 0.3,
            },
            substep_number: TextLabelConfig {
                min_score: 0.5,
                text_weight: 0.7,
                position_weight: 0.0,
                font_size_weight: 0.3,
            },
            part_count: TextLabelConfig {
                min_score: 0.5,
                text_weight: 0.7,
                position_weight: 0.0,
                font_size_weight: 0.3,
            },
            part_number: TextLabelConfig::default(),
            piece_length: TextLabelConfig::default(),
            bag_number: TextLabelConfig {
                min_score: 0.5,
                text_weight: 0.6,
                position_weight: 0.3,
                font_size_weight: 0.1,
            },
            parts_list_max_area_ratio: 0.75,
            parts_list_min_score: 0.5,
            part_alignment_ratio: 0.02,
            part_max_gap: 10.0,
        }
    }
}

impl ClassifierConfig {
    /// Validates every knob, returning the first offending field.
    pub fn validate(&self) -> ClassifyResult<()> {
        self.page_number.validate("page_number")?;
        self.step_number.validate("step_number")?;
        self.substep_number.validate("substep_number")?;
        self.part_count.validate("part_count")?;
        self.part_number.validate("part_number")?;
        self.piece_length.validate("piece_length")?;
        self.bag_number.validate("bag_number")?;
        if !(0.0..=1.0).contains(&self.parts_list_max_area_ratio) {
            return Err(ClassifyError::config_error_with_context(
                "parts_list_max_area_ratio",
                &self.parts_list_max_area_ratio.to_string(),
                "must be within [0.0, 1.0]",
            ));
        }
        if self.part_max_gap < 0.0 {
            return Err(ClassifyError::config_error_with_context(
                "part_max_gap",
                &self.part_max_gap.to_string(),
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Which labels participate in the constraint solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverLabels {
    /// Every label is selected by the solver.
    All,
    /// Only the listed labels; the rest fall back to greedy selection.
    Only(BTreeSet<Label>),
}

impl SolverLabels {
    /// Checks whether a label participates in the solver.
    pub fn contains(&self, label: Label) -> bool {
        match self {
            SolverLabels::All => true,
            SolverLabels::Only(set) => set.contains(&label),
        }
    }
}

/// Configuration for candidate selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// When false, every label uses greedy highest-score-first selection.
    pub use_solver: bool,
    /// Per-label opt-in set for the solver.
    pub solver_labels: SolverLabels,
    /// Objective reward, in integer weight units (score x 1000), for each
    /// consumed source block. Rewarding consumption is equivalent to
    /// penalizing unconsumed blocks; this knob is load-bearing and must be
    /// tuned against the documented scenarios.
    pub unconsumed_penalty: i64,
    /// Wall-clock budget for one page's solve.
    pub per_page_timeout: Duration,
    /// How many times a build failure may trigger a re-solve.
    pub build_retry_budget: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            use_solver: true,
            solver_labels: SolverLabels::All,
            unconsumed_penalty: 50,
            per_page_timeout: Duration::from_secs(3),
            build_retry_budget: 3,
        }
    }
}

impl SolverConfig {
    /// Validates the solver knobs.
    pub fn validate(&self) -> ClassifyResult<()> {
        if self.unconsumed_penalty < 0 {
            return Err(ClassifyError::config_error_with_context(
                "unconsumed_penalty",
                &self.unconsumed_penalty.to_string(),
                "must be non-negative",
            ));
        }
        if self.per_page_timeout.is_zero() {
            return Err(ClassifyError::config_error_with_context(
                "per_page_timeout",
                "0s",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ClassifierConfig::default().validate().is_ok());
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weight_out_of_range_is_rejected() {
        let mut config = ClassifierConfig::default();
        config.step_number.text_weight = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("step_number.text_weight"));
    }

    #[test]
    fn test_negative_penalty_is_rejected() {
        let config = SolverConfig {
            unconsumed_penalty: -1,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_solver_labels_membership() {
        assert!(SolverLabels::All.contains(Label::Arrow));
        let only = SolverLabels::Only(BTreeSet::from([Label::Step, Label::StepNumber]));
        assert!(only.contains(Label::Step));
        assert!(!only.contains(Label::Arrow));
    }
}
