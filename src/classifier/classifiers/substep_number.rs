//! Substep number classifier.
//!
//! Sub-assembly callouts number their internal steps with small integers
//! and mark repetition with an "Nx" label. Both shapes classify here; the
//! parsed value feeds either `SubStep.number` or `SubAssembly.repeat`.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::LinearScale;
use crate::domain::elements::{PageElement, SubstepNumber};
use crate::utils::text::{extract_step_number_value, extract_substep_repeat_value};

/// Substep numbers stay small.
const MAX_SUBSTEP_VALUE: u32 = 20;

fn extract_value(text: &str) -> Option<u32> {
    extract_substep_repeat_value(text)
        .or_else(|| extract_step_number_value(text).filter(|v| *v <= MAX_SUBSTEP_VALUE))
}

/// Classifier for substep numbers and repeat markers.
#[derive(Debug, Default)]
pub struct SubstepNumberClassifier;

impl LabelClassifier for SubstepNumberClassifier {
    fn output(&self) -> Label {
        Label::SubstepNumber
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.substep_number;
        let page = result.page().clone();
        // Substep numbers are smaller than main step numbers.
        let step_size = ctx.hints.font_sizes.step_number_size;
        let size_scale = ctx
            .hints
            .font_sizes
            .part_count_size
            .map(|size| LinearScale::around(size, 0.4, 2.0));

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_value(text) else { continue };

            if let (Some(step_size), Some(size)) = (step_size, block.font_size()) {
                // A number at the main step size is a step number, not a
                // substep number.
                if size >= step_size * 0.9 {
                    continue;
                }
            }

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);
            if let (Some(scale), Some(size)) = (&size_scale, block.font_size()) {
                score.add("font_size_score", scale.apply(size), config.font_size_weight);
            }

            // A bare small integer is weak evidence on its own; the strong
            // interpretations (step number, part count) must win conflicts.
            let final_score = score.value() * 0.7;
            if final_score < config.min_score {
                continue;
            }

            candidates.push(Candidate::atomic(
                Label::SubstepNumber,
                block.bbox(),
                final_score,
                ScoreDetails::TextMatch {
                    components: score.into_components(),
                    numeric_value: Some(i64::from(value)),
                    text: text.to_string(),
                },
                vec![block.id()],
            ));
        }
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, _ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::TextMatch { text, .. } = &candidate.score_details else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "substep number candidate without text details",
            ));
        };
        let value = extract_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse substep number from '{}'", text),
            )
        })?;
        Ok(SubstepNumber {
            bbox: candidate.bbox,
            value,
        }
        .into())
    }
}
