//! Step number classifier.
//!
//! Step numbers are prominent integers above their step's content. They
//! share the small-integer pattern with page numbers, so the bottom band
//! is excluded and the document's hinted step-number size carries the
//! discrimination.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::{text_outline_effects, WeightedScore};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::LinearScale;
use crate::domain::elements::{PageElement, StepNumber};
use crate::utils::text::extract_step_number_value;

/// Step numbers never sit in the bottom page-number band.
const BOTTOM_BAND_RATIO: f64 = 0.1;

/// Classifier for step numbers.
#[derive(Debug, Default)]
pub struct StepNumberClassifier;

impl LabelClassifier for StepNumberClassifier {
    fn output(&self) -> Label {
        Label::StepNumber
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.step_number;
        let page = result.page().clone();
        let band_top = page.height() * (1.0 - BOTTOM_BAND_RATIO);
        let size_scale = ctx
            .hints
            .font_sizes
            .step_number_size
            .map(|size| LinearScale::around(size, 0.5, 1.5));

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            if block.bbox().y1 >= band_top {
                continue;
            }
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_step_number_value(text) else {
                continue;
            };

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);
            match (&size_scale, block.font_size()) {
                (Some(scale), Some(size)) => {
                    score.add("font_size_score", scale.apply(size), config.font_size_weight);
                }
                // Without a hint, large text is the weaker fallback signal.
                (None, Some(size)) => {
                    let large = if size >= 16.0 { 1.0 } else { size / 16.0 };
                    score.add("font_size_score", large, config.font_size_weight);
                }
                _ => {}
            }

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            let mut source_blocks = vec![block.id()];
            source_blocks.extend(text_outline_effects(&page, block));
            candidates.push(Candidate::atomic(
                Label::StepNumber,
                block.bbox(),
                final_score,
                ScoreDetails::TextMatch {
                    components: score.into_components(),
                    numeric_value: Some(i64::from(value)),
                    text: text.to_string(),
                },
                source_blocks,
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
                "step number candidate without text details",
            ));
        };
        let value = extract_step_number_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse step number from '{}'", text),
            )
        })?;
        Ok(StepNumber {
            bbox: candidate.bbox,
            value,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::{Block, PageData};
    use crate::core::config::ClassifierConfig;
    use crate::core::geometry::BBox;
    use crate::domain::hints::DocumentHints;

    fn score_with_hint(blocks: Vec<Block>, step_size: Option<f64>) -> ClassificationResult {
        let page = PageData::new(3, 600.0, 840.0, blocks).unwrap();
        let mut result = ClassificationResult::new(page);
        let mut hints = DocumentHints::empty();
        hints.font_sizes.step_number_size = step_size;
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        StepNumberClassifier.score(&ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn test_hinted_size_wins() {
        let result = score_with_hint(
            vec![
                Block::text_block(0, BBox::new(50.0, 100.0, 70.0, 120.0).unwrap(), "2", 20.0),
                Block::text_block(1, BBox::new(50.0, 300.0, 60.0, 310.0).unwrap(), "2", 9.0),
            ],
            Some(20.0),
        );
        let scored = result.scored_candidates(Label::StepNumber);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].primary_block(), Some(0));
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn test_bottom_band_is_excluded() {
        let result = score_with_hint(
            vec![Block::text_block(
                0,
                BBox::new(10.0, 820.0, 25.0, 835.0).unwrap(),
                "5",
                20.0,
            )],
            Some(20.0),
        );
        assert!(result.scored_candidates(Label::StepNumber).is_empty());
    }

    #[test]
    fn test_count_pattern_is_not_a_step_number() {
        let result = score_with_hint(
            vec![Block::text_block(
                0,
                BBox::new(50.0, 100.0, 70.0, 120.0).unwrap(),
                "2x",
                20.0,
            )],
            Some(20.0),
        );
        assert!(result.scored_candidates(Label::StepNumber).is_empty());
    }
}
