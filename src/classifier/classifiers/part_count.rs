//! Part count classifier.
//!
//! Part counts are the "2x" style labels under each parts-list entry.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::{text_outline_effects, WeightedScore};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::LinearScale;
use crate::domain::elements::{PageElement, PartCount};
use crate::utils::text::extract_part_count_value;

/// Classifier for part counts.
#[derive(Debug, Default)]
pub struct PartCountClassifier;

impl LabelClassifier for PartCountClassifier {
    fn output(&self) -> Label {
        Label::PartCount
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.part_count;
        let page = result.page().clone();
        // Instruction and catalog pages print counts at different sizes;
        // match against whichever hint fits better.
        let scales: Vec<LinearScale> = [
            ctx.hints.font_sizes.part_count_size,
            ctx.hints.font_sizes.catalog_part_count_size,
        ]
        .iter()
        .flatten()
        .map(|size| LinearScale::around(*size, 0.5, 1.5))
        .collect();

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_part_count_value(text) else {
                continue;
            };

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);
            if let Some(size) = block.font_size() {
                if !scales.is_empty() {
                    let best = scales
                        .iter()
                        .map(|scale| scale.apply(size))
                        .fold(0.0f64, f64::max);
                    score.add("font_size_score", best, config.font_size_weight);
                }
            }

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            let mut source_blocks = vec![block.id()];
            source_blocks.extend(text_outline_effects(&page, block));
            candidates.push(Candidate::atomic(
                Label::PartCount,
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
                "part count candidate without text details",
            ));
        };
        let count = extract_part_count_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse part count from '{}'", text),
            )
        })?;
        Ok(PartCount {
            bbox: candidate.bbox,
            count,
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

    #[test]
    fn test_scores_count_patterns() {
        let page = PageData::new(
            1,
            600.0,
            840.0,
            vec![
                Block::text_block(0, BBox::new(10.0, 10.0, 30.0, 20.0).unwrap(), "2x", 9.0),
                Block::text_block(1, BBox::new(10.0, 30.0, 30.0, 40.0).unwrap(), "5×", 9.0),
                Block::text_block(2, BBox::new(10.0, 50.0, 30.0, 60.0).unwrap(), "2", 9.0),
            ],
        )
        .unwrap();
        let mut result = ClassificationResult::new(page);
        let hints = DocumentHints::empty();
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        PartCountClassifier.score(&ctx, &mut result).unwrap();
        let scored = result.scored_candidates(Label::PartCount);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].score_details.numeric_value(), Some(2));
    }

    #[test]
    fn test_font_hint_separates_catalog_counts() {
        let page = PageData::new(
            1,
            600.0,
            840.0,
            vec![
                Block::text_block(0, BBox::new(10.0, 10.0, 30.0, 20.0).unwrap(), "2x", 9.0),
                Block::text_block(1, BBox::new(10.0, 30.0, 30.0, 40.0).unwrap(), "3x", 30.0),
            ],
        )
        .unwrap();
        let mut result = ClassificationResult::new(page);
        let mut hints = DocumentHints::empty();
        hints.font_sizes.part_count_size = Some(9.0);
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        PartCountClassifier.score(&ctx, &mut result).unwrap();
        let scored = result.scored_candidates(Label::PartCount);
        assert_eq!(scored[0].primary_block(), Some(0));
        assert!(scored[0].score > scored.last().unwrap().score || scored.len() == 1);
    }
}
