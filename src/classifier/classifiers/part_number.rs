//! Part number (element id) classifier.
//!
//! Element ids are 4-8 digit catalog numbers, printed small, mostly on
//! catalog pages.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::LinearScale;
use crate::domain::elements::{PageElement, PartNumber};
use crate::utils::text::extract_element_id;

/// Classifier for part numbers.
#[derive(Debug, Default)]
pub struct PartNumberClassifier;

impl LabelClassifier for PartNumberClassifier {
    fn output(&self) -> Label {
        Label::PartNumber
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.part_number;
        let page = result.page().clone();
        let size_scale = ctx
            .hints
            .font_sizes
            .part_number_size
            .map(|size| LinearScale::around(size, 0.5, 1.5));
        let on_catalog_page = ctx.hints.page_types.is_catalog_page(page.page_index());

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            let Some(text) = block.text() else { continue };
            let Some(id_text) = extract_element_id(text) else {
                continue;
            };

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);
            score.add(
                "page_type_score",
                if on_catalog_page { 1.0 } else { 0.4 },
                config.position_weight,
            );
            if let (Some(scale), Some(size)) = (&size_scale, block.font_size()) {
                score.add("font_size_score", scale.apply(size), config.font_size_weight);
            }

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            candidates.push(Candidate::atomic(
                Label::PartNumber,
                block.bbox(),
                final_score,
                ScoreDetails::TextMatch {
                    components: score.into_components(),
                    numeric_value: id_text.parse().ok(),
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
                "part number candidate without text details",
            ));
        };
        let value = extract_element_id(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse element id from '{}'", text),
            )
        })?;
        Ok(PartNumber {
            bbox: candidate.bbox,
            value: value.to_string(),
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
    fn test_scores_element_ids_only() {
        let page = PageData::new(
            1,
            600.0,
            840.0,
            vec![
                Block::text_block(0, BBox::new(10.0, 10.0, 60.0, 20.0).unwrap(), "6143943", 6.5),
                Block::text_block(1, BBox::new(10.0, 30.0, 60.0, 40.0).unwrap(), "12", 6.5),
                Block::text_block(2, BBox::new(10.0, 50.0, 60.0, 60.0).unwrap(), "0123456", 6.5),
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
        PartNumberClassifier.score(&ctx, &mut result).unwrap();
        let scored = result.scored_candidates(Label::PartNumber);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].primary_block(), Some(0));
    }
}
