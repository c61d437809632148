//! Bag number classifier.
//!
//! Bag numbers open a new section of the instructions: a large small-value
//! integer, typically near the top-left of the page.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::{text_outline_effects, WeightedScore};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::score_exponential_decay;
use crate::domain::elements::{BagNumber, PageElement};
use crate::utils::text::extract_bag_number_value;

/// Distance scale (points) for the top-left preference.
const POSITION_SCALE: f64 = 150.0;
/// Minimum font size for a bag number.
const MIN_FONT_SIZE: f64 = 24.0;

/// Classifier for bag numbers.
#[derive(Debug, Default)]
pub struct BagNumberClassifier;

impl LabelClassifier for BagNumberClassifier {
    fn output(&self) -> Label {
        Label::BagNumber
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.bag_number;
        let page = result.page().clone();

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_bag_number_value(text) else {
                continue;
            };
            // Bag numbers are printed very large; small integers at body
            // sizes are step numbers or counts.
            match block.font_size() {
                Some(size) if size >= MIN_FONT_SIZE => {}
                _ => continue,
            }

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);

            // Top-left preference.
            let (cx, cy) = block.bbox().center();
            let corner_distance = (cx * cx + cy * cy).sqrt();
            score.add(
                "position_score",
                score_exponential_decay(corner_distance, POSITION_SCALE),
                config.position_weight,
            );

            // Bag numbers are printed large; reuse the step-number hint as
            // the closest size reference.
            if let (Some(step_size), Some(size)) =
                (ctx.hints.font_sizes.step_number_size, block.font_size())
            {
                let large = if size >= step_size { 1.0 } else { size / step_size };
                score.add("font_size_score", large, config.font_size_weight);
            }

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            let mut source_blocks = vec![block.id()];
            source_blocks.extend(text_outline_effects(&page, block));
            candidates.push(Candidate::atomic(
                Label::BagNumber,
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
                "bag number candidate without text details",
            ));
        };
        let value = extract_bag_number_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse bag number from '{}'", text),
            )
        })?;
        Ok(BagNumber {
            bbox: candidate.bbox,
            value,
        }
        .into())
    }
}
