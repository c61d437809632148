//! Page number classifier.
//!
//! Page numbers are small integers in the bottom band of the page, close
//! to a corner, usually printed at a consistent size throughout the
//! booklet, and usually matching the page's index in the document.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::{text_outline_effects, WeightedScore};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::{score_exponential_decay, LinearScale};
use crate::domain::elements::{PageElement, PageNumber};
use crate::utils::text::extract_page_number_value;

/// Fraction of the page height forming the bottom band.
const BOTTOM_BAND_RATIO: f64 = 0.1;

/// Classifier for page numbers.
#[derive(Debug, Default)]
pub struct PageNumberClassifier;

impl LabelClassifier for PageNumberClassifier {
    fn output(&self) -> Label {
        Label::PageNumber
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.page_number;
        let page = result.page().clone();
        let band_top = page.height() * (1.0 - BOTTOM_BAND_RATIO);
        let hinted_size = ctx.hints.font_sizes.page_number_size.unwrap_or(12.0);
        let size_scale = LinearScale::around(hinted_size, 0.5, 1.5);
        let value_scale = LinearScale::new(vec![(0.0, 1.0), (10.0, 0.0)]);

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            // Hard filter: page numbers live in the bottom band.
            if block.bbox().y1 < band_top {
                continue;
            }
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_page_number_value(text) else {
                continue;
            };

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);

            // Proximity to either bottom corner.
            let (cx, _) = block.bbox().center();
            let corner_distance = cx.min(page.width() - cx);
            score.add(
                "position_score",
                score_exponential_decay(corner_distance, ctx.config.page_number_position_scale),
                config.position_weight,
            );

            let value_gap = (i64::from(value) - i64::from(page.page_index())).unsigned_abs();
            score.add(
                "page_value_score",
                value_scale.apply(value_gap as f64),
                ctx.config.page_number_value_weight,
            );

            if let Some(size) = block.font_size() {
                score.add("font_size_score", size_scale.apply(size), config.font_size_weight);
            }

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            let mut source_blocks = vec![block.id()];
            source_blocks.extend(text_outline_effects(&page, block));
            candidates.push(Candidate::atomic(
                Label::PageNumber,
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
                "page number candidate without text details",
            ));
        };
        let value = extract_page_number_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse page number from '{}'", text),
            )
        })?;
        Ok(PageNumber {
            bbox: candidate.bbox,
            value,
        }
        .into())
    }
}
