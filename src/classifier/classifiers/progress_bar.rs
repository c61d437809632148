//! Progress bar classifiers.
//!
//! Newer instruction booklets draw a build-progress bar along the bottom
//! edge with a marker showing the current position. The bar and its
//! indicator classify separately; the indicator is placed into the bar's
//! slot by spatial assignment.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::Block;
use crate::core::errors::ClassifyResult;
use crate::core::label::Label;
use crate::domain::elements::{PageElement, ProgressBar, ProgressBarIndicator};

/// The bar lives in the bottom fraction of the page.
const BOTTOM_REGION_RATIO: f64 = 0.85;
/// Minimum bar width as a fraction of the page width.
const MIN_WIDTH_RATIO: f64 = 0.3;
/// Maximum bar height in points.
const MAX_BAR_HEIGHT: f64 = 10.0;

/// Classifier for the progress bar itself.
#[derive(Debug, Default)]
pub struct ProgressBarClassifier;

impl LabelClassifier for ProgressBarClassifier {
    fn output(&self) -> Label {
        Label::ProgressBar
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let region_top = page.height() * BOTTOM_REGION_RATIO;
        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let bbox = block.bbox();
            if bbox.y0 < region_top {
                continue;
            }
            if bbox.height() > MAX_BAR_HEIGHT || bbox.width() < page.width() * MIN_WIDTH_RATIO {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("width_score", (bbox.width() / page.width()).min(1.0), 0.6);
            score.add("thinness_score", 1.0 - bbox.height() / MAX_BAR_HEIGHT, 0.4);
            let final_score = score.value();
            if final_score < 0.3 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::ProgressBar,
                bbox,
                final_score,
                ScoreDetails::Shape {
                    components: score.into_components(),
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
        Ok(ProgressBar {
            bbox: candidate.bbox,
            indicator: None,
        }
        .into())
    }
}

/// Classifier for the position marker on the progress bar.
#[derive(Debug, Default)]
pub struct ProgressBarIndicatorClassifier;

impl LabelClassifier for ProgressBarIndicatorClassifier {
    fn output(&self) -> Label {
        Label::ProgressBarIndicator
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::ProgressBar]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let bar_boxes: Vec<_> = result
            .scored_candidates(Label::ProgressBar)
            .iter()
            .map(|c| c.bbox)
            .collect();
        if bar_boxes.is_empty() {
            return Ok(());
        }

        let mut candidates = Vec::new();
        for block in page.blocks() {
            if !matches!(block, Block::Drawing { .. } | Block::Image { .. }) {
                continue;
            }
            let bbox = block.bbox();
            if bbox.width() > 30.0 || bbox.height() > 30.0 {
                continue;
            }
            // The marker overlaps or touches the bar.
            let near_bar = bar_boxes
                .iter()
                .any(|bar| bbox.expand(3.0).intersects(bar) && !bbox.fully_inside(bar));
            let on_bar = bar_boxes.iter().any(|bar| bbox.intersects(bar));
            if !near_bar && !on_bar {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("position_score", if on_bar { 1.0 } else { 0.7 }, 1.0);
            candidates.push(Candidate::atomic(
                Label::ProgressBarIndicator,
                bbox,
                score.value() * 0.6,
                ScoreDetails::Shape {
                    components: score.into_components(),
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
        Ok(ProgressBarIndicator {
            bbox: candidate.bbox,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::PageData;
    use crate::core::config::ClassifierConfig;
    use crate::core::geometry::BBox;
    use crate::domain::hints::DocumentHints;

    #[test]
    fn test_bar_and_indicator() {
        let page = PageData::new(
            1,
            600.0,
            840.0,
            vec![
                Block::drawing(0, BBox::new(50.0, 820.0, 550.0, 826.0).unwrap(), None),
                Block::drawing(1, BBox::new(200.0, 814.0, 212.0, 830.0).unwrap(), None),
                Block::drawing(2, BBox::new(50.0, 100.0, 550.0, 106.0).unwrap(), None),
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
        ProgressBarClassifier.score(&ctx, &mut result).unwrap();
        ProgressBarIndicatorClassifier
            .score(&ctx, &mut result)
            .unwrap();

        let bars = result.scored_candidates(Label::ProgressBar);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].primary_block(), Some(0));

        let indicators = result.scored_candidates(Label::ProgressBarIndicator);
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].primary_block(), Some(1));
    }

    #[test]
    fn test_no_indicator_without_bar() {
        let page = PageData::new(
            1,
            600.0,
            840.0,
            vec![Block::drawing(
                0,
                BBox::new(200.0, 814.0, 212.0, 830.0).unwrap(),
                None,
            )],
        )
        .unwrap();
        let mut result = ClassificationResult::new(page);
        let hints = DocumentHints::empty();
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        ProgressBarIndicatorClassifier
            .score(&ctx, &mut result)
            .unwrap();
        assert!(result
            .scored_candidates(Label::ProgressBarIndicator)
            .is_empty());
    }
}
