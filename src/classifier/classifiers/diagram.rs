//! Diagram classifier.
//!
//! Diagrams are the large instruction graphics: sizeable drawings or
//! images well clear of both icon scale and full-page background scale.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::Block;
use crate::core::errors::ClassifyResult;
use crate::core::label::Label;
use crate::core::scoring::score_triangular;
use crate::domain::elements::{Diagram, PageElement};

/// Minimum fraction of the page area for a diagram candidate.
const MIN_AREA_RATIO: f64 = 0.01;
/// Area ratio scoring peaks here.
const IDEAL_AREA_RATIO: f64 = 0.18;
/// Anything beyond this fraction of the page is background, not diagram.
const MAX_AREA_RATIO: f64 = 0.8;

/// Classifier for step diagrams.
#[derive(Debug, Default)]
pub struct DiagramClassifier;

impl LabelClassifier for DiagramClassifier {
    fn output(&self) -> Label {
        Label::Diagram
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let page_area = page.bbox().area();
        if page_area <= 0.0 {
            return Ok(());
        }

        let mut candidates = Vec::new();
        for block in page.blocks() {
            let eligible = matches!(block, Block::Drawing { .. } | Block::Image { .. });
            if !eligible {
                continue;
            }
            let bbox = block.bbox();
            let ratio = bbox.area() / page_area;
            if ratio < MIN_AREA_RATIO || ratio > MAX_AREA_RATIO {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add(
                "size_score",
                score_triangular(ratio, MIN_AREA_RATIO, IDEAL_AREA_RATIO, MAX_AREA_RATIO),
                0.7,
            );
            // Extremely elongated shapes are dividers or arrows.
            let aspect = if bbox.height() > 0.0 {
                bbox.width() / bbox.height()
            } else {
                f64::INFINITY
            };
            let aspect_score = if (0.2..=5.0).contains(&aspect) { 1.0 } else { 0.0 };
            score.add("aspect_score", aspect_score, 0.3);

            let final_score = score.value();
            if final_score < 0.3 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::Diagram,
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
        Ok(Diagram {
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

    fn run(blocks: Vec<Block>) -> ClassificationResult {
        let page = PageData::new(1, 600.0, 840.0, blocks).unwrap();
        let mut result = ClassificationResult::new(page);
        let hints = DocumentHints::empty();
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        DiagramClassifier.score(&ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn test_large_drawing_scores() {
        let result = run(vec![Block::drawing(
            0,
            BBox::new(100.0, 100.0, 400.0, 400.0).unwrap(),
            None,
        )]);
        let scored = result.scored_candidates(Label::Diagram);
        assert_eq!(scored.len(), 1);
        assert!(scored[0].score > 0.5);
    }

    #[test]
    fn test_tiny_and_page_sized_blocks_are_rejected() {
        let result = run(vec![
            Block::drawing(0, BBox::new(0.0, 0.0, 10.0, 10.0).unwrap(), None),
            Block::drawing(1, BBox::new(0.0, 0.0, 600.0, 840.0).unwrap(), None),
        ]);
        assert!(result.scored_candidates(Label::Diagram).is_empty());
    }

    #[test]
    fn test_thin_line_is_rejected() {
        let result = run(vec![Block::drawing(
            0,
            BBox::new(0.0, 400.0, 550.0, 412.0).unwrap(),
            None,
        )]);
        let scored = result.scored_candidates(Label::Diagram);
        assert!(scored.is_empty() || scored[0].score < 0.5);
    }
}
