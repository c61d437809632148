//! Piece length classifier.
//!
//! Technic-style instructions print a 1:1 measurement circle next to long
//! parts with the stud count inside. The candidate claims both the text
//! and the circle drawing, so one selection explains both blocks.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::Block;
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::domain::elements::{PageElement, PieceLength};
use crate::utils::text::extract_piece_length_value;

/// Acceptable aspect ratio band for the measurement circle.
const CIRCLE_ASPECT: (f64, f64) = (0.8, 1.25);
/// Side length band for the measurement circle, in points.
const CIRCLE_SIDE: (f64, f64) = (12.0, 60.0);

/// Classifier for piece lengths.
#[derive(Debug, Default)]
pub struct PieceLengthClassifier;

fn is_measurement_circle(block: &Block) -> bool {
    let Block::Drawing { .. } = block else {
        return false;
    };
    let bbox = block.bbox();
    let (w, h) = (bbox.width(), bbox.height());
    if w <= 0.0 || h <= 0.0 {
        return false;
    }
    let aspect = w / h;
    (CIRCLE_ASPECT.0..=CIRCLE_ASPECT.1).contains(&aspect)
        && (CIRCLE_SIDE.0..=CIRCLE_SIDE.1).contains(&w)
}

impl LabelClassifier for PieceLengthClassifier {
    fn output(&self) -> Label {
        Label::PieceLength
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let config = &ctx.config.piece_length;
        let page = result.page().clone();

        let circles: Vec<&Block> = page
            .drawing_blocks()
            .filter(|block| is_measurement_circle(block))
            .collect();

        let mut candidates = Vec::new();
        for block in page.text_blocks() {
            let Some(text) = block.text() else { continue };
            let Some(value) = extract_piece_length_value(text) else {
                continue;
            };
            // The number must sit inside a measurement circle.
            let Some(circle) = circles
                .iter()
                .find(|c| block.bbox().fully_inside(&c.bbox()))
            else {
                continue;
            };

            let mut score = WeightedScore::new();
            score.add("text_score", 1.0, config.text_weight);
            score.add("circle_score", 1.0, config.position_weight);

            let final_score = score.value();
            if final_score < config.min_score {
                continue;
            }

            candidates.push(Candidate::atomic(
                Label::PieceLength,
                circle.bbox(),
                final_score,
                ScoreDetails::TextMatch {
                    components: score.into_components(),
                    numeric_value: Some(i64::from(value)),
                    text: text.to_string(),
                },
                vec![block.id(), circle.id()],
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
                "piece length candidate without text details",
            ));
        };
        let length = extract_piece_length_value(text).ok_or_else(|| {
            ClassifyError::build_failed(
                candidate.id(),
                format!("could not parse piece length from '{}'", text),
            )
        })?;
        Ok(PieceLength {
            bbox: candidate.bbox,
            length,
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
        PieceLengthClassifier.score(&ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn test_number_inside_circle_claims_both_blocks() {
        let result = run(vec![
            Block::text_block(0, BBox::new(110.0, 110.0, 118.0, 120.0).unwrap(), "4", 8.0),
            Block::drawing(1, BBox::new(100.0, 100.0, 130.0, 130.0).unwrap(), None),
        ]);
        let scored = result.scored_candidates(Label::PieceLength);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].source_blocks, vec![0, 1]);
    }

    #[test]
    fn test_number_without_circle_is_rejected() {
        let result = run(vec![Block::text_block(
            0,
            BBox::new(110.0, 110.0, 118.0, 120.0).unwrap(),
            "4",
            8.0,
        )]);
        assert!(result.scored_candidates(Label::PieceLength).is_empty());
    }

    #[test]
    fn test_elongated_drawing_is_not_a_circle() {
        let result = run(vec![
            Block::text_block(0, BBox::new(110.0, 110.0, 118.0, 120.0).unwrap(), "4", 8.0),
            Block::drawing(1, BBox::new(100.0, 100.0, 300.0, 130.0).unwrap(), None),
        ]);
        assert!(result.scored_candidates(Label::PieceLength).is_empty());
    }
}
