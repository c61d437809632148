//! Step classifier.
//!
//! A step pairs a step number with an optionally associated parts list
//! (conventionally the box directly above the number, left-aligned).
//! Every plausible pairing becomes a candidate, plus a fallback without a
//! parts list; uniqueness-by-value lets the solver keep one per step.
//! Diagrams, arrows, rotation symbols and sub-assemblies are not bound
//! here at all; they are placed after solving by spatial assignment.

use tracing::debug;

use crate::classifier::candidate::{Candidate, ChildRef, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::geometry::BBox;
use crate::core::label::Label;
use crate::domain::elements::{PageElement, Step};

/// Epsilon for the "parts list is above the step number" check.
const ABOVE_EPS: f64 = 2.0;
/// Base score for a step with a paired parts list.
const PAIRED_BASE: f64 = 0.5;
/// Score for a step without a parts list.
const UNPAIRED_SCORE: f64 = 0.3;

/// Classifier for complete steps.
#[derive(Debug, Default)]
pub struct StepClassifier;

impl LabelClassifier for StepClassifier {
    fn output(&self) -> Label {
        Label::Step
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::StepNumber, Label::PartsList]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let numbers: Vec<(ChildRef, BBox)> = result
            .scored_candidates(Label::StepNumber)
            .into_iter()
            .map(|c| {
                (
                    ChildRef {
                        label: c.label,
                        id: c.id(),
                        target: c.target,
                    },
                    c.bbox,
                )
            })
            .collect();
        if numbers.is_empty() {
            return Ok(());
        }
        let lists: Vec<(ChildRef, BBox)> = result
            .scored_candidates(Label::PartsList)
            .into_iter()
            .map(|c| {
                (
                    ChildRef {
                        label: c.label,
                        id: c.id(),
                        target: c.target,
                    },
                    c.bbox,
                )
            })
            .collect();
        debug!(
            page = page.page_index(),
            step_numbers = numbers.len(),
            parts_lists = lists.len(),
            "pairing steps"
        );

        let mut candidates = Vec::new();
        for (number, number_bbox) in &numbers {
            for (list, list_bbox) in &lists {
                // The parts list must sit above the step number.
                if list_bbox.y1 > number_bbox.y0 + ABOVE_EPS {
                    continue;
                }
                let gap = number_bbox.y0 - list_bbox.y1;
                let max_gap = number_bbox.height().max(1.0);
                let proximity_score = (1.0 - gap / max_gap).max(0.0);

                let left_offset = (list_bbox.x0 - number_bbox.x0).abs();
                let max_offset = number_bbox.width().max(1.0);
                let alignment_score = (1.0 - left_offset / max_offset).max(0.0);

                let score = PAIRED_BASE + 0.5 * (proximity_score + alignment_score) / 2.0;
                candidates.push(Candidate::composite(
                    Label::Step,
                    number_bbox.union(list_bbox).clip_to(&page.bbox()),
                    score,
                    ScoreDetails::Step {
                        number: *number,
                        parts_list: Some(*list),
                        proximity_score,
                        alignment_score,
                    },
                ));
            }
            // Fallback: a step is valid without any parts list.
            candidates.push(Candidate::composite(
                Label::Step,
                *number_bbox,
                UNPAIRED_SCORE,
                ScoreDetails::Step {
                    number: *number,
                    parts_list: None,
                    proximity_score: 0.0,
                    alignment_score: 0.0,
                },
            ));
        }
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::Step {
            number, parts_list, ..
        } = &candidate.score_details
        else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "step candidate without step details",
            ));
        };

        let step_number = ctx.build_child(number)?.into_step_number().ok_or_else(|| {
            ClassifyError::build_failed(candidate.id(), "number child has wrong type")
        })?;
        let parts_list_elem = match parts_list {
            Some(list) => Some(ctx.build_child(list)?.into_parts_list().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "parts list child has wrong type")
            })?),
            None => None,
        };

        let mut bbox = step_number.bbox;
        if let Some(list) = &parts_list_elem {
            bbox = bbox.union(&list.bbox);
        }
        Ok(Step {
            bbox,
            step_number,
            parts_list: parts_list_elem,
            diagram: None,
            rotation_symbol: None,
            arrows: Vec::new(),
            sub_assemblies: Vec::new(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::candidate::ScoreDetails as SD;
    use crate::core::blocks::{Block, PageData};
    use crate::core::config::ClassifierConfig;
    use crate::domain::hints::DocumentHints;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox::new(x0, y0, x1, y1).unwrap()
    }

    fn run(blocks: Vec<Block>) -> ClassificationResult {
        let page = PageData::new(1, 600.0, 840.0, blocks).unwrap();
        let mut result = ClassificationResult::new(page);
        let mut hints = DocumentHints::empty();
        hints.font_sizes.step_number_size = Some(20.0);
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        crate::classifier::classifiers::step_number::StepNumberClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::part_count::PartCountClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::part_image::PartImageClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::part_number::PartNumberClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::piece_length::PieceLengthClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::parts::PartsClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::parts_list::PartsListClassifier
            .score(&ctx, &mut result)
            .unwrap();
        StepClassifier.score(&ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn test_pairs_step_number_with_list_above() {
        let result = run(vec![
            // Parts list container with one part.
            Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(1, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
            // Step number just below the container, left-aligned.
            Block::text_block(3, bb(90.0, 175.0, 110.0, 195.0), "4", 20.0),
        ]);
        let steps = result.scored_candidates(Label::Step);
        // One paired candidate plus the fallback without a list.
        assert_eq!(steps.len(), 2);
        let best = steps[0];
        let SD::Step { parts_list, .. } = &best.score_details else {
            panic!("wrong details");
        };
        assert!(parts_list.is_some());
        assert!(best.score > UNPAIRED_SCORE);
    }

    #[test]
    fn test_list_below_number_is_not_paired() {
        let result = run(vec![
            Block::text_block(0, bb(90.0, 50.0, 110.0, 70.0), "4", 20.0),
            Block::drawing(1, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(2, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(3, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        let steps = result.scored_candidates(Label::Step);
        assert_eq!(steps.len(), 1);
        let SD::Step { parts_list, .. } = &steps[0].score_details else {
            panic!("wrong details");
        };
        assert!(parts_list.is_none());
    }

    #[test]
    fn test_no_step_without_step_number() {
        let result = run(vec![Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None)]);
        assert!(result.scored_candidates(Label::Step).is_empty());
    }
}
