//! Parts list classifier.
//!
//! A parts list is a boxed vector drawing containing the step's part
//! entries. The container drawing is the candidate's source block; the
//! parts inside are referenced children, scored by how many there are and
//! how much of the container they cover.

use tracing::debug;

use crate::classifier::candidate::{Candidate, ChildRef, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::score_linear;
use crate::domain::elements::{PageElement, PartsList};

/// Containment slack for parts near the container edge, in points.
const CONTAINMENT_MARGIN: f64 = 2.0;
/// Containers smaller than this fraction of the page are icons.
const MIN_AREA_RATIO: f64 = 0.005;

/// Classifier for parts-list containers.
#[derive(Debug, Default)]
pub struct PartsListClassifier;

impl LabelClassifier for PartsListClassifier {
    fn output(&self) -> Label {
        Label::PartsList
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::Part]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let page_area = page.bbox().area();
        if page_area <= 0.0 {
            return Ok(());
        }

        let parts: Vec<(ChildRef, crate::core::geometry::BBox, f64)> = result
            .scored_candidates(Label::Part)
            .into_iter()
            .map(|c| {
                (
                    ChildRef {
                        label: c.label,
                        id: c.id(),
                        target: c.target,
                    },
                    c.bbox,
                    c.bbox.area(),
                )
            })
            .collect();
        if parts.is_empty() {
            return Ok(());
        }

        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let container = block.bbox();
            let ratio = container.area() / page_area;
            if ratio < MIN_AREA_RATIO || ratio > ctx.config.parts_list_max_area_ratio {
                continue;
            }
            let expanded = container.expand(CONTAINMENT_MARGIN);

            let inside: Vec<&(ChildRef, crate::core::geometry::BBox, f64)> = parts
                .iter()
                .filter(|(_, bbox, _)| bbox.fully_inside(&expanded))
                .collect();
            if inside.is_empty() {
                continue;
            }

            let count_score = score_linear(inside.len() as f64, 0.0, 4.0, 0.0, 1.0);
            let covered: f64 = inside.iter().map(|(_, _, area)| *area).sum();
            let coverage_score = (covered / container.area()).clamp(0.0, 1.0);
            let score = (0.4 + 0.3 * count_score + 0.3 * coverage_score).min(1.0);
            if score < ctx.config.parts_list_min_score {
                continue;
            }

            debug!(
                container = %container,
                parts = inside.len(),
                coverage = coverage_score,
                "parts list candidate"
            );
            candidates.push(Candidate::atomic(
                Label::PartsList,
                container,
                score,
                ScoreDetails::PartsList {
                    count_score,
                    coverage_score,
                    parts: inside.iter().map(|(r, _, _)| *r).collect(),
                },
                vec![block.id()],
            ));
        }
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::PartsList { parts, .. } = &candidate.score_details else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "parts list candidate without parts details",
            ));
        };

        // Only the referenced parts the solver selected are built; losers
        // were alternative pairings of the same blocks.
        let mut built = Vec::new();
        for part_ref in parts {
            if !ctx.result.is_selected(part_ref.id) {
                continue;
            }
            let part = ctx.build_child(part_ref)?.into_part().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "part child has wrong type")
            })?;
            built.push(part);
        }
        if built.is_empty() {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "parts list has no selected parts",
            ));
        }
        Ok(PartsList {
            bbox: candidate.bbox,
            parts: built,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classifiers::part_count::PartCountClassifier;
    use crate::classifier::classifiers::part_image::PartImageClassifier;
    use crate::classifier::classifiers::parts::PartsClassifier;
    use crate::core::blocks::{Block, PageData};
    use crate::core::config::ClassifierConfig;
    use crate::core::geometry::BBox;
    use crate::domain::hints::DocumentHints;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox::new(x0, y0, x1, y1).unwrap()
    }

    fn run(blocks: Vec<Block>) -> ClassificationResult {
        let page = PageData::new(1, 600.0, 840.0, blocks).unwrap();
        let mut result = ClassificationResult::new(page);
        let hints = DocumentHints::empty();
        let config = ClassifierConfig::default();
        let ctx = ScoreCtx {
            hints: &hints,
            config: &config,
        };
        PartCountClassifier.score(&ctx, &mut result).unwrap();
        PartImageClassifier.score(&ctx, &mut result).unwrap();
        crate::classifier::classifiers::part_number::PartNumberClassifier
            .score(&ctx, &mut result)
            .unwrap();
        crate::classifier::classifiers::piece_length::PieceLengthClassifier
            .score(&ctx, &mut result)
            .unwrap();
        PartsClassifier.score(&ctx, &mut result).unwrap();
        PartsListClassifier.score(&ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn test_container_with_parts_scores() {
        let result = run(vec![
            Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(1, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
            Block::image(3, bb(160.0, 100.0, 200.0, 140.0)),
            Block::text_block(4, bb(160.0, 144.0, 180.0, 154.0), "3x", 9.0),
        ]);
        let lists = result.scored_candidates(Label::PartsList);
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].source_blocks, vec![0]);
        assert_eq!(lists[0].score_details.child_refs().len(), 2);
    }

    #[test]
    fn test_container_without_parts_is_skipped() {
        let result = run(vec![Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None)]);
        assert!(result.scored_candidates(Label::PartsList).is_empty());
    }

    #[test]
    fn test_page_sized_container_is_rejected() {
        let result = run(vec![
            Block::drawing(0, bb(0.0, 0.0, 600.0, 840.0), None),
            Block::image(1, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        assert!(result.scored_candidates(Label::PartsList).is_empty());
    }
}
