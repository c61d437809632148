//! Parts classifier.
//!
//! Assembles Part candidates by chaining spatially constrained searches:
//! for each PartCount, the PartImages directly above and horizontally
//! overlapping within tolerance; from each count, an optional PartNumber
//! below; near each image, an optional PieceLength. Every valid
//! combination becomes a candidate; the constraint solver picks the
//! one-to-one matching, so ambiguous layouts simply produce extra
//! candidates rather than early decisions.

use tracing::debug;

use crate::classifier::candidate::{Candidate, ChildRef, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::geometry::BBox;
use crate::core::label::Label;
use crate::core::scoring::{score_exponential_decay, score_triangular};
use crate::domain::elements::{PageElement, Part};

/// Maximum vertical distance between a count and a number below it.
const NUMBER_MAX_GAP: f64 = 15.0;
/// Search radius around an image for a piece-length circle.
const LENGTH_MAX_DISTANCE: f64 = 10.0;
/// Alignment tolerance for count-to-number chaining.
const NUMBER_ALIGN_TOLERANCE: f64 = 3.0;

fn child_ref(candidate: &Candidate) -> ChildRef {
    ChildRef {
        label: candidate.label,
        id: candidate.id(),
        target: candidate.target,
    }
}

/// Scores a (count, image) pairing from its geometry.
fn pair_score(distance: f64, alignment_offset: f64, has_number: bool, has_length: bool) -> f64 {
    let distance_score = score_exponential_decay(distance, 10.0);
    let alignment_score = score_triangular(alignment_offset.abs(), 0.0, 0.0, 8.0);
    let mut score = 0.6 * distance_score + 0.4 * alignment_score;
    if has_number {
        score += 0.01;
    }
    if has_length {
        score += 0.01;
    }
    score.min(1.0)
}

/// Classifier for complete parts-list entries.
#[derive(Debug, Default)]
pub struct PartsClassifier;

impl LabelClassifier for PartsClassifier {
    fn output(&self) -> Label {
        Label::Part
    }

    fn requires(&self) -> &'static [Label] {
        &[
            Label::PartCount,
            Label::PartImage,
            Label::PartNumber,
            Label::PieceLength,
        ]
    }

    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let h_tolerance = (ctx.config.part_alignment_ratio * page.width()).max(2.0);
        let max_gap = ctx.config.part_max_gap;

        struct Pick {
            r: ChildRef,
            bbox: BBox,
        }
        let collect = |label: Label, result: &ClassificationResult| -> Vec<Pick> {
            result
                .scored_candidates(label)
                .into_iter()
                .map(|c| Pick {
                    r: child_ref(c),
                    bbox: c.bbox,
                })
                .collect()
        };
        let counts = collect(Label::PartCount, result);
        let images = collect(Label::PartImage, result);
        let numbers = collect(Label::PartNumber, result);
        let lengths = collect(Label::PieceLength, result);
        if counts.is_empty() || images.is_empty() {
            return Ok(());
        }
        debug!(
            page = page.page_index(),
            counts = counts.len(),
            images = images.len(),
            numbers = numbers.len(),
            lengths = lengths.len(),
            "pairing parts"
        );

        let mut candidates = Vec::new();
        for count in &counts {
            // Images directly above, horizontally overlapping or
            // left-aligned within tolerance.
            for image in &images {
                if image.bbox.y1 > count.bbox.y0 + 2.0 {
                    continue;
                }
                let distance = (count.bbox.y0 - image.bbox.y1).max(0.0);
                if distance > max_gap {
                    continue;
                }
                let overlapping = image.bbox.overlaps_horizontal(&count.bbox);
                let alignment_offset = image.bbox.x0 - count.bbox.x0;
                if !overlapping && alignment_offset.abs() > h_tolerance {
                    continue;
                }

                // Optional number below the count, left-aligned.
                let number = numbers
                    .iter()
                    .filter(|n| {
                        n.bbox.y0 >= count.bbox.y1 - 2.0
                            && (n.bbox.y0 - count.bbox.y1) <= NUMBER_MAX_GAP
                            && n.bbox.left_aligned(&count.bbox, NUMBER_ALIGN_TOLERANCE)
                    })
                    .min_by(|a, b| {
                        a.bbox
                            .vertical_distance(&count.bbox)
                            .total_cmp(&b.bbox.vertical_distance(&count.bbox))
                    });

                // Optional piece length near the image.
                let length = lengths
                    .iter()
                    .filter(|l| l.bbox.min_distance(&image.bbox) <= LENGTH_MAX_DISTANCE)
                    .min_by(|a, b| {
                        a.bbox
                            .min_distance(&image.bbox)
                            .total_cmp(&b.bbox.min_distance(&image.bbox))
                    });

                let score = pair_score(
                    distance,
                    alignment_offset,
                    number.is_some(),
                    length.is_some(),
                );
                let mut bbox = image.bbox.union(&count.bbox);
                if let Some(n) = number {
                    bbox = bbox.union(&n.bbox);
                }
                if let Some(l) = length {
                    bbox = bbox.union(&l.bbox);
                }

                candidates.push(Candidate::composite(
                    Label::Part,
                    bbox,
                    score,
                    ScoreDetails::PartPair {
                        distance,
                        alignment_offset,
                        count: count.r,
                        image: image.r,
                        number: number.map(|n| n.r),
                        length: length.map(|l| l.r),
                    },
                ));
            }
        }
        debug!(candidates = candidates.len(), "part candidates created");
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::PartPair {
            count,
            image,
            number,
            length,
            ..
        } = &candidate.score_details
        else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "part candidate without pair details",
            ));
        };

        let count_elem = ctx
            .build_child(count)?
            .into_part_count()
            .ok_or_else(|| ClassifyError::build_failed(candidate.id(), "count child has wrong type"))?;
        let image_elem = ctx
            .build_child(image)?
            .into_part_image()
            .ok_or_else(|| ClassifyError::build_failed(candidate.id(), "image child has wrong type"))?;
        let number_elem = match number {
            Some(n) => Some(ctx.build_child(n)?.into_part_number().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "number child has wrong type")
            })?),
            None => None,
        };
        let length_elem = match length {
            Some(l) => Some(ctx.build_child(l)?.into_piece_length().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "length child has wrong type")
            })?),
            None => None,
        };

        let mut bbox = count_elem.bbox.union(&image_elem.bbox);
        if let Some(n) = &number_elem {
            bbox = bbox.union(&n.bbox);
        }
        if let Some(l) = &length_elem {
            bbox = bbox.union(&l.bbox);
        }
        Ok(Part {
            bbox,
            count: count_elem,
            image: image_elem,
            number: number_elem,
            length: length_elem,
        }
        .into())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classifiers::part_count::PartCountClassifier;
    use crate::classifier::classifiers::part_image::PartImageClassifier;
    use crate::core::blocks::{Block, PageData};
    use crate::core::config::ClassifierConfig;
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
        result
    }

    #[test]
    fn test_pairs_image_above_count() {
        let result = run(vec![
            Block::image(0, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(1, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        let parts = result.scored_candidates(Label::Part);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_composite());
        let refs = parts[0].score_details.child_refs();
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_rejects_image_far_above() {
        let result = run(vec![
            Block::image(0, bb(100.0, 20.0, 140.0, 60.0)),
            Block::text_block(1, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        assert!(result.scored_candidates(Label::Part).is_empty());
    }

    #[test]
    fn test_rejects_misaligned_image() {
        let result = run(vec![
            Block::image(0, bb(300.0, 100.0, 340.0, 140.0)),
            Block::text_block(1, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        assert!(result.scored_candidates(Label::Part).is_empty());
    }

    #[test]
    fn test_ambiguous_images_create_multiple_candidates() {
        let result = run(vec![
            Block::image(0, bb(100.0, 100.0, 140.0, 140.0)),
            Block::image(1, bb(102.0, 95.0, 142.0, 139.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
        ]);
        // Both images are plausible; the solver decides.
        assert_eq!(result.scored_candidates(Label::Part).len(), 2);
    }

    #[test]
    fn test_closer_pairing_scores_higher() {
        assert!(pair_score(1.0, 0.0, false, false) > pair_score(8.0, 0.0, false, false));
        assert!(pair_score(1.0, 0.0, false, false) > pair_score(1.0, 6.0, false, false));
        assert!(pair_score(1.0, 0.0, true, true) > pair_score(1.0, 0.0, false, false));
    }
}
