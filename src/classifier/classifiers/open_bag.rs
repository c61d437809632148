//! Open-bag classifier.
//!
//! The "open the bag" glyph is a rounded icon at the start of a bag
//! section, usually next to the bag number and a spread of the new parts.
//! Two variant candidates are emitted per glyph: a conservative one
//! claiming only the glyph, and a greedy one absorbing the adjacent part
//! spread. The solver chooses between them (they are mutually
//! exclusive through the shared glyph block).

use crate::classifier::candidate::{Candidate, ChildRef, OpenBagVariant, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::{Block, BlockId};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::geometry::BBox;
use crate::core::label::Label;
use crate::core::scoring::score_triangular;
use crate::domain::elements::{OpenBag, PageElement};

/// Side-length band for the open-bag glyph, in points.
const GLYPH_SIDE: (f64, f64) = (30.0, 120.0);
/// Search radius for the paired bag number.
const BAG_NUMBER_RADIUS: f64 = 50.0;
/// Search radius for the adjacent part spread.
const SPREAD_RADIUS: f64 = 80.0;
/// Maximum size of an adjacent image to absorb as spread content.
const SPREAD_MAX_SIDE: f64 = 120.0;

fn is_glyph(block: &Block) -> bool {
    if !matches!(block, Block::Drawing { .. } | Block::Image { .. }) {
        return false;
    }
    let bbox = block.bbox();
    let (w, h) = (bbox.width(), bbox.height());
    if w <= 0.0 || h <= 0.0 {
        return false;
    }
    let aspect = w / h;
    (0.7..=1.4).contains(&aspect) && (GLYPH_SIDE.0..=GLYPH_SIDE.1).contains(&w)
}

/// Classifier for open-bag markers.
#[derive(Debug, Default)]
pub struct OpenBagClassifier;

impl LabelClassifier for OpenBagClassifier {
    fn output(&self) -> Label {
        Label::OpenBag
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::BagNumber]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let bag_numbers: Vec<(ChildRef, BBox)> = result
            .scored_candidates(Label::BagNumber)
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

        let mut candidates = Vec::new();
        for block in page.blocks() {
            if !is_glyph(block) {
                continue;
            }
            let glyph = block.bbox();
            let glyph_score = score_triangular(glyph.width(), GLYPH_SIDE.0, 60.0, GLYPH_SIDE.1);
            if glyph_score <= 0.0 {
                continue;
            }

            let bag_number = bag_numbers
                .iter()
                .filter(|(_, bbox)| bbox.min_distance(&glyph) <= BAG_NUMBER_RADIUS)
                .min_by(|a, b| {
                    a.1.min_distance(&glyph).total_cmp(&b.1.min_distance(&glyph))
                })
                .map(|(r, _)| *r);

            let base = 0.55 * glyph_score + if bag_number.is_some() { 0.25 } else { 0.0 };

            // Conservative variant: the glyph alone.
            candidates.push(Candidate::atomic(
                Label::OpenBag,
                glyph,
                base.min(1.0),
                ScoreDetails::OpenBag {
                    glyph_score,
                    variant: OpenBagVariant::Conservative,
                    bag_number,
                },
                vec![block.id()],
            ));

            // Greedy variant: glyph plus the adjacent part spread.
            let spread: Vec<BlockId> = page
                .image_blocks()
                .filter(|image| image.id() != block.id())
                .filter(|image| {
                    let bbox = image.bbox();
                    bbox.width() <= SPREAD_MAX_SIDE
                        && bbox.height() <= SPREAD_MAX_SIDE
                        && bbox.min_distance(&glyph) <= SPREAD_RADIUS
                })
                .map(|image| image.id())
                .collect();
            if !spread.is_empty() {
                let mut bbox = glyph;
                let mut source_blocks = vec![block.id()];
                for id in &spread {
                    if let Some(b) = page.block(*id) {
                        bbox = bbox.union(&b.bbox());
                    }
                }
                source_blocks.extend(spread);
                candidates.push(Candidate::atomic(
                    Label::OpenBag,
                    bbox,
                    (base + 0.05).min(1.0),
                    ScoreDetails::OpenBag {
                        glyph_score,
                        variant: OpenBagVariant::Greedy,
                        bag_number,
                    },
                    source_blocks,
                ));
            }
        }
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::OpenBag { bag_number, .. } = &candidate.score_details else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "open bag candidate without glyph details",
            ));
        };
        let bag_number_elem = match bag_number {
            Some(r) => Some(ctx.build_child(r)?.into_bag_number().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "bag number child has wrong type")
            })?),
            None => None,
        };
        Ok(OpenBag {
            bbox: candidate.bbox,
            bag_number: bag_number_elem,
        }
        .into())
    }
}
