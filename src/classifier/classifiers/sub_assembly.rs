//! Sub-assembly and sub-step classifiers.
//!
//! A sub-assembly is a light-colored callout box containing its own small
//! numbered steps and drawings, optionally marked with a repeat count
//! ("2x"). The container drawing is the candidate's source block; the
//! repeat marker is a referenced child. Sub-steps pair a substep number
//! found inside a container with that container's content.

use tracing::debug;

use crate::classifier::candidate::{Candidate, ChildRef, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::Block;
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::core::scoring::score_linear;
use crate::domain::elements::{PageElement, SubAssembly, SubStep};

/// Minimum fill luminance for a callout background.
const MIN_LUMINANCE: f64 = 0.8;
/// Container area bounds as fractions of the page area.
const AREA_RATIO: (f64, f64) = (0.005, 0.4);

fn is_callout_container(block: &Block, page_area: f64) -> bool {
    let Block::Drawing { fill_color, .. } = block else {
        return false;
    };
    let Some(fill) = fill_color else { return false };
    if fill.luminance() < MIN_LUMINANCE {
        return false;
    }
    let ratio = block.bbox().area() / page_area;
    (AREA_RATIO.0..=AREA_RATIO.1).contains(&ratio)
}

/// Classifier for sub-assembly callout boxes.
#[derive(Debug, Default)]
pub struct SubAssemblyClassifier;

impl LabelClassifier for SubAssemblyClassifier {
    fn output(&self) -> Label {
        Label::SubAssembly
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::SubstepNumber]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let page_area = page.bbox().area();
        if page_area <= 0.0 {
            return Ok(());
        }

        let substep_numbers: Vec<(ChildRef, crate::core::geometry::BBox)> = result
            .scored_candidates(Label::SubstepNumber)
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
        for block in page.drawing_blocks() {
            if !is_callout_container(block, page_area) {
                continue;
            }
            let container = block.bbox();

            // The callout holds a cluster of drawings or images.
            let content_count = page
                .blocks()
                .iter()
                .filter(|b| b.id() != block.id())
                .filter(|b| matches!(b, Block::Drawing { .. } | Block::Image { .. }))
                .filter(|b| b.bbox().fully_inside(&container))
                .count();
            if content_count == 0 {
                continue;
            }

            // A repeat marker near the container edge, when present.
            let repeat = substep_numbers
                .iter()
                .filter(|(_, bbox)| bbox.fully_inside(&container.expand(5.0)))
                .min_by(|a, b| {
                    a.1.min_distance(&container)
                        .total_cmp(&b.1.min_distance(&container))
                })
                .map(|(r, _)| *r);

            let container_score = score_linear(content_count as f64, 0.0, 5.0, 0.3, 0.9);
            debug!(
                container = %container,
                content = content_count,
                has_repeat = repeat.is_some(),
                "sub-assembly candidate"
            );
            candidates.push(Candidate::atomic(
                Label::SubAssembly,
                container,
                container_score,
                ScoreDetails::SubAssembly {
                    container_score,
                    repeat,
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
        let ScoreDetails::SubAssembly { repeat, .. } = &candidate.score_details else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "sub-assembly candidate without container details",
            ));
        };
        let repeat_elem = match repeat {
            Some(r) => Some(ctx.build_child(r)?.into_substep_number().ok_or_else(|| {
                ClassifyError::build_failed(candidate.id(), "repeat child has wrong type")
            })?),
            None => None,
        };
        Ok(SubAssembly {
            bbox: candidate.bbox,
            repeat: repeat_elem,
            // Sub-steps are placed by spatial assignment.
            sub_steps: Vec::new(),
        }
        .into())
    }
}

/// Classifier for numbered steps inside sub-assembly callouts.
#[derive(Debug, Default)]
pub struct SubStepClassifier;

impl LabelClassifier for SubStepClassifier {
    fn output(&self) -> Label {
        Label::SubStep
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::SubstepNumber, Label::SubAssembly]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let containers: Vec<crate::core::geometry::BBox> = result
            .scored_candidates(Label::SubAssembly)
            .into_iter()
            .map(|c| c.bbox)
            .collect();
        if containers.is_empty() {
            return Ok(());
        }

        let mut candidates = Vec::new();
        for number in result.scored_candidates(Label::SubstepNumber) {
            // A repeat marker is "Nx"; substep numbers are plain integers.
            let is_plain = matches!(
                &number.score_details,
                ScoreDetails::TextMatch { text, .. }
                    if !text.to_ascii_lowercase().contains('x') && !text.contains('×')
            );
            if !is_plain {
                continue;
            }
            let Some(container) = containers
                .iter()
                .find(|c| number.bbox.fully_inside(&c.expand(2.0)))
            else {
                continue;
            };
            // Closer to the container's top-left means more step-like.
            let (nx, ny) = number.bbox.center();
            let corner_distance = ((nx - container.x0).powi(2) + (ny - container.y0).powi(2)).sqrt();
            let reach = (container.width().powi(2) + container.height().powi(2)).sqrt();
            let proximity_score = if reach > 0.0 {
                (1.0 - corner_distance / reach).max(0.0)
            } else {
                0.0
            };

            candidates.push(Candidate::composite(
                Label::SubStep,
                number.bbox,
                (0.4 + 0.4 * proximity_score).min(1.0),
                ScoreDetails::SubStep {
                    number: ChildRef {
                        label: number.label,
                        id: number.id(),
                        target: number.target,
                    },
                    proximity_score,
                },
            ));
        }
        for candidate in candidates {
            result.add_candidate(candidate)?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        let ScoreDetails::SubStep { number, .. } = &candidate.score_details else {
            return Err(ClassifyError::build_failed(
                candidate.id(),
                "sub-step candidate without number details",
            ));
        };
        let number_elem = ctx.build_child(number)?.into_substep_number().ok_or_else(|| {
            ClassifyError::build_failed(candidate.id(), "number child has wrong type")
        })?;
        Ok(SubStep {
            bbox: candidate.bbox,
            number: number_elem,
        }
        .into())
    }
}
