//! Part image classifier.
//!
//! Wraps every raster image as a part-image candidate with a flat
//! positive score. Whether an image really is a parts-list entry is
//! decided by the parts classifier and the solver: an image paired into a
//! part earns more than the same image interpreted as, say, a diagram.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::errors::ClassifyResult;
use crate::core::label::Label;
use crate::domain::elements::{PageElement, PartImage};

/// Flat base score for wrapping an image.
const BASE_SCORE: f64 = 0.5;

/// Classifier for part images.
#[derive(Debug, Default)]
pub struct PartImageClassifier;

impl LabelClassifier for PartImageClassifier {
    fn output(&self) -> Label {
        Label::PartImage
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        for block in page.image_blocks() {
            result.add_candidate(Candidate::atomic(
                Label::PartImage,
                block.bbox(),
                BASE_SCORE,
                ScoreDetails::PartImage { base: BASE_SCORE },
                vec![block.id()],
            ))?;
        }
        Ok(())
    }

    fn build(&self, candidate: &Candidate, _ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement> {
        Ok(PartImage {
            bbox: candidate.bbox,
        }
        .into())
    }
}
