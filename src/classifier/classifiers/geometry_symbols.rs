//! Small geometry classifiers: arrows, rotation symbols, dividers,
//! backgrounds, loose-part symbols, and shines.
//!
//! Each scores intrinsic shape only: dimensions, aspect ratio, color,
//! position. Relationships to steps and parts are discovered at solve or
//! assignment time.

use crate::classifier::candidate::{Candidate, ScoreDetails};
use crate::classifier::classifiers::common::WeightedScore;
use crate::classifier::result::ClassificationResult;
use crate::classifier::{BuildCtx, LabelClassifier, ScoreCtx};
use crate::core::blocks::Block;
use crate::core::errors::ClassifyResult;
use crate::core::label::Label;
use crate::core::scoring::score_triangular;
use crate::domain::elements::{
    Arrow, Background, Divider, LoosePartSymbol, PageElement, RotationSymbol, Shine,
};

/// Classifier for callout arrows.
#[derive(Debug, Default)]
pub struct ArrowClassifier;

impl LabelClassifier for ArrowClassifier {
    fn output(&self) -> Label {
        Label::Arrow
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let bbox = block.bbox();
            let (w, h) = (bbox.width(), bbox.height());
            if w <= 0.0 || h <= 0.0 {
                continue;
            }
            let long = w.max(h);
            let short = w.min(h);
            // Arrows are elongated and small.
            if long < 10.0 || long > 150.0 || short > 40.0 {
                continue;
            }
            let aspect = long / short.max(1.0);
            if aspect < 1.5 {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("aspect_score", score_triangular(aspect, 1.5, 4.0, 20.0), 0.6);
            score.add("size_score", score_triangular(long, 10.0, 50.0, 150.0), 0.4);
            let final_score = score.value();
            if final_score < 0.3 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::Arrow,
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
        Ok(Arrow {
            bbox: candidate.bbox,
        }
        .into())
    }
}

/// Classifier for the rotate-the-model symbol.
#[derive(Debug, Default)]
pub struct RotationSymbolClassifier;

impl LabelClassifier for RotationSymbolClassifier {
    fn output(&self) -> Label {
        Label::RotationSymbol
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let mut candidates = Vec::new();
        for block in page.blocks() {
            if !matches!(block, Block::Drawing { .. } | Block::Image { .. }) {
                continue;
            }
            let bbox = block.bbox();
            let (w, h) = (bbox.width(), bbox.height());
            if w <= 0.0 || h <= 0.0 {
                continue;
            }
            // A compact, nearly square glyph.
            let aspect = w / h;
            if !(0.75..=1.35).contains(&aspect) || !(14.0..=50.0).contains(&w) {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("aspect_score", score_triangular(aspect, 0.75, 1.0, 1.35), 0.5);
            score.add("size_score", score_triangular(w, 14.0, 28.0, 50.0), 0.5);
            let final_score = score.value() * 0.8;
            if final_score < 0.3 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::RotationSymbol,
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
        Ok(RotationSymbol {
            bbox: candidate.bbox,
        }
        .into())
    }
}

/// Classifier for separator lines between page regions.
#[derive(Debug, Default)]
pub struct DividerClassifier;

impl LabelClassifier for DividerClassifier {
    fn output(&self) -> Label {
        Label::Divider
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let bbox = block.bbox();
            let long = bbox.width().max(bbox.height());
            let short = bbox.width().min(bbox.height());
            if short > 6.0 || long < page.width().min(page.height()) * 0.25 {
                continue;
            }

            let mut score = WeightedScore::new();
            let span_ratio = long / page.width().max(page.height());
            score.add("length_score", span_ratio.min(1.0), 0.6);
            score.add("thinness_score", 1.0 - short / 6.0, 0.4);
            let final_score = score.value();
            if final_score < 0.3 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::Divider,
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
        Ok(Divider {
            bbox: candidate.bbox,
        }
        .into())
    }
}

/// Classifier for page-covering background drawings.
#[derive(Debug, Default)]
pub struct BackgroundClassifier;

impl LabelClassifier for BackgroundClassifier {
    fn output(&self) -> Label {
        Label::Background
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
        for block in page.drawing_blocks() {
            let ratio = block.bbox().area() / page_area;
            if ratio < 0.85 {
                continue;
            }
            let mut score = WeightedScore::new();
            score.add("coverage_score", ratio.min(1.0), 1.0);
            candidates.push(Candidate::atomic(
                Label::Background,
                block.bbox(),
                score.value() * 0.7,
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
        Ok(Background {
            bbox: candidate.bbox,
        }
        .into())
    }
}

/// Classifier for the loose-part symbol.
#[derive(Debug, Default)]
pub struct LoosePartSymbolClassifier;

impl LabelClassifier for LoosePartSymbolClassifier {
    fn output(&self) -> Label {
        Label::LoosePartSymbol
    }

    fn requires(&self) -> &'static [Label] {
        &[]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let bbox = block.bbox();
            let (w, h) = (bbox.width(), bbox.height());
            if w <= 0.0 || h <= 0.0 {
                continue;
            }
            let aspect = w / h;
            // A small outlined square with no fill.
            if !(0.8..=1.25).contains(&aspect) || !(8.0..=30.0).contains(&w) {
                continue;
            }
            if block.fill_color().is_some() {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("aspect_score", score_triangular(aspect, 0.8, 1.0, 1.25), 0.5);
            score.add("size_score", score_triangular(w, 8.0, 16.0, 30.0), 0.5);
            let final_score = score.value() * 0.6;
            if final_score < 0.25 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::LoosePartSymbol,
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
        Ok(LoosePartSymbol {
            bbox: candidate.bbox,
        }
        .into())
    }
}

/// Classifier for the sparkle decoration over shiny parts.
#[derive(Debug, Default)]
pub struct ShineClassifier;

impl LabelClassifier for ShineClassifier {
    fn output(&self) -> Label {
        Label::Shine
    }

    fn requires(&self) -> &'static [Label] {
        &[Label::PartImage]
    }

    fn score(&self, _ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()> {
        let page = result.page().clone();
        // Shines overlap the top-right corner of a part image.
        let image_boxes: Vec<_> = result
            .scored_candidates(Label::PartImage)
            .iter()
            .map(|c| c.bbox)
            .collect();

        let mut candidates = Vec::new();
        for block in page.drawing_blocks() {
            let bbox = block.bbox();
            let (w, h) = (bbox.width(), bbox.height());
            if w <= 0.0 || h <= 0.0 || w > 20.0 || h > 20.0 {
                continue;
            }
            let (cx, cy) = bbox.center();
            let over_image_corner = image_boxes.iter().any(|image| {
                let corner_x = image.x1;
                let corner_y = image.y0;
                ((cx - corner_x).powi(2) + (cy - corner_y).powi(2)).sqrt() <= 15.0
            });
            if !over_image_corner {
                continue;
            }

            let mut score = WeightedScore::new();
            score.add("size_score", score_triangular(w.max(h), 2.0, 8.0, 20.0), 1.0);
            let final_score = score.value() * 0.55;
            if final_score < 0.2 {
                continue;
            }
            candidates.push(Candidate::atomic(
                Label::Shine,
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
        Ok(Shine {
            bbox: candidate.bbox,
        }
        .into())
    }
}
