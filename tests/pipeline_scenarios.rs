//! End-to-end scenarios over the full pipeline: literal inputs with
//! expected structured outputs.

use bricklayout::classifier::candidate::{Candidate, ScoreDetails};
use bricklayout::classifier::result::ClassificationResult;
use bricklayout::prelude::*;
use bricklayout::solver::model::{candidate_weight, ConstraintModel};
use bricklayout::solver::schema_gen;

fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
    BBox::new(x0, y0, x1, y1).unwrap()
}

fn pipeline() -> Pipeline {
    Pipeline::new(ClassifierConfig::default(), SolverConfig::default()).unwrap()
}

fn hints_with_step_size(size: f64) -> DocumentHints {
    let mut hints = DocumentHints::empty();
    hints.font_sizes.step_number_size = Some(size);
    hints
}

/// A single page-number text is classified and consumed.
#[test]
fn single_page_number() {
    let page = PageData::new(
        5,
        600.0,
        840.0,
        vec![Block::text_block(0, bb(10.0, 820.0, 25.0, 835.0), "5", 12.0)],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &DocumentHints::empty());

    let page_number = outcome.page.page_number.expect("page number recognized");
    assert_eq!(page_number.value, 5);
    assert_eq!(page_number.bbox, bb(10.0, 820.0, 25.0, 835.0));
    assert_eq!(outcome.report.consumed_blocks, vec![0]);
    assert!(outcome.page.unprocessed_blocks.is_empty());
}

/// Two step-number readings of the same value: uniqueness keeps the one
/// matching the hinted font size, the other stays as an alternative.
#[test]
fn duplicate_step_values_resolved_by_uniqueness() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![
            Block::text_block(0, bb(50.0, 100.0, 70.0, 120.0), "2", 20.0),
            Block::text_block(1, bb(300.0, 300.0, 310.0, 310.0), "2", 10.0),
        ],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &hints_with_step_size(20.0));

    let step_number_reports = outcome.report.candidates_for(Label::StepNumber);
    assert_eq!(step_number_reports.len(), 2);
    let winners: Vec<_> = step_number_reports.iter().filter(|c| c.is_winner).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].source_blocks, vec![0]);
    let loser = step_number_reports
        .iter()
        .find(|c| c.source_blocks == vec![1])
        .unwrap();
    assert!(!loser.is_winner);

    // The winning step number surfaces through exactly one step.
    assert_eq!(outcome.page.steps.len(), 1);
    assert_eq!(outcome.page.steps[0].step_number.value, 2);
}

/// A parts-list container with two image-over-count entries.
#[test]
fn parts_list_with_two_parts() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![
            Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(1, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
            Block::image(3, bb(160.0, 100.0, 200.0, 140.0)),
            Block::text_block(4, bb(160.0, 144.0, 180.0, 154.0), "3x", 9.0),
        ],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &DocumentHints::empty());

    assert_eq!(outcome.page.parts_lists.len(), 1);
    let parts_list = &outcome.page.parts_lists[0];
    assert_eq!(parts_list.parts.len(), 2);
    assert_eq!(parts_list.parts[0].count.count, 2);
    assert_eq!(parts_list.parts[1].count.count, 3);
    assert_eq!(parts_list.total_items(), 5);
    // Every block is explained: the container, both images, both counts.
    assert_eq!(outcome.report.consumed_blocks, vec![0, 1, 2, 3, 4]);
    assert!(outcome.page.unprocessed_blocks.is_empty());
}

/// Block conflict: the higher-scoring interpretation is materialized, the
/// other stays as an alternative, and block exclusivity holds.
#[test]
fn block_conflict_resolution() {
    let page_data = PageData::new(
        1,
        600.0,
        840.0,
        vec![Block::text_block(0, bb(10.0, 10.0, 30.0, 20.0), "2x", 9.0)],
    )
    .unwrap();
    let mut result = ClassificationResult::new(page_data);
    let details = |value: i64, text: &str| ScoreDetails::TextMatch {
        components: vec![],
        numeric_value: Some(value),
        text: text.into(),
    };
    let part_count = result
        .add_candidate(Candidate::atomic(
            Label::PartCount,
            bb(10.0, 10.0, 30.0, 20.0),
            0.8,
            details(2, "2x"),
            vec![0],
        ))
        .unwrap();
    let bag_number = result
        .add_candidate(Candidate::atomic(
            Label::BagNumber,
            bb(10.0, 10.0, 30.0, 20.0),
            0.7,
            details(2, "2"),
            vec![0],
        ))
        .unwrap();

    let mut model = ConstraintModel::new();
    for candidate in result.all_candidates() {
        model.add_candidate(
            candidate.id(),
            candidate_weight(candidate.score, candidate.source_blocks.len(), 50),
        );
    }
    model.add_block_exclusivity_constraints(&result);
    schema_gen::generate_all(&mut model, &result);
    let outcome = model.solve(None);

    assert!(outcome.feasible);
    assert!(outcome.selected.contains(&part_count));
    assert!(!outcome.selected.contains(&bag_number));
}

/// The same conflict through the full pipeline: a large top-left "2"
/// reads as a bag number and as a step number; the stronger bag reading
/// wins the block, the step reading remains an alternative.
#[test]
fn block_conflict_resolution_through_pipeline() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![Block::text_block(0, bb(20.0, 20.0, 50.0, 60.0), "2", 36.0)],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &hints_with_step_size(20.0));

    let bag_reports = outcome.report.candidates_for(Label::BagNumber);
    let step_reports = outcome.report.candidates_for(Label::StepNumber);
    assert_eq!(bag_reports.len(), 1);
    assert_eq!(step_reports.len(), 1);
    assert!(bag_reports[0].is_winner);
    assert!(!step_reports[0].is_winner);
    // Exactly one winner consumed the block.
    assert_eq!(outcome.report.consumed_blocks, vec![0]);
}

/// Orphan prevention: an arrow with no viable step is not selected and
/// its block stays unprocessed.
#[test]
fn orphaned_arrow_is_not_selected() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![Block::drawing(0, bb(100.0, 100.0, 160.0, 115.0), None)],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &DocumentHints::empty());

    let arrow_reports = outcome.report.candidates_for(Label::Arrow);
    assert!(!arrow_reports.is_empty(), "the drawing scores as an arrow");
    assert!(arrow_reports.iter().all(|c| !c.is_winner));
    assert!(outcome.page.steps.is_empty());
    assert!(outcome.page.standalone_arrows.is_empty());
    assert_eq!(outcome.page.unprocessed_blocks, vec![0]);
}

/// Two steps compete for a single diagram: spatial assignment gives it to
/// the closer step, the other keeps an empty slot.
#[test]
fn two_steps_share_one_diagram() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![
            Block::text_block(0, bb(50.0, 100.0, 70.0, 120.0), "1", 20.0),
            Block::text_block(1, bb(50.0, 400.0, 70.0, 420.0), "2", 20.0),
            Block::drawing(2, bb(80.0, 100.0, 300.0, 300.0), None),
        ],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &hints_with_step_size(20.0));

    assert_eq!(outcome.page.steps.len(), 2);
    let first = &outcome.page.steps[0];
    let second = &outcome.page.steps[1];
    assert_eq!(first.step_number.value, 1);
    assert_eq!(second.step_number.value, 2);
    assert!(first.diagram.is_some(), "closer step gets the diagram");
    assert!(second.diagram.is_none());
    assert!(outcome.page.standalone_diagrams.is_empty());
}

/// Serialization round-trip of the page tree and the report.
#[test]
fn page_and_report_round_trip() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![
            Block::text_block(0, bb(10.0, 820.0, 25.0, 835.0), "1", 12.0),
            Block::drawing(1, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(2, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(3, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
            Block::text_block(4, bb(90.0, 175.0, 110.0, 195.0), "4", 20.0),
        ],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &hints_with_step_size(20.0));

    let page_json = serde_json::to_string(&outcome.page).unwrap();
    let page_back: Page = serde_json::from_str(&page_json).unwrap();
    assert_eq!(outcome.page, page_back);

    let report_json = serde_json::to_string(&outcome.report).unwrap();
    let report_back: ClassificationReport = serde_json::from_str(&report_json).unwrap();
    assert_eq!(outcome.report, report_back);
}

/// A step pairs with the parts list above it and the combined structure
/// consumes the expected blocks.
#[test]
fn step_with_parts_list() {
    let page = PageData::new(
        1,
        600.0,
        840.0,
        vec![
            Block::drawing(0, bb(90.0, 90.0, 260.0, 170.0), None),
            Block::image(1, bb(100.0, 100.0, 140.0, 140.0)),
            Block::text_block(2, bb(100.0, 144.0, 120.0, 154.0), "2x", 9.0),
            Block::text_block(3, bb(90.0, 175.0, 110.0, 195.0), "4", 20.0),
            Block::drawing(4, bb(120.0, 210.0, 400.0, 460.0), None),
        ],
    )
    .unwrap();
    let outcome = pipeline().classify_page(page, &hints_with_step_size(20.0));

    assert_eq!(outcome.page.steps.len(), 1);
    let step = &outcome.page.steps[0];
    assert_eq!(step.step_number.value, 4);
    let parts_list = step.parts_list.as_ref().expect("parts list paired");
    assert_eq!(parts_list.parts.len(), 1);
    assert_eq!(parts_list.parts[0].count.count, 2);
    assert!(step.diagram.is_some(), "the large drawing becomes the diagram");
    // The paired parts list is inside the step, not standalone.
    assert!(outcome.page.parts_lists.is_empty());
    assert_eq!(outcome.report.consumed_blocks, vec![0, 1, 2, 3, 4]);
}

/// External hints: an excluded block is never consumed, and a rejected
/// candidate loses to the next-best interpretation.
#[test]
fn external_hints_exclude_blocks_and_candidates() {
    let page = PageData::new(
        5,
        600.0,
        840.0,
        vec![Block::text_block(0, bb(10.0, 820.0, 25.0, 835.0), "5", 12.0)],
    )
    .unwrap();
    let mut external = ExternalHints::empty();
    external.excluded_blocks.insert(0);
    let outcome =
        pipeline().classify_page_with_hints(page, &DocumentHints::empty(), &external);

    assert!(outcome.page.page_number.is_none());
    assert_eq!(outcome.page.unprocessed_blocks, vec![0]);
    assert!(outcome.report.winners().is_empty());
}

/// Greedy fallback: with the solver disabled, selection is highest score
/// first respecting block exclusivity.
#[test]
fn greedy_fallback_respects_block_exclusivity() {
    let solver_config = SolverConfig {
        use_solver: false,
        ..SolverConfig::default()
    };
    let pipeline = Pipeline::new(ClassifierConfig::default(), solver_config).unwrap();
    let page = PageData::new(
        5,
        600.0,
        840.0,
        vec![Block::text_block(0, bb(10.0, 820.0, 25.0, 835.0), "5", 12.0)],
    )
    .unwrap();
    let outcome = pipeline.classify_page(page, &DocumentHints::empty());

    assert!(!outcome.report.solver.used_solver);
    assert_eq!(
        outcome.page.page_number.as_ref().map(|p| p.value),
        Some(5)
    );
    assert_eq!(outcome.report.consumed_blocks, vec![0]);
}
