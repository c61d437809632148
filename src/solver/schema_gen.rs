//! Schema-driven structural constraint generation.
//!
//! Walks the element schema tables and every candidate's score-detail
//! child references to emit the structural constraints automatically:
//! parent-child coupling with the cardinality the field declares,
//! uniqueness rules, minimum child counts, orphan prevention, and
//! per-page singletons. Classifiers only declare *semantic* constraints
//! beyond these.
//!
//! Child references are matched to schema fields by **element type**, not
//! by field name: a reference whose target is `PartCount` binds to the
//! field of type `PartCount` whatever the field is called.

use std::collections::BTreeMap;

use tracing::debug;

use crate::classifier::candidate::CandidateId;
use crate::classifier::result::ClassificationResult;
use crate::core::label::Label;
use crate::domain::schema::{Assignment, ConstraintRule, ElementType, FieldKind};
use crate::solver::model::{ChildCardinality, ConstraintModel};

/// Generates structural constraints for every label with candidates.
pub fn generate_all(model: &mut ConstraintModel, result: &ClassificationResult) {
    for label in Label::ALL {
        generate_for_label(label, model, result);
    }
}

/// Generates structural constraints for one label's candidates.
pub fn generate_for_label(label: Label, model: &mut ConstraintModel, result: &ClassificationResult) {
    let element_type = ElementType::for_label(label);
    let candidates: Vec<CandidateId> = result
        .candidates_for(label)
        .iter()
        .copied()
        .filter(|id| model.has_candidate(*id))
        .collect();
    if candidates.is_empty() {
        return;
    }
    debug!(
        label = %label,
        candidates = candidates.len(),
        "generating schema constraints"
    );

    generate_field_constraints(element_type, &candidates, model, result);
    generate_rule_constraints(element_type, &candidates, model, result);
}

/// Emits parent-child coupling per schema field.
///
/// Composite candidates reference the children a specific interpretation
/// is built from, so a referenced child is required for *that* candidate
/// even when the field is optional at the domain layer; optionality is
/// expressed by emitting a sibling variant without the child. Sequence
/// fields are left to `min_count` rules.
fn generate_field_constraints(
    element_type: ElementType,
    candidates: &[CandidateId],
    model: &mut ConstraintModel,
    result: &ClassificationResult,
) {
    for field in element_type.fields() {
        if field.assignment == Assignment::Spatial {
            // Bound post-solve by spatial matching.
            continue;
        }
        // A child candidate serves at most one parent: block exclusivity
        // covers the blocks, this covers the candidate level, where
        // several composites can reference the same child.
        let mut parents_by_child: BTreeMap<CandidateId, Vec<CandidateId>> = BTreeMap::new();
        for parent in candidates {
            let Some(candidate) = result.candidate(*parent) else {
                continue;
            };
            let refs: Vec<CandidateId> = candidate
                .score_details
                .child_refs_of(field.child)
                .into_iter()
                .map(|r| r.id)
                .filter(|id| model.has_candidate(*id))
                .collect();
            for child in &refs {
                parents_by_child.entry(*child).or_default().push(*parent);
            }
            match field.kind {
                FieldKind::Required => {
                    // A required child must exist; no references means the
                    // parent is unbuildable.
                    model.if_selected_then(*parent, &refs, ChildCardinality::ExactlyOne);
                }
                FieldKind::Optional => {
                    if !refs.is_empty() {
                        model.if_selected_then(*parent, &refs, ChildCardinality::ExactlyOne);
                    }
                }
                FieldKind::Sequence => {
                    // Zero or more; min_count rules bound it from below.
                }
            }
        }
        for (_, parents) in parents_by_child {
            if parents.len() > 1 {
                model.at_most_one_of(&parents);
            }
        }
    }
}

/// Emits the semantic rules declared in the schema tables.
fn generate_rule_constraints(
    element_type: ElementType,
    candidates: &[CandidateId],
    model: &mut ConstraintModel,
    result: &ClassificationResult,
) {
    for rule in element_type.constraint_rules() {
        match rule {
            ConstraintRule::UniqueBy { field } => {
                add_uniqueness_constraint(element_type, field, candidates, model, result);
            }
            ConstraintRule::MinCount { field, min } => {
                add_min_count_constraint(element_type, field, *min, candidates, model, result);
            }
            ConstraintRule::NoOrphans { parent } => {
                let parent_label = parent.label().expect("orphan parents have classifiers");
                let parents: Vec<CandidateId> = result
                    .candidates_for(parent_label)
                    .iter()
                    .copied()
                    .filter(|id| model.has_candidate(*id))
                    .collect();
                model.if_any_selected_then_one_of(candidates, &parents);
            }
            ConstraintRule::SingletonPerPage => {
                model.at_most_one_of(candidates);
            }
            ConstraintRule::UniqueValue => {
                let mut by_value: BTreeMap<i64, Vec<CandidateId>> = BTreeMap::new();
                for id in candidates {
                    let value = result
                        .candidate(*id)
                        .and_then(|c| c.score_details.numeric_value());
                    if let Some(value) = value {
                        by_value.entry(value).or_default().push(*id);
                    }
                }
                for (_, group) in by_value {
                    if group.len() > 1 {
                        model.at_most_one_of(&group);
                    }
                }
            }
        }
    }
}

/// At most one selected parent per distinct value of the named child
/// field.
fn add_uniqueness_constraint(
    element_type: ElementType,
    field_name: &str,
    candidates: &[CandidateId],
    model: &mut ConstraintModel,
    result: &ClassificationResult,
) {
    let Some(field) = element_type.fields().iter().find(|f| f.name == field_name) else {
        return;
    };
    let mut by_value: BTreeMap<i64, Vec<CandidateId>> = BTreeMap::new();
    for parent in candidates {
        let Some(candidate) = result.candidate(*parent) else {
            continue;
        };
        let refs = candidate.score_details.child_refs_of(field.child);
        let Some(first) = refs.first() else {
            continue;
        };
        let value = result
            .candidate(first.id)
            .and_then(|child| child.score_details.numeric_value());
        if let Some(value) = value {
            by_value.entry(value).or_default().push(*parent);
        }
    }
    for (value, group) in &by_value {
        if group.len() > 1 {
            debug!(field = field_name, value, group = group.len(), "uniqueness");
            model.at_most_one_of(group);
        }
    }
}

/// If the parent is selected, at least `min` referenced children must be
/// selected.
fn add_min_count_constraint(
    element_type: ElementType,
    field_name: &str,
    min: u32,
    candidates: &[CandidateId],
    model: &mut ConstraintModel,
    result: &ClassificationResult,
) {
    let Some(field) = element_type.fields().iter().find(|f| f.name == field_name) else {
        return;
    };
    for parent in candidates {
        let Some(candidate) = result.candidate(*parent) else {
            continue;
        };
        let refs: Vec<CandidateId> = candidate
            .score_details
            .child_refs_of(field.child)
            .into_iter()
            .map(|r| r.id)
            .filter(|id| model.has_candidate(*id))
            .collect();
        model.if_selected_then(*parent, &refs, ChildCardinality::AtLeast(min));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::candidate::{Candidate, ChildRef, ScoreDetails};
    use crate::core::blocks::{Block, PageData};
    use crate::core::geometry::BBox;
    use crate::solver::model::candidate_weight;

    fn bb() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    fn page(n_texts: u32) -> PageData {
        let blocks = (0..n_texts)
            .map(|i| Block::text_block(i, bb(), format!("{}", i + 1), 20.0))
            .collect();
        PageData::new(1, 600.0, 840.0, blocks).unwrap()
    }

    fn step_number(result: &mut ClassificationResult, value: i64, block: u32) -> CandidateId {
        result
            .add_candidate(Candidate::atomic(
                Label::StepNumber,
                bb(),
                0.8,
                ScoreDetails::TextMatch {
                    components: vec![],
                    numeric_value: Some(value),
                    text: value.to_string(),
                },
                vec![block],
            ))
            .unwrap()
    }

    fn step(result: &mut ClassificationResult, number: CandidateId, score: f64) -> CandidateId {
        result
            .add_candidate(Candidate::composite(
                Label::Step,
                bb(),
                score,
                ScoreDetails::Step {
                    number: ChildRef {
                        label: Label::StepNumber,
                        id: number,
                        target: ElementType::StepNumber,
                    },
                    parts_list: None,
                    proximity_score: 0.0,
                    alignment_score: 0.0,
                },
            ))
            .unwrap()
    }

    fn register_all(model: &mut ConstraintModel, result: &ClassificationResult) {
        for candidate in result.all_candidates() {
            model.add_candidate(
                candidate.id(),
                candidate_weight(candidate.score, candidate.source_blocks.len(), 50),
            );
        }
    }

    #[test]
    fn test_required_child_coupling() {
        let mut result = ClassificationResult::new(page(1));
        let number = step_number(&mut result, 1, 0);
        let parent = step(&mut result, number, 0.9);

        let mut model = ConstraintModel::new();
        register_all(&mut model, &result);
        generate_all(&mut model, &result);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        // Selecting the step forces its step number.
        assert!(outcome.selected.contains(&parent));
        assert!(outcome.selected.contains(&number));
    }

    #[test]
    fn test_uniqueness_by_step_value() {
        let mut result = ClassificationResult::new(page(2));
        // Two step numbers with the same value (different blocks), each
        // wrapped in a step candidate.
        let n1 = step_number(&mut result, 2, 0);
        let n2 = step_number(&mut result, 2, 1);
        let s1 = step(&mut result, n1, 0.9);
        let s2 = step(&mut result, n2, 0.8);

        let mut model = ConstraintModel::new();
        register_all(&mut model, &result);
        generate_all(&mut model, &result);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        let both = outcome.selected.contains(&s1) && outcome.selected.contains(&s2);
        assert!(!both, "steps with equal values must not both be selected");
        assert!(outcome.selected.contains(&s1));
    }

    #[test]
    fn test_orphan_prevention_for_arrows() {
        let mut result = ClassificationResult::new(page(1));
        let arrow = result
            .add_candidate(Candidate::atomic(
                Label::Arrow,
                bb(),
                0.9,
                ScoreDetails::Shape { components: vec![] },
                vec![0],
            ))
            .unwrap();

        let mut model = ConstraintModel::new();
        register_all(&mut model, &result);
        generate_all(&mut model, &result);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        // No step candidate exists, so the arrow cannot be selected.
        assert!(!outcome.selected.contains(&arrow));
    }

    #[test]
    fn test_min_count_blocks_empty_parts_list() {
        let mut result = ClassificationResult::new(page(1));
        let empty_list = result
            .add_candidate(Candidate::composite(
                Label::PartsList,
                bb(),
                0.9,
                ScoreDetails::PartsList {
                    count_score: 0.5,
                    coverage_score: 0.5,
                    parts: vec![],
                },
            ))
            .unwrap();

        let mut model = ConstraintModel::new();
        register_all(&mut model, &result);
        generate_all(&mut model, &result);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        assert!(!outcome.selected.contains(&empty_list));
    }

    #[test]
    fn test_singleton_page_number() {
        let mut result = ClassificationResult::new(page(2));
        let a = result
            .add_candidate(Candidate::atomic(
                Label::PageNumber,
                bb(),
                0.9,
                ScoreDetails::TextMatch {
                    components: vec![],
                    numeric_value: Some(1),
                    text: "1".into(),
                },
                vec![0],
            ))
            .unwrap();
        let b = result
            .add_candidate(Candidate::atomic(
                Label::PageNumber,
                bb(),
                0.8,
                ScoreDetails::TextMatch {
                    components: vec![],
                    numeric_value: Some(2),
                    text: "2".into(),
                },
                vec![1],
            ))
            .unwrap();

        let mut model = ConstraintModel::new();
        register_all(&mut model, &result);
        generate_all(&mut model, &result);
        let outcome = model.solve(None);
        assert!(outcome.selected.contains(&a));
        assert!(!outcome.selected.contains(&b));
    }
}
