//! High-level constraint model over classification candidates.
//!
//! Wraps the boolean optimizer with one decision variable per candidate
//! and the standard constraint shapes the classifiers and the schema
//! generator declare. Scores are scaled to integer weights, and each
//! candidate's weight additionally rewards the source blocks it would
//! consume, which is the unconsumed-block penalty expressed positively:
//! under block exclusivity a block is consumed iff its single claiming
//! candidate is selected.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::classifier::candidate::CandidateId;
use crate::classifier::result::ClassificationResult;
use crate::solver::sat::{BoolModel, SolveStatus, VarId, NO_MAX, NO_MIN};

/// Scale factor from `[0, 1]` scores to integer objective weights.
pub const SCORE_SCALE: f64 = 1000.0;

/// Cardinality of a parent-child coupling constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCardinality {
    /// Parent selected implies exactly one of the children selected.
    ExactlyOne,
    /// Parent selected implies at most one of the children selected.
    AtMostOne,
    /// Parent selected implies at least `min` children selected.
    AtLeast(u32),
}

/// Outcome of a solve over the candidate model.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub feasible: bool,
    /// Whether the solution is provably optimal (false after a timeout).
    pub optimal: bool,
    pub selected: BTreeSet<CandidateId>,
    pub objective: i64,
}

/// Constraint model with one boolean variable per candidate.
#[derive(Debug, Default)]
pub struct ConstraintModel {
    model: BoolModel,
    vars: BTreeMap<CandidateId, VarId>,
    constraint_counts: BTreeMap<&'static str, u32>,
}

impl ConstraintModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a candidate with the given objective weight, returning its
    /// variable. Repeated registration returns the existing variable.
    pub fn add_candidate(&mut self, id: CandidateId, weight: i64) -> VarId {
        if let Some(var) = self.vars.get(&id) {
            return *var;
        }
        let var = self.model.new_var(weight);
        self.vars.insert(id, var);
        var
    }

    /// The variable for a registered candidate.
    ///
    /// Candidates must be registered before constraints reference them.
    pub fn var(&self, id: CandidateId) -> Option<VarId> {
        self.vars.get(&id).copied()
    }

    /// Whether a candidate has been registered.
    pub fn has_candidate(&self, id: CandidateId) -> bool {
        self.vars.contains_key(&id)
    }

    fn track(&mut self, kind: &'static str, count: u32) {
        *self.constraint_counts.entry(kind).or_insert(0) += count;
    }

    /// At most one of the candidates may be selected.
    pub fn at_most_one_of(&mut self, ids: &[CandidateId]) {
        if ids.len() <= 1 {
            return;
        }
        let terms = self.terms(ids);
        self.model.add_range(terms, NO_MIN, 1);
        self.track("at_most_one_of", 1);
    }

    /// Exactly one of the candidates must be selected.
    pub fn exactly_one_of(&mut self, ids: &[CandidateId]) {
        if ids.is_empty() {
            return;
        }
        let terms = self.terms(ids);
        self.model.add_range(terms, 1, 1);
        self.track("exactly_one_of", 1);
    }

    /// The two candidates cannot both be selected.
    pub fn mutually_exclusive(&mut self, a: CandidateId, b: CandidateId) {
        self.at_most_one_of(&[a, b]);
        self.track("mutually_exclusive", 1);
    }

    /// Couples a selected parent to its children with the given
    /// cardinality.
    pub fn if_selected_then(
        &mut self,
        parent: CandidateId,
        children: &[CandidateId],
        cardinality: ChildCardinality,
    ) {
        let Some(parent_var) = self.var(parent) else {
            return;
        };
        if children.is_empty() {
            // An exactly-one/at-least coupling with no child candidates
            // means the parent can never be selected.
            match cardinality {
                ChildCardinality::ExactlyOne | ChildCardinality::AtLeast(_) => {
                    self.model.fix(parent_var, false);
                    self.track("unsatisfiable_parent", 1);
                }
                ChildCardinality::AtMostOne => {}
            }
            return;
        }
        let terms = self.terms(children);
        match cardinality {
            ChildCardinality::ExactlyOne => {
                self.model.add_range_if(parent_var, terms, 1, 1);
            }
            ChildCardinality::AtMostOne => {
                self.model.add_range_if(parent_var, terms, NO_MIN, 1);
            }
            ChildCardinality::AtLeast(min) => {
                self.model
                    .add_range_if(parent_var, terms, i64::from(min), NO_MAX);
            }
        }
        self.track("if_selected_then", 1);
    }

    /// If any candidate in `group` is selected, at least one of `parents`
    /// must be selected. The orphan-prevention primitive.
    pub fn if_any_selected_then_one_of(&mut self, group: &[CandidateId], parents: &[CandidateId]) {
        if group.is_empty() {
            return;
        }
        if parents.is_empty() {
            // No possible parent: the whole group is unselectable.
            for id in group {
                if let Some(var) = self.var(*id) {
                    self.model.fix(var, false);
                }
            }
            self.track("orphans_unselectable", group.len() as u32);
            return;
        }
        let indicator = self.model.new_var(0);
        for id in group {
            if let Some(var) = self.var(*id) {
                // member - indicator <= 0, so selecting a member raises the
                // indicator.
                self.model.add_range(vec![(var, 1), (indicator, -1)], NO_MIN, 0);
            }
        }
        let parent_terms = self.terms(parents);
        self.model.add_range_if(indicator, parent_terms, 1, NO_MAX);
        self.track("if_any_selected_then_one_of", 1);
    }

    /// For every source block, at most one claiming candidate may be
    /// selected. Composites contribute no terms: their children enforce
    /// exclusivity transitively.
    pub fn add_block_exclusivity_constraints(&mut self, result: &ClassificationResult) {
        let mut by_block: BTreeMap<u32, Vec<CandidateId>> = BTreeMap::new();
        for candidate in result.all_candidates() {
            if !self.has_candidate(candidate.id()) {
                continue;
            }
            for block in &candidate.source_blocks {
                by_block.entry(*block).or_default().push(candidate.id());
            }
        }
        let mut count = 0;
        for (block, claimants) in &by_block {
            if claimants.len() > 1 {
                let terms = self.terms(claimants);
                self.model.add_range(terms, NO_MIN, 1);
                count += 1;
                debug!(block, claimants = claimants.len(), "block exclusivity");
            }
        }
        self.track("block_exclusivity", count);
    }

    /// Forbids a candidate's selection (used for build-failure retries).
    pub fn forbid(&mut self, id: CandidateId) {
        if let Some(var) = self.var(id) {
            self.model.fix(var, false);
            self.track("forbidden", 1);
        }
    }

    /// Human-readable summary of the constraints added so far.
    pub fn constraint_summary(&self) -> String {
        if self.constraint_counts.is_empty() {
            return "no constraints".to_string();
        }
        let total: u32 = self.constraint_counts.values().sum();
        let parts: Vec<String> = self
            .constraint_counts
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        format!("{} ({} total)", parts.join(", "), total)
    }

    /// Solves the model, maximizing the weighted objective.
    pub fn solve(&self, deadline: Option<Instant>) -> SolveOutcome {
        info!(
            candidates = self.vars.len(),
            constraints = self.model.num_constraints(),
            "constraint solver starting: {}",
            self.constraint_summary()
        );
        let solution = self.model.solve(deadline);
        match solution.status {
            SolveStatus::Infeasible => {
                warn!("constraint solver found no feasible selection");
                SolveOutcome {
                    feasible: false,
                    optimal: false,
                    selected: BTreeSet::new(),
                    objective: 0,
                }
            }
            status => {
                let selected: BTreeSet<CandidateId> = self
                    .vars
                    .iter()
                    .filter(|(_, var)| solution.values[var.0])
                    .map(|(id, _)| *id)
                    .collect();
                info!(
                    selected = selected.len(),
                    total = self.vars.len(),
                    objective = solution.objective,
                    optimal = status == SolveStatus::Optimal,
                    "constraint solver complete"
                );
                SolveOutcome {
                    feasible: true,
                    optimal: status == SolveStatus::Optimal,
                    selected,
                    objective: solution.objective,
                }
            }
        }
    }

    fn terms(&self, ids: &[CandidateId]) -> Vec<(VarId, i64)> {
        ids.iter()
            .filter_map(|id| self.var(*id))
            .map(|var| (var, 1))
            .collect()
    }
}

/// Computes a candidate's objective weight from its score and provenance.
///
/// `consumption_reward` is `SolverConfig::unconsumed_penalty`: each block a
/// candidate would consume adds this much weight, steering the solver
/// toward solutions that explain more of the page.
pub fn candidate_weight(score: f64, source_block_count: usize, consumption_reward: i64) -> i64 {
    (score * SCORE_SCALE).round() as i64 + consumption_reward * source_block_count as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::candidate::{Candidate, ScoreDetails};
    use crate::core::blocks::{Block, PageData};
    use crate::core::geometry::BBox;
    use crate::core::label::Label;

    fn bb() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    fn result_with_conflict() -> (ClassificationResult, CandidateId, CandidateId) {
        let page = PageData::new(1, 600.0, 840.0, vec![Block::text_block(0, bb(), "2x", 9.0)]).unwrap();
        let mut result = ClassificationResult::new(page);
        let details = |text: &str| ScoreDetails::TextMatch {
            components: vec![],
            numeric_value: Some(2),
            text: text.into(),
        };
        let a = result
            .add_candidate(Candidate::atomic(
                Label::PartCount,
                bb(),
                0.8,
                details("2x"),
                vec![0],
            ))
            .unwrap();
        let b = result
            .add_candidate(Candidate::atomic(
                Label::BagNumber,
                bb(),
                0.7,
                details("2"),
                vec![0],
            ))
            .unwrap();
        (result, a, b)
    }

    #[test]
    fn test_candidate_weight() {
        assert_eq!(candidate_weight(0.8, 1, 50), 850);
        assert_eq!(candidate_weight(0.0, 0, 50), 0);
        assert_eq!(candidate_weight(1.0, 3, 0), 1000);
    }

    #[test]
    fn test_block_exclusivity_resolves_conflict() {
        let (result, a, b) = result_with_conflict();
        let mut model = ConstraintModel::new();
        model.add_candidate(a, candidate_weight(0.8, 1, 50));
        model.add_candidate(b, candidate_weight(0.7, 1, 50));
        model.add_block_exclusivity_constraints(&result);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        assert!(outcome.optimal);
        assert!(outcome.selected.contains(&a));
        assert!(!outcome.selected.contains(&b));
    }

    #[test]
    fn test_exactly_one_coupling_with_missing_children_blocks_parent() {
        let (result, a, _) = result_with_conflict();
        let _ = result;
        let mut model = ConstraintModel::new();
        model.add_candidate(a, 800);
        model.if_selected_then(a, &[], ChildCardinality::ExactlyOne);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        assert!(!outcome.selected.contains(&a));
    }

    #[test]
    fn test_forbid_excludes_candidate() {
        let (result, a, b) = result_with_conflict();
        let mut model = ConstraintModel::new();
        model.add_candidate(a, 850);
        model.add_candidate(b, 750);
        model.add_block_exclusivity_constraints(&result);
        model.forbid(a);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        assert!(!outcome.selected.contains(&a));
        assert!(outcome.selected.contains(&b));
    }

    #[test]
    fn test_orphan_prevention_without_parents() {
        let (_, a, _) = result_with_conflict();
        let mut model = ConstraintModel::new();
        model.add_candidate(a, 900);
        model.if_any_selected_then_one_of(&[a], &[]);
        let outcome = model.solve(None);
        assert!(outcome.feasible);
        assert!(outcome.selected.is_empty());
    }

    #[test]
    fn test_constraint_summary() {
        let (result, a, b) = result_with_conflict();
        let mut model = ConstraintModel::new();
        model.add_candidate(a, 800);
        model.add_candidate(b, 700);
        model.add_block_exclusivity_constraints(&result);
        model.mutually_exclusive(a, b);
        let summary = model.constraint_summary();
        assert!(summary.contains("block_exclusivity=1"));
        assert!(summary.contains("mutually_exclusive=1"));
    }
}
