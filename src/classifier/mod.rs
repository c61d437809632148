//! The classification framework: candidates, results, classifiers, and
//! the per-page pipeline.

pub mod candidate;
pub mod classifiers;
pub mod pipeline;
pub mod report;
pub mod result;

use std::collections::BTreeMap;

use crate::classifier::candidate::{Candidate, CandidateId, ChildRef};
use crate::classifier::result::ClassificationResult;
use crate::core::config::ClassifierConfig;
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::domain::elements::PageElement;
use crate::domain::hints::DocumentHints;
use crate::solver::model::ConstraintModel;

pub use candidate::{CandidateState, OpenBagVariant, ScoreComponent, ScoreDetails};
pub use pipeline::{ExternalHints, PageOutcome, Pipeline};
pub use report::{CandidateReport, ClassificationReport, SolverReport};

/// Read-only context available during the scoring phase.
pub struct ScoreCtx<'a> {
    /// Document-level hints, shared read-only across pages.
    pub hints: &'a DocumentHints,
    /// Pipeline configuration.
    pub config: &'a ClassifierConfig,
}

/// Contract every label classifier implements.
///
/// A classifier scores candidates for exactly one label and builds the
/// elements for the candidates the solver selects. Scoring reads the page,
/// the hints, and candidates of its `requires` labels; it must evaluate
/// intrinsic properties and structural opportunity without pre-assigning
/// specific children; child binding is the solver's job.
pub trait LabelClassifier: Send + Sync {
    /// The label this classifier produces.
    fn output(&self) -> Label;

    /// Labels whose candidates must exist before this classifier scores.
    fn requires(&self) -> &'static [Label];

    /// Scores candidates for this label into the result.
    fn score(&self, ctx: &ScoreCtx<'_>, result: &mut ClassificationResult) -> ClassifyResult<()>;

    /// Builds the element for a selected candidate.
    ///
    /// Composite classifiers build their children through
    /// [`BuildCtx::build`]; a missing child surfaces as a build failure
    /// which the driver converts into a re-solve.
    fn build(&self, candidate: &Candidate, ctx: &mut BuildCtx<'_>) -> ClassifyResult<PageElement>;

    /// Declares semantic constraints beyond the schema-generated ones.
    fn declare_constraints(&self, _model: &mut ConstraintModel, _result: &ClassificationResult) {}
}

/// Mutable context for the build phase.
///
/// Owns the recursion: building a composite builds its children first,
/// with snapshot rollback making each top-level build transactional.
pub struct BuildCtx<'a> {
    classifiers: &'a BTreeMap<Label, Box<dyn LabelClassifier>>,
    /// The per-page classification state.
    pub result: &'a mut ClassificationResult,
}

impl<'a> BuildCtx<'a> {
    pub(crate) fn new(
        classifiers: &'a BTreeMap<Label, Box<dyn LabelClassifier>>,
        result: &'a mut ClassificationResult,
    ) -> Self {
        Self {
            classifiers,
            result,
        }
    }

    /// Builds a candidate, memoized and transactional.
    ///
    /// Fails when the candidate was not selected, already failed, or
    /// claims an already-consumed block; on failure all state changes made
    /// during the attempt are rolled back.
    pub fn build(&mut self, id: CandidateId) -> ClassifyResult<PageElement> {
        if let Some(element) = self.result.built(id) {
            return Ok(element.clone());
        }
        if let Some(reason) = self.result.failure(id) {
            return Err(ClassifyError::build_failed(id, reason.to_string()));
        }
        let Some(candidate) = self.result.candidate(id).cloned() else {
            return Err(ClassifyError::invalid_input(format!(
                "unknown candidate {:?}",
                id
            )));
        };
        if !self.result.is_selected(id) {
            let reason = "not selected".to_string();
            self.result.record_failure(id, reason.clone());
            return Err(ClassifyError::build_failed(id, reason));
        }
        for block in &candidate.source_blocks {
            if self.result.is_consumed(*block) {
                let reason = format!("block {} already consumed", block);
                self.result.record_failure(id, reason.clone());
                return Err(ClassifyError::build_failed(id, reason));
            }
        }
        let Some(classifier) = self.classifiers.get(&candidate.label) else {
            return Err(ClassifyError::config_error(format!(
                "no classifier registered for label '{}'",
                candidate.label
            )));
        };

        let snapshot = self.result.snapshot();
        match classifier.build(&candidate, self) {
            Ok(element) => {
                self.result.record_built(id, element.clone());
                Ok(element)
            }
            Err(err) => {
                self.result.restore(snapshot);
                self.result.record_failure(id, err.to_string());
                // Propagate the innermost failing candidate so the driver
                // forbids the root cause, not just the composite.
                match err {
                    ClassifyError::BuildFailed { candidate, reason } => {
                        Err(ClassifyError::BuildFailed { candidate, reason })
                    }
                    other => Err(ClassifyError::build_failed(id, other.to_string())),
                }
            }
        }
    }

    /// Builds the candidate behind a child reference.
    pub fn build_child(&mut self, child: &ChildRef) -> ClassifyResult<PageElement> {
        self.build(child.id)
    }
}
