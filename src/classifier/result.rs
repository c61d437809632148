//! Per-page classification state.
//!
//! [`ClassificationResult`] accumulates everything classification learns
//! about one page: every candidate ever scored (insertion order preserved
//! for deterministic tie-breaks), the solver's selection, built elements,
//! consumed blocks, failure reasons, and warnings. Candidates are never
//! destroyed; losers stay behind as alternatives for debugging and
//! re-evaluation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classifier::candidate::{Candidate, CandidateId, CandidateState};
use crate::core::blocks::{BlockId, PageData};
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::label::Label;
use crate::domain::elements::PageElement;

/// Snapshot of mutable build state, for transactional rollback.
///
/// If a composite build fails partway (after building some children), the
/// driver restores the snapshot so the failed attempt leaves no trace.
#[derive(Debug, Clone)]
pub struct BuildSnapshot {
    built: BTreeMap<CandidateId, PageElement>,
    failures: BTreeMap<CandidateId, String>,
    consumed: BTreeSet<BlockId>,
}

/// Mutable classification state for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    page: PageData,
    candidates: Vec<Candidate>,
    by_label: BTreeMap<Label, Vec<CandidateId>>,
    selected: BTreeSet<CandidateId>,
    built: BTreeMap<CandidateId, PageElement>,
    failures: BTreeMap<CandidateId, String>,
    consumed: BTreeSet<BlockId>,
    warnings: Vec<String>,
}

impl ClassificationResult {
    /// Creates empty state for one page.
    pub fn new(page: PageData) -> Self {
        Self {
            page,
            candidates: Vec::new(),
            by_label: BTreeMap::new(),
            selected: BTreeSet::new(),
            built: BTreeMap::new(),
            failures: BTreeMap::new(),
            consumed: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// The page being classified.
    pub fn page(&self) -> &PageData {
        &self.page
    }

    /// Adds a candidate, assigning its id.
    ///
    /// Validates the score range and that every claimed source block exists
    /// on the page.
    pub fn add_candidate(&mut self, mut candidate: Candidate) -> ClassifyResult<CandidateId> {
        if !(0.0..=1.0).contains(&candidate.score) {
            return Err(ClassifyError::invalid_input(format!(
                "candidate score {} for label '{}' outside [0.0, 1.0]",
                candidate.score, candidate.label
            )));
        }
        for block_id in &candidate.source_blocks {
            if self.page.block(*block_id).is_none() {
                return Err(ClassifyError::invalid_input(format!(
                    "candidate for label '{}' claims unknown block {}",
                    candidate.label, block_id
                )));
            }
        }
        let id = CandidateId(self.candidates.len() as u32);
        candidate.assign_id(id);
        self.by_label
            .entry(candidate.label)
            .or_default()
            .push(id);
        self.candidates.push(candidate);
        Ok(id)
    }

    /// Looks up a candidate by id.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(id.0 as usize)
    }

    /// All candidates, in insertion order.
    pub fn all_candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidate ids for a label, in insertion order.
    pub fn candidates_for(&self, label: Label) -> &[CandidateId] {
        self.by_label.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scored candidates of a label that have not failed, sorted by score
    /// descending with insertion order as the tie-break.
    ///
    /// This is the accessor dependency classifiers use: downstream
    /// classifiers work with candidates, never with built elements.
    pub fn scored_candidates(&self, label: Label) -> Vec<&Candidate> {
        let mut list: Vec<&Candidate> = self
            .candidates_for(label)
            .iter()
            .filter_map(|id| self.candidate(*id))
            .filter(|c| !self.failures.contains_key(&c.id()))
            .collect();
        list.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id().cmp(&b.id())));
        list
    }

    /// Marks a set of candidates as selected by the solver.
    pub fn set_selected(&mut self, ids: BTreeSet<CandidateId>) {
        self.selected = ids;
    }

    /// The currently selected candidate ids.
    pub fn selected(&self) -> &BTreeSet<CandidateId> {
        &self.selected
    }

    /// Whether a candidate is selected.
    pub fn is_selected(&self, id: CandidateId) -> bool {
        self.selected.contains(&id)
    }

    /// The lifecycle state of a candidate.
    pub fn state(&self, id: CandidateId) -> CandidateState {
        if self.built.contains_key(&id) {
            CandidateState::Built
        } else if self.failures.contains_key(&id) {
            CandidateState::Failed
        } else if self.selected.contains(&id) {
            CandidateState::Selected
        } else {
            CandidateState::Scored
        }
    }

    /// Records a built element for a candidate and consumes its blocks.
    pub fn record_built(&mut self, id: CandidateId, element: PageElement) {
        if let Some(candidate) = self.candidate(id) {
            let blocks: Vec<BlockId> = candidate.source_blocks.clone();
            self.consumed.extend(blocks);
        }
        self.built.insert(id, element);
    }

    /// The built element for a candidate, when one exists.
    pub fn built(&self, id: CandidateId) -> Option<&PageElement> {
        self.built.get(&id)
    }

    /// All built elements keyed by candidate id.
    pub fn built_elements(&self) -> &BTreeMap<CandidateId, PageElement> {
        &self.built
    }

    /// Marks a candidate as failed with a reason. The first reason wins.
    pub fn record_failure(&mut self, id: CandidateId, reason: impl Into<String>) {
        self.failures.entry(id).or_insert_with(|| reason.into());
    }

    /// The failure reason for a candidate, when one was recorded.
    pub fn failure(&self, id: CandidateId) -> Option<&str> {
        self.failures.get(&id).map(String::as_str)
    }

    /// Whether a block has been consumed by a built candidate.
    pub fn is_consumed(&self, block: BlockId) -> bool {
        self.consumed.contains(&block)
    }

    /// The set of consumed block ids.
    pub fn consumed_blocks(&self) -> &BTreeSet<BlockId> {
        &self.consumed
    }

    /// Block ids no built candidate consumed.
    pub fn unprocessed_blocks(&self) -> Vec<BlockId> {
        self.page
            .blocks()
            .iter()
            .map(|b| b.id())
            .filter(|id| !self.consumed.contains(id))
            .collect()
    }

    /// Adds a warning message.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// All warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Takes a snapshot of the mutable build state.
    pub fn snapshot(&self) -> BuildSnapshot {
        BuildSnapshot {
            built: self.built.clone(),
            failures: self.failures.clone(),
            consumed: self.consumed.clone(),
        }
    }

    /// Restores a previously taken snapshot.
    pub fn restore(&mut self, snapshot: BuildSnapshot) {
        self.built = snapshot.built;
        self.failures = snapshot.failures;
        self.consumed = snapshot.consumed;
    }

    /// Clears everything derived from the previous selection, keeping
    /// candidates and warnings.
    ///
    /// Used when a build failure forces a re-solve: stale failure marks
    /// from the aborted build pass are discarded too, and the driver
    /// re-records reasons for the candidates it excludes.
    pub fn reset_for_resolve(&mut self) {
        self.selected.clear();
        self.built.clear();
        self.consumed.clear();
        self.failures.clear();
    }

    /// All candidates whose source blocks include `block`.
    pub fn candidates_for_block(&self, block: BlockId) -> Vec<&Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.source_blocks.contains(&block))
            .collect()
    }
}
