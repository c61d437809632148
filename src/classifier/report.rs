//! The classification report: the debug and golden-file surface.
//!
//! Reports expose everything classification considered, not just what
//! won: every candidate with its score, state and rejection reason, the
//! consumed and unprocessed block sets, and the solver's statistics.

use serde::{Deserialize, Serialize};

use crate::classifier::candidate::{CandidateId, CandidateState, ScoreDetails};
use crate::classifier::result::ClassificationResult;
use crate::core::blocks::BlockId;
use crate::core::geometry::BBox;
use crate::core::label::Label;
use crate::domain::schema::ElementType;

/// One candidate's entry in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub id: CandidateId,
    pub label: Label,
    pub target: ElementType,
    pub bbox: BBox,
    pub score: f64,
    pub score_details: ScoreDetails,
    pub source_blocks: Vec<BlockId>,
    /// Whether this candidate was selected and built.
    pub is_winner: bool,
    pub state: CandidateState,
    /// Why the candidate lost, when it did.
    pub failure_reason: Option<String>,
}

/// Solver statistics for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    /// Whether the constraint solver ran (vs. pure greedy selection).
    pub used_solver: bool,
    pub feasible: bool,
    /// Whether the solution was proven optimal within the time budget.
    pub optimal: bool,
    pub objective: i64,
    /// How many build-failure re-solves were needed.
    pub retries: u32,
}

/// Everything classification learned about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub page_index: u32,
    pub candidates: Vec<CandidateReport>,
    pub consumed_blocks: Vec<BlockId>,
    pub unprocessed_blocks: Vec<BlockId>,
    pub warnings: Vec<String>,
    pub solver: SolverReport,
}

impl ClassificationReport {
    /// Builds the report from final classification state.
    pub fn from_result(result: &ClassificationResult, solver: SolverReport) -> Self {
        let candidates = result
            .all_candidates()
            .iter()
            .map(|candidate| {
                let id = candidate.id();
                let state = result.state(id);
                CandidateReport {
                    id,
                    label: candidate.label,
                    target: candidate.target,
                    bbox: candidate.bbox,
                    score: candidate.score,
                    score_details: candidate.score_details.clone(),
                    source_blocks: candidate.source_blocks.clone(),
                    is_winner: state == CandidateState::Built,
                    state,
                    failure_reason: result.failure(id).map(String::from),
                }
            })
            .collect();
        Self {
            page_index: result.page().page_index(),
            candidates,
            consumed_blocks: result.consumed_blocks().iter().copied().collect(),
            unprocessed_blocks: result.unprocessed_blocks(),
            warnings: result.warnings().to_vec(),
            solver,
        }
    }

    /// Candidate entries for one label.
    pub fn candidates_for(&self, label: Label) -> Vec<&CandidateReport> {
        self.candidates.iter().filter(|c| c.label == label).collect()
    }

    /// The winning candidates, in id order.
    pub fn winners(&self) -> Vec<&CandidateReport> {
        self.candidates.iter().filter(|c| c.is_winner).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::candidate::Candidate;
    use crate::core::blocks::{Block, PageData};
    use crate::domain::elements::PageNumber;
    use std::collections::BTreeSet;

    #[test]
    fn test_report_reflects_result_state() {
        let bb = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let page = PageData::new(
            2,
            600.0,
            840.0,
            vec![Block::text_block(0, bb, "2", 12.0), Block::text_block(1, bb, "2", 9.0)],
        )
        .unwrap();
        let mut result = ClassificationResult::new(page);
        let details = |text: &str| ScoreDetails::TextMatch {
            components: vec![],
            numeric_value: Some(2),
            text: text.into(),
        };
        let winner = result
            .add_candidate(Candidate::atomic(
                Label::PageNumber,
                bb,
                0.9,
                details("2"),
                vec![0],
            ))
            .unwrap();
        let loser = result
            .add_candidate(Candidate::atomic(
                Label::StepNumber,
                bb,
                0.6,
                details("2"),
                vec![1],
            ))
            .unwrap();
        result.set_selected(BTreeSet::from([winner]));
        result.record_built(winner, PageNumber { bbox: bb, value: 2 }.into());
        result.record_failure(loser, "not selected by solver");
        result.add_warning("example warning");

        let report = ClassificationReport::from_result(
            &result,
            SolverReport {
                used_solver: true,
                feasible: true,
                optimal: true,
                objective: 950,
                retries: 0,
            },
        );
        assert_eq!(report.page_index, 2);
        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.winners().len(), 1);
        assert!(report.winners()[0].is_winner);
        let losers = report.candidates_for(Label::StepNumber);
        assert_eq!(
            losers[0].failure_reason.as_deref(),
            Some("not selected by solver")
        );
        assert_eq!(report.consumed_blocks, vec![0]);
        assert_eq!(report.unprocessed_blocks, vec![1]);
        assert_eq!(report.warnings, vec!["example warning".to_string()]);

        // The report is the golden-file surface; it must round-trip.
        let json = serde_json::to_string(&report).unwrap();
        let back: ClassificationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
