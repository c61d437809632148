//! Candidates: scored, possibly-selectable interpretations of blocks.
//!
//! A candidate records how plausibly some blocks form a specific element.
//! Atomic candidates wrap the block(s) they would consume; composite
//! candidates carry no source blocks at all; their children own the
//! provenance, which is what keeps block exclusivity enforced exactly once
//! in the solver. Candidates reference each other by `(label, id)` pairs,
//! never by pointer, so results clone and serialize cheaply.

use serde::{Deserialize, Serialize};

use crate::core::blocks::BlockId;
use crate::core::geometry::BBox;
use crate::core::label::Label;
use crate::domain::schema::ElementType;

/// Stable identifier of a candidate within one page's classification.
///
/// Ids are assigned in insertion order, which makes them the deterministic
/// tie-break for equal scores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CandidateId(pub u32);

/// A reference to a child candidate, stored inside score details.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    pub label: Label,
    pub id: CandidateId,
    /// Element type the child would build; the schema constraint generator
    /// matches this against field declarations.
    pub target: ElementType,
}

/// One named component of a candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub score: f64,
}

impl ScoreComponent {
    /// Creates a component.
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Which subset of adjacent content an open-bag candidate claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenBagVariant {
    /// Only the open-bag glyph itself.
    Conservative,
    /// The glyph plus the cluster of adjacent part images.
    Greedy,
}

/// Classifier-specific scoring record attached to each candidate.
///
/// Composite variants embed [`ChildRef`]s; the schema constraint generator
/// reads them through [`ScoreDetails::child_refs`] to emit parent-child
/// coupling constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreDetails {
    /// A text block matched against a pattern and font-size hints.
    TextMatch {
        components: Vec<ScoreComponent>,
        /// Parsed numeric value, when the pattern has one. Used for
        /// uniqueness constraints and page assembly.
        numeric_value: Option<i64>,
        text: String,
    },
    /// A drawing or image scored on intrinsic shape properties.
    Shape { components: Vec<ScoreComponent> },
    /// An image wrapped as a part-image candidate with a flat base score.
    PartImage { base: f64 },
    /// A part: count below image, with optional catalog metadata.
    PartPair {
        /// Vertical gap between image bottom and count top.
        distance: f64,
        /// Horizontal offset between the left edges.
        alignment_offset: f64,
        count: ChildRef,
        image: ChildRef,
        number: Option<ChildRef>,
        length: Option<ChildRef>,
    },
    /// A parts-list container with the parts found inside it.
    PartsList {
        count_score: f64,
        coverage_score: f64,
        parts: Vec<ChildRef>,
    },
    /// A step: its number plus an optionally paired parts list. Diagrams
    /// and other graphics are bound post-solve by spatial assignment.
    Step {
        number: ChildRef,
        parts_list: Option<ChildRef>,
        proximity_score: f64,
        alignment_score: f64,
    },
    /// A sub-assembly callout container.
    SubAssembly {
        container_score: f64,
        repeat: Option<ChildRef>,
    },
    /// A numbered step inside a sub-assembly.
    SubStep {
        number: ChildRef,
        proximity_score: f64,
    },
    /// An open-bag glyph, optionally paired with a bag number.
    OpenBag {
        glyph_score: f64,
        variant: OpenBagVariant,
        bag_number: Option<ChildRef>,
    },
}

impl ScoreDetails {
    /// All child references embedded in this record, in declaration order.
    pub fn child_refs(&self) -> Vec<ChildRef> {
        match self {
            ScoreDetails::TextMatch { .. }
            | ScoreDetails::Shape { .. }
            | ScoreDetails::PartImage { .. } => Vec::new(),
            ScoreDetails::PartPair {
                count,
                image,
                number,
                length,
                ..
            } => {
                let mut refs = vec![*count, *image];
                refs.extend(number.iter().copied());
                refs.extend(length.iter().copied());
                refs
            }
            ScoreDetails::PartsList { parts, .. } => parts.clone(),
            ScoreDetails::Step {
                number, parts_list, ..
            } => {
                let mut refs = vec![*number];
                refs.extend(parts_list.iter().copied());
                refs
            }
            ScoreDetails::SubAssembly { repeat, .. } => repeat.iter().copied().collect(),
            ScoreDetails::SubStep { number, .. } => vec![*number],
            ScoreDetails::OpenBag { bag_number, .. } => bag_number.iter().copied().collect(),
        }
    }

    /// Child references whose target matches `child`, in declaration order.
    pub fn child_refs_of(&self, child: ElementType) -> Vec<ChildRef> {
        self.child_refs()
            .into_iter()
            .filter(|r| r.target == child)
            .collect()
    }

    /// The parsed numeric value, for text-backed candidates.
    pub fn numeric_value(&self) -> Option<i64> {
        match self {
            ScoreDetails::TextMatch { numeric_value, .. } => *numeric_value,
            _ => None,
        }
    }

    /// Looks up a named score component.
    pub fn component(&self, name: &str) -> Option<f64> {
        let components = match self {
            ScoreDetails::TextMatch { components, .. } | ScoreDetails::Shape { components } => {
                components
            }
            _ => return None,
        };
        components.iter().find(|c| c.name == name).map(|c| c.score)
    }
}

/// Lifecycle state of a candidate.
///
/// The only legal transitions are `Scored -> Selected -> Built` and
/// `Scored -> Selected -> Failed`; unselected candidates stay `Scored`
/// forever as alternatives for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    Scored,
    Selected,
    Built,
    Failed,
}

/// A scored interpretation of one or more blocks as a specific element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    id: CandidateId,
    pub label: Label,
    /// Element type this candidate would build.
    pub target: ElementType,
    pub bbox: BBox,
    /// Combined score in [0.0, 1.0].
    pub score: f64,
    pub score_details: ScoreDetails,
    /// Blocks this candidate consumes if selected. Empty for composites.
    pub source_blocks: Vec<BlockId>,
}

impl Candidate {
    /// Creates an atomic candidate claiming one or more source blocks.
    ///
    /// The id is assigned when the candidate is added to a
    /// classification result.
    pub fn atomic(
        label: Label,
        bbox: BBox,
        score: f64,
        score_details: ScoreDetails,
        source_blocks: Vec<BlockId>,
    ) -> Self {
        debug_assert!(
            !source_blocks.is_empty(),
            "atomic candidates must claim at least one block"
        );
        Self {
            id: CandidateId(u32::MAX),
            label,
            target: ElementType::for_label(label),
            bbox,
            score,
            score_details,
            source_blocks,
        }
    }

    /// Creates a composite candidate.
    ///
    /// Composites never claim source blocks: their children carry the
    /// provenance, so block exclusivity is enforced exactly once.
    pub fn composite(label: Label, bbox: BBox, score: f64, score_details: ScoreDetails) -> Self {
        Self {
            id: CandidateId(u32::MAX),
            label,
            target: ElementType::for_label(label),
            bbox,
            score,
            score_details,
            source_blocks: Vec::new(),
        }
    }

    /// The candidate's id within its classification result.
    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: CandidateId) {
        self.id = id;
    }

    /// Whether this candidate claims no blocks directly.
    pub fn is_composite(&self) -> bool {
        self.source_blocks.is_empty()
    }

    /// The primary source block (first claimed), for atomic candidates.
    pub fn primary_block(&self) -> Option<BlockId> {
        self.source_blocks.first().copied()
    }
}
