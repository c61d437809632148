//! Static schema tables for the element tree.
//!
//! Rust has no run-time reflection over struct fields, so the schema
//! constraint generator works from these tables instead: every element type
//! declares its child fields (with cardinality and assignment mode) and its
//! semantic constraint rules. Child references inside candidate score
//! details are matched against these tables **by element type**, not by
//! field name.

use serde::{Deserialize, Serialize};

use crate::core::label::Label;

/// Run-time tag identifying an element type.
///
/// This is the crate's stand-in for the generic parameter `T` of a typed
/// candidate: each candidate carries the `ElementType` it would build, and
/// the constraint generator indexes schema fields by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Page,
    PageNumber,
    Step,
    StepNumber,
    SubstepNumber,
    PartsList,
    Part,
    PartCount,
    PartImage,
    PartNumber,
    PieceLength,
    Diagram,
    Arrow,
    RotationSymbol,
    SubAssembly,
    SubStep,
    BagNumber,
    OpenBag,
    ProgressBar,
    ProgressBarIndicator,
    Divider,
    Background,
    LoosePartSymbol,
    Shine,
}

/// Cardinality of a child field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Exactly one child; the parent cannot exist without it.
    Required,
    /// At most one child.
    Optional,
    /// Zero or more children.
    Sequence,
}

/// How a child field is bound to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// Bound at solve time through score-detail references.
    Reference,
    /// Bound after solving by spatial matching; the solver ignores the
    /// field entirely.
    Spatial,
}

/// Declares one child field of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name in the element struct.
    pub name: &'static str,
    /// Element type of the children.
    pub child: ElementType,
    pub kind: FieldKind,
    pub assignment: Assignment,
}

impl FieldSpec {
    const fn referenced(name: &'static str, child: ElementType, kind: FieldKind) -> Self {
        Self {
            name,
            child,
            kind,
            assignment: Assignment::Reference,
        }
    }

    const fn spatial(name: &'static str, child: ElementType, kind: FieldKind) -> Self {
        Self {
            name,
            child,
            kind,
            assignment: Assignment::Spatial,
        }
    }
}

/// A semantic constraint rule attached to an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRule {
    /// At most one selected candidate per distinct value of the named
    /// child field's numeric value.
    UniqueBy { field: &'static str },
    /// If the parent is selected, at least `min` children of the named
    /// field must be selected.
    MinCount { field: &'static str, min: u32 },
    /// If any candidate of this type is selected, at least one candidate
    /// of the parent type must be selected too.
    NoOrphans { parent: ElementType },
    /// At most one selected candidate of this type per page.
    SingletonPerPage,
    /// At most one selected candidate of this type per distinct parsed
    /// value (e.g. two step numbers both reading "2").
    UniqueValue,
}

impl ElementType {
    /// Child field declarations for this element type.
    pub fn fields(&self) -> &'static [FieldSpec] {
        const PAGE_FIELDS: &[FieldSpec] = &[
            FieldSpec::spatial("page_number", ElementType::PageNumber, FieldKind::Optional),
            FieldSpec::spatial("steps", ElementType::Step, FieldKind::Sequence),
            FieldSpec::spatial("parts_lists", ElementType::PartsList, FieldKind::Sequence),
            FieldSpec::spatial("open_bags", ElementType::OpenBag, FieldKind::Sequence),
            FieldSpec::spatial("progress_bar", ElementType::ProgressBar, FieldKind::Optional),
            FieldSpec::spatial("background", ElementType::Background, FieldKind::Optional),
            FieldSpec::spatial("dividers", ElementType::Divider, FieldKind::Sequence),
        ];
        const STEP_FIELDS: &[FieldSpec] = &[
            FieldSpec::referenced(
                "step_number",
                ElementType::StepNumber,
                FieldKind::Required,
            ),
            FieldSpec::referenced("parts_list", ElementType::PartsList, FieldKind::Optional),
            FieldSpec::spatial("diagram", ElementType::Diagram, FieldKind::Optional),
            FieldSpec::spatial(
                "rotation_symbol",
                ElementType::RotationSymbol,
                FieldKind::Optional,
            ),
            FieldSpec::spatial("arrows", ElementType::Arrow, FieldKind::Sequence),
            FieldSpec::spatial(
                "sub_assemblies",
                ElementType::SubAssembly,
                FieldKind::Sequence,
            ),
        ];
        const PARTS_LIST_FIELDS: &[FieldSpec] = &[FieldSpec::referenced(
            "parts",
            ElementType::Part,
            FieldKind::Sequence,
        )];
        const PART_FIELDS: &[FieldSpec] = &[
            FieldSpec::referenced("count", ElementType::PartCount, FieldKind::Required),
            FieldSpec::referenced("image", ElementType::PartImage, FieldKind::Required),
            FieldSpec::referenced("number", ElementType::PartNumber, FieldKind::Optional),
            FieldSpec::referenced("length", ElementType::PieceLength, FieldKind::Optional),
        ];
        const SUB_ASSEMBLY_FIELDS: &[FieldSpec] = &[
            FieldSpec::referenced("repeat", ElementType::SubstepNumber, FieldKind::Optional),
            FieldSpec::spatial("sub_steps", ElementType::SubStep, FieldKind::Sequence),
        ];
        const SUB_STEP_FIELDS: &[FieldSpec] = &[FieldSpec::referenced(
            "number",
            ElementType::SubstepNumber,
            FieldKind::Required,
        )];
        const OPEN_BAG_FIELDS: &[FieldSpec] = &[FieldSpec::referenced(
            "bag_number",
            ElementType::BagNumber,
            FieldKind::Optional,
        )];
        const PROGRESS_BAR_FIELDS: &[FieldSpec] = &[FieldSpec::spatial(
            "indicator",
            ElementType::ProgressBarIndicator,
            FieldKind::Optional,
        )];
        match self {
            ElementType::Page => PAGE_FIELDS,
            ElementType::Step => STEP_FIELDS,
            ElementType::PartsList => PARTS_LIST_FIELDS,
            ElementType::Part => PART_FIELDS,
            ElementType::SubAssembly => SUB_ASSEMBLY_FIELDS,
            ElementType::SubStep => SUB_STEP_FIELDS,
            ElementType::OpenBag => OPEN_BAG_FIELDS,
            ElementType::ProgressBar => PROGRESS_BAR_FIELDS,
            _ => &[],
        }
    }

    /// Semantic constraint rules for this element type.
    pub fn constraint_rules(&self) -> &'static [ConstraintRule] {
        match self {
            ElementType::Step => &[ConstraintRule::UniqueBy {
                field: "step_number",
            }],
            ElementType::PartsList => &[ConstraintRule::MinCount {
                field: "parts",
                min: 1,
            }],
            ElementType::Arrow => &[ConstraintRule::NoOrphans {
                parent: ElementType::Step,
            }],
            ElementType::RotationSymbol => &[ConstraintRule::NoOrphans {
                parent: ElementType::Step,
            }],
            ElementType::SubStep => &[ConstraintRule::NoOrphans {
                parent: ElementType::SubAssembly,
            }],
            ElementType::ProgressBarIndicator => &[ConstraintRule::NoOrphans {
                parent: ElementType::ProgressBar,
            }],
            ElementType::PageNumber => &[ConstraintRule::SingletonPerPage],
            ElementType::Background => &[ConstraintRule::SingletonPerPage],
            ElementType::ProgressBar => &[ConstraintRule::SingletonPerPage],
            ElementType::StepNumber => &[ConstraintRule::UniqueValue],
            ElementType::BagNumber => &[ConstraintRule::UniqueValue],
            _ => &[],
        }
    }

    /// The classifier label producing this element type, when one exists.
    ///
    /// `Page` has no classifier; the driver assembles it.
    pub fn label(&self) -> Option<Label> {
        Some(match self {
            ElementType::Page => return None,
            ElementType::PageNumber => Label::PageNumber,
            ElementType::Step => Label::Step,
            ElementType::StepNumber => Label::StepNumber,
            ElementType::SubstepNumber => Label::SubstepNumber,
            ElementType::PartsList => Label::PartsList,
            ElementType::Part => Label::Part,
            ElementType::PartCount => Label::PartCount,
            ElementType::PartImage => Label::PartImage,
            ElementType::PartNumber => Label::PartNumber,
            ElementType::PieceLength => Label::PieceLength,
            ElementType::Diagram => Label::Diagram,
            ElementType::Arrow => Label::Arrow,
            ElementType::RotationSymbol => Label::RotationSymbol,
            ElementType::SubAssembly => Label::SubAssembly,
            ElementType::SubStep => Label::SubStep,
            ElementType::BagNumber => Label::BagNumber,
            ElementType::OpenBag => Label::OpenBag,
            ElementType::ProgressBar => Label::ProgressBar,
            ElementType::ProgressBarIndicator => Label::ProgressBarIndicator,
            ElementType::Divider => Label::Divider,
            ElementType::Background => Label::Background,
            ElementType::LoosePartSymbol => Label::LoosePartSymbol,
            ElementType::Shine => Label::Shine,
        })
    }

    /// The element type a classifier label produces.
    pub fn for_label(label: Label) -> ElementType {
        match label {
            Label::Arrow => ElementType::Arrow,
            Label::Background => ElementType::Background,
            Label::BagNumber => ElementType::BagNumber,
            Label::Diagram => ElementType::Diagram,
            Label::Divider => ElementType::Divider,
            Label::LoosePartSymbol => ElementType::LoosePartSymbol,
            Label::OpenBag => ElementType::OpenBag,
            Label::PageNumber => ElementType::PageNumber,
            Label::Part => ElementType::Part,
            Label::PartCount => ElementType::PartCount,
            Label::PartImage => ElementType::PartImage,
            Label::PartNumber => ElementType::PartNumber,
            Label::PartsList => ElementType::PartsList,
            Label::PieceLength => ElementType::PieceLength,
            Label::ProgressBar => ElementType::ProgressBar,
            Label::ProgressBarIndicator => ElementType::ProgressBarIndicator,
            Label::RotationSymbol => ElementType::RotationSymbol,
            Label::Shine => ElementType::Shine,
            Label::Step => ElementType::Step,
            Label::StepNumber => ElementType::StepNumber,
            Label::SubAssembly => ElementType::SubAssembly,
            Label::SubStep => ElementType::SubStep,
            Label::SubstepNumber => ElementType::SubstepNumber,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for label in Label::ALL {
            let ty = ElementType::for_label(label);
            assert_eq!(ty.label(), Some(label));
        }
        assert_eq!(ElementType::Page.label(), None);
    }

    #[test]
    fn test_step_fields() {
        let fields = ElementType::Step.fields();
        let number = fields.iter().find(|f| f.name == "step_number").unwrap();
        assert_eq!(number.kind, FieldKind::Required);
        assert_eq!(number.assignment, Assignment::Reference);
        assert_eq!(number.child, ElementType::StepNumber);

        let diagram = fields.iter().find(|f| f.name == "diagram").unwrap();
        assert_eq!(diagram.assignment, Assignment::Spatial);
        assert_eq!(diagram.kind, FieldKind::Optional);
    }

    #[test]
    fn test_part_requires_count_and_image() {
        let fields = ElementType::Part.fields();
        let required: Vec<_> = fields
            .iter()
            .filter(|f| f.kind == FieldKind::Required)
            .map(|f| f.child)
            .collect();
        assert_eq!(required, vec![ElementType::PartCount, ElementType::PartImage]);
    }

    #[test]
    fn test_constraint_rules() {
        assert!(matches!(
            ElementType::Step.constraint_rules(),
            [ConstraintRule::UniqueBy {
                field: "step_number"
            }]
        ));
        assert!(matches!(
            ElementType::PartsList.constraint_rules(),
            [ConstraintRule::MinCount {
                field: "parts",
                min: 1
            }]
        ));
        assert!(matches!(
            ElementType::Arrow.constraint_rules(),
            [ConstraintRule::NoOrphans {
                parent: ElementType::Step
            }]
        ));
        assert!(ElementType::Diagram.constraint_rules().is_empty());
    }

    #[test]
    fn test_leaves_have_no_fields() {
        for ty in [
            ElementType::PageNumber,
            ElementType::StepNumber,
            ElementType::PartCount,
            ElementType::Diagram,
            ElementType::Divider,
            ElementType::Shine,
        ] {
            assert!(ty.fields().is_empty(), "{:?} should be a leaf", ty);
        }
    }
}
