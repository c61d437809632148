//! Classifier output labels.
//!
//! Every classifier produces candidates for exactly one label. Labels form
//! the vocabulary of the pipeline's dependency graph (`requires`) and key
//! the candidate store.

use serde::{Deserialize, Serialize};

/// Identifies what a classifier outputs.
///
/// The `Ord` implementation follows the snake_case name, which gives the
/// pipeline its deterministic alphabetical tie-break when topologically
/// sorting classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Arrow,
    Background,
    BagNumber,
    Diagram,
    Divider,
    LoosePartSymbol,
    OpenBag,
    PageNumber,
    Part,
    PartCount,
    PartImage,
    PartNumber,
    PartsList,
    PieceLength,
    ProgressBar,
    ProgressBarIndicator,
    RotationSymbol,
    Shine,
    Step,
    StepNumber,
    SubAssembly,
    SubStep,
    SubstepNumber,
}

impl Label {
    /// All labels, in alphabetical (snake_case) order.
    pub const ALL: [Label; 23] = [
        Label::Arrow,
        Label::Background,
        Label::BagNumber,
        Label::Diagram,
        Label::Divider,
        Label::LoosePartSymbol,
        Label::OpenBag,
        Label::PageNumber,
        Label::Part,
        Label::PartCount,
        Label::PartImage,
        Label::PartNumber,
        Label::PartsList,
        Label::PieceLength,
        Label::ProgressBar,
        Label::ProgressBarIndicator,
        Label::RotationSymbol,
        Label::Shine,
        Label::Step,
        Label::StepNumber,
        Label::SubAssembly,
        Label::SubStep,
        Label::SubstepNumber,
    ];

    /// Returns the snake_case name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Arrow => "arrow",
            Label::Background => "background",
            Label::BagNumber => "bag_number",
            Label::Diagram => "diagram",
            Label::Divider => "divider",
            Label::LoosePartSymbol => "loose_part_symbol",
            Label::OpenBag => "open_bag",
            Label::PageNumber => "page_number",
            Label::Part => "part",
            Label::PartCount => "part_count",
            Label::PartImage => "part_image",
            Label::PartNumber => "part_number",
            Label::PartsList => "parts_list",
            Label::PieceLength => "piece_length",
            Label::ProgressBar => "progress_bar",
            Label::ProgressBarIndicator => "progress_bar_indicator",
            Label::RotationSymbol => "rotation_symbol",
            Label::Shine => "shine",
            Label::Step => "step",
            Label::StepNumber => "step_number",
            Label::SubAssembly => "sub_assembly",
            Label::SubStep => "sub_step",
            Label::SubstepNumber => "substep_number",
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
