//! The rule-based label classifiers.
//!
//! One classifier per label; each is small and follows the framework
//! contract. `default_classifiers` returns the full set the pipeline
//! registers by default.

pub mod bag_number;
pub mod common;
pub mod diagram;
pub mod geometry_symbols;
pub mod open_bag;
pub mod page_number;
pub mod part_count;
pub mod part_image;
pub mod part_number;
pub mod parts;
pub mod parts_list;
pub mod piece_length;
pub mod progress_bar;
pub mod step;
pub mod step_number;
pub mod sub_assembly;
pub mod substep_number;

use crate::classifier::LabelClassifier;

pub use bag_number::BagNumberClassifier;
pub use diagram::DiagramClassifier;
pub use geometry_symbols::{
    ArrowClassifier, BackgroundClassifier, DividerClassifier, LoosePartSymbolClassifier,
    RotationSymbolClassifier, ShineClassifier,
};
pub use open_bag::OpenBagClassifier;
pub use page_number::PageNumberClassifier;
pub use part_count::PartCountClassifier;
pub use part_image::PartImageClassifier;
pub use part_number::PartNumberClassifier;
pub use parts::PartsClassifier;
pub use parts_list::PartsListClassifier;
pub use piece_length::PieceLengthClassifier;
pub use progress_bar::{ProgressBarClassifier, ProgressBarIndicatorClassifier};
pub use step::StepClassifier;
pub use step_number::StepNumberClassifier;
pub use sub_assembly::{SubAssemblyClassifier, SubStepClassifier};
pub use substep_number::SubstepNumberClassifier;

/// The full default classifier set, one per label.
pub fn default_classifiers() -> Vec<Box<dyn LabelClassifier>> {
    vec![
        Box::new(ArrowClassifier),
        Box::new(BackgroundClassifier),
        Box::new(BagNumberClassifier),
        Box::new(DiagramClassifier),
        Box::new(DividerClassifier),
        Box::new(LoosePartSymbolClassifier),
        Box::new(OpenBagClassifier),
        Box::new(PageNumberClassifier),
        Box::new(PartsClassifier),
        Box::new(PartCountClassifier),
        Box::new(PartImageClassifier),
        Box::new(PartNumberClassifier),
        Box::new(PartsListClassifier),
        Box::new(PieceLengthClassifier),
        Box::new(ProgressBarClassifier),
        Box::new(ProgressBarIndicatorClassifier),
        Box::new(RotationSymbolClassifier),
        Box::new(ShineClassifier),
        Box::new(StepClassifier),
        Box::new(StepNumberClassifier),
        Box::new(SubAssemblyClassifier),
        Box::new(SubStepClassifier),
        Box::new(SubstepNumberClassifier),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::Label;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_label_has_exactly_one_classifier() {
        let classifiers = default_classifiers();
        let outputs: BTreeSet<Label> = classifiers.iter().map(|c| c.output()).collect();
        assert_eq!(outputs.len(), classifiers.len(), "duplicate outputs");
        assert_eq!(outputs.len(), Label::ALL.len());
    }

    #[test]
    fn test_requires_reference_known_labels() {
        for classifier in default_classifiers() {
            for required in classifier.requires() {
                assert!(
                    Label::ALL.contains(required),
                    "{} requires unknown label {}",
                    classifier.output(),
                    required
                );
            }
        }
    }
}
