//! Domain model: the element tree, its schema tables, and document hints.

pub mod elements;
pub mod hints;
pub mod schema;

pub use elements::{
    Arrow, Background, BagNumber, Diagram, Divider, LoosePartSymbol, OpenBag, Page, PageElement,
    PageNumber, Part, PartCount, PartImage, PartNumber, PartsList, PieceLength, ProgressBar,
    ProgressBarIndicator, RotationSymbol, Shine, Step, StepNumber, SubAssembly, SubStep,
    SubstepNumber,
};
pub use hints::DocumentHints;
pub use schema::{Assignment, ConstraintRule, ElementType, FieldKind, FieldSpec};
