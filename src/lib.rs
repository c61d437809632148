//! bricklayout - structured classification of LEGO instruction page layouts.
//!
//! This library ingests layout-extracted pages of LEGO assembly
//! instruction PDFs, flat collections of typed blocks (text, image,
//! vector drawing) with bounding boxes, and produces a structured
//! hierarchical model of each page: page number, steps, parts lists,
//! parts, sub-assemblies, bags, diagrams, and the rest.
//!
//! The heart of the crate is the classification pipeline: a
//! dependency-ordered set of rule-based classifiers that score candidate
//! interpretations of each block, a constraint solver that picks the
//! globally best conflict-free subset of candidates, and a spatial
//! assignment pass that places graphics into their parent slots.
//!
//! # Modules
//!
//! * [`core`] - Fundamental components: geometry, blocks, errors, config
//! * [`domain`] - The element tree, its schema tables, and document hints
//! * [`classifier`] - Candidates, classifiers, and the per-page pipeline
//! * [`solver`] - The constraint engine and spatial assignment
//! * [`utils`] - Text value extraction helpers
//!
//! # Examples
//!
//! ```rust
//! use bricklayout::prelude::*;
//!
//! let blocks = vec![Block::text_block(
//!     0,
//!     BBox::new(10.0, 820.0, 25.0, 835.0).unwrap(),
//!     "5",
//!     12.0,
//! )];
//! let page = PageData::new(5, 600.0, 840.0, blocks).unwrap();
//!
//! let pipeline = Pipeline::new(ClassifierConfig::default(), SolverConfig::default())?;
//! let outcomes = pipeline.classify_document(&[page]);
//! assert_eq!(outcomes[0].page.page_number.as_ref().map(|p| p.value), Some(5));
//! # Ok::<(), bricklayout::ClassifyError>(())
//! ```

pub mod classifier;
pub mod core;
pub mod domain;
pub mod solver;
pub mod utils;

pub use crate::core::errors::{ClassifyError, ClassifyResult};

/// A prelude module for convenient imports.
///
/// Re-exports the types most callers need: the block model, the pipeline,
/// its configuration, and the output page tree.
pub mod prelude {
    pub use crate::classifier::{
        CandidateState, ClassificationReport, ExternalHints, PageOutcome, Pipeline, SolverReport,
    };
    pub use crate::core::{
        BBox, Block, BlockId, ClassifierConfig, ClassifyError, ClassifyResult, Color, Label,
        PageData, SolverConfig, SolverLabels,
    };
    pub use crate::domain::{
        DocumentHints, Page, PageElement, Part, PartsList, Step, SubAssembly,
    };
}
