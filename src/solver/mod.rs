//! Constraint engine: candidate selection and spatial placement.
//!
//! Selection is a 0/1 optimization: maximize total candidate score (plus
//! the consumption reward) subject to block exclusivity and the structural
//! constraints generated from the element schema. Spatially-assigned
//! fields are bound afterwards by minimum-cost matching.

pub mod assignment;
pub mod model;
pub mod sat;
pub mod schema_gen;

pub use assignment::{min_cost_assignment, PairingConfig};
pub use model::{candidate_weight, ChildCardinality, ConstraintModel, SolveOutcome};
pub use sat::{BoolModel, SolveStatus, VarId};
