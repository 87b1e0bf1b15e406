//! Parameter-combination engine
//!
//! Two related, pure operations:
//! - Grid expansion (`GridExpander::expand`): turn a nested parameter
//!   specification (scalars, named alternatives, `{from,to,step}` ranges)
//!   into the list of concrete parameter combinations.
//! - Data-source combination (`combine`): fan a function out over one or
//!   more data sources and parameter grids with controlled zip or
//!   cross-product semantics, carrying provenance for every produced result.
//!
//! Both operations materialize their results eagerly; neither holds state
//! across calls beyond the configuration captured at construction.

pub mod combine;
pub mod errors;
pub mod grid;

pub use combine::{combine, normalize_source, CombineSpec, DataItem};
pub use errors::CombineError;
pub use grid::GridExpander;
