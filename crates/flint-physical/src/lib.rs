//! The physical operator pipeline (§4.4, §4.5): lowers a bound, optimized
//! logical plan into a tree of pull-based iterators and runs the vectorized
//! expression evaluator each one needs.
//!
//! [`plan::build_physical_plan`] is the entry point; everything else in
//! this crate is either one operator module (named after the `Step`
//! variant it builds) or a shared piece of machinery (`evaluator`,
//! `resize`, `operator`) those modules lean on.

pub mod aggregate;
pub mod cross_join;
pub mod distinct;
pub mod evaluator;
pub mod exit;
pub mod filter;
pub mod function_dataset;
pub mod join;
pub mod limit;
pub mod offset;
pub mod operator;
pub mod plan;
pub mod project;
pub mod resize;
pub mod scan;
pub mod sort;

pub use operator::{Explain, ExplainNode, OperatorStream};
pub use plan::build_physical_plan;
