//! Columnar value representation shared by the expression evaluator,
//! physical operators, and connector contract.
//!
//! This crate deliberately knows nothing about SQL, catalogs, or plans; it
//! is the vocabulary ([`array::Array`], [`morsel::Morsel`],
//! [`scalar::ScalarValue`], [`datatype::DataType`]) that the planning and
//! execution crate builds on.

pub mod array;
pub mod bitmap;
pub mod datatype;
pub mod morsel;
pub mod scalar;
pub mod validity;

pub use array::Array;
pub use datatype::DataType;
pub use morsel::Morsel;
pub use scalar::ScalarValue;
