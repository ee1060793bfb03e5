#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(clippy::all, clippy::cargo, clippy::nursery, missing_docs)]
#![doc = include_str!("../README.md")]

/// Conversion factors and numeric constants shared by the unit catalog.
pub mod constants;
/// Shared numeric helpers and the scalar alias.
pub mod math;
/// Error types shared across the crate.
pub mod errors;
/// Prime-encoded dimension signatures.
pub mod dimension;
/// Unit definitions, the sealed registry and the standard catalog.
pub mod units;
/// Values tagged with units, and dimension-checked arithmetic on them.
pub mod quantity;
/// Expression trees, evaluation and rendering.
pub mod expression;
/// Dimension-checked equations and single-unknown solving.
pub mod equation;
/// Root finding and the dependency-ordered problem solver.
pub mod solver;
/// Variables, stores and problems.
pub mod problem;

/// Common exports for downstream crates.
pub mod prelude;
