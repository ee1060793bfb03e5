//! Convenience re-exports for defining and solving problems.

pub use crate::dimension::DimensionSignature;
pub use crate::equation::{Equation, Solution};
pub use crate::errors::{DimsolveError, Result};
pub use crate::expression::{
    abs, acos, asin, atan, atan2, cos, exp, ln, log10, max, min, sin, sqrt, tan, EvalContext,
    Expression, MathFunction,
};
pub use crate::math::Scalar;
pub use crate::problem::{
    EquationStore, Origin, Problem, ProblemState, SolveStep, SolveSummary, Solver, Variable,
    VariableLookup, VariableStore,
};
pub use crate::quantity::Quantity;
pub use crate::solver::{ConvergenceCriteria, DependencySolver, SolveMethod, SolverConfig};
pub use crate::units::{
    initialize_registry, standard_catalog, StandardUnit, Unit, UnitDefinition, UnitRegistry,
};
