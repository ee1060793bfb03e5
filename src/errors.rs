//! Shared error types used across submodules.

use thiserror::Error;

use crate::dimension::DimensionSignature;
use crate::math::Scalar;

/// Top-level error type for the crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimsolveError {
    /// An operator, equation or conversion was applied across incompatible dimensions.
    #[error("dimensional mismatch: {0}")]
    DimensionalMismatch(String),
    /// An expression read a variable that is still unknown.
    #[error("variable `{0}` is not known yet")]
    UnknownVariable(String),
    /// Registry lookup miss for a unit name or symbol.
    #[error("unit not found: `{0}`")]
    UnitNotFound(String),
    /// An iterative solve exceeded its iteration cap without meeting tolerance.
    #[error("solver convergence failure after {iterations} iterations (residual {residual:.3e})")]
    Convergence {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Residual norm at termination.
        residual: Scalar,
    },
    /// Dependency analysis found an under-determined or disconnected unknown.
    #[error("unsolvable system: {0}")]
    UnsolvableSystem(String),
    /// A unit name or symbol is already bound to an incompatible definition.
    #[error("registry conflict: {0}")]
    RegistryConflict(String),
    /// A function received a value outside its numeric domain.
    #[error("domain error: {0}")]
    Domain(String),
    /// An expression references a variable that was never registered.
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    /// A variable with the same name is already registered.
    #[error("duplicate variable `{0}`")]
    DuplicateVariable(String),
    /// A solver tried to assign a variable that is already known.
    #[error("variable `{0}` is already known")]
    AlreadyKnown(String),
    /// The problem was sealed and can no longer be modified.
    #[error("problem `{0}` is sealed")]
    ProblemSealed(String),
}

impl DimsolveError {
    /// Builds a mismatch error for a binary operation between two dimensions.
    #[must_use]
    pub fn mismatch(
        operation: &str,
        left: DimensionSignature,
        right: DimensionSignature,
    ) -> Self {
        Self::DimensionalMismatch(format!("{operation}: [{left}] vs [{right}]"))
    }

    /// True for errors the dependency solver interprets as "not ready yet".
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::UnknownVariable(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = DimsolveError> = std::result::Result<T, E>;
