//! Numeric root finding and the dependency-ordered problem solver.
//!
//! - [`numeric`]: bounded Newton/bisection for one unknown.
//! - [`simultaneous`]: multivariate Newton with an SVD least-squares step for
//!   coupled unknowns.
//! - [`dependency`]: the [`DependencySolver`] that schedules equations,
//!   splits stalled components into coupled blocks and hands the smallest to
//!   the simultaneous solver.

/// Single-variable root finding.
pub mod numeric;
/// Coupled multivariate Newton iteration.
pub mod simultaneous;
/// Dependency-ordered fixed-point solve over a whole problem.
pub mod dependency;

use std::fmt;

pub use dependency::DependencySolver;
pub use numeric::{solve_scalar, ConvergenceCriteria, Residual, ScalarSolution};
pub use simultaneous::{numerical_rank, solve_system, SystemSolution};

use crate::math::Scalar;

/// How a value was obtained.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Algebraic isolation of the unknown.
    ClosedForm,
    /// Single-variable iteration.
    Numeric {
        /// Iterations performed.
        iterations: usize,
    },
    /// Multivariate iteration over a coupled component.
    Simultaneous {
        /// Iterations performed.
        iterations: usize,
    },
}

impl SolveMethod {
    /// Iterations performed (zero for closed form).
    #[must_use]
    pub fn iterations(self) -> usize {
        match self {
            Self::ClosedForm => 0,
            Self::Numeric { iterations } | Self::Simultaneous { iterations } => iterations,
        }
    }
}

impl fmt::Display for SolveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClosedForm => f.write_str("closed form"),
            Self::Numeric { iterations } => write!(f, "numeric ({iterations} iterations)"),
            Self::Simultaneous { iterations } => {
                write!(f, "simultaneous ({iterations} iterations)")
            }
        }
    }
}

/// Solver configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Criteria for single-unknown iteration.
    pub single: ConvergenceCriteria,
    /// Criteria for simultaneous iteration.
    pub simultaneous: ConvergenceCriteria,
    /// Relative finite-difference step for derivatives.
    pub derivative_step: Scalar,
    /// Check equations whose variables are all known after solving.
    pub check_consistency: bool,
    /// Relative tolerance for the consistency check.
    pub consistency_tolerance: Scalar,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            single: ConvergenceCriteria::default(),
            simultaneous: ConvergenceCriteria::default(),
            derivative_step: 1e-7,
            check_consistency: true,
            consistency_tolerance: 1e-6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = SolverConfig::default();
        assert_eq!(config.single.max_iterations, 100);
        assert_eq!(config.single.relative_tolerance, 1e-10);
        assert_eq!(config.single.step_tolerance, 1e-12);
        assert_eq!(config.simultaneous, config.single);
        assert!(config.check_consistency);
    }

    #[test]
    fn method_display() {
        assert_eq!(SolveMethod::ClosedForm.to_string(), "closed form");
        assert_eq!(
            SolveMethod::Numeric { iterations: 4 }.to_string(),
            "numeric (4 iterations)"
        );
        assert_eq!(SolveMethod::Simultaneous { iterations: 6 }.iterations(), 6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_round_trips_through_json() {
        let config = SolverConfig {
            simultaneous: ConvergenceCriteria::default().with_max_iterations(40),
            check_consistency: false,
            ..SolverConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"step_tolerance\""));
        let back: SolverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let method = SolveMethod::Numeric { iterations: 3 };
        let json = serde_json::to_string(&method).unwrap();
        assert_eq!(json, r#"{"Numeric":{"iterations":3}}"#);
        assert_eq!(serde_json::from_str::<SolveMethod>(&json).unwrap(), method);
    }
}
