//! Records of a solve: per-step reports, the run summary, and a flat
//! snapshot of problem state for export.

use std::fmt;

use crate::math::Scalar;
use crate::problem::variable::Origin;
use crate::quantity::Quantity;
use crate::solver::SolveMethod;

/// One variable resolved by a step.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedValue {
    /// Variable name.
    pub name: String,
    /// Value in the variable's display unit.
    pub value: Scalar,
    /// Display unit symbol.
    pub unit: String,
}

impl SolvedValue {
    /// Captures `quantity` under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: &Quantity) -> Self {
        Self {
            name: name.into(),
            value: quantity.value(),
            unit: quantity.unit().symbol().to_string(),
        }
    }
}

impl fmt::Display for SolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} = {}", self.name, self.value)
        } else {
            write!(f, "{} = {} {}", self.name, self.value, self.unit)
        }
    }
}

/// One solver step: the equations used and the values they produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveStep {
    /// Names of the equations consumed.
    pub equations: Vec<String>,
    /// Variables resolved, in store order.
    pub solved: Vec<SolvedValue>,
    /// Method used.
    pub method: SolveMethod,
    /// Equations rendered with known values substituted, before the step.
    pub substituted: Vec<String>,
}

impl fmt::Display for SolveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.equations.join(", "))?;
        for (index, value) in self.solved.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, " ({})", self.method)
    }
}

/// Totals for one solve run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveSummary {
    /// Variables resolved.
    pub solved: usize,
    /// Steps solved by isolation.
    pub closed_form: usize,
    /// Steps solved by single-variable iteration.
    pub numeric: usize,
    /// Steps solved as coupled components.
    pub simultaneous: usize,
    /// Iterations across all iterative steps.
    pub iterations: usize,
    /// Fully-known equations whose residual exceeded the consistency tolerance.
    pub inconsistent: Vec<String>,
}

impl SolveSummary {
    /// Tallies `steps`.
    #[must_use]
    pub fn from_steps(steps: &[SolveStep], inconsistent: Vec<String>) -> Self {
        let mut summary = Self {
            inconsistent,
            ..Self::default()
        };
        for step in steps {
            summary.solved += step.solved.len();
            summary.iterations += step.method.iterations();
            match step.method {
                SolveMethod::ClosedForm => summary.closed_form += 1,
                SolveMethod::Numeric { .. } => summary.numeric += 1,
                SolveMethod::Simultaneous { .. } => summary.simultaneous += 1,
            }
        }
        summary
    }

    /// True when no equation was flagged inconsistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.inconsistent.is_empty()
    }
}

/// Exported variable state.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableState {
    /// Variable name.
    pub name: String,
    /// Whether a value is known.
    pub is_known: bool,
    /// Value in the display unit, when known.
    pub value: Option<Scalar>,
    /// Display unit symbol.
    pub unit: String,
    /// Where the value came from.
    pub origin: Origin,
}

/// Exported equation state.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EquationState {
    /// Equation name.
    pub name: String,
    /// Canonical `lhs = rhs` rendering.
    pub canonical: String,
    /// Rendering with the values known before this equation was solved.
    pub substituted: Option<String>,
    /// Values this equation produced.
    pub result: Option<Vec<SolvedValue>>,
}

/// Flat snapshot of a problem, suitable for serialization.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemState {
    /// Problem name.
    pub name: String,
    /// Variables in insertion order.
    pub variables: Vec<VariableState>,
    /// Equations in insertion order.
    pub equations: Vec<EquationState>,
}

impl fmt::Display for ProblemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for variable in &self.variables {
            match variable.value {
                Some(value) => writeln!(f, "  {} = {} {}", variable.name, value, variable.unit)?,
                None => writeln!(f, "  {} = ? {}", variable.name, variable.unit)?,
            }
        }
        for equation in &self.equations {
            writeln!(f, "  {}: {}", equation.name, equation.canonical)?;
        }
        Ok(())
    }
}
