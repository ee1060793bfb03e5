//! Problems: a variable store, an ordered equation list and a solver.
//!
//! A [`Problem`] is built incrementally. Variables are registered first and
//! hand back an [`Expression`] naming them; equations are then dimension
//! checked against the registered variables as they are added. Calling
//! [`Problem::solve`] seals the problem and runs the solver, which moves
//! unknown variables to known in a deterministic order.
//!
//! ```
//! use dimsolve::prelude::*;
//!
//! let registry = initialize_registry(standard_catalog()).unwrap();
//! let mut problem = Problem::new("wall thickness", registry);
//! let t_bar = problem.known("T_bar", 0.147, StandardUnit::Inch).unwrap();
//! let u_m = problem.known("U_m", 0.125, StandardUnit::Dimensionless).unwrap();
//! let t = problem.unknown("T", StandardUnit::Inch).unwrap();
//! problem.add_equation("T", t, t_bar * (1.0 - u_m)).unwrap();
//! problem.solve().unwrap();
//! let value = problem.value_in("T", StandardUnit::Inch).unwrap();
//! assert!((value - 0.128625).abs() < 1e-12);
//! ```

/// Named variable slots.
pub mod variable;
/// Storage capability traits and their default implementations.
pub mod store;
/// Solve steps, summaries and exported state.
pub mod report;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

pub use report::{EquationState, ProblemState, SolveStep, SolveSummary, SolvedValue, VariableState};
pub use store::{EquationList, EquationStore, Solver, VariableLookup, VariableStore, VariableTable};
pub use variable::{Origin, Variable, DEFAULT_GUESS};

use crate::equation::Equation;
use crate::errors::{DimsolveError, Result};
use crate::expression::{EvalContext, Expression};
use crate::math::Scalar;
use crate::quantity::Quantity;
use crate::solver::DependencySolver;
use crate::units::UnitRegistry;

/// A system of equations over named variables.
///
/// Cloning an unsolved problem gives an independent copy that can be solved
/// separately; the clone gets its own variable store identity.
#[derive(Debug, Clone)]
pub struct Problem<S: Solver = DependencySolver> {
    name: String,
    registry: Arc<UnitRegistry>,
    variables: VariableTable,
    equations: EquationList,
    solver: S,
    sealed: bool,
    steps: Vec<SolveStep>,
    summary: Option<SolveSummary>,
}

impl Problem {
    /// Creates an empty problem using the default [`DependencySolver`].
    #[must_use]
    pub fn new(name: impl Into<String>, registry: Arc<UnitRegistry>) -> Self {
        Self::with_solver(name, registry, DependencySolver::default())
    }
}

impl<S: Solver> Problem<S> {
    /// Creates an empty problem with a specific solver.
    #[must_use]
    pub fn with_solver(name: impl Into<String>, registry: Arc<UnitRegistry>, solver: S) -> Self {
        Self {
            name: name.into(),
            registry,
            variables: VariableTable::new(),
            equations: EquationList::new(),
            solver,
            sealed: false,
            steps: Vec::new(),
            summary: None,
        }
    }

    /// Problem name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry used for every conversion in this problem.
    #[must_use]
    pub fn registry(&self) -> &Arc<UnitRegistry> {
        &self.registry
    }

    /// Solver in use.
    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.sealed {
            return Err(DimsolveError::ProblemSealed(format!(
                "cannot {action} after `{}` was sealed",
                self.name
            )));
        }
        Ok(())
    }

    /// Registers a variable and returns an expression referencing it.
    pub fn add_variable(&mut self, variable: Variable) -> Result<Expression> {
        self.ensure_open("add a variable")?;
        let expression = Expression::variable(variable.name());
        self.variables.insert(variable)?;
        Ok(expression)
    }

    /// Registers a known variable from a value and a unit id.
    pub fn known(&mut self, name: &str, value: Scalar, unit: impl AsRef<str>) -> Result<Expression> {
        let quantity = Quantity::with_unit(&self.registry, unit, value)?;
        self.add_variable(Variable::known(name, quantity))
    }

    /// Registers an unknown variable displayed in `unit`.
    pub fn unknown(&mut self, name: &str, unit: impl AsRef<str>) -> Result<Expression> {
        let unit = self.registry.unit(unit)?;
        self.add_variable(Variable::unknown(name, unit))
    }

    /// Adds the equation `lhs = rhs`.
    ///
    /// Fails on dimensional mismatch or when a side names a variable that was
    /// never registered.
    pub fn add_equation(
        &mut self,
        name: impl Into<String>,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
    ) -> Result<()> {
        self.ensure_open("add an equation")?;
        let equation = Equation::new(name, lhs, rhs, &self.variables)?;
        debug!(problem = %self.name, equation = %equation, "equation added");
        self.equations.push(equation);
        Ok(())
    }

    /// Freezes the definition; later additions fail with `ProblemSealed`.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// True once sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Seals the problem and solves every reachable unknown.
    ///
    /// On error the variables solved before the failure stay known and their
    /// steps remain available through [`Problem::steps`].
    pub fn solve(&mut self) -> Result<&SolveSummary> {
        self.seal();
        let summary = self.solver.solve(
            &mut self.variables,
            &self.equations,
            &self.registry,
            &mut self.steps,
        )?;
        Ok(self.summary.insert(summary))
    }

    /// Summary of the last successful solve.
    #[must_use]
    pub fn summary(&self) -> Option<&SolveSummary> {
        self.summary.as_ref()
    }

    /// Variable registered under `name`.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.variable(name)
    }

    /// Variables in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Current value of `name`.
    ///
    /// Fails with `UndefinedVariable` for unregistered names and
    /// `UnknownVariable` while the variable is unresolved.
    pub fn quantity(&self, name: &str) -> Result<&Quantity> {
        self.variables
            .variable(name)
            .ok_or_else(|| DimsolveError::UndefinedVariable(name.to_string()))?
            .quantity()
            .ok_or_else(|| DimsolveError::UnknownVariable(name.to_string()))
    }

    /// Current value of `name` expressed in `unit`.
    pub fn value_in(&self, name: &str, unit: impl AsRef<str>) -> Result<Scalar> {
        self.quantity(name)?.value_in(&self.registry, unit)
    }

    /// Equations in insertion order.
    #[must_use]
    pub fn equations(&self) -> &[Equation] {
        self.equations.equations()
    }

    /// Steps recorded so far.
    #[must_use]
    pub fn steps(&self) -> &[SolveStep] {
        &self.steps
    }

    /// Evaluates an expression against the current variable values.
    pub fn evaluate(&self, expression: &Expression) -> Result<Quantity> {
        let ctx = EvalContext::new(&self.registry, &self.variables);
        expression.evaluate(&ctx)
    }

    /// Flat snapshot of variables and equations for export.
    #[must_use]
    pub fn state(&self) -> ProblemState {
        let mut produced: HashMap<&str, (&str, &[SolvedValue])> = HashMap::new();
        for step in &self.steps {
            for (name, substituted) in step.equations.iter().zip(&step.substituted) {
                produced.insert(name.as_str(), (substituted.as_str(), step.solved.as_slice()));
            }
        }

        let variables = self
            .variables
            .iter()
            .map(|variable| VariableState {
                name: variable.name().to_string(),
                is_known: variable.is_known(),
                value: variable.quantity().map(Quantity::value),
                unit: variable.unit().symbol().to_string(),
                origin: variable.origin(),
            })
            .collect();
        let equations = self
            .equations
            .equations()
            .iter()
            .map(|equation| {
                let record = produced.get(equation.name());
                EquationState {
                    name: equation.name().to_string(),
                    canonical: equation.render(),
                    substituted: record.map(|(substituted, _)| (*substituted).to_string()),
                    result: record.map(|(_, solved)| solved.to_vec()),
                }
            })
            .collect();

        ProblemState {
            name: self.name.clone(),
            variables,
            equations,
        }
    }
}
