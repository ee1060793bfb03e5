//! Named equations `lhs = rhs` between expressions of equal dimension.

/// Closed-form isolation of a single unknown.
pub mod isolate;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

pub use isolate::isolate;

use crate::dimension::DimensionSignature;
use crate::errors::{DimsolveError, Result};
use crate::expression::{EvalContext, Expression};
use crate::problem::VariableLookup;
use crate::quantity::Quantity;
use crate::solver::numeric::{self, ConvergenceCriteria, Residual};
use crate::solver::{SolveMethod, SolverConfig};

/// Value found for an unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Value in the variable's display unit.
    pub value: Quantity,
    /// Method that produced it.
    pub method: SolveMethod,
}

/// A dimension-checked equation.
#[derive(Debug, Clone)]
pub struct Equation {
    name: String,
    lhs: Expression,
    rhs: Expression,
    dimension: DimensionSignature,
    variables: BTreeSet<String>,
}

impl Equation {
    /// Builds an equation, checking that both sides share a dimension.
    ///
    /// Every referenced variable must be registered in `variables`.
    pub fn new(
        name: impl Into<String>,
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
        variables: &dyn VariableLookup,
    ) -> Result<Self> {
        let name = name.into();
        let lhs = lhs.into();
        let rhs = rhs.into();
        let left = lhs.dimension(variables)?;
        let right = rhs.dimension(variables)?;
        if left != right {
            return Err(DimsolveError::mismatch(
                &format!("equation `{name}`: {lhs} = {rhs}"),
                left,
                right,
            ));
        }
        let referenced = lhs
            .variables()
            .union(rhs.variables())
            .cloned()
            .collect();
        Ok(Self {
            name,
            lhs,
            rhs,
            dimension: left,
            variables: referenced,
        })
    }

    /// Equation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Left-hand side.
    #[must_use]
    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    /// Right-hand side.
    #[must_use]
    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    /// Shared dimension of both sides.
    #[must_use]
    pub fn dimension(&self) -> DimensionSignature {
        self.dimension
    }

    /// Referenced variable names, sorted.
    #[must_use]
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// True when `name` appears on either side.
    #[must_use]
    pub fn references(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    /// Referenced variables that are still unknown.
    pub fn unknowns<'a>(
        &'a self,
        variables: &'a dyn VariableLookup,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.variables
            .iter()
            .filter(move |name| variables.variable(name).map_or(true, |v| !v.is_known()))
            .map(String::as_str)
    }

    /// `lhs - rhs` in the left-hand side's unit.
    pub fn residual(&self, ctx: &EvalContext<'_>) -> Result<Quantity> {
        let lhs = self.lhs.evaluate(ctx)?;
        let rhs = self.rhs.evaluate(ctx)?;
        lhs.try_sub(&rhs, ctx.registry())
    }

    /// Residual in coherent SI with the magnitude it is judged against.
    ///
    /// The scale is the larger side's [`Expression::magnitude`], so an
    /// equation whose terms nearly cancel is judged against its terms.
    pub fn residual_si(&self, ctx: &EvalContext<'_>) -> Result<Residual> {
        let lhs = self.lhs.evaluate(ctx)?.si_value();
        let rhs = self.rhs.evaluate(ctx)?.si_value();
        let scale = self
            .lhs
            .magnitude(ctx)?
            .max(self.rhs.magnitude(ctx)?)
            .max(lhs.abs())
            .max(rhs.abs());
        Ok(Residual {
            value: lhs - rhs,
            scale,
        })
    }

    /// True when the residual meets `criteria`.
    pub fn is_satisfied(&self, ctx: &EvalContext<'_>, criteria: &ConvergenceCriteria) -> Result<bool> {
        Ok(self.residual_si(ctx)?.is_converged(criteria))
    }

    /// Solves for the single unknown `name`, all other variables being known.
    ///
    /// Closed-form isolation is tried first and accepted only if the result
    /// satisfies the equation; otherwise the variable's guess seeds a bounded
    /// numeric search.
    pub fn solve_for(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        config: &SolverConfig,
    ) -> Result<Solution> {
        let variable = ctx
            .variables()
            .variable(name)
            .ok_or_else(|| DimsolveError::UndefinedVariable(name.to_string()))?;
        if !self.references(name) {
            return Err(DimsolveError::UnsolvableSystem(format!(
                "equation `{}` does not reference `{name}`",
                self.name
            )));
        }
        let registry = ctx.registry();
        let dimension = variable.dimension();
        let unit = variable.unit().clone();
        let mut trial = BTreeMap::new();

        if let Some(isolated) = isolate(&self.lhs, &self.rhs, name, ctx.variables()) {
            match isolated.evaluate(ctx) {
                Ok(value) if value.dimension() == dimension && value.value().is_finite() => {
                    trial.insert(name.to_string(), value.clone());
                    let check = self.residual_si(&ctx.with_trial(&trial));
                    if check.is_ok_and(|residual| residual.is_converged(&config.single)) {
                        debug!(equation = %self.name, variable = name, form = %isolated, "closed form");
                        return Ok(Solution {
                            value: value.to(registry, &unit)?,
                            method: SolveMethod::ClosedForm,
                        });
                    }
                    debug!(equation = %self.name, variable = name, "closed form rejected");
                }
                Ok(_) => {}
                Err(error) if error.is_not_ready() => return Err(error),
                Err(error) => debug!(equation = %self.name, %error, "closed form failed"),
            }
        }

        let solution = numeric::solve_scalar(
            |x| {
                trial.insert(name.to_string(), Quantity::from_si(registry, dimension, x));
                self.residual_si(&ctx.with_trial(&trial))
            },
            variable.initial_guess_si(),
            &config.single,
            config.derivative_step,
        )?;
        debug!(
            equation = %self.name,
            variable = name,
            iterations = solution.iterations,
            "numeric solve"
        );
        Ok(Solution {
            value: Quantity::from_si(registry, dimension, solution.root).to(registry, &unit)?,
            method: SolveMethod::Numeric {
                iterations: solution.iterations,
            },
        })
    }

    /// Canonical `lhs = rhs` form.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{} = {}", self.lhs, self.rhs)
    }

    /// `lhs = rhs` with substituted variable values.
    #[must_use]
    pub fn render_with<F>(&self, substitute: F) -> String
    where
        F: Fn(&str) -> Option<Quantity>,
    {
        format!(
            "{} = {}",
            self.lhs.render_with(&substitute),
            self.rhs.render_with(&substitute)
        )
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.name, self.lhs, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::dimension::LENGTH;
    use crate::expression::{cos, sin, sqrt};
    use crate::problem::{Variable, VariableStore, VariableTable};
    use crate::units::{initialize_registry, standard_catalog, UnitRegistry};

    fn registry() -> Arc<UnitRegistry> {
        initialize_registry(standard_catalog()).unwrap()
    }

    fn known(reg: &UnitRegistry, table: &mut VariableTable, name: &str, value: f64, unit: &str) {
        table
            .insert(Variable::known(name, Quantity::with_unit(reg, unit, value).unwrap()))
            .unwrap();
    }

    fn unknown(reg: &UnitRegistry, table: &mut VariableTable, name: &str, unit: &str) {
        table
            .insert(Variable::unknown(name, reg.unit(unit).unwrap()))
            .unwrap();
    }

    #[test]
    fn construction_checks_dimensions() {
        let reg = registry();
        let mut vars = VariableTable::new();
        unknown(&reg, &mut vars, "t", "in");
        unknown(&reg, &mut vars, "F", "N");
        let three_mm = Quantity::with_unit(&reg, "mm", 3.0).unwrap();
        let ok = Equation::new("wall", Expression::variable("t"), three_mm, &vars).unwrap();
        assert_eq!(ok.dimension(), LENGTH);
        assert_eq!(ok.render(), "t = 3 mm");
        let err = Equation::new("bad", Expression::variable("t"), Expression::variable("F"), &vars)
            .unwrap_err();
        assert!(matches!(err, DimsolveError::DimensionalMismatch(_)));
        let err = Equation::new("typo", Expression::variable("T"), 1.0, &vars).unwrap_err();
        assert_eq!(err, DimsolveError::UndefinedVariable("T".into()));
    }

    #[test]
    fn closed_form_wall_thickness() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "T_bar", 0.147, "in");
        known(&reg, &mut vars, "U_m", 0.125, "dimensionless");
        unknown(&reg, &mut vars, "T", "in");
        let rhs = Expression::variable("T_bar") * (1.0 - Expression::variable("U_m"));
        let eq = Equation::new("T", Expression::variable("T"), rhs, &vars).unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let solution = eq.solve_for("T", &ctx, &SolverConfig::default()).unwrap();
        assert_eq!(solution.method, SolveMethod::ClosedForm);
        assert_eq!(solution.value.unit().symbol(), "in");
        assert_relative_eq!(solution.value.value(), 0.128625, max_relative = 1e-12);
        assert_relative_eq!(
            solution.value.value_in(&reg, "m").unwrap(),
            0.003_267_075,
            max_relative = 1e-9
        );
    }

    #[test]
    fn closed_form_in_the_middle_of_an_expression() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "T", 0.128625, "in");
        known(&reg, &mut vars, "U_m", 0.125, "dimensionless");
        unknown(&reg, &mut vars, "T_bar", "in");
        let rhs = Expression::variable("T_bar") * (1.0 - Expression::variable("U_m"));
        let eq = Equation::new("T", Expression::variable("T"), rhs, &vars).unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let solution = eq.solve_for("T_bar", &ctx, &SolverConfig::default()).unwrap();
        assert_eq!(solution.method, SolveMethod::ClosedForm);
        assert_relative_eq!(solution.value.value(), 0.147, max_relative = 1e-12);
    }

    #[test]
    fn law_of_cosines_and_direction() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "F_1", 450.0, "N");
        known(&reg, &mut vars, "F_2", 700.0, "N");
        unknown(&reg, &mut vars, "F_R", "N");
        unknown(&reg, &mut vars, "theta", "deg");
        let f1 = Expression::variable("F_1");
        let f2 = Expression::variable("F_2");
        let f_r = Expression::variable("F_R");
        let theta = Expression::variable("theta");
        let deg = |v: f64| Quantity::with_unit(&reg, "deg", v).unwrap();

        let magnitude = Equation::new(
            "magnitude",
            f_r.clone(),
            sqrt(f1.powf(2.0) + f2.powf(2.0) - 2.0 * &f1 * &f2 * cos(deg(45.0))),
            &vars,
        )
        .unwrap();
        let solution = {
            let ctx = EvalContext::new(&reg, &vars);
            magnitude.solve_for("F_R", &ctx, &SolverConfig::default()).unwrap()
        };
        assert_eq!(solution.method, SolveMethod::ClosedForm);
        assert_relative_eq!(solution.value.value(), 497.013_810_524_893_76, max_relative = 1e-10);
        vars.mark_known("F_R", &solution.value, &reg).unwrap();

        let direction = Equation::new(
            "direction",
            &f1 * sin(deg(45.0)),
            &f_r * sin(Expression::from(deg(195.0)) - &theta),
            &vars,
        )
        .unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let solution = direction.solve_for("theta", &ctx, &SolverConfig::default()).unwrap();
        assert_eq!(solution.method, SolveMethod::ClosedForm);
        assert_eq!(solution.value.unit().symbol(), "deg");
        assert_relative_eq!(solution.value.value(), 155.191_793_24, max_relative = 1e-9);
    }

    #[test]
    fn repeated_unknown_falls_back_to_iteration() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "A", 6.0, "m²");
        unknown(&reg, &mut vars, "w", "m");
        let w = Expression::variable("w");
        // w * (w + 1 m) = 6 m², positive root w = 2 m.
        let lhs = &w * (&w + Quantity::with_unit(&reg, "m", 1.0).unwrap());
        let eq = Equation::new("area", lhs, Expression::variable("A"), &vars).unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let solution = eq.solve_for("w", &ctx, &SolverConfig::default()).unwrap();
        assert!(matches!(solution.method, SolveMethod::Numeric { .. }));
        assert_relative_eq!(solution.value.value(), 2.0, max_relative = 1e-9);
    }

    #[test]
    fn inverse_cosine_closed_form() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "c", -0.5, "dimensionless");
        vars.insert(Variable::unknown("phi", reg.unit("deg").unwrap()).with_guess(200.0))
            .unwrap();
        // acos(-0.5) = 120 deg satisfies the equation, so the guess is unused.
        let lhs = cos(Expression::variable("phi"));
        let eq = Equation::new("c", lhs, Expression::variable("c"), &vars).unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let solution = eq.solve_for("phi", &ctx, &SolverConfig::default()).unwrap();
        assert_eq!(solution.method, SolveMethod::ClosedForm);
        assert_relative_eq!(solution.value.value(), 120.0, max_relative = 1e-12);
    }

    #[test]
    fn no_real_root_hits_iteration_cap() {
        let reg = registry();
        let mut vars = VariableTable::new();
        unknown(&reg, &mut vars, "x", "dimensionless");
        let x = Expression::variable("x");
        let eq = Equation::new("imaginary", &x * &x + 1.0, 0.0, &vars).unwrap();
        let ctx = EvalContext::new(&reg, &vars);
        let err = eq.solve_for("x", &ctx, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, DimsolveError::Convergence { iterations: 100, .. }));
    }

    #[test]
    fn substituted_rendering() {
        let reg = registry();
        let mut vars = VariableTable::new();
        known(&reg, &mut vars, "T_bar", 0.147, "in");
        known(&reg, &mut vars, "U_m", 0.125, "dimensionless");
        unknown(&reg, &mut vars, "T", "in");
        let rhs = Expression::variable("T_bar") * (1.0 - Expression::variable("U_m"));
        let eq = Equation::new("T", Expression::variable("T"), rhs, &vars).unwrap();
        let rendered = eq.render_with(|name| vars.variable(name).and_then(|v| v.quantity().cloned()));
        assert_eq!(rendered, "T = 0.147 in * (1 - 0.125)");
        assert_eq!(eq.to_string(), "T: T = T_bar * (1 - U_m)");
        let unknowns: Vec<_> = eq.unknowns(&vars).collect();
        assert_eq!(unknowns, ["T"]);
    }
}
