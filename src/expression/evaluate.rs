//! Expression evaluation with structural memoization.
//!
//! Each composite node keeps its last value together with the identity of the
//! variable store and registry it was computed against and the dependency
//! stamp: the highest store generation among the variables it references.
//! Assigning any referenced variable bumps that stamp, so a stale entry can
//! never match. Nodes that read a trial binding bypass the cache entirely.

use std::cell::Cell;
use std::collections::BTreeMap;

use tracing::trace;

use super::{BinaryOp, ExprKind, Expression, UnaryOp};
use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;
use crate::problem::VariableLookup;
use crate::quantity::Quantity;
use crate::units::UnitRegistry;

/// Evaluation counters for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Nodes whose value was computed.
    pub node_evaluations: u64,
    /// Nodes served from their cache.
    pub cache_hits: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    store_id: u64,
    registry_id: u64,
    stamp: u64,
    value: Quantity,
}

/// Everything an expression needs to produce a value.
pub struct EvalContext<'a> {
    registry: &'a UnitRegistry,
    variables: &'a dyn VariableLookup,
    trial: Option<&'a BTreeMap<String, Quantity>>,
    stats: Cell<EvalStats>,
}

impl<'a> EvalContext<'a> {
    /// Context reading stored variable values.
    #[must_use]
    pub fn new(registry: &'a UnitRegistry, variables: &'a dyn VariableLookup) -> Self {
        Self {
            registry,
            variables,
            trial: None,
            stats: Cell::new(EvalStats::default()),
        }
    }

    /// Context in which `trial` values shadow stored ones.
    #[must_use]
    pub fn with_trial<'b>(&self, trial: &'b BTreeMap<String, Quantity>) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            registry: self.registry,
            variables: self.variables,
            trial: Some(trial),
            stats: Cell::new(EvalStats::default()),
        }
    }

    /// Unit registry.
    #[must_use]
    pub fn registry(&self) -> &'a UnitRegistry {
        self.registry
    }

    /// Variable store.
    #[must_use]
    pub fn variables(&self) -> &'a dyn VariableLookup {
        self.variables
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> EvalStats {
        self.stats.get()
    }

    /// Value of a variable: trial binding first, then the store.
    pub fn lookup(&self, name: &str) -> Result<Quantity> {
        if let Some(value) = self.trial.and_then(|trial| trial.get(name)) {
            return Ok(value.clone());
        }
        let variable = self
            .variables
            .variable(name)
            .ok_or_else(|| DimsolveError::UndefinedVariable(name.to_string()))?;
        variable
            .quantity()
            .cloned()
            .ok_or_else(|| DimsolveError::UnknownVariable(name.to_string()))
    }

    fn is_trial_bound(&self, expression: &Expression) -> bool {
        self.trial.is_some_and(|trial| {
            expression
                .variables()
                .iter()
                .any(|name| trial.contains_key(name))
        })
    }

    fn stamp(&self, expression: &Expression) -> u64 {
        expression
            .variables()
            .iter()
            .filter_map(|name| self.variables.variable(name))
            .map(|variable| variable.stamp())
            .max()
            .unwrap_or(0)
    }

    fn record(&self, update: impl FnOnce(&mut EvalStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl Expression {
    /// Evaluates the expression.
    ///
    /// Fails with [`DimsolveError::UnknownVariable`] when a referenced
    /// variable has no value yet, and with the dimension or domain error of
    /// the first failing node otherwise.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Quantity> {
        let cacheable = matches!(
            self.kind(),
            ExprKind::Unary(..) | ExprKind::Binary(..) | ExprKind::Call(..)
        ) && !ctx.is_trial_bound(self);
        if !cacheable {
            ctx.record(|stats| stats.node_evaluations += 1);
            return self.evaluate_node(ctx);
        }

        let store_id = ctx.variables.store_id();
        let registry_id = ctx.registry.id();
        let stamp = ctx.stamp(self);
        let hit = self.0.cache.borrow().as_ref().and_then(|entry| {
            (entry.store_id == store_id && entry.registry_id == registry_id && entry.stamp == stamp)
                .then(|| entry.value.clone())
        });
        if let Some(value) = hit {
            ctx.record(|stats| stats.cache_hits += 1);
            return Ok(value);
        }

        ctx.record(|stats| stats.node_evaluations += 1);
        let value = self.evaluate_node(ctx)?;
        trace!(expression = %self, value = %value, "evaluated");
        *self.0.cache.borrow_mut() = Some(CacheEntry {
            store_id,
            registry_id,
            stamp,
            value: value.clone(),
        });
        Ok(value)
    }

    fn evaluate_node(&self, ctx: &EvalContext<'_>) -> Result<Quantity> {
        let registry = ctx.registry;
        match self.kind() {
            ExprKind::Literal(quantity) => Ok(quantity.clone()),
            ExprKind::Variable(name) => ctx.lookup(name),
            ExprKind::Unary(UnaryOp::Neg, operand) => Ok(-operand.evaluate(ctx)?),
            ExprKind::Binary(op, left, right) => {
                let a = left.evaluate(ctx)?;
                let b = right.evaluate(ctx)?;
                match op {
                    BinaryOp::Add => a.try_add(&b, registry),
                    BinaryOp::Sub => a.try_sub(&b, registry),
                    BinaryOp::Mul => a.try_mul(&b, registry),
                    BinaryOp::Div => a.try_div(&b, registry),
                    BinaryOp::Pow => {
                        if !b.dimension().is_dimensionless() {
                            return Err(DimsolveError::mismatch(
                                &format!("exponent of `{self}`"),
                                crate::dimension::DIMENSIONLESS,
                                b.dimension(),
                            ));
                        }
                        a.try_pow(b.si_value(), registry)
                    }
                }
            }
            ExprKind::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(ctx))
                    .collect::<Result<Vec<_>>>()?;
                function.apply(&values, registry)
            }
        }
    }

    /// Coherent-SI magnitude with every sum counted term by term.
    ///
    /// This is the size a cancellation error in the value is relative to:
    /// `a - b` with `a ≈ b` has a value near zero but a magnitude of
    /// `|a| + |b|`. Products and quotients carry the magnitudes of their
    /// factors, powers that of their base.
    pub fn magnitude(&self, ctx: &EvalContext<'_>) -> Result<Scalar> {
        let magnitude = match self.kind() {
            ExprKind::Unary(UnaryOp::Neg, operand) => operand.magnitude(ctx)?,
            ExprKind::Binary(BinaryOp::Add | BinaryOp::Sub, left, right) => {
                left.magnitude(ctx)? + right.magnitude(ctx)?
            }
            ExprKind::Binary(BinaryOp::Mul, left, right) => {
                left.magnitude(ctx)? * right.magnitude(ctx)?
            }
            ExprKind::Binary(BinaryOp::Div, left, right) => {
                left.magnitude(ctx)? / right.evaluate(ctx)?.si_value().abs()
            }
            ExprKind::Binary(BinaryOp::Pow, base, exponent) => {
                let exponent = exponent.evaluate(ctx)?.si_value();
                base.magnitude(ctx)?.powf(exponent)
            }
            ExprKind::Literal(_) | ExprKind::Variable(_) | ExprKind::Call(..) => {
                self.evaluate(ctx)?.si_value().abs()
            }
        };
        if magnitude.is_finite() {
            Ok(magnitude)
        } else {
            Ok(self.evaluate(ctx)?.si_value().abs())
        }
    }
}
