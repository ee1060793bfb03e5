//! Immutable expression trees over quantities and named variables.
//!
//! An [`Expression`] is a reference-counted node, so sub-expressions can be
//! shared freely between equations; the resulting graph is acyclic by
//! construction. Each node knows the set of variables below it and owns a
//! single-slot evaluation cache (see [`evaluate`]).
//!
//! ```
//! use dimsolve::prelude::*;
//!
//! let registry = initialize_registry(standard_catalog()).unwrap();
//! let f1 = Expression::variable("F_1");
//! let f2 = Expression::variable("F_2");
//! let angle = Quantity::with_unit(&registry, StandardUnit::Degree, 45.0).unwrap();
//! let rhs = sqrt(f1.powf(2.0) + f2.powf(2.0) - 2.0 * &f1 * &f2 * cos(angle));
//! assert_eq!(rhs.to_string(), "sqrt(F_1^2 + F_2^2 - 2 * F_1 * F_2 * cos(45 deg))");
//! assert_eq!(rhs.occurrences("F_1"), 2);
//! ```

/// Evaluation context, trial bindings and the per-node cache.
pub mod evaluate;
/// Built-in mathematical functions with dimension rules.
pub mod functions;
/// Canonical and substituted string rendering.
pub mod render;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

pub use evaluate::{EvalContext, EvalStats};
pub use functions::{
    abs, acos, asin, atan, atan2, cos, exp, ln, log10, max, min, sin, sqrt, tan, InputDomain,
    MathFunction, OutputDimension,
};

use crate::dimension::{DimensionSignature, DIMENSIONLESS};
use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;
use crate::problem::VariableLookup;
use crate::quantity::Quantity;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`
    Pow,
}

impl BinaryOp {
    /// Operator symbol used in rendering.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }
}

/// Node payload.
#[derive(Debug)]
pub enum ExprKind {
    /// A constant quantity.
    Literal(Quantity),
    /// A reference to a named variable.
    Variable(String),
    /// Prefix operation.
    Unary(UnaryOp, Expression),
    /// Infix operation.
    Binary(BinaryOp, Expression, Expression),
    /// Function call.
    Call(MathFunction, Vec<Expression>),
}

#[derive(Debug)]
struct Node {
    kind: ExprKind,
    variables: BTreeSet<String>,
    cache: RefCell<Option<evaluate::CacheEntry>>,
}

/// Shared handle to an immutable expression node.
#[derive(Debug, Clone)]
pub struct Expression(Rc<Node>);

impl Expression {
    fn from_kind(kind: ExprKind) -> Self {
        let mut variables = BTreeSet::new();
        match &kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable(name) => {
                variables.insert(name.clone());
            }
            ExprKind::Unary(_, operand) => variables.extend(operand.variables().iter().cloned()),
            ExprKind::Binary(_, left, right) => {
                variables.extend(left.variables().iter().cloned());
                variables.extend(right.variables().iter().cloned());
            }
            ExprKind::Call(_, args) => {
                for arg in args {
                    variables.extend(arg.variables().iter().cloned());
                }
            }
        }
        Self(Rc::new(Node {
            kind,
            variables,
            cache: RefCell::new(None),
        }))
    }

    /// Constant quantity leaf.
    #[must_use]
    pub fn literal(quantity: Quantity) -> Self {
        Self::from_kind(ExprKind::Literal(quantity))
    }

    /// Dimensionless constant leaf.
    #[must_use]
    pub fn constant(value: Scalar) -> Self {
        Self::literal(Quantity::dimensionless(value))
    }

    /// Variable reference leaf.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::from_kind(ExprKind::Variable(name.into()))
    }

    /// Prefix node.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::from_kind(ExprKind::Unary(op, operand))
    }

    /// Infix node.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::from_kind(ExprKind::Binary(op, left, right))
    }

    /// Function call node. Arity is checked on evaluation.
    #[must_use]
    pub fn call(function: MathFunction, args: Vec<Self>) -> Self {
        Self::from_kind(ExprKind::Call(function, args))
    }

    /// `self ^ exponent`.
    #[must_use]
    pub fn pow(&self, exponent: impl Into<Self>) -> Self {
        Self::binary(BinaryOp::Pow, self.clone(), exponent.into())
    }

    /// `self ^ n` for a numeric exponent.
    #[must_use]
    pub fn powf(&self, n: Scalar) -> Self {
        self.pow(Self::constant(n))
    }

    /// `sqrt(self)`.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        Self::call(MathFunction::Sqrt, vec![self.clone()])
    }

    /// Node payload.
    #[must_use]
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Names of all variables referenced below this node.
    #[must_use]
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.0.variables
    }

    /// True when `name` appears below this node.
    #[must_use]
    pub fn references(&self, name: &str) -> bool {
        self.0.variables.contains(name)
    }

    /// Number of leaves referring to `name`.
    #[must_use]
    pub fn occurrences(&self, name: &str) -> usize {
        if !self.references(name) {
            return 0;
        }
        match self.kind() {
            ExprKind::Literal(_) => 0,
            ExprKind::Variable(v) => usize::from(v == name),
            ExprKind::Unary(_, operand) => operand.occurrences(name),
            ExprKind::Binary(_, left, right) => left.occurrences(name) + right.occurrences(name),
            ExprKind::Call(_, args) => args.iter().map(|arg| arg.occurrences(name)).sum(),
        }
    }

    /// True when both handles share the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Folds a variable-free dimensionless sub-tree into a number.
    ///
    /// Only arithmetic operators are folded; function calls return `None`.
    #[must_use]
    pub fn constant_value(&self) -> Option<Scalar> {
        match self.kind() {
            ExprKind::Literal(q) if q.dimension().is_dimensionless() => Some(q.si_value()),
            ExprKind::Unary(UnaryOp::Neg, operand) => operand.constant_value().map(Neg::neg),
            ExprKind::Binary(op, left, right) => {
                let (a, b) = (left.constant_value()?, right.constant_value()?);
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                };
                value.is_finite().then_some(value)
            }
            _ => None,
        }
    }

    /// Static dimension of the expression, using declared variable
    /// dimensions so unknowns need no value.
    ///
    /// A dimensional base may only be raised to a constant exponent.
    pub fn dimension(&self, variables: &dyn VariableLookup) -> Result<DimensionSignature> {
        match self.kind() {
            ExprKind::Literal(q) => Ok(q.dimension()),
            ExprKind::Variable(name) => variables
                .variable(name)
                .map(|variable| variable.dimension())
                .ok_or_else(|| DimsolveError::UndefinedVariable(name.clone())),
            ExprKind::Unary(UnaryOp::Neg, operand) => operand.dimension(variables),
            ExprKind::Binary(op, left, right) => {
                let a = left.dimension(variables)?;
                let b = right.dimension(variables)?;
                match op {
                    BinaryOp::Add | BinaryOp::Sub => {
                        if a == b {
                            Ok(a)
                        } else {
                            Err(DimsolveError::mismatch(&format!("`{self}`"), a, b))
                        }
                    }
                    BinaryOp::Mul => a.multiply(b),
                    BinaryOp::Div => a.divide(b),
                    BinaryOp::Pow => {
                        if !b.is_dimensionless() {
                            return Err(DimsolveError::mismatch(
                                &format!("exponent of `{self}`"),
                                DIMENSIONLESS,
                                b,
                            ));
                        }
                        if a.is_dimensionless() {
                            return Ok(DIMENSIONLESS);
                        }
                        let n = right.constant_value().ok_or_else(|| {
                            DimsolveError::DimensionalMismatch(format!(
                                "`{self}`: a base of dimension [{a}] needs a constant exponent"
                            ))
                        })?;
                        a.power(n)
                    }
                }
            }
            ExprKind::Call(function, args) => {
                let dims = args
                    .iter()
                    .map(|arg| arg.dimension(variables))
                    .collect::<Result<Vec<_>>>()?;
                function.output_dimension(&dims)
            }
        }
    }
}

impl From<Quantity> for Expression {
    fn from(quantity: Quantity) -> Self {
        Self::literal(quantity)
    }
}

impl From<&Quantity> for Expression {
    fn from(quantity: &Quantity) -> Self {
        Self::literal(quantity.clone())
    }
}

impl From<Scalar> for Expression {
    fn from(value: Scalar) -> Self {
        Self::constant(value)
    }
}

impl From<&Self> for Expression {
    fn from(expression: &Self) -> Self {
        expression.clone()
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expression>> $trait<R> for Expression {
            type Output = Expression;

            fn $method(self, rhs: R) -> Expression {
                Expression::binary($op, self, rhs.into())
            }
        }

        impl<R: Into<Expression>> $trait<R> for &Expression {
            type Output = Expression;

            fn $method(self, rhs: R) -> Expression {
                Expression::binary($op, self.clone(), rhs.into())
            }
        }

        impl $trait<Expression> for Scalar {
            type Output = Expression;

            fn $method(self, rhs: Expression) -> Expression {
                Expression::binary($op, Expression::constant(self), rhs)
            }
        }

        impl $trait<&Expression> for Scalar {
            type Output = Expression;

            fn $method(self, rhs: &Expression) -> Expression {
                Expression::binary($op, Expression::constant(self), rhs.clone())
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);

impl Neg for Expression {
    type Output = Self;

    fn neg(self) -> Self {
        Self::unary(UnaryOp::Neg, self)
    }
}

impl Neg for &Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::unary(UnaryOp::Neg, self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{AREA, FORCE, LENGTH, PRESSURE};
    use crate::problem::{Variable, VariableStore, VariableTable};
    use crate::units::{initialize_registry, standard_catalog};

    fn table() -> VariableTable {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut table = VariableTable::new();
        table
            .insert(Variable::unknown("F", reg.unit("N").unwrap()))
            .unwrap();
        table
            .insert(Variable::unknown("A", reg.unit("in²").unwrap()))
            .unwrap();
        table
            .insert(Variable::unknown("L", reg.unit("ft").unwrap()))
            .unwrap();
        table
    }

    #[test]
    fn variables_are_collected_bottom_up() {
        let f = Expression::variable("F");
        let a = Expression::variable("A");
        let e = &f / &a + &f * 2.0;
        let names: Vec<_> = e.variables().iter().map(String::as_str).collect();
        assert_eq!(names, ["A", "F"]);
        assert_eq!(e.occurrences("F"), 2);
        assert_eq!(e.occurrences("L"), 0);
        assert!(!e.references("L"));
    }

    #[test]
    fn static_dimensions() {
        let vars = table();
        let f = Expression::variable("F");
        let a = Expression::variable("A");
        let l = Expression::variable("L");
        assert_eq!((&f / &a).dimension(&vars).unwrap(), PRESSURE);
        assert_eq!(l.powf(2.0).dimension(&vars).unwrap(), AREA);
        assert_eq!(a.sqrt().dimension(&vars).unwrap(), LENGTH);
        assert_eq!((-&f).dimension(&vars).unwrap(), FORCE);
        assert!(matches!(
            (&f + &l).dimension(&vars),
            Err(DimsolveError::DimensionalMismatch(_))
        ));
        assert!(matches!(
            l.sqrt().dimension(&vars),
            Err(DimsolveError::DimensionalMismatch(_))
        ));
        assert!(matches!(
            Expression::variable("missing").dimension(&vars),
            Err(DimsolveError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn dimensional_base_needs_constant_exponent() {
        let vars = table();
        let l = Expression::variable("L");
        let e = l.pow(Expression::constant(1.0) + Expression::constant(2.0));
        assert_eq!(e.dimension(&vars).unwrap(), LENGTH.power(3.0).unwrap());
        let ratio = Expression::variable("L") / Expression::variable("L");
        assert!(l.pow(ratio).dimension(&vars).is_err());
    }

    #[test]
    fn constant_folding() {
        let e = (Expression::constant(1.0) - 0.125) * 8.0;
        assert_eq!(e.constant_value(), Some(7.0));
        assert_eq!(Expression::variable("x").constant_value(), None);
        assert_eq!((Expression::constant(1.0) / 0.0).constant_value(), None);
    }

    #[test]
    fn shared_subexpressions() {
        let f = Expression::variable("F");
        let twice = &f + &f;
        match twice.kind() {
            ExprKind::Binary(BinaryOp::Add, l, r) => assert!(l.ptr_eq(r)),
            other => panic!("unexpected node {other:?}"),
        }
    }
}
