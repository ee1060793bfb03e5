//! Closed-form isolation of a single unknown.
//!
//! When the unknown occurs exactly once, the side holding it is peeled one
//! node at a time while the inverse operation is applied to the other side.
//! Inverse trig functions return principal values only, so callers verify the
//! isolated value against the original equation.

use crate::dimension::ANGLE;
use crate::expression::{
    acos, asin, atan, cos, exp, ln, sin, tan, BinaryOp, ExprKind, Expression, MathFunction,
    UnaryOp,
};
use crate::problem::VariableLookup;

/// Rewrites `lhs = rhs` as `name = <expression>`, if the shape allows it.
#[must_use]
pub fn isolate(
    lhs: &Expression,
    rhs: &Expression,
    name: &str,
    variables: &dyn VariableLookup,
) -> Option<Expression> {
    let (mut side, mut target) = match (lhs.occurrences(name), rhs.occurrences(name)) {
        (1, 0) => (lhs.clone(), rhs.clone()),
        (0, 1) => (rhs.clone(), lhs.clone()),
        _ => return None,
    };

    loop {
        let (next, inverted) = match side.kind() {
            ExprKind::Variable(v) if v == name => return Some(target),
            ExprKind::Literal(_) | ExprKind::Variable(_) => return None,
            ExprKind::Unary(UnaryOp::Neg, operand) => (operand.clone(), -target),
            ExprKind::Binary(op, left, right) => invert_binary(*op, left, right, target, name),
            ExprKind::Call(function, args) => {
                let arg = args.first()?.clone();
                let inverted = invert_call(*function, &arg, target, variables)?;
                (arg, inverted)
            }
        };
        side = next;
        target = inverted;
    }
}

fn invert_binary(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
    target: Expression,
    name: &str,
) -> (Expression, Expression) {
    let in_left = left.references(name);
    match (op, in_left) {
        (BinaryOp::Add, true) => (left.clone(), target - right),
        (BinaryOp::Add, false) => (right.clone(), target - left),
        (BinaryOp::Sub, true) => (left.clone(), target + right),
        (BinaryOp::Sub, false) => (right.clone(), left - target),
        (BinaryOp::Mul, true) => (left.clone(), target / right),
        (BinaryOp::Mul, false) => (right.clone(), target / left),
        (BinaryOp::Div, true) => (left.clone(), target * right),
        (BinaryOp::Div, false) => (right.clone(), left / target),
        (BinaryOp::Pow, true) => (left.clone(), target.pow(1.0 / right)),
        (BinaryOp::Pow, false) => (right.clone(), ln(target) / ln(left)),
    }
}

fn invert_call(
    function: MathFunction,
    arg: &Expression,
    target: Expression,
    variables: &dyn VariableLookup,
) -> Option<Expression> {
    let is_angle = || arg.dimension(variables).is_ok_and(|d| d == ANGLE);
    let inverted = match function {
        MathFunction::Sqrt => target.powf(2.0),
        MathFunction::Exp => ln(target),
        MathFunction::Ln => exp(target),
        MathFunction::Log10 => Expression::constant(10.0).pow(target),
        MathFunction::Asin => sin(target),
        MathFunction::Acos => cos(target),
        MathFunction::Atan => tan(target),
        MathFunction::Sin if is_angle() => asin(target),
        MathFunction::Cos if is_angle() => acos(target),
        MathFunction::Tan if is_angle() => atan(target),
        _ => return None,
    };
    Some(inverted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::sqrt;
    use crate::problem::{Variable, VariableStore, VariableTable};
    use crate::units::{initialize_registry, standard_catalog};

    fn v(name: &str) -> Expression {
        Expression::variable(name)
    }

    fn table() -> VariableTable {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut table = VariableTable::new();
        let units = [
            ("theta", "deg"),
            ("x", "dimensionless"),
            ("y", "dimensionless"),
            ("z", "dimensionless"),
        ];
        for (name, unit) in units {
            table
                .insert(Variable::unknown(name, reg.unit(unit).unwrap()))
                .unwrap();
        }
        table
    }

    #[test]
    fn peels_arithmetic() {
        let vars = table();
        let lhs = v("y");
        let rhs = v("z") * (1.0 - v("x"));
        let isolated = isolate(&lhs, &rhs, "x", &vars).unwrap();
        assert_eq!(isolated.render(), "1 - y / z");

        let isolated = isolate(&rhs, &lhs, "z", &vars).unwrap();
        assert_eq!(isolated.render(), "y / (1 - x)");
    }

    #[test]
    fn inverts_powers_and_functions() {
        let vars = table();
        let isolated = isolate(&sqrt(v("x")), &v("y"), "x", &vars).unwrap();
        assert_eq!(isolated.render(), "y^2");
        let isolated = isolate(&v("x").powf(3.0), &v("y"), "x", &vars).unwrap();
        assert_eq!(isolated.render(), "y^(1 / 3)");
        let two_to_x = Expression::constant(2.0).pow(v("x"));
        let isolated = isolate(&two_to_x, &v("y"), "x", &vars).unwrap();
        assert_eq!(isolated.render(), "ln(y) / ln(2)");
        let isolated = isolate(&ln(v("x")), &v("y"), "x", &vars).unwrap();
        assert_eq!(isolated.render(), "exp(y)");
        let isolated = isolate(&-v("x"), &v("y"), "x", &vars).unwrap();
        assert_eq!(isolated.render(), "-y");
    }

    #[test]
    fn trig_needs_an_angle_argument() {
        let vars = table();
        let isolated = isolate(&v("y"), &(v("z") * sin(v("theta"))), "theta", &vars).unwrap();
        assert_eq!(isolated.render(), "asin(y / z)");
        assert!(isolate(&sin(v("x")), &v("y"), "x", &vars).is_none());
    }

    #[test]
    fn repeated_or_missing_unknown_is_not_isolated() {
        let vars = table();
        assert!(isolate(&(v("x") * v("x")), &v("y"), "x", &vars).is_none());
        assert!(isolate(&v("x"), &v("x"), "x", &vars).is_none());
        assert!(isolate(&v("y"), &v("z"), "x", &vars).is_none());
        assert!(isolate(&v("y"), &crate::expression::abs(v("x")), "x", &vars).is_none());
    }
}
