//! Canonical string rendering.
//!
//! Parentheses are emitted only where precedence requires them
//! (unary > pow > mul/div > add/sub). `-` and `/` group to the left, `^` to
//! the right. A literal carrying a unit reads like a product (`0.147 in`) and
//! is grouped accordingly.

use std::fmt;

use super::{BinaryOp, ExprKind, Expression, UnaryOp};
use crate::quantity::Quantity;

const ADDITIVE: u8 = 1;
const MULTIPLICATIVE: u8 = 2;
const POWER: u8 = 3;
const PREFIX: u8 = 4;
const ATOM: u8 = 5;

const fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div => MULTIPLICATIVE,
        BinaryOp::Pow => POWER,
    }
}

fn literal_precedence(quantity: &Quantity) -> u8 {
    if !quantity.unit().symbol().is_empty() {
        MULTIPLICATIVE
    } else if quantity.value().is_sign_negative() {
        PREFIX
    } else {
        ATOM
    }
}

impl Expression {
    /// Canonical form, e.g. `T_bar * (1 - U_m)`.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_with(|_| None)
    }

    /// Canonical form with variable values substituted where `substitute`
    /// returns one, e.g. `0.147 in * (1 - 0.125)`.
    #[must_use]
    pub fn render_with<F>(&self, substitute: F) -> String
    where
        F: Fn(&str) -> Option<Quantity>,
    {
        let mut out = String::new();
        self.write_to(&mut out, &substitute);
        out
    }

    fn precedence_with<F>(&self, substitute: &F) -> u8
    where
        F: Fn(&str) -> Option<Quantity>,
    {
        match self.kind() {
            ExprKind::Literal(quantity) => literal_precedence(quantity),
            ExprKind::Variable(name) => substitute(name).as_ref().map_or(ATOM, literal_precedence),
            ExprKind::Unary(..) => PREFIX,
            ExprKind::Binary(op, ..) => binary_precedence(*op),
            ExprKind::Call(..) => ATOM,
        }
    }

    fn write_grouped<F>(&self, out: &mut String, substitute: &F, grouped: bool)
    where
        F: Fn(&str) -> Option<Quantity>,
    {
        if grouped {
            out.push('(');
            self.write_to(out, substitute);
            out.push(')');
        } else {
            self.write_to(out, substitute);
        }
    }

    fn write_to<F>(&self, out: &mut String, substitute: &F)
    where
        F: Fn(&str) -> Option<Quantity>,
    {
        match self.kind() {
            ExprKind::Literal(quantity) => out.push_str(&quantity.to_string()),
            ExprKind::Variable(name) => match substitute(name) {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str(name),
            },
            ExprKind::Unary(UnaryOp::Neg, operand) => {
                out.push('-');
                let inner = operand.precedence_with(substitute);
                operand.write_grouped(out, substitute, inner <= PREFIX);
            }
            ExprKind::Binary(op, left, right) => {
                let precedence = binary_precedence(*op);
                let lp = left.precedence_with(substitute);
                let rp = right.precedence_with(substitute);
                let (group_left, group_right) = match op {
                    BinaryOp::Pow => (lp <= PREFIX, rp < precedence),
                    BinaryOp::Sub | BinaryOp::Div => (lp < precedence, rp <= precedence),
                    BinaryOp::Add | BinaryOp::Mul => (lp < precedence, rp < precedence),
                };
                let group_right = group_right || rp == PREFIX;
                left.write_grouped(out, substitute, group_left);
                if *op == BinaryOp::Pow {
                    out.push('^');
                } else {
                    out.push(' ');
                    out.push_str(op.symbol());
                    out.push(' ');
                }
                right.write_grouped(out, substitute, group_right);
            }
            ExprKind::Call(function, args) => {
                out.push_str(function.name());
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write_to(out, substitute);
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{atan2, sin};
    use crate::units::{initialize_registry, standard_catalog};

    fn v(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn precedence_drops_redundant_parentheses() {
        assert_eq!((v("a") + v("b") * v("c")).render(), "a + b * c");
        assert_eq!(((v("a") + v("b")) * v("c")).render(), "(a + b) * c");
        assert_eq!((v("a") - (v("b") - v("c"))).render(), "a - (b - c)");
        assert_eq!((v("a") - v("b") - v("c")).render(), "a - b - c");
        assert_eq!((v("a") / (v("b") * v("c"))).render(), "a / (b * c)");
        assert_eq!((v("a") * v("b")).powf(2.0).render(), "(a * b)^2");
        assert_eq!((-v("a")).powf(2.0).render(), "(-a)^2");
        assert_eq!((-(v("a") + v("b"))).render(), "-(a + b)");
        assert_eq!(v("a").pow(v("b").pow(v("c"))).render(), "a^b^c");
        assert_eq!(v("a").pow(v("b")).pow(v("c")).render(), "(a^b)^c");
        assert_eq!(atan2(v("y"), v("x")).render(), "atan2(y, x)");
    }

    #[test]
    fn literals_with_units_group_like_products() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let t = Quantity::with_unit(&reg, "in", 0.147).unwrap();
        let angle = Quantity::with_unit(&reg, "deg", 45.0).unwrap();
        assert_eq!((v("x") / t.clone()).render(), "x / (0.147 in)");
        assert_eq!((Expression::from(t) * 2.0).render(), "0.147 in * 2");
        assert_eq!(sin(angle).render(), "sin(45 deg)");
        assert_eq!((v("x") - Expression::constant(-1.0)).render(), "x - (-1)");
    }

    #[test]
    fn substituted_rendering() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let e = v("T_bar") * (1.0 - v("U_m"));
        let rendered = e.render_with(|name| match name {
            "T_bar" => Quantity::with_unit(&reg, "in", 0.147).ok(),
            "U_m" => Some(Quantity::dimensionless(0.125)),
            _ => None,
        });
        assert_eq!(e.to_string(), "T_bar * (1 - U_m)");
        assert_eq!(rendered, "0.147 in * (1 - 0.125)");
    }
}
