//! Built-in functions and their dimension rules.

use std::cmp::Ordering;
use std::fmt;

use super::Expression;
use crate::dimension::{DimensionSignature, ANGLE, DIMENSIONLESS};
use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;
use crate::quantity::Quantity;
use crate::units::UnitRegistry;

/// Slack allowed on the `[-1, 1]` domain of `asin`/`acos` before failing.
const UNIT_INTERVAL_SLACK: Scalar = 1.0e-12;

/// Accepted argument dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDomain {
    /// Any dimension.
    Any,
    /// Pure numbers only.
    Dimensionless,
    /// Pure numbers (read as radians) or angles.
    DimensionlessOrAngle,
    /// Two arguments of the same dimension.
    SamePair,
}

/// Result dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDimension {
    /// Dimension of the first argument.
    Same,
    /// Pure number.
    Dimensionless,
    /// Plane angle.
    Angle,
    /// Square root of the argument's dimension.
    SquareRoot,
}

/// Functions callable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    /// Square root.
    Sqrt,
    /// Absolute value.
    Abs,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Arcsine, returns an angle.
    Asin,
    /// Arccosine, returns an angle.
    Acos,
    /// Arctangent, returns an angle.
    Atan,
    /// Two-argument arctangent `atan2(y, x)`, returns an angle.
    Atan2,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Ln,
    /// Base-10 logarithm.
    Log10,
    /// Smaller of two quantities.
    Min,
    /// Larger of two quantities.
    Max,
}

impl MathFunction {
    /// Every function.
    pub const ALL: [Self; 14] = [
        Self::Sqrt,
        Self::Abs,
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Atan2,
        Self::Exp,
        Self::Ln,
        Self::Log10,
        Self::Min,
        Self::Max,
    ];

    /// Name used in rendering.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Number of arguments.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Min | Self::Max => 2,
            _ => 1,
        }
    }

    /// Accepted argument dimensions.
    #[must_use]
    pub const fn domain(self) -> InputDomain {
        match self {
            Self::Sqrt | Self::Abs => InputDomain::Any,
            Self::Sin | Self::Cos | Self::Tan => InputDomain::DimensionlessOrAngle,
            Self::Asin | Self::Acos | Self::Atan | Self::Exp | Self::Ln | Self::Log10 => {
                InputDomain::Dimensionless
            }
            Self::Atan2 | Self::Min | Self::Max => InputDomain::SamePair,
        }
    }

    /// Result dimension rule.
    #[must_use]
    pub const fn output(self) -> OutputDimension {
        match self {
            Self::Sqrt => OutputDimension::SquareRoot,
            Self::Abs | Self::Min | Self::Max => OutputDimension::Same,
            Self::Asin | Self::Acos | Self::Atan | Self::Atan2 => OutputDimension::Angle,
            Self::Sin | Self::Cos | Self::Tan | Self::Exp | Self::Ln | Self::Log10 => {
                OutputDimension::Dimensionless
            }
        }
    }

    /// Checks arity and argument dimensions, returning the result dimension.
    pub fn output_dimension(self, args: &[DimensionSignature]) -> Result<DimensionSignature> {
        if args.len() != self.arity() {
            return Err(DimsolveError::Domain(format!(
                "{} expects {} argument(s), got {}",
                self.name(),
                self.arity(),
                args.len()
            )));
        }
        let first = args[0];
        match self.domain() {
            InputDomain::Any => {}
            InputDomain::Dimensionless if first.is_dimensionless() => {}
            InputDomain::DimensionlessOrAngle if first.is_dimensionless() || first == ANGLE => {}
            InputDomain::SamePair if args[1] == first => {}
            InputDomain::SamePair => {
                return Err(DimsolveError::mismatch(self.name(), first, args[1]));
            }
            InputDomain::Dimensionless | InputDomain::DimensionlessOrAngle => {
                return Err(DimsolveError::mismatch(self.name(), DIMENSIONLESS, first));
            }
        }
        match self.output() {
            OutputDimension::Same => Ok(first),
            OutputDimension::Dimensionless => Ok(DIMENSIONLESS),
            OutputDimension::Angle => Ok(ANGLE),
            OutputDimension::SquareRoot => first.power(0.5),
        }
    }

    /// Applies the function to evaluated arguments.
    pub fn apply(self, args: &[Quantity], registry: &UnitRegistry) -> Result<Quantity> {
        let dims: Vec<_> = args.iter().map(Quantity::dimension).collect();
        self.output_dimension(&dims)?;
        let x = &args[0];
        let angle = |radians: Scalar| Quantity::from_si(registry, ANGLE, radians);
        let number = Quantity::dimensionless;
        let result = match self {
            Self::Sqrt => return x.try_sqrt(registry),
            Self::Abs => return Ok(x.abs()),
            Self::Sin => number(x.si_value().sin()),
            Self::Cos => number(x.si_value().cos()),
            Self::Tan => number(x.si_value().tan()),
            Self::Asin => angle(unit_interval(self, x.si_value())?.asin()),
            Self::Acos => angle(unit_interval(self, x.si_value())?.acos()),
            Self::Atan => angle(x.si_value().atan()),
            Self::Atan2 => angle(x.si_value().atan2(args[1].si_value())),
            Self::Exp => number(x.si_value().exp()),
            Self::Ln | Self::Log10 => {
                let value = x.si_value();
                if value <= 0.0 {
                    return Err(DimsolveError::Domain(format!(
                        "{}({value}) is undefined",
                        self.name()
                    )));
                }
                number(if self == Self::Ln { value.ln() } else { value.log10() })
            }
            Self::Min | Self::Max => {
                let ordering = x.compare(&args[1], registry)?;
                let pick_first = match self {
                    Self::Min => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                return Ok(if pick_first { x.clone() } else { args[1].clone() });
            }
        };
        if result.value().is_finite() {
            Ok(result)
        } else {
            Err(DimsolveError::Domain(format!(
                "{}({x}) is not finite",
                self.name()
            )))
        }
    }
}

impl fmt::Display for MathFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unit_interval(function: MathFunction, value: Scalar) -> Result<Scalar> {
    if value.abs() <= 1.0 {
        Ok(value)
    } else if value.abs() <= 1.0 + UNIT_INTERVAL_SLACK {
        Ok(value.clamp(-1.0, 1.0))
    } else {
        Err(DimsolveError::Domain(format!(
            "{}({value}) is outside [-1, 1]",
            function.name()
        )))
    }
}

macro_rules! unary_functions {
    ($($(#[$doc:meta])* $name:ident => $function:ident;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name(x: impl Into<Expression>) -> Expression {
                Expression::call(MathFunction::$function, vec![x.into()])
            }
        )*
    };
}

unary_functions! {
    /// `sqrt(x)`
    sqrt => Sqrt;
    /// `abs(x)`
    abs => Abs;
    /// `sin(x)`
    sin => Sin;
    /// `cos(x)`
    cos => Cos;
    /// `tan(x)`
    tan => Tan;
    /// `asin(x)`
    asin => Asin;
    /// `acos(x)`
    acos => Acos;
    /// `atan(x)`
    atan => Atan;
    /// `exp(x)`
    exp => Exp;
    /// `ln(x)`
    ln => Ln;
    /// `log10(x)`
    log10 => Log10;
}

/// `atan2(y, x)`
#[must_use]
pub fn atan2(y: impl Into<Expression>, x: impl Into<Expression>) -> Expression {
    Expression::call(MathFunction::Atan2, vec![y.into(), x.into()])
}

/// `min(a, b)`
#[must_use]
pub fn min(a: impl Into<Expression>, b: impl Into<Expression>) -> Expression {
    Expression::call(MathFunction::Min, vec![a.into(), b.into()])
}

/// `max(a, b)`
#[must_use]
pub fn max(a: impl Into<Expression>, b: impl Into<Expression>) -> Expression {
    Expression::call(MathFunction::Max, vec![a.into(), b.into()])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use super::*;
    use crate::dimension::{AREA, LENGTH};
    use crate::units::{initialize_registry, standard_catalog};

    fn registry() -> Arc<UnitRegistry> {
        initialize_registry(standard_catalog()).unwrap()
    }

    #[test]
    fn arity_and_dimension_rules() {
        assert_eq!(MathFunction::Sqrt.output_dimension(&[AREA]).unwrap(), LENGTH);
        assert_eq!(MathFunction::Sin.output_dimension(&[ANGLE]).unwrap(), DIMENSIONLESS);
        assert_eq!(MathFunction::Atan2.output_dimension(&[LENGTH, LENGTH]).unwrap(), ANGLE);
        assert!(MathFunction::Sin.output_dimension(&[LENGTH]).is_err());
        assert!(MathFunction::Ln.output_dimension(&[ANGLE]).is_err());
        assert!(MathFunction::Min.output_dimension(&[LENGTH, AREA]).is_err());
        assert!(matches!(
            MathFunction::Atan2.output_dimension(&[LENGTH]),
            Err(DimsolveError::Domain(_))
        ));
        for function in MathFunction::ALL {
            assert!(!function.name().is_empty());
        }
    }

    #[test]
    fn trig_accepts_degrees() {
        let reg = registry();
        let angle = Quantity::with_unit(&reg, "deg", 30.0).unwrap();
        let s = MathFunction::Sin.apply(&[angle], &reg).unwrap();
        assert!(s.dimension().is_dimensionless());
        assert_relative_eq!(s.value(), 0.5, max_relative = 1e-12);
    }

    #[test]
    fn inverse_trig_returns_radians() {
        let reg = registry();
        let a = MathFunction::Asin
            .apply(&[Quantity::dimensionless(1.0)], &reg)
            .unwrap();
        assert_eq!(a.dimension(), ANGLE);
        assert_eq!(a.unit().symbol(), "rad");
        assert_relative_eq!(a.value(), std::f64::consts::FRAC_PI_2);
        let y = Quantity::with_unit(&reg, "ft", 1.0).unwrap();
        let x = Quantity::with_unit(&reg, "in", -12.0).unwrap();
        let theta = MathFunction::Atan2.apply(&[y, x], &reg).unwrap();
        assert_relative_eq!(theta.value_in(&reg, "deg").unwrap(), 135.0, max_relative = 1e-12);
    }

    #[test]
    fn domain_errors() {
        let reg = registry();
        let cases = [
            (MathFunction::Sqrt, -1.0),
            (MathFunction::Ln, 0.0),
            (MathFunction::Log10, -3.0),
            (MathFunction::Asin, 2.0),
            (MathFunction::Acos, -1.5),
        ];
        for (function, value) in cases {
            assert!(
                matches!(
                    function.apply(&[Quantity::dimensionless(value)], &reg),
                    Err(DimsolveError::Domain(_))
                ),
                "{function}({value}) should be out of domain"
            );
        }
        assert!(MathFunction::Exp
            .apply(&[Quantity::dimensionless(1.0e6)], &reg)
            .is_err());
    }

    #[test]
    fn min_max_compare_across_units() {
        let reg = registry();
        let a = Quantity::with_unit(&reg, "ft", 1.0).unwrap();
        let b = Quantity::with_unit(&reg, "in", 13.0).unwrap();
        let lo = MathFunction::Min.apply(&[a.clone(), b.clone()], &reg).unwrap();
        let hi = MathFunction::Max.apply(&[a, b], &reg).unwrap();
        assert_eq!(lo.unit().symbol(), "ft");
        assert_eq!(hi.unit().symbol(), "in");
    }
}
