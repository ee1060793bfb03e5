//! Dimensionally-checked quantity arithmetic.
//!
//! A [`Quantity`] is an immutable `(value, unit)` pair. Every operation
//! returns a new quantity and fails fast with
//! [`DimsolveError::DimensionalMismatch`] instead of coercing.
//!
//! - Addition, subtraction and comparison convert the right operand into the
//!   left operand's unit. Operands already in the same unit skip conversion.
//! - Multiplication, division and powers combine dimension signatures. The
//!   result unit is a registered unit with the same dimension and scale when
//!   one exists, otherwise a composite unit carrying the combined SI factor.
//! - Affine operands (°C, °F) are moved to their coherent SI form before
//!   multiplicative operations.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

use crate::dimension::DimensionSignature;
use crate::errors::{DimsolveError, Result};
use crate::math::{format_significant, Scalar};
use crate::units::{Unit, UnitDefinition, UnitRegistry};

/// Significant digits used by `Display` when no precision is requested.
const DISPLAY_DIGITS: usize = 6;

/// A numeric value paired with a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: Scalar,
    unit: Unit,
}

impl Quantity {
    /// Creates a quantity from a value and a unit handle.
    #[must_use]
    pub fn new(value: Scalar, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Creates a quantity from a registered unit name, symbol or [`StandardUnit`](crate::units::StandardUnit).
    pub fn with_unit(registry: &UnitRegistry, unit: impl AsRef<str>, value: Scalar) -> Result<Self> {
        Ok(Self::new(value, registry.unit(unit)?))
    }

    /// Creates a pure number.
    #[must_use]
    pub fn dimensionless(value: Scalar) -> Self {
        Self::new(value, Unit::dimensionless())
    }

    /// Creates a quantity from a coherent SI value.
    #[must_use]
    pub fn from_si(registry: &UnitRegistry, dimension: DimensionSignature, si_value: Scalar) -> Self {
        Self::new(si_value, registry.coherent_unit(dimension))
    }

    /// Numeric value in [`Self::unit`].
    #[must_use]
    pub fn value(&self) -> Scalar {
        self.value
    }

    /// Unit of the value.
    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Dimension signature (always the unit's).
    #[must_use]
    pub fn dimension(&self) -> DimensionSignature {
        self.unit.dimension()
    }

    /// Value expressed in the coherent SI unit.
    #[must_use]
    pub fn si_value(&self) -> Scalar {
        self.unit.to_si(self.value)
    }

    /// Converts into `unit`.
    pub fn to(&self, registry: &UnitRegistry, unit: &Unit) -> Result<Self> {
        let value = registry.convert(self.value, &self.unit, unit)?;
        Ok(Self::new(value, unit.clone()))
    }

    /// Converts into the registered unit named `id`.
    pub fn to_unit(&self, registry: &UnitRegistry, id: impl AsRef<str>) -> Result<Self> {
        self.to(registry, &registry.unit(id)?)
    }

    /// Numeric value in the registered unit named `id`.
    pub fn value_in(&self, registry: &UnitRegistry, id: impl AsRef<str>) -> Result<Scalar> {
        Ok(self.to_unit(registry, id)?.value)
    }

    /// Same quantity in the coherent SI unit of its dimension.
    #[must_use]
    pub fn to_coherent(&self, registry: &UnitRegistry) -> Self {
        Self::from_si(registry, self.dimension(), self.si_value())
    }

    /// Sum; `rhs` is converted into this quantity's unit.
    pub fn try_add(&self, rhs: &Self, registry: &UnitRegistry) -> Result<Self> {
        let rhs_value = self.aligned(rhs, registry, "add")?;
        Ok(Self::new(self.value + rhs_value, self.unit.clone()))
    }

    /// Difference; `rhs` is converted into this quantity's unit.
    pub fn try_sub(&self, rhs: &Self, registry: &UnitRegistry) -> Result<Self> {
        let rhs_value = self.aligned(rhs, registry, "subtract")?;
        Ok(Self::new(self.value - rhs_value, self.unit.clone()))
    }

    /// Product with combined dimension.
    pub fn try_mul(&self, rhs: &Self, registry: &UnitRegistry) -> Result<Self> {
        let lhs = self.linearized(registry);
        let rhs = rhs.linearized(registry);
        let dimension = lhs.dimension().multiply(rhs.dimension())?;
        let factor = lhs.unit.si_factor() * rhs.unit.si_factor();
        let unit = resolve_unit(registry, dimension, factor, || {
            product_symbol(lhs.unit.symbol(), rhs.unit.symbol())
        });
        Ok(Self::new(lhs.value * rhs.value, unit))
    }

    /// Quotient with combined dimension.
    pub fn try_div(&self, rhs: &Self, registry: &UnitRegistry) -> Result<Self> {
        let lhs = self.linearized(registry);
        let rhs = rhs.linearized(registry);
        let dimension = lhs.dimension().divide(rhs.dimension())?;
        if rhs.value == 0.0 {
            return Err(DimsolveError::Domain(format!("division of {lhs} by zero")));
        }
        let factor = lhs.unit.si_factor() / rhs.unit.si_factor();
        let unit = resolve_unit(registry, dimension, factor, || {
            quotient_symbol(lhs.unit.symbol(), rhs.unit.symbol())
        });
        Ok(Self::new(lhs.value / rhs.value, unit))
    }

    /// Raises to a (possibly fractional) power.
    ///
    /// Fails when the resulting dimension would need fractional base
    /// exponents, or when the value is not real (negative base with a
    /// fractional exponent, zero to a negative power).
    pub fn try_pow(&self, n: Scalar, registry: &UnitRegistry) -> Result<Self> {
        let base = self.linearized(registry);
        let dimension = base.dimension().power(n)?;
        let value = base.value.powf(n);
        if !value.is_finite() {
            return Err(DimsolveError::Domain(format!("({base})^{n} is not a finite real number")));
        }
        let factor = base.unit.si_factor().powf(n);
        let unit = resolve_unit(registry, dimension, factor, || power_symbol(base.unit.symbol(), n));
        Ok(Self::new(value, unit))
    }

    /// Square root, i.e. `try_pow(0.5)`.
    pub fn try_sqrt(&self, registry: &UnitRegistry) -> Result<Self> {
        if self.value < 0.0 {
            return Err(DimsolveError::Domain(format!("sqrt of negative quantity {self}")));
        }
        self.try_pow(0.5, registry)
    }

    /// Absolute value in the same unit.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self::new(self.value.abs(), self.unit.clone())
    }

    /// Multiplies the value by a pure number.
    #[must_use]
    pub fn scale(&self, factor: Scalar) -> Self {
        Self::new(self.value * factor, self.unit.clone())
    }

    /// Orders two quantities of the same dimension.
    pub fn compare(&self, rhs: &Self, registry: &UnitRegistry) -> Result<Ordering> {
        let rhs_value = self.aligned(rhs, registry, "compare")?;
        self.value.partial_cmp(&rhs_value).ok_or_else(|| {
            DimsolveError::Domain(format!("cannot order {self} and {rhs}"))
        })
    }

    /// `self < rhs`.
    pub fn lt(&self, rhs: &Self, registry: &UnitRegistry) -> Result<bool> {
        Ok(self.compare(rhs, registry)? == Ordering::Less)
    }

    /// `self <= rhs`.
    pub fn le(&self, rhs: &Self, registry: &UnitRegistry) -> Result<bool> {
        Ok(self.compare(rhs, registry)? != Ordering::Greater)
    }

    /// `self > rhs`.
    pub fn gt(&self, rhs: &Self, registry: &UnitRegistry) -> Result<bool> {
        Ok(self.compare(rhs, registry)? == Ordering::Greater)
    }

    /// `self >= rhs`.
    pub fn ge(&self, rhs: &Self, registry: &UnitRegistry) -> Result<bool> {
        Ok(self.compare(rhs, registry)? != Ordering::Less)
    }

    /// Relative equality after conversion to a common unit.
    pub fn approx_eq(&self, rhs: &Self, registry: &UnitRegistry, max_relative: Scalar) -> Result<bool> {
        let rhs_value = self.aligned(rhs, registry, "compare")?;
        Ok(crate::math::relative_eq(self.value, rhs_value, max_relative))
    }

    /// Value of `rhs` in this quantity's unit, checking dimensions.
    fn aligned(&self, rhs: &Self, registry: &UnitRegistry, operation: &str) -> Result<Scalar> {
        if self.dimension() != rhs.dimension() {
            return Err(DimsolveError::mismatch(
                &format!("{operation} {self} and {rhs}"),
                self.dimension(),
                rhs.dimension(),
            ));
        }
        registry.convert(rhs.value, &rhs.unit, &self.unit)
    }

    /// Affine quantities are moved to coherent SI; others are returned as-is.
    fn linearized(&self, registry: &UnitRegistry) -> Self {
        if self.unit.is_affine() {
            self.to_coherent(registry)
        } else {
            self.clone()
        }
    }
}

impl Neg for Quantity {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.value, self.unit)
    }
}

impl Neg for &Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity::new(-self.value, self.unit.clone())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match f.precision() {
            Some(precision) => format!("{:.*}", precision, self.value),
            None => format_significant(self.value, DISPLAY_DIGITS),
        };
        if self.unit.symbol().is_empty() {
            f.write_str(&value)
        } else {
            write!(f, "{value} {}", self.unit.symbol())
        }
    }
}

fn resolve_unit(
    registry: &UnitRegistry,
    dimension: DimensionSignature,
    si_factor: Scalar,
    symbol: impl FnOnce() -> String,
) -> Unit {
    registry
        .find_unit(dimension, si_factor)
        .unwrap_or_else(|| Unit::new(UnitDefinition::composite(symbol(), dimension, si_factor)))
}

fn needs_grouping(symbol: &str) -> bool {
    symbol.contains('·') || symbol.contains('/') || symbol.contains('^')
}

fn grouped(symbol: &str) -> String {
    if needs_grouping(symbol) {
        format!("({symbol})")
    } else {
        symbol.to_string()
    }
}

fn product_symbol(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ if a == b => format!("{}^2", grouped(a)),
        _ => format!("{a}·{b}"),
    }
}

fn quotient_symbol(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (_, true) => a.to_string(),
        (true, false) => format!("1/{}", grouped(b)),
        _ => format!("{a}/{}", grouped(b)),
    }
}

fn power_symbol(a: &str, n: Scalar) -> String {
    if a.is_empty() {
        String::new()
    } else {
        format!("{}^{}", grouped(a), format_significant(n, DISPLAY_DIGITS))
    }
}
