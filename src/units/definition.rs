//! Immutable unit records and the shared `Unit` handle.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use crate::dimension::{DimensionSignature, DIMENSIONLESS};
use crate::math::Scalar;

/// Whether a unit came from a catalog or was synthesized by arithmetic.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Registered through a catalog.
    Named,
    /// Produced by multiplying, dividing or raising other units.
    Composite,
}

/// A unit of measure: `si = value * si_factor + si_offset`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDefinition {
    name: String,
    symbol: String,
    dimension: DimensionSignature,
    si_factor: Scalar,
    si_offset: Scalar,
    kind: UnitKind,
}

impl UnitDefinition {
    /// Creates a linear unit.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        dimension: DimensionSignature,
        si_factor: Scalar,
    ) -> Self {
        Self::affine(name, symbol, dimension, si_factor, 0.0)
    }

    /// Creates an affine unit such as degrees Celsius.
    #[must_use]
    pub fn affine(
        name: impl Into<String>,
        symbol: impl Into<String>,
        dimension: DimensionSignature,
        si_factor: Scalar,
        si_offset: Scalar,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            dimension,
            si_factor,
            si_offset,
            kind: UnitKind::Named,
        }
    }

    /// Creates a synthetic unit produced by arithmetic.
    #[must_use]
    pub fn composite(symbol: impl Into<String>, dimension: DimensionSignature, si_factor: Scalar) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            dimension,
            si_factor,
            si_offset: 0.0,
            kind: UnitKind::Composite,
        }
    }

    /// Synthetic coherent SI unit for a dimension, e.g. `kg·m·s⁻²`.
    #[must_use]
    pub fn coherent(dimension: DimensionSignature) -> Self {
        if dimension.is_dimensionless() {
            return Self::new("dimensionless", "", DIMENSIONLESS, 1.0);
        }
        Self::composite(dimension.si_symbol(), dimension, 1.0)
    }

    /// Unit name, e.g. `inch`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit symbol, e.g. `in`.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Physical dimension.
    #[must_use]
    pub fn dimension(&self) -> DimensionSignature {
        self.dimension
    }

    /// Multiplicative factor to the coherent SI unit.
    #[must_use]
    pub fn si_factor(&self) -> Scalar {
        self.si_factor
    }

    /// Additive offset to the coherent SI unit (non-zero only for affine scales).
    #[must_use]
    pub fn si_offset(&self) -> Scalar {
        self.si_offset
    }

    /// Catalog or arithmetic origin.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// True for affine scales.
    #[must_use]
    pub fn is_affine(&self) -> bool {
        self.si_offset != 0.0
    }

    /// True when values in both units are numerically interchangeable.
    #[must_use]
    pub fn same_scale(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && self.si_factor == other.si_factor
            && self.si_offset == other.si_offset
    }

    /// Converts a value in this unit to the coherent SI unit.
    #[inline]
    #[must_use]
    pub fn to_si(&self, value: Scalar) -> Scalar {
        value * self.si_factor + self.si_offset
    }

    /// Converts a coherent SI value into this unit.
    #[inline]
    #[must_use]
    pub fn from_si(&self, si: Scalar) -> Scalar {
        (si - self.si_offset) / self.si_factor
    }
}

/// Shared, immutable handle to a [`UnitDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Unit(Arc<UnitDefinition>);

impl Unit {
    /// Wraps a definition.
    #[must_use]
    pub fn new(definition: UnitDefinition) -> Self {
        Self(Arc::new(definition))
    }

    /// The pure-number unit.
    #[must_use]
    pub fn dimensionless() -> Self {
        static DIMENSIONLESS_UNIT: OnceLock<Unit> = OnceLock::new();
        DIMENSIONLESS_UNIT
            .get_or_init(|| Unit::new(UnitDefinition::coherent(DIMENSIONLESS)))
            .clone()
    }

    /// Synthetic coherent SI unit for `dimension`.
    #[must_use]
    pub fn coherent(dimension: DimensionSignature) -> Self {
        if dimension.is_dimensionless() {
            return Self::dimensionless();
        }
        Self::new(UnitDefinition::coherent(dimension))
    }

    /// True when both handles point at the same definition.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// True when no numeric conversion is needed between the two units.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.same_scale(other)
    }
}

impl Deref for Unit {
    type Target = UnitDefinition;

    fn deref(&self) -> &UnitDefinition {
        &self.0
    }
}

impl From<UnitDefinition> for Unit {
    fn from(definition: UnitDefinition) -> Self {
        Self::new(definition)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::dimension::{FORCE, TEMPERATURE};

    #[test]
    fn affine_round_trip_through_si() {
        let celsius = UnitDefinition::affine("celsius", "°C", TEMPERATURE, 1.0, 273.15);
        assert!(celsius.is_affine());
        assert_relative_eq!(celsius.to_si(100.0), 373.15);
        assert_relative_eq!(celsius.from_si(273.15), 0.0);
    }

    #[test]
    fn coherent_units_use_si_symbols() {
        let unit = Unit::coherent(FORCE);
        assert_eq!(unit.symbol(), "kg·m·s⁻²");
        assert_eq!(unit.kind(), UnitKind::Composite);
        assert_eq!(unit.si_factor(), 1.0);
    }

    #[test]
    fn dimensionless_handle_is_shared() {
        let a = Unit::dimensionless();
        let b = Unit::dimensionless();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.to_string(), "");
    }

    #[test]
    fn same_scale_ignores_names() {
        let a = Unit::new(UnitDefinition::new("newton", "N", FORCE, 1.0));
        let b = Unit::coherent(FORCE);
        assert!(!a.ptr_eq(&b));
        assert!(a.is_same(&b));
    }
}
