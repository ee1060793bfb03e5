//! Named variable slots.

use std::fmt;

use crate::dimension::DimensionSignature;
use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;
use crate::quantity::Quantity;
use crate::units::{Unit, UnitRegistry};

/// Initial guess used by numeric solving when none is declared, in the
/// variable's display unit.
pub const DEFAULT_GUESS: Scalar = 1.0;

/// How a variable obtained its value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Supplied when the problem was defined.
    Given,
    /// Still unknown.
    Unresolved,
    /// Computed by a solver.
    Solved,
}

/// A named slot that is either known (holds a quantity) or unknown.
///
/// Unknown variables still carry a dimension and a display unit so equations
/// can be dimension-checked before anything is solved. A variable moves from
/// unknown to known exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    unit: Unit,
    quantity: Option<Quantity>,
    guess: Option<Scalar>,
    origin: Origin,
    stamp: u64,
}

impl Variable {
    /// A variable with a given value.
    #[must_use]
    pub fn known(name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            unit: quantity.unit().clone(),
            quantity: Some(quantity),
            guess: None,
            origin: Origin::Given,
            stamp: 0,
        }
    }

    /// An unknown variable whose result will be expressed in `unit`.
    #[must_use]
    pub fn unknown(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            unit,
            quantity: None,
            guess: None,
            origin: Origin::Unresolved,
            stamp: 0,
        }
    }

    /// Sets the numeric starting point (in the display unit).
    #[must_use]
    pub fn with_guess(mut self, guess: Scalar) -> Self {
        self.guess = Some(guess);
        self
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dimension.
    #[must_use]
    pub fn dimension(&self) -> DimensionSignature {
        self.unit.dimension()
    }

    /// Display unit.
    #[must_use]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Current value, if known.
    #[must_use]
    pub fn quantity(&self) -> Option<&Quantity> {
        self.quantity.as_ref()
    }

    /// True once a value is present.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.quantity.is_some()
    }

    /// Declared initial guess, if any.
    #[must_use]
    pub fn guess(&self) -> Option<Scalar> {
        self.guess
    }

    /// Value origin.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Store generation at which the variable was inserted or last assigned.
    #[must_use]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Numeric starting point in coherent SI.
    #[must_use]
    pub fn initial_guess_si(&self) -> Scalar {
        self.unit.to_si(self.guess.unwrap_or(DEFAULT_GUESS))
    }

    pub(crate) fn set_stamp(&mut self, stamp: u64) {
        self.stamp = stamp;
    }

    /// Assigns a solved value, converting it into the display unit.
    pub(crate) fn assign(&mut self, quantity: &Quantity, registry: &UnitRegistry, stamp: u64) -> Result<()> {
        if self.is_known() {
            return Err(DimsolveError::AlreadyKnown(self.name.clone()));
        }
        if quantity.dimension() != self.dimension() {
            return Err(DimsolveError::mismatch(
                &format!("assign `{}`", self.name),
                self.dimension(),
                quantity.dimension(),
            ));
        }
        self.quantity = Some(quantity.to(registry, &self.unit)?);
        self.origin = Origin::Solved;
        self.stamp = stamp;
        Ok(())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.quantity {
            Some(quantity) => write!(f, "{} = {quantity}", self.name),
            None => write!(f, "{} = ? {}", self.name, self.unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::dimension::LENGTH;
    use crate::units::{initialize_registry, standard_catalog};

    #[test]
    fn unknown_variable_carries_dimension() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let t = Variable::unknown("t", reg.unit("in").unwrap()).with_guess(0.1);
        assert!(!t.is_known());
        assert_eq!(t.dimension(), LENGTH);
        assert_eq!(t.origin(), Origin::Unresolved);
        assert_relative_eq!(t.initial_guess_si(), 0.00254, max_relative = 1e-12);
        assert_eq!(t.to_string(), "t = ? in");
    }

    #[test]
    fn assignment_converts_and_happens_once() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut t = Variable::unknown("t", reg.unit("in").unwrap());
        let value = Quantity::with_unit(&reg, "m", 0.0254).unwrap();
        t.assign(&value, &reg, 7).unwrap();
        assert_relative_eq!(t.quantity().unwrap().value(), 1.0, max_relative = 1e-12);
        assert_eq!(t.origin(), Origin::Solved);
        assert_eq!(t.stamp(), 7);
        assert_eq!(
            t.assign(&value, &reg, 8),
            Err(DimsolveError::AlreadyKnown("t".into()))
        );
    }

    #[test]
    fn assignment_rejects_wrong_dimension() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut t = Variable::unknown("t", reg.unit("in").unwrap());
        let wrong = Quantity::with_unit(&reg, "s", 1.0).unwrap();
        assert!(matches!(
            t.assign(&wrong, &reg, 1),
            Err(DimsolveError::DimensionalMismatch(_))
        ));
    }
}
