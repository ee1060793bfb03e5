//! Prime-encoded dimension signatures.
//!
//! Every physical dimension is an exponent vector over the base dimensions.
//! Each base dimension owns a distinct prime, and a signature stores the
//! product `Π prime_i ^ exponent_i` as a reduced fraction. Negative exponents
//! land in the denominator.
//!
//! Unique prime factorization makes the encoding collision free, so:
//! - compatibility is a single equality test;
//! - multiplying or dividing quantities multiplies or divides signatures.
//!
//! ```
//! use dimsolve::dimension::{FORCE, LENGTH, ENERGY};
//!
//! let work = FORCE.multiply(LENGTH).unwrap();
//! assert!(work.equals(ENERGY));
//! ```

use std::fmt;

use crate::errors::{DimsolveError, Result};
use crate::math::{self, Scalar};

/// Base dimensions and their primes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseDimension {
    /// Length [L], prime 2.
    Length,
    /// Mass [M], prime 3.
    Mass,
    /// Time [T], prime 5.
    Time,
    /// Thermodynamic temperature [Θ], prime 7.
    Temperature,
    /// Electric current [I], prime 11.
    Current,
    /// Amount of substance [N], prime 13.
    Amount,
    /// Luminous intensity [J], prime 17.
    LuminousIntensity,
    /// Plane angle [∠], prime 19.
    Angle,
}

impl BaseDimension {
    /// All base dimensions in prime order.
    pub const ALL: [Self; 8] = [
        Self::Length,
        Self::Mass,
        Self::Time,
        Self::Temperature,
        Self::Current,
        Self::Amount,
        Self::LuminousIntensity,
        Self::Angle,
    ];

    /// Display order (conventional M L T I Θ N J, then angle).
    const DISPLAY_ORDER: [Self; 8] = [
        Self::Mass,
        Self::Length,
        Self::Time,
        Self::Current,
        Self::Temperature,
        Self::Amount,
        Self::LuminousIntensity,
        Self::Angle,
    ];

    /// Prime assigned to this base dimension.
    #[must_use]
    pub const fn prime(self) -> u128 {
        match self {
            Self::Length => 2,
            Self::Mass => 3,
            Self::Time => 5,
            Self::Temperature => 7,
            Self::Current => 11,
            Self::Amount => 13,
            Self::LuminousIntensity => 17,
            Self::Angle => 19,
        }
    }

    /// Dimension symbol used by `Display`.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Length => "L",
            Self::Mass => "M",
            Self::Time => "T",
            Self::Temperature => "Θ",
            Self::Current => "I",
            Self::Amount => "N",
            Self::LuminousIntensity => "J",
            Self::Angle => "∠",
        }
    }

    /// Symbol of the coherent SI unit for this base dimension.
    #[must_use]
    pub const fn si_symbol(self) -> &'static str {
        match self {
            Self::Length => "m",
            Self::Mass => "kg",
            Self::Time => "s",
            Self::Temperature => "K",
            Self::Current => "A",
            Self::Amount => "mol",
            Self::LuminousIntensity => "cd",
            Self::Angle => "rad",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Canonical, comparable encoding of a physical dimension.
///
/// Stored as a reduced fraction of prime powers. Two signatures are
/// dimensionally compatible exactly when they are equal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionSignature {
    numerator: u128,
    denominator: u128,
}

/// Builds a signature from exponents in prime order
/// `[length, mass, time, temperature, current, amount, luminous, angle]`.
///
/// Only used for compile-time constants; the exponents are small enough
/// that the encoding cannot overflow.
const fn signature(exponents: [i8; 8]) -> DimensionSignature {
    let mut numerator: u128 = 1;
    let mut denominator: u128 = 1;
    let mut i = 0;
    while i < 8 {
        let prime = BaseDimension::ALL[i].prime();
        let e = exponents[i];
        let mut k = 0;
        if e >= 0 {
            while k < e {
                numerator *= prime;
                k += 1;
            }
        } else {
            while k < -e {
                denominator *= prime;
                k += 1;
            }
        }
        i += 1;
    }
    DimensionSignature {
        numerator,
        denominator,
    }
}

/// Pure number.
pub const DIMENSIONLESS: DimensionSignature = signature([0, 0, 0, 0, 0, 0, 0, 0]);
/// Length [L].
pub const LENGTH: DimensionSignature = signature([1, 0, 0, 0, 0, 0, 0, 0]);
/// Mass [M].
pub const MASS: DimensionSignature = signature([0, 1, 0, 0, 0, 0, 0, 0]);
/// Time [T].
pub const TIME: DimensionSignature = signature([0, 0, 1, 0, 0, 0, 0, 0]);
/// Temperature [Θ].
pub const TEMPERATURE: DimensionSignature = signature([0, 0, 0, 1, 0, 0, 0, 0]);
/// Electric current [I].
pub const CURRENT: DimensionSignature = signature([0, 0, 0, 0, 1, 0, 0, 0]);
/// Amount of substance [N].
pub const AMOUNT: DimensionSignature = signature([0, 0, 0, 0, 0, 1, 0, 0]);
/// Luminous intensity [J].
pub const LUMINOUS_INTENSITY: DimensionSignature = signature([0, 0, 0, 0, 0, 0, 1, 0]);
/// Plane angle [∠].
pub const ANGLE: DimensionSignature = signature([0, 0, 0, 0, 0, 0, 0, 1]);
/// Area [L²].
pub const AREA: DimensionSignature = signature([2, 0, 0, 0, 0, 0, 0, 0]);
/// Volume [L³].
pub const VOLUME: DimensionSignature = signature([3, 0, 0, 0, 0, 0, 0, 0]);
/// Velocity [L T⁻¹].
pub const VELOCITY: DimensionSignature = signature([1, 0, -1, 0, 0, 0, 0, 0]);
/// Acceleration [L T⁻²].
pub const ACCELERATION: DimensionSignature = signature([1, 0, -2, 0, 0, 0, 0, 0]);
/// Force [M L T⁻²].
pub const FORCE: DimensionSignature = signature([1, 1, -2, 0, 0, 0, 0, 0]);
/// Pressure and stress [M L⁻¹ T⁻²].
pub const PRESSURE: DimensionSignature = signature([-1, 1, -2, 0, 0, 0, 0, 0]);
/// Energy, work, and torque [M L² T⁻²].
pub const ENERGY: DimensionSignature = signature([2, 1, -2, 0, 0, 0, 0, 0]);
/// Power [M L² T⁻³].
pub const POWER: DimensionSignature = signature([2, 1, -3, 0, 0, 0, 0, 0]);
/// Frequency [T⁻¹].
pub const FREQUENCY: DimensionSignature = signature([0, 0, -1, 0, 0, 0, 0, 0]);
/// Angular velocity [∠ T⁻¹].
pub const ANGULAR_VELOCITY: DimensionSignature = signature([0, 0, -1, 0, 0, 0, 0, 1]);
/// Mass density [M L⁻³].
pub const DENSITY: DimensionSignature = signature([-3, 1, 0, 0, 0, 0, 0, 0]);
/// Electric charge [I T].
pub const CHARGE: DimensionSignature = signature([0, 0, 1, 0, 1, 0, 0, 0]);
/// Voltage [M L² T⁻³ I⁻¹].
pub const VOLTAGE: DimensionSignature = signature([2, 1, -3, 0, -1, 0, 0, 0]);

/// Largest root index accepted when rationalizing fractional powers.
const MAX_ROOT: u32 = 12;

impl DimensionSignature {
    /// Builds a signature from exponents in prime order
    /// `[length, mass, time, temperature, current, amount, luminous, angle]`.
    pub fn from_exponents(exponents: [i32; 8]) -> Result<Self> {
        let mut numerator: u128 = 1;
        let mut denominator: u128 = 1;
        for (base, &e) in BaseDimension::ALL.iter().zip(exponents.iter()) {
            let power = math::checked_pow(base.prime(), e.unsigned_abs())
                .ok_or_else(|| overflow(&exponents))?;
            let slot = if e >= 0 { &mut numerator } else { &mut denominator };
            *slot = slot.checked_mul(power).ok_or_else(|| overflow(&exponents))?;
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Signature of a single base dimension raised to `exponent`.
    pub fn base(base: BaseDimension, exponent: i32) -> Result<Self> {
        let mut exponents = [0; 8];
        exponents[base.index()] = exponent;
        Self::from_exponents(exponents)
    }

    /// Raw encoded numerator.
    #[must_use]
    pub const fn numerator(self) -> u128 {
        self.numerator
    }

    /// Raw encoded denominator.
    #[must_use]
    pub const fn denominator(self) -> u128 {
        self.denominator
    }

    /// True for pure numbers.
    #[must_use]
    pub const fn is_dimensionless(self) -> bool {
        self.numerator == 1 && self.denominator == 1
    }

    /// Dimensional compatibility test: a single comparison.
    #[inline]
    #[must_use]
    pub fn equals(self, other: Self) -> bool {
        self == other
    }

    /// Dimension of a product of quantities.
    pub fn multiply(self, other: Self) -> Result<Self> {
        self.combine(other.numerator, other.denominator)
    }

    /// Dimension of a quotient of quantities.
    pub fn divide(self, other: Self) -> Result<Self> {
        self.combine(other.denominator, other.numerator)
    }

    /// Dimension of the reciprocal.
    #[must_use]
    pub const fn reciprocal(self) -> Self {
        Self {
            numerator: self.denominator,
            denominator: self.numerator,
        }
    }

    /// Raises the signature to `n`.
    ///
    /// `n` may be fractional as long as every resulting exponent stays an
    /// integer, e.g. `AREA.power(0.5) == LENGTH` but `LENGTH.power(0.5)` fails.
    pub fn power(self, n: Scalar) -> Result<Self> {
        if self.is_dimensionless() {
            return Ok(self);
        }
        let (p, q) = math::rationalize(n, MAX_ROOT).ok_or_else(|| {
            DimsolveError::DimensionalMismatch(format!(
                "cannot raise [{self}] to irrational power {n}"
            ))
        })?;
        let magnitude = u32::try_from(p.unsigned_abs()).map_err(|_| overflow_power(self, n))?;
        let numerator =
            math::checked_pow(self.numerator, magnitude).ok_or_else(|| overflow_power(self, n))?;
        let denominator =
            math::checked_pow(self.denominator, magnitude).ok_or_else(|| overflow_power(self, n))?;
        let (numerator, denominator) = match (
            math::exact_root(numerator, q),
            math::exact_root(denominator, q),
        ) {
            (Some(num), Some(den)) => (num, den),
            _ => {
                return Err(DimsolveError::DimensionalMismatch(format!(
                    "[{self}]^{n} has fractional base exponents"
                )))
            }
        };
        let raised = Self {
            numerator,
            denominator,
        };
        Ok(if p < 0 { raised.reciprocal() } else { raised })
    }

    /// Exponent of a single base dimension.
    #[must_use]
    pub fn exponent(self, base: BaseDimension) -> i32 {
        let prime = base.prime();
        let count = |mut value: u128| {
            let mut e = 0;
            while value % prime == 0 {
                value /= prime;
                e += 1;
            }
            e
        };
        count(self.numerator) - count(self.denominator)
    }

    /// Full exponent vector in prime order.
    #[must_use]
    pub fn exponents(self) -> [i32; 8] {
        let mut out = [0; 8];
        for base in BaseDimension::ALL {
            out[base.index()] = self.exponent(base);
        }
        out
    }

    /// Renders the signature with coherent SI base unit symbols, e.g. `kg·m·s⁻²`.
    #[must_use]
    pub fn si_symbol(self) -> String {
        self.render(BaseDimension::si_symbol)
    }

    fn combine(self, numerator: u128, denominator: u128) -> Result<Self> {
        // Cross-reduce first so intermediate products stay small.
        let g1 = math::gcd(self.numerator, denominator);
        let g2 = math::gcd(numerator, self.denominator);
        let num = (self.numerator / g1).checked_mul(numerator / g2);
        let den = (self.denominator / g2).checked_mul(denominator / g1);
        match (num, den) {
            (Some(numerator), Some(denominator)) => Ok(Self {
                numerator,
                denominator,
            }),
            _ => Err(DimsolveError::DimensionalMismatch(format!(
                "dimension signature overflow combining [{self}]"
            ))),
        }
    }

    fn render(self, symbol: fn(BaseDimension) -> &'static str) -> String {
        let parts: Vec<String> = BaseDimension::DISPLAY_ORDER
            .iter()
            .filter_map(|&base| {
                let e = self.exponent(base);
                (e != 0).then(|| format!("{}{}", symbol(base), superscript(e)))
            })
            .collect();
        if parts.is_empty() {
            "1".to_string()
        } else {
            parts.join("·")
        }
    }
}

impl Default for DimensionSignature {
    fn default() -> Self {
        DIMENSIONLESS
    }
}

impl fmt::Display for DimensionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(BaseDimension::symbol))
    }
}

fn superscript(exponent: i32) -> String {
    if exponent == 1 {
        return String::new();
    }
    const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
    let mut out = String::new();
    if exponent < 0 {
        out.push('⁻');
    }
    for c in exponent.unsigned_abs().to_string().chars() {
        if let Some(d) = c.to_digit(10) {
            out.push(DIGITS[d as usize]);
        }
    }
    out
}

fn overflow(exponents: &[i32; 8]) -> DimsolveError {
    DimsolveError::DimensionalMismatch(format!(
        "dimension signature overflow for exponents {exponents:?}"
    ))
}

fn overflow_power(signature: DimensionSignature, n: Scalar) -> DimsolveError {
    DimsolveError::DimensionalMismatch(format!("dimension signature overflow for [{signature}]^{n}"))
}
