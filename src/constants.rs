//! Exact conversion constants used by the standard unit catalog.
//!
//! ## Accuracy
//!
//! Every length, mass and force constant below is exact by definition (the
//! 1959 international yard and pound agreement, and the CGPM standard
//! acceleration of gravity). Derived constants are computed from them so
//! that catalog factors never disagree with each other.
//!
//! ## References
//!
//! - NIST Special Publication 811 (2008), "Guide for the Use of the
//!   International System of Units", Appendix B.
//! - BIPM, "The International System of Units (SI)", 9th edition (2019).

use std::f64::consts::PI;

/// International inch in meters (exact).
pub const INCH: f64 = 0.0254;
/// International foot in meters (exact).
pub const FOOT: f64 = 12.0 * INCH;
/// International yard in meters (exact).
pub const YARD: f64 = 3.0 * FOOT;
/// International mile in meters (exact).
pub const MILE: f64 = 5280.0 * FOOT;
/// Avoirdupois pound in kilograms (exact).
pub const POUND_MASS: f64 = 0.453_592_37;
/// Standard acceleration of gravity g₀ in m/s² (exact).
pub const STANDARD_GRAVITY: f64 = 9.806_65;
/// Pound-force in newtons.
pub const POUND_FORCE: f64 = POUND_MASS * STANDARD_GRAVITY;
/// Pound-force per square inch in pascals.
pub const PSI: f64 = POUND_FORCE / (INCH * INCH);
/// Standard atmosphere in pascals (exact).
pub const STANDARD_ATMOSPHERE: f64 = 101_325.0;
/// Bar in pascals (exact).
pub const BAR: f64 = 1.0e5;
/// US liquid gallon in cubic meters (exact, 231 in³).
pub const US_GALLON: f64 = 231.0 * INCH * INCH * INCH;
/// International table British thermal unit in joules (exact).
pub const BTU: f64 = 1_055.055_852_62;
/// Mechanical horsepower in watts (550 ft·lbf/s).
pub const HORSEPOWER: f64 = 550.0 * FOOT * POUND_FORCE;
/// Offset between the Celsius and Kelvin scales.
pub const CELSIUS_OFFSET: f64 = 273.15;
/// Size of one Fahrenheit/Rankine degree in kelvin.
pub const RANKINE: f64 = 5.0 / 9.0;
/// Kelvin value of 0 °F.
pub const FAHRENHEIT_OFFSET: f64 = CELSIUS_OFFSET - 32.0 * RANKINE;
/// One degree of arc in radians.
pub const DEGREE: f64 = PI / 180.0;
/// One revolution in radians.
pub const REVOLUTION: f64 = 2.0 * PI;

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn pound_force_matches_reference() {
        assert_relative_eq!(POUND_FORCE, 4.448_221_615_260_5, max_relative = 1.0e-12);
        assert_relative_eq!(PSI, 6_894.757_293_168, max_relative = 1.0e-10);
    }

    #[test]
    fn fahrenheit_offset_places_freezing_point() {
        // 32 °F is 273.15 K.
        assert_relative_eq!(32.0 * RANKINE + FAHRENHEIT_OFFSET, 273.15, max_relative = 1.0e-12);
    }

    #[test]
    fn right_angle_in_radians() {
        assert_relative_eq!(90.0 * DEGREE, PI / 2.0, epsilon = 1.0e-15);
    }
}
