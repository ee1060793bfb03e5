//! Built-in engineering unit catalog.
//!
//! [`StandardUnit`] names every unit in [`standard_catalog`], so code that
//! sticks to the standard catalog gets compile-time checked unit ids:
//!
//! ```
//! use dimsolve::units::{initialize_registry, standard_catalog, StandardUnit};
//! use dimsolve::quantity::Quantity;
//!
//! let registry = initialize_registry(standard_catalog()).unwrap();
//! let t = Quantity::with_unit(&registry, StandardUnit::Inch, 0.147).unwrap();
//! assert_eq!(t.unit().symbol(), "in");
//! ```

use crate::constants::{
    BAR, BTU, CELSIUS_OFFSET, DEGREE, FAHRENHEIT_OFFSET, FOOT, HORSEPOWER, INCH, MILE,
    POUND_FORCE, POUND_MASS, PSI, RANKINE, REVOLUTION, STANDARD_ATMOSPHERE, STANDARD_GRAVITY,
    US_GALLON, YARD,
};
use crate::dimension::{
    ACCELERATION, AMOUNT, ANGLE, ANGULAR_VELOCITY, AREA, CHARGE, CURRENT, DENSITY, DIMENSIONLESS,
    ENERGY, FORCE, FREQUENCY, LENGTH, LUMINOUS_INTENSITY, MASS, POWER, PRESSURE, TEMPERATURE, TIME,
    VELOCITY, VOLTAGE, VOLUME,
};

use super::definition::UnitDefinition;

macro_rules! standard_units {
    ($(
        $(#[$doc:meta])*
        $variant:ident => ($name:literal, $symbol:literal, $dimension:expr, $factor:expr $(, $offset:expr)?)
    ),* $(,)?) => {
        /// Identifier of a unit in the standard catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StandardUnit {
            $( $(#[$doc])* $variant, )*
        }

        impl StandardUnit {
            /// Every standard unit in registration order.
            pub const ALL: &'static [StandardUnit] = &[$(StandardUnit::$variant),*];

            /// Registry name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(StandardUnit::$variant => $name,)*
                }
            }

            /// Registry symbol.
            #[must_use]
            pub const fn symbol(self) -> &'static str {
                match self {
                    $(StandardUnit::$variant => $symbol,)*
                }
            }

            /// Full definition for registration.
            #[must_use]
            pub fn definition(self) -> UnitDefinition {
                match self {
                    $(StandardUnit::$variant => UnitDefinition::affine(
                        $name,
                        $symbol,
                        $dimension,
                        $factor,
                        standard_units!(@offset $($offset)?),
                    ),)*
                }
            }
        }
    };
    (@offset) => { 0.0 };
    (@offset $offset:expr) => { $offset };
}

// Registration order matters: the first offset-free unit of a dimension with
// factor 1 is that dimension's coherent unit.
standard_units! {
    /// Pure number.
    Dimensionless => ("dimensionless", "", DIMENSIONLESS, 1.0),
    /// Percent (0.01).
    Percent => ("percent", "%", DIMENSIONLESS, 0.01),

    /// Meter.
    Meter => ("meter", "m", LENGTH, 1.0),
    /// Millimeter.
    Millimeter => ("millimeter", "mm", LENGTH, 1.0e-3),
    /// Centimeter.
    Centimeter => ("centimeter", "cm", LENGTH, 1.0e-2),
    /// Kilometer.
    Kilometer => ("kilometer", "km", LENGTH, 1.0e3),
    /// International inch.
    Inch => ("inch", "in", LENGTH, INCH),
    /// International foot.
    Foot => ("foot", "ft", LENGTH, FOOT),
    /// International yard.
    Yard => ("yard", "yd", LENGTH, YARD),
    /// International mile.
    Mile => ("mile", "mi", LENGTH, MILE),

    /// Kilogram.
    Kilogram => ("kilogram", "kg", MASS, 1.0),
    /// Gram.
    Gram => ("gram", "g", MASS, 1.0e-3),
    /// Metric tonne.
    Tonne => ("tonne", "t", MASS, 1.0e3),
    /// Avoirdupois pound.
    PoundMass => ("pound", "lb", MASS, POUND_MASS),

    /// Second.
    Second => ("second", "s", TIME, 1.0),
    /// Millisecond.
    Millisecond => ("millisecond", "ms", TIME, 1.0e-3),
    /// Minute.
    Minute => ("minute", "min", TIME, 60.0),
    /// Hour.
    Hour => ("hour", "h", TIME, 3600.0),
    /// Day.
    Day => ("day", "d", TIME, 86_400.0),

    /// Kelvin.
    Kelvin => ("kelvin", "K", TEMPERATURE, 1.0),
    /// Degree Celsius (affine).
    Celsius => ("celsius", "°C", TEMPERATURE, 1.0, CELSIUS_OFFSET),
    /// Degree Fahrenheit (affine).
    Fahrenheit => ("fahrenheit", "°F", TEMPERATURE, RANKINE, FAHRENHEIT_OFFSET),
    /// Degree Rankine.
    Rankine => ("rankine", "°R", TEMPERATURE, RANKINE),

    /// Ampere.
    Ampere => ("ampere", "A", CURRENT, 1.0),
    /// Milliampere.
    Milliampere => ("milliampere", "mA", CURRENT, 1.0e-3),
    /// Mole.
    Mole => ("mole", "mol", AMOUNT, 1.0),
    /// Candela.
    Candela => ("candela", "cd", LUMINOUS_INTENSITY, 1.0),

    /// Radian.
    Radian => ("radian", "rad", ANGLE, 1.0),
    /// Degree of arc.
    Degree => ("degree", "deg", ANGLE, DEGREE),
    /// Full revolution.
    Revolution => ("revolution", "rev", ANGLE, REVOLUTION),

    /// Square meter.
    SquareMeter => ("square_meter", "m²", AREA, 1.0),
    /// Square millimeter.
    SquareMillimeter => ("square_millimeter", "mm²", AREA, 1.0e-6),
    /// Square inch.
    SquareInch => ("square_inch", "in²", AREA, INCH * INCH),
    /// Square foot.
    SquareFoot => ("square_foot", "ft²", AREA, FOOT * FOOT),

    /// Cubic meter.
    CubicMeter => ("cubic_meter", "m³", VOLUME, 1.0),
    /// Liter.
    Liter => ("liter", "L", VOLUME, 1.0e-3),
    /// Cubic inch.
    CubicInch => ("cubic_inch", "in³", VOLUME, INCH * INCH * INCH),
    /// Cubic foot.
    CubicFoot => ("cubic_foot", "ft³", VOLUME, FOOT * FOOT * FOOT),
    /// US liquid gallon.
    Gallon => ("gallon", "gal", VOLUME, US_GALLON),

    /// Meter per second.
    MeterPerSecond => ("meter_per_second", "m/s", VELOCITY, 1.0),
    /// Kilometer per hour.
    KilometerPerHour => ("kilometer_per_hour", "km/h", VELOCITY, 1.0e3 / 3600.0),
    /// Foot per second.
    FootPerSecond => ("foot_per_second", "ft/s", VELOCITY, FOOT),
    /// Mile per hour.
    MilePerHour => ("mile_per_hour", "mph", VELOCITY, MILE / 3600.0),

    /// Meter per second squared.
    MeterPerSecondSquared => ("meter_per_second_squared", "m/s²", ACCELERATION, 1.0),
    /// Standard gravity.
    StandardGravity => ("standard_gravity", "gn", ACCELERATION, STANDARD_GRAVITY),

    /// Newton.
    Newton => ("newton", "N", FORCE, 1.0),
    /// Kilonewton.
    Kilonewton => ("kilonewton", "kN", FORCE, 1.0e3),
    /// Pound-force.
    PoundForce => ("pound_force", "lbf", FORCE, POUND_FORCE),
    /// Kip (1000 lbf).
    Kip => ("kip", "kip", FORCE, 1.0e3 * POUND_FORCE),

    /// Pascal.
    Pascal => ("pascal", "Pa", PRESSURE, 1.0),
    /// Kilopascal.
    Kilopascal => ("kilopascal", "kPa", PRESSURE, 1.0e3),
    /// Megapascal.
    Megapascal => ("megapascal", "MPa", PRESSURE, 1.0e6),
    /// Bar.
    Bar => ("bar", "bar", PRESSURE, BAR),
    /// Standard atmosphere.
    Atmosphere => ("atmosphere", "atm", PRESSURE, STANDARD_ATMOSPHERE),
    /// Pound-force per square inch.
    Psi => ("psi", "psi", PRESSURE, PSI),
    /// Kilopound-force per square inch.
    Ksi => ("ksi", "ksi", PRESSURE, 1.0e3 * PSI),

    /// Joule.
    Joule => ("joule", "J", ENERGY, 1.0),
    /// Kilojoule.
    Kilojoule => ("kilojoule", "kJ", ENERGY, 1.0e3),
    /// International table BTU.
    Btu => ("btu", "BTU", ENERGY, BTU),
    /// Newton meter (torque).
    NewtonMeter => ("newton_meter", "N·m", ENERGY, 1.0),
    /// Foot pound-force.
    FootPound => ("foot_pound", "ft·lbf", ENERGY, FOOT * POUND_FORCE),
    /// Inch pound-force.
    InchPound => ("inch_pound", "in·lbf", ENERGY, INCH * POUND_FORCE),

    /// Watt.
    Watt => ("watt", "W", POWER, 1.0),
    /// Kilowatt.
    Kilowatt => ("kilowatt", "kW", POWER, 1.0e3),
    /// Mechanical horsepower.
    Horsepower => ("horsepower", "hp", POWER, HORSEPOWER),

    /// Hertz.
    Hertz => ("hertz", "Hz", FREQUENCY, 1.0),
    /// Radian per second.
    RadianPerSecond => ("radian_per_second", "rad/s", ANGULAR_VELOCITY, 1.0),
    /// Revolution per minute.
    RevolutionPerMinute => ("revolution_per_minute", "rpm", ANGULAR_VELOCITY, REVOLUTION / 60.0),

    /// Kilogram per cubic meter.
    KilogramPerCubicMeter => ("kilogram_per_cubic_meter", "kg/m³", DENSITY, 1.0),
    /// Pound per cubic foot.
    PoundPerCubicFoot => ("pound_per_cubic_foot", "lb/ft³", DENSITY, POUND_MASS / (FOOT * FOOT * FOOT)),

    /// Coulomb.
    Coulomb => ("coulomb", "C", CHARGE, 1.0),
    /// Volt.
    Volt => ("volt", "V", VOLTAGE, 1.0),
}

impl AsRef<str> for StandardUnit {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

/// Definitions for every [`StandardUnit`], ready for
/// [`initialize_registry`](super::initialize_registry).
#[must_use]
pub fn standard_catalog() -> Vec<UnitDefinition> {
    StandardUnit::ALL.iter().map(|unit| unit.definition()).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::units::initialize_registry;

    #[test]
    fn catalog_is_internally_consistent() {
        let registry = initialize_registry(standard_catalog()).unwrap();
        assert_eq!(registry.len(), StandardUnit::ALL.len());
    }

    #[test]
    fn every_standard_id_resolves() {
        let registry = initialize_registry(standard_catalog()).unwrap();
        for &id in StandardUnit::ALL {
            let unit = registry.unit(id).unwrap();
            assert_eq!(unit.name(), id.name());
            if !id.symbol().is_empty() {
                assert!(registry.unit(id.symbol()).unwrap().ptr_eq(&unit));
            }
        }
    }

    #[test]
    fn imperial_factors() {
        let registry = initialize_registry(standard_catalog()).unwrap();
        let lbf = registry.unit(StandardUnit::PoundForce).unwrap();
        let n = registry.unit(StandardUnit::Newton).unwrap();
        assert_relative_eq!(registry.convert(1.0, &lbf, &n).unwrap(), 4.448_221_615_260_5, max_relative = 1e-12);
        let hp = registry.unit(StandardUnit::Horsepower).unwrap();
        let w = registry.unit(StandardUnit::Watt).unwrap();
        assert_relative_eq!(registry.convert(1.0, &hp, &w).unwrap(), 745.699_871_582_270_2, max_relative = 1e-12);
    }
}
