//! Unit registry: lookup by name, symbol and dimension, plus conversion.
//!
//! The registry is built once through [`UnitRegistryBuilder`] (or
//! [`initialize_registry`]) and then sealed into an immutable
//! `Arc<UnitRegistry>` that is passed explicitly to every consumer.
//!
//! Conversions between offset-free units memoize their multiplicative factor
//! per registered unit pair. The cache sits behind an `RwLock` and the
//! counters are atomics, so a sealed registry can be shared across threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::definition::{Unit, UnitDefinition, UnitKind};
use crate::dimension::DimensionSignature;
use crate::errors::{DimsolveError, Result};
use crate::math::{self, Scalar};

/// Relative tolerance used when matching composite factors to named units.
const FACTOR_MATCH_TOLERANCE: Scalar = 1.0e-12;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Mutable registration phase of a [`UnitRegistry`].
#[derive(Debug, Default)]
pub struct UnitRegistryBuilder {
    units: Vec<Unit>,
    by_key: HashMap<String, usize>,
}

impl UnitRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit definition.
    ///
    /// Re-registering an identical definition is a no-op. A definition whose
    /// name or symbol is already bound to the same dimension and scale adds
    /// its other key as an alias of that unit. A name or symbol already bound
    /// to a different definition is a conflict.
    pub fn register(&mut self, definition: UnitDefinition) -> Result<Unit> {
        if !definition.si_factor().is_finite() || definition.si_factor() == 0.0 {
            return Err(DimsolveError::RegistryConflict(format!(
                "unit `{}` has invalid scale factor {}",
                definition.name(),
                definition.si_factor()
            )));
        }

        let mut existing = None;
        for key in [definition.name(), definition.symbol()] {
            let Some(&index) = self.by_key.get(key) else {
                continue;
            };
            let bound = &self.units[index];
            if bound.dimension() != definition.dimension() {
                return Err(DimsolveError::RegistryConflict(format!(
                    "`{key}` is bound to [{}], cannot rebind to [{}]",
                    bound.dimension(),
                    definition.dimension()
                )));
            }
            if !bound.same_scale(&definition) {
                return Err(DimsolveError::RegistryConflict(format!(
                    "`{key}` is already bound to a different scale"
                )));
            }
            existing.get_or_insert(index);
        }

        if let Some(index) = existing {
            for key in [definition.name(), definition.symbol()] {
                if !key.is_empty() && !self.by_key.contains_key(key) {
                    debug!(alias = key, unit = self.units[index].name(), "bound unit alias");
                    self.by_key.insert(key.to_string(), index);
                }
            }
            return Ok(self.units[index].clone());
        }

        let index = self.units.len();
        let unit = Unit::new(definition);
        self.by_key.insert(unit.name().to_string(), index);
        if !unit.symbol().is_empty() {
            self.by_key.insert(unit.symbol().to_string(), index);
        }
        self.units.push(unit.clone());
        Ok(unit)
    }

    /// Registers every definition in `catalog`.
    pub fn extend<I>(&mut self, catalog: I) -> Result<()>
    where
        I: IntoIterator<Item = UnitDefinition>,
    {
        for definition in catalog {
            self.register(definition)?;
        }
        Ok(())
    }

    /// Seals the builder into an immutable, shareable registry.
    #[must_use]
    pub fn seal(self) -> Arc<UnitRegistry> {
        let mut by_dimension: HashMap<DimensionSignature, Vec<usize>> = HashMap::new();
        for (index, unit) in self.units.iter().enumerate() {
            by_dimension.entry(unit.dimension()).or_default().push(index);
        }
        let id = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);
        debug!(registry = id, units = self.units.len(), "sealed unit registry");
        Arc::new(UnitRegistry {
            id,
            units: self.units,
            by_key: self.by_key,
            by_dimension,
            factor_cache: RwLock::new(HashMap::new()),
            conversions: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        })
    }
}

/// Builds and seals a registry from a catalog in one call.
pub fn initialize_registry<I>(catalog: I) -> Result<Arc<UnitRegistry>>
where
    I: IntoIterator<Item = UnitDefinition>,
{
    let mut builder = UnitRegistryBuilder::new();
    builder.extend(catalog)?;
    Ok(builder.seal())
}

/// Conversion counters, useful for verifying fast paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionStats {
    /// Conversions that performed arithmetic.
    pub conversions: u64,
    /// Linear factors served from the cache.
    pub cache_hits: u64,
    /// Unit pairs currently memoized.
    pub cached_pairs: usize,
}

/// Sealed collection of unit definitions.
#[derive(Debug)]
pub struct UnitRegistry {
    id: u64,
    units: Vec<Unit>,
    by_key: HashMap<String, usize>,
    by_dimension: HashMap<DimensionSignature, Vec<usize>>,
    factor_cache: RwLock<HashMap<(usize, usize), Scalar>>,
    conversions: AtomicU64,
    cache_hits: AtomicU64,
}

impl UnitRegistry {
    /// Process-unique registry identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered units in registration order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Looks up a unit by name or symbol.
    pub fn unit(&self, id: impl AsRef<str>) -> Result<Unit> {
        let id = id.as_ref();
        self.by_key
            .get(id)
            .map(|&index| self.units[index].clone())
            .ok_or_else(|| DimsolveError::UnitNotFound(id.to_string()))
    }

    /// True when `id` names a registered unit.
    #[must_use]
    pub fn contains(&self, id: impl AsRef<str>) -> bool {
        self.by_key.contains_key(id.as_ref())
    }

    /// Registered units of a dimension, in registration order.
    pub fn units_for(&self, dimension: DimensionSignature) -> impl Iterator<Item = &Unit> {
        self.by_dimension
            .get(&dimension)
            .into_iter()
            .flatten()
            .map(|&index| &self.units[index])
    }

    /// Registered offset-free unit with the given dimension and SI factor.
    #[must_use]
    pub fn find_unit(&self, dimension: DimensionSignature, si_factor: Scalar) -> Option<Unit> {
        self.units_for(dimension)
            .find(|unit| {
                !unit.is_affine()
                    && math::relative_eq(unit.si_factor(), si_factor, FACTOR_MATCH_TOLERANCE)
            })
            .cloned()
    }

    /// Coherent SI unit for a dimension: registered when available,
    /// synthesized otherwise.
    #[must_use]
    pub fn coherent_unit(&self, dimension: DimensionSignature) -> Unit {
        self.find_unit(dimension, 1.0)
            .unwrap_or_else(|| Unit::coherent(dimension))
    }

    /// Converts `value` from one unit to another.
    ///
    /// `si = value * from.si_factor + from.si_offset`, then
    /// `value' = (si - to.si_offset) / to.si_factor`. Identical units skip all
    /// arithmetic.
    pub fn convert(&self, value: Scalar, from: &Unit, to: &Unit) -> Result<Scalar> {
        if from.is_same(to) {
            return Ok(value);
        }
        if from.dimension() != to.dimension() {
            return Err(DimsolveError::mismatch(
                &format!("convert {} -> {}", from.symbol(), to.symbol()),
                from.dimension(),
                to.dimension(),
            ));
        }
        self.conversions.fetch_add(1, Ordering::Relaxed);
        if from.is_affine() || to.is_affine() {
            return Ok(to.from_si(from.to_si(value)));
        }
        Ok(value * self.linear_factor(from, to))
    }

    /// Multiplicative factor from `from` to `to` for offset-free units.
    ///
    /// Returns exactly `1.0` for identical units.
    pub fn conversion_factor(&self, from: &Unit, to: &Unit) -> Result<Scalar> {
        if from.is_same(to) {
            return Ok(1.0);
        }
        if from.dimension() != to.dimension() {
            return Err(DimsolveError::mismatch(
                "conversion factor",
                from.dimension(),
                to.dimension(),
            ));
        }
        if from.is_affine() || to.is_affine() {
            return Err(DimsolveError::DimensionalMismatch(format!(
                "no linear factor between affine units {} and {}",
                from.symbol(),
                to.symbol()
            )));
        }
        Ok(self.linear_factor(from, to))
    }

    /// Snapshot of the conversion counters.
    #[must_use]
    pub fn conversion_stats(&self) -> ConversionStats {
        let cached_pairs = self.factor_cache.read().map(|cache| cache.len()).unwrap_or(0);
        ConversionStats {
            conversions: self.conversions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cached_pairs,
        }
    }

    fn linear_factor(&self, from: &Unit, to: &Unit) -> Scalar {
        let key = match (self.registered_index(from), self.registered_index(to)) {
            (Some(a), Some(b)) => (a, b),
            _ => return from.si_factor() / to.si_factor(),
        };
        let cached = self
            .factor_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&key).copied());
        if let Some(factor) = cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return factor;
        }
        let factor = from.si_factor() / to.si_factor();
        if let Ok(mut cache) = self.factor_cache.write() {
            cache.insert(key, factor);
        }
        factor
    }

    fn registered_index(&self, unit: &Unit) -> Option<usize> {
        if unit.kind() != UnitKind::Named {
            return None;
        }
        let index = *self.by_key.get(unit.name())?;
        let registered = &self.units[index];
        (registered.ptr_eq(unit) || **registered == **unit).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::dimension::{FORCE, LENGTH, TEMPERATURE};
    use crate::units::catalog::{standard_catalog, StandardUnit};

    fn registry() -> Arc<UnitRegistry> {
        initialize_registry(standard_catalog()).unwrap()
    }

    #[test]
    fn lookup_by_name_and_symbol() {
        let reg = registry();
        let by_name = reg.unit("inch").unwrap();
        let by_symbol = reg.unit("in").unwrap();
        assert!(by_name.ptr_eq(&by_symbol));
        assert!(reg.unit(StandardUnit::Inch).unwrap().ptr_eq(&by_name));
        assert_eq!(
            reg.unit("furlong"),
            Err(DimsolveError::UnitNotFound("furlong".into()))
        );
    }

    #[test]
    fn conflicting_dimension_is_rejected() {
        let mut builder = UnitRegistryBuilder::new();
        builder
            .register(UnitDefinition::new("meter", "m", LENGTH, 1.0))
            .unwrap();
        let err = builder
            .register(UnitDefinition::new("minute", "m", crate::dimension::TIME, 60.0))
            .unwrap_err();
        assert!(matches!(err, DimsolveError::RegistryConflict(_)));
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut builder = UnitRegistryBuilder::new();
        let a = builder
            .register(UnitDefinition::new("newton", "N", FORCE, 1.0))
            .unwrap();
        let b = builder
            .register(UnitDefinition::new("newton", "N", FORCE, 1.0))
            .unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(builder.seal().len(), 1);
    }

    #[test]
    fn new_name_for_existing_symbol_becomes_alias() {
        let mut builder = UnitRegistryBuilder::new();
        let metre = builder
            .register(UnitDefinition::new("meter", "m", LENGTH, 1.0))
            .unwrap();
        let alias = builder
            .register(UnitDefinition::new("metre", "m", LENGTH, 1.0))
            .unwrap();
        assert!(alias.ptr_eq(&metre));
        let reg = builder.seal();
        assert_eq!(reg.len(), 1);
        assert!(reg.unit("metre").unwrap().ptr_eq(&metre));
        assert!(reg.unit("meter").unwrap().ptr_eq(&metre));
    }

    #[test]
    fn zero_factor_is_rejected() {
        let mut builder = UnitRegistryBuilder::new();
        assert!(builder
            .register(UnitDefinition::new("nothing", "nil", LENGTH, 0.0))
            .is_err());
    }

    #[test]
    fn affine_temperature_conversion() {
        let reg = registry();
        let c = reg.unit("°C").unwrap();
        let f = reg.unit("°F").unwrap();
        let k = reg.unit("K").unwrap();
        assert_relative_eq!(reg.convert(100.0, &c, &f).unwrap(), 212.0, max_relative = 1e-12);
        assert_relative_eq!(reg.convert(-40.0, &f, &c).unwrap(), -40.0, max_relative = 1e-12);
        assert_relative_eq!(reg.convert(0.0, &c, &k).unwrap(), 273.15, max_relative = 1e-12);
        assert!(reg.conversion_factor(&c, &k).is_err());
    }

    #[test]
    fn mismatched_dimensions_fail() {
        let reg = registry();
        let m = reg.unit("m").unwrap();
        let k = reg.unit("K").unwrap();
        assert!(matches!(
            reg.convert(1.0, &m, &k),
            Err(DimsolveError::DimensionalMismatch(_))
        ));
    }

    #[test]
    fn round_trip_all_compatible_pairs() {
        let reg = registry();
        let values = [-3.5, 0.0, 1.0, 0.147, 2.5e4];
        for a in reg.units() {
            for b in reg.units_for(a.dimension()) {
                for &x in &values {
                    let there = reg.convert(x, a, b).unwrap();
                    let back = reg.convert(there, b, a).unwrap();
                    assert_relative_eq!(back, x, max_relative = 1.0e-9, epsilon = 1.0e-9);
                }
            }
        }
    }

    #[test]
    fn factor_cache_memoizes_registered_pairs() {
        let reg = registry();
        let inch = reg.unit("in").unwrap();
        let meter = reg.unit("m").unwrap();
        let first = reg.conversion_factor(&inch, &meter).unwrap();
        let before = reg.conversion_stats();
        let second = reg.conversion_factor(&inch, &meter).unwrap();
        let after = reg.conversion_stats();
        assert_eq!(first, second);
        assert_relative_eq!(first, 0.0254);
        assert_eq!(after.cache_hits, before.cache_hits + 1);
        assert!(after.cached_pairs >= 1);
    }

    #[test]
    fn same_unit_factor_is_exactly_one() {
        let reg = registry();
        let psi = reg.unit("psi").unwrap();
        let before = reg.conversion_stats();
        assert_eq!(reg.conversion_factor(&psi, &psi).unwrap(), 1.0);
        assert_eq!(reg.convert(42.0, &psi, &psi).unwrap(), 42.0);
        assert_eq!(reg.conversion_stats(), before);
    }

    #[test]
    fn named_unit_found_by_dimension_and_factor() {
        let reg = registry();
        let unit = reg.find_unit(LENGTH, 0.0254).unwrap();
        assert_eq!(unit.symbol(), "in");
        assert!(reg.find_unit(LENGTH, 0.123).is_none());
        assert_eq!(reg.coherent_unit(FORCE).symbol(), "N");
        assert_eq!(reg.find_unit(TEMPERATURE, 1.0).unwrap().symbol(), "K");
    }
}
