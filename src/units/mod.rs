//! Unit definitions, the sealed unit registry, and the standard catalog.

/// Immutable unit records and the shared `Unit` handle.
pub mod definition;
/// Registration, lookup and conversion.
pub mod registry;
/// Built-in engineering catalog and `StandardUnit` ids.
pub mod catalog;

pub use catalog::{standard_catalog, StandardUnit};
pub use definition::{Unit, UnitDefinition, UnitKind};
pub use registry::{initialize_registry, ConversionStats, UnitRegistry, UnitRegistryBuilder};
