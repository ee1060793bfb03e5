//! Capability traits for variable and equation storage, and their default
//! insertion-ordered implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::report::{SolveStep, SolveSummary};
use super::variable::Variable;
use crate::equation::Equation;
use crate::errors::{DimsolveError, Result};
use crate::quantity::Quantity;
use crate::units::UnitRegistry;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Read access to variables by name.
pub trait VariableLookup {
    /// Variable registered under `name`.
    fn variable(&self, name: &str) -> Option<&Variable>;

    /// Identifier distinguishing this store from every other live store.
    fn store_id(&self) -> u64;
}

/// Mutable variable storage used by solvers.
pub trait VariableStore: VariableLookup {
    /// Registers a new variable; names must be unique.
    fn insert(&mut self, variable: Variable) -> Result<()>;

    /// Moves an unknown variable to known.
    fn mark_known(&mut self, name: &str, quantity: &Quantity, registry: &UnitRegistry) -> Result<()>;

    /// Variables in insertion order.
    fn variables(&self) -> Box<dyn Iterator<Item = &Variable> + '_>;

    /// This store as a plain lookup.
    fn as_lookup(&self) -> &dyn VariableLookup;

    /// Names of unknown variables in insertion order.
    fn unknowns(&self) -> Vec<String> {
        self.variables()
            .filter(|variable| !variable.is_known())
            .map(|variable| variable.name().to_string())
            .collect()
    }
}

/// Ordered equation storage.
pub trait EquationStore {
    /// Equations in insertion order.
    fn equations(&self) -> &[Equation];

    /// Appends an equation.
    fn push(&mut self, equation: Equation);

    /// Number of equations.
    fn len(&self) -> usize {
        self.equations().len()
    }

    /// True when no equation is stored.
    fn is_empty(&self) -> bool {
        self.equations().is_empty()
    }
}

/// Strategy that resolves unknown variables from a set of equations.
pub trait Solver {
    /// Solves as many unknowns as possible.
    ///
    /// Steps are appended to `steps` as they complete, so a failing solve
    /// still reports the progress made before the error.
    fn solve(
        &self,
        variables: &mut dyn VariableStore,
        equations: &dyn EquationStore,
        registry: &UnitRegistry,
        steps: &mut Vec<SolveStep>,
    ) -> Result<SolveSummary>;
}

/// Insertion-ordered variable table.
///
/// Every insertion or assignment bumps a generation counter; the variable
/// records the generation as its stamp, which expression caches use for
/// invalidation.
#[derive(Debug)]
pub struct VariableTable {
    id: u64,
    generation: u64,
    variables: IndexMap<String, Variable>,
}

impl VariableTable {
    /// Creates an empty table with a fresh store id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            variables: IndexMap::new(),
        }
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Current generation counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

// A clone is a different store: expression caches must not treat its
// values as interchangeable with the original's.
impl Clone for VariableTable {
    fn clone(&self) -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            generation: self.generation,
            variables: self.variables.clone(),
        }
    }
}

impl VariableLookup for VariableTable {
    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    fn store_id(&self) -> u64 {
        self.id
    }
}

impl VariableStore for VariableTable {
    fn insert(&mut self, mut variable: Variable) -> Result<()> {
        if self.variables.contains_key(variable.name()) {
            return Err(DimsolveError::DuplicateVariable(variable.name().to_string()));
        }
        self.generation += 1;
        variable.set_stamp(self.generation);
        self.variables.insert(variable.name().to_string(), variable);
        Ok(())
    }

    fn mark_known(&mut self, name: &str, quantity: &Quantity, registry: &UnitRegistry) -> Result<()> {
        let generation = self.generation + 1;
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| DimsolveError::UndefinedVariable(name.to_string()))?;
        variable.assign(quantity, registry, generation)?;
        self.generation = generation;
        Ok(())
    }

    fn variables(&self) -> Box<dyn Iterator<Item = &Variable> + '_> {
        Box::new(self.variables.values())
    }

    fn as_lookup(&self) -> &dyn VariableLookup {
        self
    }
}

/// Equations kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EquationList {
    equations: Vec<Equation>,
}

impl EquationList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EquationStore for EquationList {
    fn equations(&self) -> &[Equation] {
        &self.equations
    }

    fn push(&mut self, equation: Equation) {
        self.equations.push(equation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{initialize_registry, standard_catalog};

    #[test]
    fn insertion_order_and_duplicates() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut table = VariableTable::new();
        table
            .insert(Variable::unknown("b", reg.unit("m").unwrap()))
            .unwrap();
        table
            .insert(Variable::known("a", Quantity::with_unit(&reg, "m", 1.0).unwrap()))
            .unwrap();
        let names: Vec<_> = table.iter().map(Variable::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(table.unknowns(), ["b"]);
        assert_eq!(
            table.insert(Variable::unknown("a", reg.unit("m").unwrap())),
            Err(DimsolveError::DuplicateVariable("a".into()))
        );
    }

    #[test]
    fn marking_known_bumps_generation() {
        let reg = initialize_registry(standard_catalog()).unwrap();
        let mut table = VariableTable::new();
        table
            .insert(Variable::unknown("x", reg.unit("m").unwrap()))
            .unwrap();
        let before = table.generation();
        let value = Quantity::with_unit(&reg, "m", 2.0).unwrap();
        table.mark_known("x", &value, &reg).unwrap();
        assert_eq!(table.generation(), before + 1);
        assert_eq!(table.variable("x").unwrap().stamp(), before + 1);
        assert!(matches!(
            table.mark_known("x", &value, &reg),
            Err(DimsolveError::AlreadyKnown(_))
        ));
        assert_eq!(table.generation(), before + 1);
        assert!(matches!(
            table.mark_known("y", &value, &reg),
            Err(DimsolveError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn clones_get_their_own_id() {
        let table = VariableTable::new();
        let copy = table.clone();
        assert_ne!(table.store_id(), copy.store_id());
    }
}
