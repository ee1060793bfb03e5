//! Dependency-ordered solving of a whole problem.
//!
//! Equations and variables form a bipartite graph. An equation is *ready*
//! when exactly one of its variables is unknown. The solver repeatedly scans
//! the equations in insertion order, solves the first ready one and restarts
//! the scan. When nothing is ready but unknowns remain, the unresolved
//! equations are split into connected components (breadth-first search over
//! shared unknowns). Each component is split further into blocks of mutually
//! dependent unknowns: unknowns are matched to equations, and the strongly
//! connected parts of the resulting dependency graph are the blocks. The
//! smallest block that depends on no other unknown is solved simultaneously
//! and the scan resumes, so the rest of the component can become ready.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use nalgebra::DVector;
use tracing::{debug, info, warn};

use super::numeric::ConvergenceCriteria;
use super::simultaneous::solve_system;
use super::{SolveMethod, SolverConfig};
use crate::dimension::DimensionSignature;
use crate::equation::Equation;
use crate::errors::{DimsolveError, Result};
use crate::expression::EvalContext;
use crate::problem::report::{SolveStep, SolveSummary, SolvedValue};
use crate::problem::store::{EquationStore, Solver, VariableLookup, VariableStore};
use crate::quantity::Quantity;
use crate::units::{Unit, UnitRegistry};

/// Equations coupled through shared unknowns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Equation indices, ascending.
    pub equations: Vec<usize>,
    /// Unknown names in store order.
    pub unknowns: Vec<String>,
}

/// Default [`Solver`]: dependency-ordered scan with simultaneous fallback.
#[derive(Debug, Clone, Default)]
pub struct DependencySolver {
    config: SolverConfig,
}

impl DependencySolver {
    /// Creates a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves the first ready equation, if any. Returns whether progress was made.
    fn solve_next_ready(
        &self,
        variables: &mut dyn VariableStore,
        equations: &[Equation],
        registry: &UnitRegistry,
        used: &mut [bool],
        steps: &mut Vec<SolveStep>,
    ) -> Result<bool> {
        for (index, equation) in equations.iter().enumerate() {
            if used[index] {
                continue;
            }
            let lookup = variables.as_lookup();
            let Some(name) = single_unknown(equation, lookup) else {
                continue;
            };
            let ctx = EvalContext::new(registry, lookup);
            let solution = match equation.solve_for(&name, &ctx, &self.config) {
                Ok(solution) => solution,
                Err(error) if error.is_not_ready() => continue,
                Err(error) => return Err(error),
            };
            let substituted = substitute(equation, lookup);

            variables.mark_known(&name, &solution.value, registry)?;
            used[index] = true;
            debug!(
                equation = equation.name(),
                variable = %name,
                value = %solution.value,
                method = %solution.method,
                "solved"
            );
            steps.push(SolveStep {
                equations: vec![equation.name().to_string()],
                solved: vec![SolvedValue::new(&name, &solution.value)],
                method: solution.method,
                substituted: vec![substituted],
            });
            return Ok(true);
        }
        Ok(false)
    }

    /// Solves one stalled component simultaneously.
    fn solve_component(
        &self,
        variables: &mut dyn VariableStore,
        equations: &[Equation],
        registry: &UnitRegistry,
        component: &Component,
        steps: &mut Vec<SolveStep>,
    ) -> Result<()> {
        let lookup = variables.as_lookup();
        let mut slots: Vec<(DimensionSignature, Unit)> = Vec::with_capacity(component.unknowns.len());
        let mut guesses = Vec::with_capacity(component.unknowns.len());
        for name in &component.unknowns {
            let variable = lookup
                .variable(name)
                .ok_or_else(|| DimsolveError::UndefinedVariable(name.clone()))?;
            slots.push((variable.dimension(), variable.unit().clone()));
            guesses.push(variable.initial_guess_si());
        }

        let base = EvalContext::new(registry, lookup);
        let mut trial = BTreeMap::new();
        let solution = solve_system(
            |x: &DVector<f64>| {
                for ((name, (dimension, _)), value) in component.unknowns.iter().zip(&slots).zip(x.iter()) {
                    trial.insert(name.clone(), Quantity::from_si(registry, *dimension, *value));
                }
                let ctx = base.with_trial(&trial);
                component
                    .equations
                    .iter()
                    .map(|&index| equations[index].residual_si(&ctx))
                    .collect()
            },
            DVector::from_vec(guesses),
            &self.config.simultaneous,
            self.config.derivative_step,
        )?;

        let values = slots
            .iter()
            .zip(solution.roots.iter())
            .map(|((dimension, unit), &root)| Quantity::from_si(registry, *dimension, root).to(registry, unit))
            .collect::<Result<Vec<_>>>()?;
        let substituted = component
            .equations
            .iter()
            .map(|&index| substitute(&equations[index], lookup))
            .collect();

        for (name, value) in component.unknowns.iter().zip(&values) {
            variables.mark_known(name, value, registry)?;
        }
        let method = SolveMethod::Simultaneous {
            iterations: solution.iterations,
        };
        debug!(
            equations = component.equations.len(),
            unknowns = ?component.unknowns,
            %method,
            "solved coupled component"
        );
        steps.push(SolveStep {
            equations: component
                .equations
                .iter()
                .map(|&index| equations[index].name().to_string())
                .collect(),
            solved: component
                .unknowns
                .iter()
                .zip(&values)
                .map(|(name, value)| SolvedValue::new(name, value))
                .collect(),
            method,
            substituted,
        });
        Ok(())
    }

    /// Flags fully-known equations that are not satisfied. Never fails.
    fn check_consistency(
        &self,
        variables: &dyn VariableLookup,
        equations: &[Equation],
        registry: &UnitRegistry,
        used: &[bool],
    ) -> Vec<String> {
        let criteria = ConvergenceCriteria {
            relative_tolerance: self.config.consistency_tolerance,
            ..self.config.single
        };
        let ctx = EvalContext::new(registry, variables);
        let mut inconsistent = Vec::new();
        for (index, equation) in equations.iter().enumerate() {
            if used[index] || equation.unknowns(variables).next().is_some() {
                continue;
            }
            match equation.residual_si(&ctx) {
                Ok(residual) if residual.is_converged(&criteria) => {}
                Ok(residual) => {
                    warn!(
                        equation = equation.name(),
                        residual = residual.value,
                        scale = residual.scale,
                        "equation not satisfied by known values"
                    );
                    inconsistent.push(equation.name().to_string());
                }
                Err(error) => {
                    warn!(equation = equation.name(), %error, "consistency check failed");
                    inconsistent.push(equation.name().to_string());
                }
            }
        }
        inconsistent
    }
}

impl Solver for DependencySolver {
    fn solve(
        &self,
        variables: &mut dyn VariableStore,
        equations: &dyn EquationStore,
        registry: &UnitRegistry,
        steps: &mut Vec<SolveStep>,
    ) -> Result<SolveSummary> {
        let equations = equations.equations();
        let mut used = vec![false; equations.len()];
        let first_step = steps.len();

        loop {
            if self.solve_next_ready(variables, equations, registry, &mut used, steps)? {
                continue;
            }
            let unknowns = variables.unknowns();
            if unknowns.is_empty() {
                break;
            }
            let component = stalled_component(variables.as_lookup(), equations, &used, &unknowns)?;
            if component.equations.len() < component.unknowns.len() {
                return Err(DimsolveError::UnsolvableSystem(format!(
                    "{} equation(s) for unknowns {:?}",
                    component.equations.len(),
                    component.unknowns
                )));
            }
            self.solve_component(variables, equations, registry, &component, steps)?;
            for &index in &component.equations {
                used[index] = true;
            }
        }

        let inconsistent = if self.config.check_consistency {
            self.check_consistency(variables.as_lookup(), equations, registry, &used)
        } else {
            Vec::new()
        };
        let summary = SolveSummary::from_steps(&steps[first_step..], inconsistent);
        info!(
            solved = summary.solved,
            closed_form = summary.closed_form,
            numeric = summary.numeric,
            simultaneous = summary.simultaneous,
            "solve finished"
        );
        Ok(summary)
    }
}

/// The only unknown of `equation`, if it has exactly one.
fn single_unknown(equation: &Equation, variables: &dyn VariableLookup) -> Option<String> {
    let mut unknowns = equation.unknowns(variables);
    match (unknowns.next(), unknowns.next()) {
        (Some(name), None) => Some(name.to_string()),
        _ => None,
    }
}

/// Renders `equation` with every known value substituted.
fn substitute(equation: &Equation, variables: &dyn VariableLookup) -> String {
    equation.render_with(|name| variables.variable(name).and_then(|v| v.quantity().cloned()))
}

/// Picks the component to solve simultaneously after a stall.
///
/// Fails when an unknown is referenced by no unresolved equation.
pub fn stalled_component(
    variables: &dyn VariableLookup,
    equations: &[Equation],
    used: &[bool],
    unknowns: &[String],
) -> Result<Component> {
    let pending: Vec<usize> = (0..equations.len())
        .filter(|&index| !used[index] && equations[index].unknowns(variables).next().is_some())
        .collect();
    if let Some(orphan) = unknowns
        .iter()
        .find(|name| !pending.iter().any(|&index| equations[index].references(name)))
    {
        return Err(DimsolveError::UnsolvableSystem(format!(
            "`{orphan}` does not appear in any unresolved equation"
        )));
    }
    connected_components(variables, equations, &pending, unknowns)
        .iter()
        .map(|component| minimal_block(equations, component))
        .min_by_key(|block| (block.unknowns.len(), block.equations.first().copied()))
        .ok_or_else(|| DimsolveError::UnsolvableSystem("no unresolved equations".into()))
}

/// Smallest block of `component` whose equations involve no unknown outside it.
///
/// Each unknown is matched to a distinct equation by augmenting paths; an
/// unknown then depends on every other unknown of its matched equation.
/// Blocks are the strongly connected parts of that dependency graph. When
/// no complete matching exists the component is returned whole.
pub fn minimal_block(equations: &[Equation], component: &Component) -> Component {
    let incidence: Vec<Vec<usize>> = component
        .unknowns
        .iter()
        .map(|name| {
            (0..component.equations.len())
                .filter(|&slot| equations[component.equations[slot]].references(name))
                .collect()
        })
        .collect();
    let Some(matched) = match_unknowns(&incidence, component.equations.len()) else {
        return component.clone();
    };

    let depends_on: Vec<Vec<usize>> = matched
        .iter()
        .enumerate()
        .map(|(unknown, &slot)| {
            (0..component.unknowns.len())
                .filter(|&other| other != unknown && incidence[other].contains(&slot))
                .collect()
        })
        .collect();
    let block_of = strongly_connected(&depends_on);
    let block_count = block_of.iter().max().map_or(0, |&last| last + 1);

    (0..block_count)
        .filter(|&block| {
            (0..depends_on.len())
                .filter(|&unknown| block_of[unknown] == block)
                .all(|unknown| depends_on[unknown].iter().all(|&other| block_of[other] == block))
        })
        .map(|block| {
            let members: Vec<usize> = (0..component.unknowns.len())
                .filter(|&unknown| block_of[unknown] == block)
                .collect();
            let mut block_equations: Vec<usize> = members
                .iter()
                .map(|&unknown| component.equations[matched[unknown]])
                .collect();
            block_equations.sort_unstable();
            Component {
                equations: block_equations,
                unknowns: members
                    .iter()
                    .map(|&unknown| component.unknowns[unknown].clone())
                    .collect(),
            }
        })
        .min_by_key(|block| (block.unknowns.len(), block.equations.first().copied()))
        .unwrap_or_else(|| component.clone())
}

/// Matches every unknown to a distinct equation slot, if possible.
fn match_unknowns(incidence: &[Vec<usize>], slots: usize) -> Option<Vec<usize>> {
    fn augment(
        unknown: usize,
        incidence: &[Vec<usize>],
        owner: &mut [Option<usize>],
        seen: &mut [bool],
    ) -> bool {
        for &slot in &incidence[unknown] {
            if seen[slot] {
                continue;
            }
            seen[slot] = true;
            let free = match owner[slot] {
                None => true,
                Some(other) => augment(other, incidence, owner, seen),
            };
            if free {
                owner[slot] = Some(unknown);
                return true;
            }
        }
        false
    }

    let mut owner = vec![None; slots];
    for unknown in 0..incidence.len() {
        let mut seen = vec![false; slots];
        if !augment(unknown, incidence, &mut owner, &mut seen) {
            return None;
        }
    }
    let mut matched = vec![0; incidence.len()];
    for (slot, unknown) in owner.iter().enumerate() {
        if let Some(unknown) = *unknown {
            matched[unknown] = slot;
        }
    }
    Some(matched)
}

/// Tarjan's algorithm; returns a block id per node.
fn strongly_connected(edges: &[Vec<usize>]) -> Vec<usize> {
    struct Search<'a> {
        edges: &'a [Vec<usize>],
        order: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        block_of: Vec<usize>,
        visited: usize,
        blocks: usize,
    }

    impl Search<'_> {
        fn visit(&mut self, node: usize) {
            self.order[node] = Some(self.visited);
            self.low[node] = self.visited;
            self.visited += 1;
            self.stack.push(node);
            self.on_stack[node] = true;

            let edges = self.edges;
            for &next in &edges[node] {
                match self.order[next] {
                    None => {
                        self.visit(next);
                        self.low[node] = self.low[node].min(self.low[next]);
                    }
                    Some(order) if self.on_stack[next] => {
                        self.low[node] = self.low[node].min(order);
                    }
                    Some(_) => {}
                }
            }

            if Some(self.low[node]) == self.order[node] {
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member] = false;
                    self.block_of[member] = self.blocks;
                    if member == node {
                        break;
                    }
                }
                self.blocks += 1;
            }
        }
    }

    let n = edges.len();
    let mut search = Search {
        edges,
        order: vec![None; n],
        low: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::with_capacity(n),
        block_of: vec![0; n],
        visited: 0,
        blocks: 0,
    };
    for node in 0..n {
        if search.order[node].is_none() {
            search.visit(node);
        }
    }
    search.block_of
}

/// Breadth-first search over equations linked by shared unknowns.
///
/// Components come out ordered by their earliest equation.
pub fn connected_components(
    variables: &dyn VariableLookup,
    equations: &[Equation],
    pending: &[usize],
    unknowns: &[String],
) -> Vec<Component> {
    let mut visited = vec![false; pending.len()];
    let mut components = Vec::new();

    for start in 0..pending.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut members = Vec::new();
        let mut names: BTreeSet<&str> = BTreeSet::new();

        while let Some(slot) = queue.pop_front() {
            let equation = &equations[pending[slot]];
            members.push(pending[slot]);
            for name in equation.unknowns(variables) {
                if !names.insert(name) {
                    continue;
                }
                for (other, &index) in pending.iter().enumerate() {
                    if !visited[other] && equations[index].references(name) {
                        visited[other] = true;
                        queue.push_back(other);
                    }
                }
            }
        }

        members.sort_unstable();
        components.push(Component {
            equations: members,
            unknowns: unknowns
                .iter()
                .filter(|name| names.contains(name.as_str()))
                .cloned()
                .collect(),
        });
    }
    components
}
