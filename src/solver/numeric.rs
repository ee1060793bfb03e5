//! Bounded single-variable root finding.
//!
//! Newton iteration with a central-difference derivative. Once two iterates
//! straddle a sign change the search keeps that bracket and falls back to
//! bisection whenever the Newton step would leave it. A trial point outside
//! the residual's domain halves the step instead of aborting, and a starting
//! point outside it is moved outward until the residual is defined.
//!
//! Tolerances are relative throughout: residuals against the magnitude of
//! the equation's terms, steps against the magnitude of the variable. A
//! problem stated in mm² converges to the same relative accuracy as one in
//! m² or MPa·m⁴.

use tracing::trace;

use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;

/// Halvings attempted when a trial point is outside the residual's domain.
const MAX_BACKTRACKS: usize = 30;
/// Doublings of the offset tried when the starting point is outside the domain.
const MAX_EXPANSIONS: i32 = 40;

/// Convergence criteria for iterative solvers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Residual tolerance: |r| <= rel_tol * scale.
    pub relative_tolerance: Scalar,
    /// Step tolerance: a full Newton step |dx| <= step_tol * max(|x|, |x0|).
    pub step_tolerance: Scalar,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            relative_tolerance: 1e-10,
            step_tolerance: 1e-12,
        }
    }
}

impl ConvergenceCriteria {
    /// Checks whether a residual satisfies the criteria.
    ///
    /// Only an exactly zero residual passes against a zero scale.
    #[must_use]
    pub fn is_converged(&self, residual: Scalar, scale: Scalar) -> bool {
        let residual = residual.abs();
        residual == 0.0 || residual <= self.relative_tolerance * scale.abs()
    }

    /// Checks whether a step from `x` is negligible.
    ///
    /// `typical` is the magnitude the variable started at, so a root at zero
    /// is still reached in finitely many steps.
    #[must_use]
    pub fn is_negligible_step(&self, step: Scalar, x: Scalar, typical: Scalar) -> bool {
        step.abs() <= self.step_tolerance * x.abs().max(typical)
    }

    /// Same criteria with a different iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Magnitude a variable is measured against: its starting value, or one.
#[must_use]
pub fn typical_magnitude(x0: Scalar) -> Scalar {
    if x0 != 0.0 && x0.is_finite() {
        x0.abs()
    } else {
        1.0
    }
}

/// Signed residual of an equation with the magnitude it is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    /// `lhs - rhs` in coherent SI.
    pub value: Scalar,
    /// Term magnitude of the larger side in coherent SI.
    pub scale: Scalar,
}

impl Residual {
    /// True when the residual meets `criteria`.
    #[must_use]
    pub fn is_converged(&self, criteria: &ConvergenceCriteria) -> bool {
        criteria.is_converged(self.value, self.scale)
    }
}

/// Result of [`solve_scalar`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarSolution {
    /// Root in the residual function's coordinates.
    pub root: Scalar,
    /// Iterations performed.
    pub iterations: usize,
    /// Residual at the root.
    pub residual: Scalar,
}

impl ScalarSolution {
    fn new(root: Scalar, residual: Residual, iterations: usize) -> Self {
        Self {
            root,
            iterations,
            residual: residual.value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: Scalar,
    f_lo: Scalar,
    hi: Scalar,
}

impl Bracket {
    fn contains(&self, x: Scalar) -> bool {
        let (a, b) = if self.lo < self.hi {
            (self.lo, self.hi)
        } else {
            (self.hi, self.lo)
        };
        x > a && x < b
    }

    fn midpoint(&self) -> Scalar {
        0.5 * (self.lo + self.hi)
    }

    fn width(&self) -> Scalar {
        (self.hi - self.lo).abs()
    }

    fn narrow(&mut self, x: Scalar, fx: Scalar) {
        if fx.signum() == self.f_lo.signum() {
            self.lo = x;
            self.f_lo = fx;
        } else {
            self.hi = x;
        }
    }
}

/// Finds `x` with `f(x) ≈ 0`, starting from `x0`.
///
/// Converges when the residual meets the relative criterion, when a full
/// Newton step is negligible against the variable, or when a sign-change
/// bracket has collapsed to that width. Runs at most
/// `criteria.max_iterations` iterations; on failure the error reports
/// exactly that count. Errors from `f` other than domain errors on trial
/// points are propagated unchanged.
pub fn solve_scalar<F>(
    mut f: F,
    x0: Scalar,
    criteria: &ConvergenceCriteria,
    derivative_step: Scalar,
) -> Result<ScalarSolution>
where
    F: FnMut(Scalar) -> Result<Residual>,
{
    let typical = typical_magnitude(x0);
    let (mut x, mut current) = feasible_start(&mut f, x0, typical)?;
    let mut bracket: Option<Bracket> = None;

    for iteration in 0..criteria.max_iterations {
        let collapsed =
            bracket.is_some_and(|b| criteria.is_negligible_step(b.width(), x, typical));
        if current.is_converged(criteria) || collapsed {
            return Ok(ScalarSolution::new(x, current, iteration));
        }

        let magnitude = if x == 0.0 { typical } else { x.abs() };
        let h = derivative_step * magnitude;
        let newton = slope(&mut f, x, h)
            .filter(|s| *s != 0.0 && s.is_finite())
            .map(|s| x - current.value / s)
            .filter(|next| next.is_finite());
        let target = match (bracket, newton) {
            (Some(b), Some(next)) if b.contains(next) => next,
            (Some(b), _) => b.midpoint(),
            (None, Some(next)) => next,
            (None, None) => x + magnitude,
        };
        let full_step_negligible =
            newton == Some(target) && criteria.is_negligible_step(target - x, x, typical);

        let (next, next_residual) = backtrack(&mut f, x, target)?;
        trace!(iteration, x = next, residual = next_residual.value, "scalar step");

        if full_step_negligible {
            return Ok(ScalarSolution::new(next, next_residual, iteration + 1));
        }
        if let Some(b) = bracket.as_mut() {
            b.narrow(next, next_residual.value);
        } else if next_residual.value != 0.0
            && current.value != 0.0
            && next_residual.value.signum() != current.value.signum()
        {
            bracket = Some(Bracket {
                lo: x,
                f_lo: current.value,
                hi: next,
            });
        }
        x = next;
        current = next_residual;
    }

    if current.is_converged(criteria) {
        return Ok(ScalarSolution::new(x, current, criteria.max_iterations));
    }
    Err(DimsolveError::Convergence {
        iterations: criteria.max_iterations,
        residual: current.value.abs(),
    })
}

/// First point at which the residual is defined: `x0` itself, or the nearest
/// of `x0 ± typical * 2^k` for growing `k`.
fn feasible_start<F>(f: &mut F, x0: Scalar, typical: Scalar) -> Result<(Scalar, Residual)>
where
    F: FnMut(Scalar) -> Result<Residual>,
{
    let first_error = match f(x0) {
        Ok(residual) if residual.value.is_finite() => return Ok((x0, residual)),
        Ok(_) => DimsolveError::Domain(format!("residual is not finite at {x0}")),
        Err(error @ DimsolveError::Domain(_)) => error,
        Err(error) => return Err(error),
    };
    for k in 0..MAX_EXPANSIONS {
        let offset = typical * 2.0_f64.powi(k);
        for candidate in [x0 + offset, x0 - offset] {
            match f(candidate) {
                Ok(residual) if residual.value.is_finite() => {
                    trace!(from = x0, to = candidate, "moved starting point into domain");
                    return Ok((candidate, residual));
                }
                Ok(_) | Err(DimsolveError::Domain(_)) => {}
                Err(error) => return Err(error),
            }
        }
    }
    Err(first_error)
}

/// Central difference, falling back to one-sided differences near a domain edge.
fn slope<F>(f: &mut F, x: Scalar, h: Scalar) -> Option<Scalar>
where
    F: FnMut(Scalar) -> Result<Residual>,
{
    let forward = f(x + h).ok();
    let backward = f(x - h).ok();
    match (forward, backward) {
        (Some(p), Some(m)) => Some((p.value - m.value) / (2.0 * h)),
        (Some(p), None) => f(x).ok().map(|c| (p.value - c.value) / h),
        (None, Some(m)) => f(x).ok().map(|c| (c.value - m.value) / h),
        (None, None) => None,
    }
}

/// Evaluates `target`, halving the step from `x` while the residual is
/// undefined there.
fn backtrack<F>(f: &mut F, x: Scalar, target: Scalar) -> Result<(Scalar, Residual)>
where
    F: FnMut(Scalar) -> Result<Residual>,
{
    let mut step = target - x;
    let mut last_error = None;
    for _ in 0..MAX_BACKTRACKS {
        let candidate = x + step;
        match f(candidate) {
            Ok(residual) if residual.value.is_finite() => return Ok((candidate, residual)),
            Ok(_) => {}
            Err(error @ DimsolveError::Domain(_)) => last_error = Some(error),
            Err(error) => return Err(error),
        }
        step *= 0.5;
    }
    Err(last_error.unwrap_or_else(|| {
        DimsolveError::Domain(format!("no finite residual between {x} and {target}"))
    }))
}
