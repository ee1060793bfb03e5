//! Multivariate Newton iteration for coupled equations.
//!
//! The Jacobian is built by forward differences on residuals weighted by
//! their magnitude at the starting point, so equations in different units
//! contribute comparably. Each step is the SVD least-squares solution of
//! `J dx = -r`, shortened by backtracking until the weighted residual norm
//! decreases. A square system also converges once a full step is negligible
//! against every unknown's magnitude.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use super::numeric::{typical_magnitude, ConvergenceCriteria, Residual};
use crate::errors::{DimsolveError, Result};
use crate::math::Scalar;

/// Halvings attempted per Newton step.
const MAX_BACKTRACKS: usize = 20;
/// Singular values below this fraction of the largest count as zero.
const RANK_TOLERANCE: Scalar = 1.0e-6;
/// Singular values below this are dropped from the least-squares step.
const SVD_EPSILON: Scalar = 1.0e-14;
/// Doublings of the offset tried when the starting point is outside the domain.
const MAX_EXPANSIONS: i32 = 40;

/// Result of [`solve_system`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSolution {
    /// Root in the residual function's coordinates.
    pub roots: DVector<Scalar>,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Weighted residual norm at the root.
    pub residual_norm: Scalar,
}

/// Numerical rank of a matrix.
#[must_use]
pub fn numerical_rank(matrix: &DMatrix<Scalar>) -> usize {
    let singular_values = matrix.clone().svd(false, false).singular_values;
    let largest = singular_values.max();
    if largest <= 0.0 || !largest.is_finite() {
        return 0;
    }
    singular_values
        .iter()
        .filter(|&&value| value > RANK_TOLERANCE * largest)
        .count()
}

/// Solves `f(x) ≈ 0` for a system of at least as many residuals as unknowns.
///
/// Fails with [`DimsolveError::UnsolvableSystem`] when the Jacobian is rank
/// deficient both at `x0` and at a perturbed point, and with
/// [`DimsolveError::Convergence`] after `criteria.max_iterations` steps.
pub fn solve_system<F>(
    mut f: F,
    x0: DVector<Scalar>,
    criteria: &ConvergenceCriteria,
    derivative_step: Scalar,
) -> Result<SystemSolution>
where
    F: FnMut(&DVector<Scalar>) -> Result<Vec<Residual>>,
{
    let n = x0.len();
    let typical: Vec<Scalar> = x0.iter().map(|&x| typical_magnitude(x)).collect();
    let (x0, initial) = feasible_start(&mut f, x0, &typical)?;
    if initial.len() < n {
        return Err(DimsolveError::UnsolvableSystem(format!(
            "{} equation(s) for {n} unknown(s)",
            initial.len()
        )));
    }
    let weights: Vec<Scalar> = initial
        .iter()
        .map(|r| if r.scale > 0.0 && r.scale.is_finite() { 1.0 / r.scale } else { 1.0 })
        .collect();

    let weighted = |residuals: &[Residual]| -> DVector<Scalar> {
        DVector::from_iterator(
            residuals.len(),
            residuals.iter().zip(&weights).map(|(r, w)| r.value * w),
        )
    };

    let r0 = weighted(&initial);
    let at_guess = jacobian(&mut f, &x0, &r0, &weights, &typical, derivative_step)?;
    let rank_at_guess = numerical_rank(&at_guess);
    if rank_at_guess < n {
        let perturbed = DVector::from_iterator(
            n,
            x0.iter().zip(&typical).map(|(&x, &t)| x * 1.1 + 0.1 * t),
        );
        let rank_at_perturbed = match f(&perturbed) {
            Ok(values) => {
                let r = weighted(&values);
                let at_perturbed =
                    jacobian(&mut f, &perturbed, &r, &weights, &typical, derivative_step)?;
                numerical_rank(&at_perturbed)
            }
            Err(DimsolveError::Domain(_)) => rank_at_guess,
            Err(error) => return Err(error),
        };
        if rank_at_perturbed < n {
            return Err(DimsolveError::UnsolvableSystem(format!(
                "{} independent equation(s) for {n} unknown(s)",
                rank_at_guess.max(rank_at_perturbed)
            )));
        }
    }

    let mut x = x0;
    let mut residuals = initial;
    let mut r = weighted(&residuals);
    for iteration in 0..criteria.max_iterations {
        if residuals.iter().all(|res| res.is_converged(criteria)) {
            return Ok(SystemSolution {
                roots: x,
                iterations: iteration,
                residual_norm: r.norm(),
            });
        }

        let j = jacobian(&mut f, &x, &r, &weights, &typical, derivative_step)?;
        let dx = j
            .svd(true, true)
            .solve(&(-&r), SVD_EPSILON)
            .map_err(|reason| DimsolveError::UnsolvableSystem(reason.to_string()))?;
        let full_step_negligible = residuals.len() == n
            && dx
                .iter()
                .zip(x.iter().zip(&typical))
                .all(|(&step, (&xi, &t))| criteria.is_negligible_step(step, xi, t));

        let norm = r.norm();
        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let candidate = &x + &dx * alpha;
            match f(&candidate) {
                Ok(trial) => {
                    let trial_r = weighted(&trial);
                    let finite = trial_r.iter().all(|v| v.is_finite());
                    if finite && (trial_r.norm() < norm || accepted.is_none()) {
                        let improved = trial_r.norm() < norm;
                        accepted = Some((candidate, trial, trial_r));
                        if improved {
                            break;
                        }
                    }
                }
                Err(DimsolveError::Domain(_)) => {}
                Err(error) => return Err(error),
            }
            alpha *= 0.5;
        }
        let (next, next_residuals, next_r) = accepted.ok_or_else(|| {
            DimsolveError::Domain("no Newton step stays inside the equations' domain".into())
        })?;
        trace!(iteration, alpha, residual = next_r.norm(), "simultaneous step");
        x = next;
        residuals = next_residuals;
        r = next_r;
        if full_step_negligible {
            return Ok(SystemSolution {
                roots: x,
                iterations: iteration + 1,
                residual_norm: r.norm(),
            });
        }
    }

    if residuals.iter().all(|res| res.is_converged(criteria)) {
        return Ok(SystemSolution {
            roots: x,
            iterations: criteria.max_iterations,
            residual_norm: r.norm(),
        });
    }
    Err(DimsolveError::Convergence {
        iterations: criteria.max_iterations,
        residual: r.norm(),
    })
}

/// First point at which every residual is defined: `x0` itself, or
/// `x0 ± typical * 2^k` for growing `k`, all unknowns moved together.
fn feasible_start<F>(
    f: &mut F,
    x0: DVector<Scalar>,
    typical: &[Scalar],
) -> Result<(DVector<Scalar>, Vec<Residual>)>
where
    F: FnMut(&DVector<Scalar>) -> Result<Vec<Residual>>,
{
    let first_error = match f(&x0) {
        Ok(values) => return Ok((x0, values)),
        Err(error @ DimsolveError::Domain(_)) => error,
        Err(error) => return Err(error),
    };
    for k in 0..MAX_EXPANSIONS {
        let factor = 2.0_f64.powi(k);
        for sign in [1.0, -1.0] {
            let candidate = DVector::from_iterator(
                x0.len(),
                x0.iter().zip(typical).map(|(&x, &t)| x + sign * factor * t),
            );
            match f(&candidate) {
                Ok(values) => {
                    trace!(expansion = k, "moved starting point into domain");
                    return Ok((candidate, values));
                }
                Err(DimsolveError::Domain(_)) => {}
                Err(error) => return Err(error),
            }
        }
    }
    Err(first_error)
}

/// Forward-difference Jacobian of the weighted residuals.
fn jacobian<F>(
    f: &mut F,
    x: &DVector<Scalar>,
    r: &DVector<Scalar>,
    weights: &[Scalar],
    typical: &[Scalar],
    derivative_step: Scalar,
) -> Result<DMatrix<Scalar>>
where
    F: FnMut(&DVector<Scalar>) -> Result<Vec<Residual>>,
{
    let mut j = DMatrix::zeros(r.len(), x.len());
    for col in 0..x.len() {
        let magnitude = if x[col] == 0.0 { typical[col] } else { x[col].abs() };
        let h = derivative_step * magnitude;
        let mut shifted = x.clone();
        shifted[col] += h;
        // Step backwards when the forward point is outside the domain.
        let (values, h) = match f(&shifted) {
            Ok(values) => (values, h),
            Err(DimsolveError::Domain(_)) => {
                shifted[col] = x[col] - h;
                (f(&shifted)?, -h)
            }
            Err(error) => return Err(error),
        };
        for (row, (value, w)) in values.iter().zip(weights).enumerate() {
            j[(row, col)] = (value.value * w - r[row]) / h;
        }
    }
    Ok(j)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn residual(value: Scalar, scale: Scalar) -> Residual {
        Residual { value, scale }
    }

    #[test]
    fn polar_to_cartesian_pair() {
        let (f1, f2) = (450.0_f64, 700.0_f64);
        let rx = f1 * 60.0_f64.to_radians().cos() + f2 * 195.0_f64.to_radians().cos();
        let ry = f1 * 60.0_f64.to_radians().sin() + f2 * 195.0_f64.to_radians().sin();
        let f = |x: &DVector<Scalar>| {
            let (r, theta) = (x[0], x[1]);
            let px = r * theta.cos();
            let py = r * theta.sin();
            Ok(vec![
                residual(px - rx, px.abs().max(rx.abs())),
                residual(py - ry, py.abs().max(ry.abs())),
            ])
        };
        let guess = DVector::from_vec(vec![500.0, 150.0_f64.to_radians()]);
        let solution = solve_system(f, guess, &ConvergenceCriteria::default(), 1e-7).unwrap();
        assert_relative_eq!(solution.roots[0], 497.013_810_524_893_76, max_relative = 1e-9);
        assert_relative_eq!(
            solution.roots[1].to_degrees(),
            155.191_793_24,
            max_relative = 1e-9
        );
        assert!(solution.iterations > 0);
    }

    #[test]
    fn linear_system_converges_in_few_steps() {
        let f = |x: &DVector<Scalar>| {
            Ok(vec![
                residual(x[0] + x[1] - 3.0, 3.0),
                residual(x[0] - x[1] - 1.0, 1.0),
            ])
        };
        let solution = solve_system(
            f,
            DVector::from_vec(vec![0.0, 0.0]),
            &ConvergenceCriteria::default(),
            1e-7,
        )
        .unwrap();
        assert_relative_eq!(solution.roots[0], 2.0, max_relative = 1e-9);
        assert_relative_eq!(solution.roots[1], 1.0, max_relative = 1e-9);
        assert!(solution.iterations <= 3);
    }

    #[test]
    fn dependent_equations_are_rank_deficient() {
        let f = |x: &DVector<Scalar>| {
            Ok(vec![
                residual(x[0] + x[1] - 3.0, 3.0),
                residual(2.0 * x[0] + 2.0 * x[1] - 6.0, 6.0),
            ])
        };
        let err = solve_system(
            f,
            DVector::from_vec(vec![1.0, 1.0]),
            &ConvergenceCriteria::default(),
            1e-7,
        )
        .unwrap_err();
        assert!(matches!(err, DimsolveError::UnsolvableSystem(_)));
    }

    #[test]
    fn too_few_equations() {
        let f = |x: &DVector<Scalar>| Ok(vec![residual(x[0] + x[1] - 3.0, 3.0)]);
        let err = solve_system(
            f,
            DVector::from_vec(vec![1.0, 1.0]),
            &ConvergenceCriteria::default(),
            1e-7,
        )
        .unwrap_err();
        assert!(matches!(err, DimsolveError::UnsolvableSystem(_)));
    }

    #[test]
    fn inconsistent_system_hits_cap() {
        let f = |x: &DVector<Scalar>| {
            Ok(vec![
                residual(x[0] * x[0] + 1.0, 1.0),
                residual(x[1] - 2.0, 2.0),
            ])
        };
        let criteria = ConvergenceCriteria::default().with_max_iterations(25);
        let err = solve_system(f, DVector::from_vec(vec![1.0, 0.0]), &criteria, 1e-7).unwrap_err();
        assert!(matches!(
            err,
            DimsolveError::Convergence { iterations: 25, .. }
        ));
    }

    #[test]
    fn small_magnitudes_are_not_converged_early() {
        // x·y = 2e-12 m² and x − y = 1e-6 m; every residual at the guess is
        // already below 1e-10 in SI.
        let f = |x: &DVector<Scalar>| {
            let product = x[0] * x[1];
            Ok(vec![
                residual(product - 2.0e-12, product.abs().max(2.0e-12)),
                residual(x[0] - x[1] - 1.0e-6, (x[0].abs() + x[1].abs()).max(1.0e-6)),
            ])
        };
        let guess = DVector::from_vec(vec![1.0e-6, 1.0e-6]);
        let solution = solve_system(f, guess, &ConvergenceCriteria::default(), 1e-7).unwrap();
        assert_relative_eq!(solution.roots[0], 2.0e-6, max_relative = 1e-9);
        assert_relative_eq!(solution.roots[1], 1.0e-6, max_relative = 1e-9);
        assert!(solution.iterations > 0);
    }

    #[test]
    fn large_magnitudes_converge() {
        // Stresses in Pa: p·q = (200 MPa)(100 MPa) and p − q = 100 MPa.
        let f = |x: &DVector<Scalar>| {
            let product = x[0] * x[1];
            Ok(vec![
                residual(product - 2.0e16, product.abs().max(2.0e16)),
                residual(x[0] - x[1] - 1.0e8, (x[0].abs() + x[1].abs()).max(1.0e8)),
            ])
        };
        let guess = DVector::from_vec(vec![1.0e8, 1.0e8]);
        let solution = solve_system(f, guess, &ConvergenceCriteria::default(), 1e-7).unwrap();
        assert_relative_eq!(solution.roots[0], 2.0e8, max_relative = 1e-9);
        assert_relative_eq!(solution.roots[1], 1.0e8, max_relative = 1e-9);
    }

    #[test]
    fn undefined_start_moves_into_domain() {
        // sqrt(x − 4) = y and x + y = 10, undefined at the guess (1, 1).
        let f = |x: &DVector<Scalar>| {
            if x[0] < 4.0 {
                return Err(DimsolveError::Domain(format!("sqrt of {}", x[0] - 4.0)));
            }
            let root = (x[0] - 4.0).sqrt();
            Ok(vec![
                residual(root - x[1], root.max(x[1].abs()).max(1.0)),
                residual(x[0] + x[1] - 10.0, 10.0),
            ])
        };
        let guess = DVector::from_vec(vec![1.0, 1.0]);
        let solution = solve_system(f, guess, &ConvergenceCriteria::default(), 1e-7).unwrap();
        assert_relative_eq!(solution.roots[0], 8.0, max_relative = 1e-9);
        assert_relative_eq!(solution.roots[1], 2.0, max_relative = 1e-9);
    }

    #[test]
    fn rank_of_known_matrices() {
        let full = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let deficient = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(numerical_rank(&full), 2);
        assert_eq!(numerical_rank(&deficient), 1);
        assert_eq!(numerical_rank(&DMatrix::zeros(2, 2)), 0);
    }
}
