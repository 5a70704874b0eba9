//! Damped Newton iteration with a finite-difference Jacobian.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::trace;

use crate::numerics::timing::{record_jacobian, record_linear_solve};
use crate::physics::residual::INVALID_RESIDUAL;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("linear solve failed")]
    LinearSolveFailed,
    #[error("Newton's method failed to converge in {0} iterations")]
    NonConvergence(u32),
    #[error("line search failed to find sufficient decrease")]
    LineSearchFailed,
    #[error("step size {h:.3e} s fell below the minimum at t = {t:.6e} s")]
    StepSizeUnderflow { h: f64, t: f64 },
    #[error("exceeded {0} internal steps")]
    TooManySteps(usize),
    #[error("residual is not finite")]
    NonFiniteResidual,
}

/// Work done by one or more Newton solves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NewtonStats {
    pub iterations: u32,
    pub nfev: usize,
    pub njev: usize,
}

pub struct NewtonArmijoSolver {
    /// Convergence threshold on the weighted RMS norm of the update.
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Minimum step size before we give up (prevents infinite loops)
    pub min_step_size: f64,
    /// Parameter for sufficient decrease (usually 1e-4)
    pub armijo_param: f64,
}

impl Default for NewtonArmijoSolver {
    fn default() -> Self {
        Self {
            tolerance: 0.33,
            max_iterations: 8,
            min_step_size: 1e-3,
            armijo_param: 1e-4,
        }
    }
}

/// Weighted root-mean-square norm.
pub fn wrms_norm(v: &[f64], weights: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().zip(weights).map(|(x, w)| (x * w).powi(2)).sum();
    (sum / v.len() as f64).sqrt()
}

fn is_invalid(res: &[f64]) -> bool {
    res.iter().any(|r| !r.is_finite() || r.abs() >= INVALID_RESIDUAL)
}

impl NewtonArmijoSolver {
    /// Solve `g(z) = 0` in place starting from `z`.
    ///
    /// `weights` scale the update norm, `band` restricts the Jacobian to
    /// `(lband, uband)` half-bandwidths. Counters in `stats` are updated
    /// even when the iteration fails.
    pub fn solve<G>(
        &self,
        g: &mut G,
        z: &mut [f64],
        weights: &[f64],
        band: Option<(usize, usize)>,
        stats: &mut NewtonStats,
    ) -> Result<u32, SolverError>
    where
        G: FnMut(&[f64], &mut [f64]),
    {
        let n = z.len();
        let mut res = vec![0.0; n];
        g(&*z, &mut res);
        stats.nfev += 1;
        if is_invalid(&res) {
            return Err(SolverError::NonFiniteResidual);
        }

        let mut trial = vec![0.0; n];
        let mut trial_res = vec![0.0; n];

        for i in 0..self.max_iterations {
            stats.iterations += 1;
            let mut jacobian = record_jacobian(|| fd_jacobian(&mut *g, &*z, &res, band, &mut *stats));

            // Row scaling D^{-1} from the diagonal, so the merit function
            // weighs charge and mass balances alike.
            let d_inv: Vec<f64> = (0..n)
                .map(|r| {
                    let diag = jacobian[(r, r)].abs();
                    let scale = if diag > 1e-12 {
                        diag
                    } else {
                        jacobian.row(r).amax()
                    };
                    if scale > 0.0 { 1.0 / scale } else { 1.0 }
                })
                .collect();
            for (r, d) in d_inv.iter().enumerate() {
                jacobian.row_mut(r).scale_mut(*d);
            }
            let rhs = DVector::from_iterator(n, res.iter().zip(&d_inv).map(|(r, d)| -r * d));

            let delta = record_linear_solve(|| jacobian.lu().solve(&rhs))
                .filter(|d| d.iter().all(|x| x.is_finite()))
                .ok_or(SolverError::LinearSolveFailed)?;

            let norm = wrms_norm(delta.as_slice(), weights);
            trace!(iteration = i, update = norm, "newton");
            if norm <= self.tolerance {
                for (zi, di) in z.iter_mut().zip(delta.iter()) {
                    *zi += di;
                }
                return Ok(i + 1);
            }

            // Backtracking line search on ||D^{-1} g||
            let merit0 = scaled_norm(&res, &d_inv);
            let mut alpha = 1.0;
            let mut accepted = false;
            while alpha >= self.min_step_size {
                for ((t, zi), di) in trial.iter_mut().zip(z.iter()).zip(delta.iter()) {
                    *t = zi + alpha * di;
                }
                g(&trial, &mut trial_res);
                stats.nfev += 1;

                let merit = scaled_norm(&trial_res, &d_inv);
                if !is_invalid(&trial_res) && merit <= (1.0 - alpha * self.armijo_param) * merit0 {
                    z.copy_from_slice(&trial);
                    res.copy_from_slice(&trial_res);
                    accepted = true;
                    break;
                }
                alpha *= 0.5;
            }

            if !accepted {
                return Err(SolverError::LineSearchFailed);
            }
            if alpha * norm <= self.tolerance {
                return Ok(i + 1);
            }
        }
        Err(SolverError::NonConvergence(self.max_iterations))
    }
}

fn scaled_norm(res: &[f64], d_inv: &[f64]) -> f64 {
    res.iter()
        .zip(d_inv)
        .map(|(r, d)| (r * d).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Forward-difference Jacobian of `g` at `z`, where `g0 = g(z)`.
///
/// With a band, columns further apart than `lband + uband` cannot share a
/// row, so they are perturbed together and the Jacobian costs
/// `lband + uband + 1` evaluations instead of `n`.
pub fn fd_jacobian<G>(
    g: &mut G,
    z: &[f64],
    g0: &[f64],
    band: Option<(usize, usize)>,
    stats: &mut NewtonStats,
) -> DMatrix<f64>
where
    G: FnMut(&[f64], &mut [f64]),
{
    let n = z.len();
    let (lband, uband) = band.unwrap_or((n.saturating_sub(1), n.saturating_sub(1)));
    let width = (lband + uband + 1).min(n).max(1);
    let sqrt_eps = f64::EPSILON.sqrt();

    let mut jac = DMatrix::zeros(n, n);
    let mut zp = z.to_vec();
    let mut gp = vec![0.0; n];
    let mut delta = vec![0.0; n];

    for group in 0..width {
        for j in (group..n).step_by(width) {
            let h = sqrt_eps * z[j].abs().max(1.0);
            zp[j] = z[j] + h;
            delta[j] = zp[j] - z[j];
        }
        g(&zp, &mut gp);
        stats.nfev += 1;

        for j in (group..n).step_by(width) {
            let rows = j.saturating_sub(uband)..=(j + lband).min(n - 1);
            for i in rows {
                jac[(i, j)] = (gp[i] - g0[i]) / delta[j];
            }
            zp[j] = z[j];
        }
    }
    stats.njev += 1;
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn banded_jacobian_matches_dense() {
        let mut g = |z: &[f64], r: &mut [f64]| {
            let n = z.len();
            for i in 0..n {
                let left = if i > 0 { z[i - 1] } else { 0.0 };
                let right = if i + 1 < n { z[i + 1] } else { 0.0 };
                r[i] = z[i].powi(3) - left + 2.0 * right;
            }
        };
        let z: Vec<f64> = (0..7).map(|i| 0.3 * i as f64 - 1.0).collect();
        let mut g0 = vec![0.0; 7];
        g(&z, &mut g0);

        let mut stats = NewtonStats::default();
        let dense = fd_jacobian(&mut g, &z, &g0, None, &mut stats);
        let banded = fd_jacobian(&mut g, &z, &g0, Some((1, 1)), &mut stats);
        assert_eq!(stats.nfev, 7 + 3);
        for (a, b) in dense.iter().zip(banded.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        assert_relative_eq!(dense[(2, 2)], 3.0 * z[2] * z[2], max_relative = 1e-6);
    }

    #[test]
    fn solves_a_nonlinear_system() {
        // x^2 = 2, x * y = 3
        let mut g = |z: &[f64], r: &mut [f64]| {
            r[0] = z[0] * z[0] - 2.0;
            r[1] = z[0] * z[1] - 3.0;
        };
        let solver = NewtonArmijoSolver {
            max_iterations: 30,
            tolerance: 1e-6,
            ..Default::default()
        };
        let mut z = vec![1.0, 1.0];
        let mut stats = NewtonStats::default();
        solver.solve(&mut g, &mut z, &[1.0, 1.0], None, &mut stats).unwrap();
        assert_relative_eq!(z[0], 2f64.sqrt(), max_relative = 1e-8);
        assert_relative_eq!(z[1], 3.0 / 2f64.sqrt(), max_relative = 1e-8);
        assert!(stats.njev >= 1);
    }

    #[test]
    fn invalid_start_is_reported() {
        let mut g = |_: &[f64], r: &mut [f64]| r[0] = INVALID_RESIDUAL;
        let mut z = vec![0.0];
        let err = NewtonArmijoSolver::default()
            .solve(&mut g, &mut z, &[1.0], None, &mut NewtonStats::default())
            .unwrap_err();
        assert_eq!(err, SolverError::NonFiniteResidual);
    }

    #[test]
    fn weighted_norm() {
        assert_relative_eq!(wrms_norm(&[3.0, 4.0], &[1.0, 1.0]), (12.5f64).sqrt());
        assert_eq!(wrms_norm(&[], &[]), 0.0);
    }
}
