//! Variable-step backward Euler for index-1 DAEs.
//!
//! Each step solves `F(t + h, v, (v - y) / h) = 0` for `v` with a damped
//! Newton iteration started from the explicit predictor `y + h * yp`. Half
//! the predictor-corrector difference over the differential components
//! serves as the local error estimate.

use std::time::Instant;

use tracing::{debug, warn};

use crate::numerics::events::EventFunction;
use crate::numerics::integrator::{
    DaeIntegrator, InitialCondition, IntegratorOptions, IntegratorResult, IntegratorStats,
    LinearSolver,
};
use crate::numerics::newton::{NewtonArmijoSolver, NewtonStats, SolverError, wrms_norm};
use crate::numerics::timing::{finalize_and_print, reset_timing};
use crate::physics::DaeModel;

pub struct BackwardEuler {
    pub newton: NewtonArmijoSolver,
    /// Safety factor of the step-size controller.
    pub safety: f64,
    /// Step growth bounds after an accepted step.
    pub min_growth: f64,
    pub max_growth: f64,
    /// Step reduction after a Newton failure.
    pub failure_shrink: f64,
}

impl Default for BackwardEuler {
    fn default() -> Self {
        Self {
            newton: NewtonArmijoSolver::default(),
            safety: 0.9,
            min_growth: 0.2,
            max_growth: 2.0,
            failure_shrink: 0.25,
        }
    }
}

/// Accepted state at one end of a step.
struct Node<'a> {
    t: f64,
    y: &'a [f64],
}

/// State on the linear interpolant between two accepted nodes. The slope
/// of the interpolant is the derivative of the later node.
fn interpolate(a: &Node<'_>, b: &Node<'_>, t: f64, y: &mut [f64]) {
    let theta = (t - a.t) / (b.t - a.t);
    for ((yi, ya), yb) in y.iter_mut().zip(a.y).zip(b.y) {
        *yi = ya + theta * (yb - ya);
    }
}

impl BackwardEuler {
    fn band(options: &IntegratorOptions) -> Option<(usize, usize)> {
        match options.linear_solver {
            LinearSolver::Dense => None,
            LinearSolver::Banded { lband, uband } => Some((lband, uband)),
        }
    }

    /// Solve for algebraic `y` and differential `yp` at `t0`.
    fn consistent_initial_condition(
        &self,
        model: &dyn DaeModel,
        options: &IntegratorOptions,
        is_alg: &[bool],
        t0: f64,
        y: &mut [f64],
        yp: &mut [f64],
        stats: &mut NewtonStats,
    ) -> Result<(), SolverError> {
        let n = y.len();
        let mut res = vec![0.0; n];
        model.residual(t0, y, yp, &mut res);
        stats.nfev += 1;
        if res.iter().all(|&r| r == 0.0) {
            return Ok(());
        }

        let mut z: Vec<f64> = (0..n).map(|i| if is_alg[i] { y[i] } else { yp[i] }).collect();
        let weights: Vec<f64> = z
            .iter()
            .map(|v| 1.0 / (options.rtol * v.abs() + options.atol))
            .collect();

        let (y_fixed, yp_fixed) = (y.to_vec(), yp.to_vec());
        let mut y_work = y_fixed.clone();
        let mut yp_work = yp_fixed.clone();
        let mut g = |z: &[f64], r: &mut [f64]| {
            for i in 0..n {
                if is_alg[i] {
                    y_work[i] = z[i];
                } else {
                    yp_work[i] = z[i];
                }
            }
            model.residual(t0, &y_work, &yp_work, r);
        };

        let newton = NewtonArmijoSolver {
            max_iterations: self.newton.max_iterations.max(25),
            ..self.newton
        };
        newton.solve(&mut g, &mut z, &weights, Self::band(options), stats)?;

        for i in 0..n {
            if is_alg[i] {
                y[i] = z[i];
            } else {
                yp[i] = z[i];
            }
        }
        Ok(())
    }

    /// Earliest time in `(a.t, b.t]` where event `i` crosses zero, by the
    /// Illinois variant of regula falsi on the linear interpolant.
    #[allow(clippy::too_many_arguments)]
    fn locate_root(
        &self,
        events: &dyn EventFunction,
        i: usize,
        a: &Node<'_>,
        b: &Node<'_>,
        yp_b: &[f64],
        g_a: f64,
        g_b: f64,
        stats: &mut IntegratorStats,
    ) -> f64 {
        if g_b == 0.0 {
            return b.t;
        }
        let before = g_a.signum();
        let tol = 1e-12 * (b.t.abs() + (b.t - a.t)).max(1e-300);
        let mut y = vec![0.0; a.y.len()];
        let mut g = vec![0.0; events.len()];

        let (mut ta, mut tb, mut fa, mut fb) = (a.t, b.t, g_a, g_b);
        let mut side = 0;
        for _ in 0..100 {
            if tb - ta <= tol {
                break;
            }
            let mut tc = (ta * fb - tb * fa) / (fb - fa);
            if !(tc > ta && tc < tb) {
                tc = 0.5 * (ta + tb);
            }
            interpolate(a, b, tc, &mut y);
            events.evaluate(tc, &y, yp_b, &mut g);
            stats.nfev += 1;
            let fc = g[i];
            if fc == 0.0 {
                return tc;
            }
            if fc.signum() != before {
                tb = tc;
                fb = fc;
                if side == 1 {
                    fa *= 0.5;
                }
                side = 1;
            } else {
                ta = tc;
                fa = fc;
                if side == -1 {
                    fb *= 0.5;
                }
                side = -1;
            }
        }
        tb
    }

    fn integrate(
        &self,
        model: &dyn DaeModel,
        events: Option<&dyn EventFunction>,
        options: &IntegratorOptions,
        tspan: &[f64],
        y0: &[f64],
        yp0: &[f64],
    ) -> IntegratorResult {
        let n = model.len();
        if y0.len() != n || yp0.len() != n {
            return IntegratorResult::failure(format!(
                "initial state has length {}/{}, model expects {n}",
                y0.len(),
                yp0.len()
            ));
        }
        if tspan.len() < 2 || tspan.windows(2).any(|w| !(w[1] > w[0])) {
            return IntegratorResult::failure("tspan needs at least two increasing times");
        }

        let (t0, tf) = (tspan[0], tspan[tspan.len() - 1]);
        let span = tf - t0;
        let mut is_alg = vec![false; n];
        for &i in options.algebraic_idx.iter().filter(|&&i| i < n) {
            is_alg[i] = true;
        }
        let band = Self::band(options);

        let mut out = IntegratorResult::default();
        let mut newton_stats = NewtonStats::default();
        let mut stats = IntegratorStats::default();
        let mut y = y0.to_vec();
        let mut yp = yp0.to_vec();

        if options.initial_condition == InitialCondition::Yp0 {
            if let Err(e) = self.consistent_initial_condition(
                model,
                options,
                &is_alg,
                t0,
                &mut y,
                &mut yp,
                &mut newton_stats,
            ) {
                out.message = format!("initial condition failed: {e}");
                out.stats = merge(stats, newton_stats);
                return out;
            }
        }
        out.push(t0, &y, &yp);

        let n_ev = events.map_or(0, |e| e.len());
        let mut g_prev = vec![0.0; n_ev];
        let mut g_new = vec![0.0; n_ev];
        let mut counts = vec![0u32; n_ev];
        if let Some(ev) = events {
            ev.evaluate(t0, &y, &yp, &mut g_prev);
        }

        let dense_output = tspan.len() > 2;
        let mut next_out = 1;
        let h_min = 1e-12 * span.max(t0.abs());
        let h_max = options.max_step.unwrap_or(span).min(span);
        let mut h = options.first_step.unwrap_or(1e-5 * span).min(h_max);
        let mut t = t0;

        let mut v = vec![0.0; n];
        let mut yp_new = vec![0.0; n];
        let mut y_pred = vec![0.0; n];
        let mut ypw = vec![0.0; n];
        let mut y_out = vec![0.0; n];

        while t < tf {
            if stats.nsteps >= options.max_num_steps {
                out.message = SolverError::TooManySteps(options.max_num_steps).to_string();
                out.stats = merge(stats, newton_stats);
                return out;
            }

            let mut h_try = h.min(tf - t);
            let t_new = if tf - (t + h_try) < h_min {
                h_try = tf - t;
                tf
            } else {
                t + h_try
            };

            for i in 0..n {
                y_pred[i] = y[i] + h_try * yp[i];
            }
            v.copy_from_slice(&y_pred);
            let weights: Vec<f64> = y
                .iter()
                .map(|yi| 1.0 / (options.rtol * yi.abs() + options.atol))
                .collect();

            let outcome = {
                let y_old = &y;
                let mut g = |z: &[f64], r: &mut [f64]| {
                    for i in 0..n {
                        ypw[i] = (z[i] - y_old[i]) / h_try;
                    }
                    model.residual(t_new, z, &ypw, r);
                };
                self.newton.solve(&mut g, &mut v, &weights, band, &mut newton_stats)
            };

            if let Err(e) = outcome {
                stats.ncfails += 1;
                h = h_try * self.failure_shrink;
                warn!(t, h = h_try, error = %e, "step failed, reducing step size");
                if h < h_min {
                    out.message = SolverError::StepSizeUnderflow { h, t }.to_string();
                    out.stats = merge(stats, newton_stats);
                    return out;
                }
                continue;
            }

            let diff: Vec<f64> = (0..n)
                .filter(|&i| !is_alg[i])
                .map(|i| 0.5 * (v[i] - y_pred[i]))
                .collect();
            let diff_weights: Vec<f64> = (0..n)
                .filter(|&i| !is_alg[i])
                .map(|i| 1.0 / (options.rtol * y[i].abs().max(v[i].abs()) + options.atol))
                .collect();
            let err = wrms_norm(&diff, &diff_weights);

            if err > 1.0 {
                stats.netfails += 1;
                h = h_try * (self.safety / err.sqrt()).clamp(0.1, 0.5);
                debug!(t, h = h_try, err, "error test failed");
                if h < h_min {
                    out.message = SolverError::StepSizeUnderflow { h, t }.to_string();
                    out.stats = merge(stats, newton_stats);
                    return out;
                }
                continue;
            }

            stats.nsteps += 1;
            for i in 0..n {
                yp_new[i] = (v[i] - y[i]) / h_try;
            }
            let a = Node { t, y: &y };
            let b = Node { t: t_new, y: &v };

            if let Some(ev) = events {
                ev.evaluate(t_new, &v, &yp_new, &mut g_new);
                let mut crossings: Vec<(f64, usize)> = (0..n_ev)
                    .filter(|&i| ev.direction(i).accepts(g_prev[i], g_new[i]))
                    .map(|i| {
                        let tr = self.locate_root(
                            ev, i, &a, &b, &yp_new, g_prev[i], g_new[i], &mut stats,
                        );
                        (tr, i)
                    })
                    .collect();
                crossings.sort_by(|x, y| x.0.total_cmp(&y.0));

                for (tr, i) in crossings {
                    counts[i] += 1;
                    interpolate(&a, &b, tr, &mut y_out);
                    out.t_events.push(tr);
                    out.y_events.push(y_out.clone());
                    out.i_events.push(i);

                    if ev.terminal(i).stops_at(counts[i]) {
                        if dense_output {
                            while next_out < tspan.len() && tspan[next_out] < tr {
                                interpolate(&a, &b, tspan[next_out], &mut y_out);
                                out.push(tspan[next_out], &y_out, &yp_new);
                                next_out += 1;
                            }
                            interpolate(&a, &b, tr, &mut y_out);
                        }
                        out.push(tr, &y_out, &yp_new);
                        out.success = true;
                        out.on_event = true;
                        out.message = format!("event {i} triggered at t = {tr:.6e}");
                        out.stats = merge(stats, newton_stats);
                        return out;
                    }
                }
                g_prev.copy_from_slice(&g_new);
            }

            if dense_output {
                while next_out < tspan.len() && tspan[next_out] <= t_new {
                    interpolate(&a, &b, tspan[next_out], &mut y_out);
                    out.push(tspan[next_out], &y_out, &yp_new);
                    next_out += 1;
                }
            } else {
                out.push(t_new, &v, &yp_new);
            }

            y.copy_from_slice(&v);
            yp.copy_from_slice(&yp_new);
            t = t_new;

            let growth = if err > 0.0 {
                (self.safety / err.sqrt()).clamp(self.min_growth, self.max_growth)
            } else {
                self.max_growth
            };
            h = (h_try * growth).min(h_max);
        }

        out.success = true;
        out.message = "reached the end of the time span".to_string();
        out.stats = merge(stats, newton_stats);
        out
    }
}

fn merge(mut stats: IntegratorStats, newton: NewtonStats) -> IntegratorStats {
    stats.nfev += newton.nfev;
    stats.njev += newton.njev;
    stats
}

impl DaeIntegrator for BackwardEuler {
    fn solve(
        &self,
        model: &dyn DaeModel,
        events: Option<&dyn EventFunction>,
        options: &IntegratorOptions,
        tspan: &[f64],
        y0: &[f64],
        yp0: &[f64],
    ) -> IntegratorResult {
        reset_timing();
        let start = Instant::now();
        let result = self.integrate(model, events, options, tspan, y0, yp0);
        finalize_and_print(start.elapsed());
        debug!(
            success = result.success,
            steps = result.stats.nsteps,
            nfev = result.stats.nfev,
            njev = result.stats.njev,
            "integration finished: {}",
            result.message
        );
        result
    }
}
