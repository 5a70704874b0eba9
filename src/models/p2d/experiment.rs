//! Step-by-step experiments on a built cell.

use tracing::{info, warn};

use super::cell::P2dCell;
use crate::numerics::backward_euler::BackwardEuler;
use crate::numerics::events::{Direction, EventFunction, Limit, Terminal};
use crate::numerics::integrator::{DaeIntegrator, IntegratorOptions, IntegratorStats};
use crate::physics::control::ControlMode;
use crate::physics::residual::{Observables, ResidualAssembler};

/// One segment of an experiment under a single control mode.
#[derive(Clone, Debug)]
pub struct Step {
    pub mode: ControlMode,
    /// Step length [s].
    pub duration: f64,
    /// Number of evenly spaced saved points, `None` to save every internal
    /// step.
    pub n_points: Option<usize>,
    pub limits: Vec<Limit>,
    /// Replaces the options derived from the cell when set.
    pub options: Option<IntegratorOptions>,
}

impl Step {
    pub fn new(mode: ControlMode, duration: f64) -> Self {
        Self {
            mode,
            duration,
            n_points: None,
            limits: Vec::new(),
            options: None,
        }
    }

    /// Open-circuit rest.
    pub fn rest(duration: f64) -> Self {
        Self::new(ControlMode::rest(), duration)
    }

    pub fn points(mut self, n_points: usize) -> Self {
        self.n_points = Some(n_points);
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limits.push(limit);
        self
    }

    pub fn options(mut self, options: IntegratorOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Output times relative to the step start.
    pub fn tspan(&self) -> Vec<f64> {
        match self.n_points {
            Some(n) if n > 2 => {
                let dt = self.duration / (n - 1) as f64;
                let mut tspan: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
                tspan[n - 1] = self.duration;
                tspan
            }
            _ => vec![0.0, self.duration],
        }
    }
}

/// Limits of a step packed into one event vector.
pub struct LimitEvents<'a> {
    assembler: &'a ResidualAssembler<'a>,
    limits: &'a [Limit],
}

impl<'a> LimitEvents<'a> {
    pub fn new(assembler: &'a ResidualAssembler<'a>, limits: &'a [Limit]) -> Self {
        Self { assembler, limits }
    }
}

impl EventFunction for LimitEvents<'_> {
    fn len(&self) -> usize {
        self.limits.len()
    }

    fn direction(&self, i: usize) -> Direction {
        self.limits[i].direction
    }

    fn terminal(&self, i: usize) -> Terminal {
        self.limits[i].terminal
    }

    fn evaluate(&self, t: f64, y: &[f64], yp: &[f64], out: &mut [f64]) {
        let obs = self.assembler.observables(t, y, yp);
        for (o, limit) in out.iter_mut().zip(self.limits) {
            *o = obs.get(limit.quantity) - limit.value;
        }
    }
}

/// Result of one step with its cell-level series.
#[derive(Clone, Debug, Default)]
pub struct StepSolution {
    /// Time since the step started [s].
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub yp: Vec<Vec<f64>>,
    /// Total time of the experiment at the step start [s].
    pub t_offset: f64,
    pub time_s: Vec<f64>,
    pub current_a: Vec<f64>,
    pub voltage_v: Vec<f64>,
    pub power_w: Vec<f64>,
    pub success: bool,
    pub on_event: bool,
    pub message: String,
    /// Step times of every limit crossing and the limit behind each.
    pub t_events: Vec<f64>,
    pub i_events: Vec<usize>,
    pub stats: IntegratorStats,
}

impl StepSolution {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Last saved `(y, yp)`.
    pub fn final_state(&self) -> Option<(&[f64], &[f64])> {
        Some((self.y.last()?.as_slice(), self.yp.last()?.as_slice()))
    }

    fn push_observables(&mut self, obs: Observables) {
        self.time_s.push(obs.time_s);
        self.current_a.push(obs.current_a);
        self.voltage_v.push(obs.voltage_v);
        self.power_w.push(obs.power_w);
    }
}

/// Runs steps back to back on one cell. The terminal state of each step
/// seeds the next.
pub struct Simulation<'c, I: DaeIntegrator = BackwardEuler> {
    cell: &'c P2dCell,
    integrator: I,
    state: Option<(Vec<f64>, Vec<f64>)>,
    t_offset: f64,
}

impl<'c> Simulation<'c, BackwardEuler> {
    pub fn new(cell: &'c P2dCell) -> Self {
        Self::with_integrator(cell, BackwardEuler::default())
    }
}

impl<'c, I: DaeIntegrator> Simulation<'c, I> {
    pub fn with_integrator(cell: &'c P2dCell, integrator: I) -> Self {
        Self {
            cell,
            integrator,
            state: None,
            t_offset: 0.0,
        }
    }

    pub fn cell(&self) -> &P2dCell {
        self.cell
    }

    /// Total time simulated so far [s].
    pub fn t_offset(&self) -> f64 {
        self.t_offset
    }

    /// State the next step starts from.
    pub fn state(&self) -> (&[f64], &[f64]) {
        match &self.state {
            Some((y, yp)) => (y, yp),
            None => (&self.cell.y0, &self.cell.yp0),
        }
    }

    /// Back to the rested state at zero time.
    pub fn reset(&mut self) {
        self.state = None;
        self.t_offset = 0.0;
    }

    /// Integrate one step. Numerical failures are reported in the returned
    /// solution; whatever state was reached still seeds the next step.
    pub fn run_step(&mut self, step: &Step) -> StepSolution {
        let assembler = self.cell.assembler(step.mode.clone()).with_offset(self.t_offset);
        let events = LimitEvents::new(&assembler, &step.limits);
        let events = (!step.limits.is_empty()).then_some(&events as &dyn EventFunction);
        let options = step
            .options
            .clone()
            .unwrap_or_else(|| self.cell.integrator_options());

        info!(
            mode = ?step.mode,
            duration = step.duration,
            t_offset = self.t_offset,
            limits = step.limits.len(),
            "starting step"
        );

        let (y0, yp0) = self.state();
        let result = self
            .integrator
            .solve(&assembler, events, &options, &step.tspan(), y0, yp0);

        let mut solution = StepSolution {
            t_offset: self.t_offset,
            success: result.success,
            on_event: result.on_event,
            message: result.message,
            t_events: result.t_events,
            i_events: result.i_events,
            stats: result.stats,
            ..StepSolution::default()
        };
        for ((t, y), yp) in result.t.iter().zip(&result.y).zip(&result.yp) {
            solution.push_observables(assembler.observables(*t, y, yp));
        }
        solution.t = result.t;
        solution.y = result.y;
        solution.yp = result.yp;

        if let (Some(&t_end), Some((y, yp))) = (solution.t.last(), solution.final_state()) {
            self.state = Some((y.to_vec(), yp.to_vec()));
            self.t_offset += t_end;
        }

        if solution.success {
            info!(
                points = solution.len(),
                on_event = solution.on_event,
                steps = solution.stats.nsteps,
                t_offset = self.t_offset,
                "step finished"
            );
        } else {
            warn!(message = %solution.message, t_offset = self.t_offset, "step failed");
        }
        solution
    }

    /// Run `steps` in order. Every step runs even when an earlier one failed.
    pub fn run_steps(&mut self, steps: &[Step]) -> Vec<StepSolution> {
        steps.iter().map(|step| self.run_step(step)).collect()
    }
}
