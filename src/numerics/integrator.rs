//! Contract between the model and a DAE time integrator.

use crate::numerics::events::EventFunction;
use crate::physics::DaeModel;

/// Linear solver used inside the Newton iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinearSolver {
    Dense,
    /// Half-bandwidths of the iteration matrix.
    Banded { lband: usize, uband: usize },
}

/// Treatment of the initial state before the first step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InitialCondition {
    /// Use `(y0, yp0)` as given.
    #[default]
    None,
    /// Solve for the algebraic components of `y` and the differential
    /// components of `yp`, keeping differential `y` fixed.
    Yp0,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntegratorOptions {
    pub rtol: f64,
    pub atol: f64,
    pub linear_solver: LinearSolver,
    /// Indices whose equation has no time derivative.
    pub algebraic_idx: Vec<usize>,
    pub initial_condition: InitialCondition,
    /// Upper bound on the internal step [s], `None` for no bound.
    pub max_step: Option<f64>,
    /// Size of the first attempted step [s].
    pub first_step: Option<f64>,
    pub max_num_steps: usize,
    /// Newton iterations allowed per attempted step.
    pub max_nonlinear_iterations: u32,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            linear_solver: LinearSolver::Dense,
            algebraic_idx: Vec::new(),
            initial_condition: InitialCondition::None,
            max_step: None,
            first_step: None,
            max_num_steps: 100_000,
            max_nonlinear_iterations: 8,
        }
    }
}

/// Work counters of one integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegratorStats {
    pub nsteps: usize,
    /// Residual evaluations.
    pub nfev: usize,
    /// Jacobian evaluations.
    pub njev: usize,
    /// Steps rejected by the error test.
    pub netfails: usize,
    /// Steps rejected because Newton failed.
    pub ncfails: usize,
}

/// Outcome of an integration. Failures are reported here, never raised.
#[derive(Clone, Debug, Default)]
pub struct IntegratorResult {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub yp: Vec<Vec<f64>>,
    pub success: bool,
    /// True when a terminal event ended the integration.
    pub on_event: bool,
    pub message: String,
    /// Every event occurrence, terminal or not.
    pub t_events: Vec<f64>,
    pub y_events: Vec<Vec<f64>>,
    /// Index of the event function behind each occurrence.
    pub i_events: Vec<usize>,
    pub stats: IntegratorStats,
}

impl IntegratorResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, t: f64, y: &[f64], yp: &[f64]) {
        self.t.push(t);
        self.y.push(y.to_vec());
        self.yp.push(yp.to_vec());
    }
}

/// A DAE time integrator.
///
/// `tspan` with two entries saves every internal step; longer spans save
/// exactly at the given times.
pub trait DaeIntegrator {
    fn solve(
        &self,
        model: &dyn DaeModel,
        events: Option<&dyn EventFunction>,
        options: &IntegratorOptions,
        tspan: &[f64],
        y0: &[f64],
        yp0: &[f64],
    ) -> IntegratorResult;
}
