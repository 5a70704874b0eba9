pub mod control;
pub mod kinetics;
pub mod residual;

pub use control::{ControlMode, CurrentUnits, Profile};
pub use residual::{Diagnostics, Observables, ResidualAssembler};

/// Physical constants in the kmol-based unit system used throughout.
pub mod constants {
    /// Faraday's constant [C/kmol].
    pub const F: f64 = 96485.3321e3;
    /// Universal gas constant [J/kmol/K].
    pub const R: f64 = 8.3145e3;
}

/// Defines the contract for any DAE model handed to an integrator.
///
/// The system is `res = M * yp - f(t, y)` with a diagonal mass matrix. The
/// residual is written into a caller-owned buffer so integrators can reuse
/// their memory between calls.
pub trait DaeModel {
    /// Number of unknowns.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `res` with the residual at `(t, y, yp)`.
    ///
    /// Numerical trouble (non-finite intermediates, properties queried out
    /// of range) must show up as large entries in `res`, never as a panic.
    fn residual(&self, t: f64, y: &[f64], yp: &[f64], res: &mut [f64]);
}
