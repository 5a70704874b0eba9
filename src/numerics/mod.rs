pub mod backward_euler;
pub mod bandwidth;
pub mod events;
pub mod integrator;
pub mod newton;
pub mod timing;

pub use backward_euler::BackwardEuler;
pub use bandwidth::JacobianPattern;
pub use events::{Direction, EventFunction, Limit, Quantity, Terminal};
pub use integrator::{
    DaeIntegrator, InitialCondition, IntegratorOptions, IntegratorResult, IntegratorStats,
    LinearSolver,
};
pub use newton::{NewtonArmijoSolver, SolverError};
