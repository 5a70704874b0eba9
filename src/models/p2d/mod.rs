//! Pseudo-two-dimensional lithium-ion cell.
//!
//! [`P2dCell`] is the immutable snapshot produced from a [`CellConfig`]:
//! meshes, pointers, rested state and bandwidths. [`Simulation`] drives it
//! through a sequence of [`Step`]s.
//!
//! [`CellConfig`]: crate::config::CellConfig

pub mod cell;
pub mod domains;
pub mod experiment;

pub use cell::P2dCell;
pub use domains::{Battery, Electrode, Electrolyte, Separator};
pub use experiment::{LimitEvents, Simulation, Step, StepSolution};
