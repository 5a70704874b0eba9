pub mod config;
pub mod discretization;
pub mod materials;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;
