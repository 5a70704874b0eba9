pub mod generator;
pub mod mesh;
pub mod operators;
pub mod pointer;
