pub mod csv_writer;
pub mod summary;
pub mod verification;

pub use summary::BuildSummary;
pub use verification::{check_step, reaction_balance, StepBalance};
