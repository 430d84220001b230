//! Pipeline execution engine

pub mod commit;
pub mod engine;
pub mod executor;

pub use commit::push_target;
pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::StepExecutor;
