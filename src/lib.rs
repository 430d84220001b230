//! rc-pipeline - label-gated release candidate publishing

pub mod cli;
pub mod core;
pub mod execution;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use crate::core::{
    ExecutionStatus, Guard, LabelFlags, Pipeline, RunContext, Secrets, Step, StepOutcome,
    StepState, TriggerEvent,
};
pub use execution::{ExecutionEngine, ExecutionEvent};
pub use report::{RunResult, StepCounts};
pub use runner::{CommandOutput, CommandRunner, DryRunRunner, Invocation, ProcessRunner};
