//! Core domain models for the release pipeline
//!
//! Trigger events, label flags, the run context, and the ordered
//! steps that make up a pipeline.

pub mod condition;
pub mod config;
pub mod context;
pub mod event;
pub mod pipeline;
pub mod state;
pub mod step;

pub use condition::*;
pub use context::{RunContext, Secrets};
pub use event::{EventError, TriggerEvent};
pub use pipeline::*;
pub use state::*;
pub use step::*;
