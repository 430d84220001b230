//! Pipeline domain model

use crate::core::{
    condition::LabelFlags,
    config::{ConfigError, PipelineConfig},
    state::{ExecutionStatus, PipelineState},
    step::Step,
};

/// An ordered release pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Steps in declaration order; this is the execution order
    pub steps: Vec<Step>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let steps = config
            .steps
            .iter()
            .map(Step::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pipeline {
            name: config.name.clone(),
            steps,
            state: PipelineState::new(),
        })
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// IDs of the steps whose guard allows them for these flags, in order
    pub fn planned_steps(&self, flags: &LabelFlags) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.should_run(flags))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Recount step states into the pipeline state
    pub fn update_state_counts(&mut self) {
        let states = self.steps.iter().map(|s| &s.state);
        self.state.update_counts(states);
    }
}
