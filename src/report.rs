//! Run results and JSON run reports

use crate::core::{ExecutionStatus, LabelFlags, Pipeline, StepState, TriggerEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Final state of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub name: String,
    pub state: StepState,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Source branch the run was triggered for
    pub branch: String,

    /// Labels of the triggering event
    pub labels: Vec<String>,

    /// Flags derived from the labels
    pub flags: LabelFlags,

    /// Execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Per-state step counts
    pub counts: StepCounts,

    /// Steps in declaration order
    pub steps: Vec<StepRecord>,
}

/// How many steps ended in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunResult {
    /// Snapshot a finished pipeline
    pub fn from_pipeline(pipeline: &Pipeline, event: &TriggerEvent, flags: LabelFlags) -> Self {
        Self {
            execution_id: pipeline.state.execution_id,
            pipeline_name: pipeline.name.clone(),
            branch: event.branch.clone(),
            labels: event.labels.iter().cloned().collect(),
            flags,
            status: pipeline.state.status,
            started_at: pipeline.state.started_at,
            completed_at: pipeline.state.completed_at,
            counts: StepCounts {
                total: pipeline.state.total_steps,
                completed: pipeline.state.completed_steps,
                failed: pipeline.state.failed_steps,
                skipped: pipeline.state.skipped_steps,
            },
            steps: pipeline
                .steps
                .iter()
                .map(|s| StepRecord {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    state: s.state.clone(),
                })
                .collect(),
        }
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ExecutionStatus::Completed => 0,
            _ => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }

    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// IDs of the steps that ran, in order
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.state.was_executed())
            .map(|s| s.id.as_str())
            .collect()
    }

    /// IDs of the steps that were skipped
    pub fn skipped_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Skipped { .. }))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// All suppressed failures, tagged with their step
    pub fn suppressed_failures(&self) -> Vec<(&str, &str)> {
        self.steps
            .iter()
            .flat_map(|s| match &s.state {
                StepState::Completed { suppressed, .. } => suppressed
                    .iter()
                    .map(|e| (s.id.as_str(), e.as_str()))
                    .collect::<Vec<_>>(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Write the run report as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        Ok(())
    }
}
