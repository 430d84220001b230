//! Main execution engine - runs the pipeline's steps in declaration order

use crate::{
    core::{
        ExecutionStatus, LabelFlags, Pipeline, RunContext, StepOutcome, StepState, TriggerEvent,
    },
    execution::StepExecutor,
    report::RunResult,
    runner::CommandRunner,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        branch: String,
        flags: LabelFlags,
    },
    StepStarted {
        step_id: String,
        name: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    CommandStarted {
        step_id: String,
        command: String,
    },
    CommandSuppressed {
        step_id: String,
        error: String,
    },
    NothingToCommit {
        step_id: String,
    },
    PushRetried {
        step_id: String,
        attempt: usize,
        max_retries: usize,
    },
    StepCompleted {
        step_id: String,
        suppressed: usize,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
pub struct ExecutionEngine<R> {
    executor: StepExecutor<R>,
    event_handlers: Vec<EventHandler>,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            event_handlers: Vec::new(),
        }
    }

    /// The runner commands are sent to
    pub fn runner(&self) -> &R {
        self.executor.runner()
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    fn complete_step(
        &self,
        step_id: &str,
        suppressed: Vec<String>,
        started_at: chrono::DateTime<Utc>,
    ) -> StepState {
        self.emit_event(ExecutionEvent::StepCompleted {
            step_id: step_id.to_string(),
            suppressed: suppressed.len(),
        });
        StepState::Completed {
            suppressed,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Execute the pipeline for a trigger event
    ///
    /// Label flags are computed once from the event. Steps run strictly in
    /// order; a false guard skips a step without side effects, and the first
    /// fatal outcome skips everything after it.
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
        event: &TriggerEvent,
        context: &RunContext,
    ) -> RunResult {
        let flags = event.flags();
        let execution_id = pipeline.state.execution_id;

        info!(
            "Starting pipeline execution: {} ({}) on branch {} with {:?}",
            pipeline.name, execution_id, event.branch, flags
        );
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            branch: event.branch.clone(),
            flags,
        });

        pipeline.state.start(pipeline.steps.len());
        let emit = |event: ExecutionEvent| self.emit_event(event);
        let mut aborted_by: Option<String> = None;

        for index in 0..pipeline.steps.len() {
            let step = pipeline.steps[index].clone();

            let skip_reason = match &aborted_by {
                Some(failed) => Some(format!("aborted after '{}' failed", failed)),
                None if !step.should_run(&flags) => Some(format!("requires {}", step.guard.describe())),
                None => None,
            };

            if let Some(reason) = skip_reason {
                info!("Skipping step {}: {}", step.id, reason);
                pipeline.steps[index].state = StepState::Skipped {
                    reason: reason.clone(),
                };
                self.emit_event(ExecutionEvent::StepSkipped {
                    step_id: step.id.clone(),
                    reason,
                });
                pipeline.update_state_counts();
                continue;
            }

            let started_at = Utc::now();
            pipeline.steps[index].state = StepState::Running { started_at };
            self.emit_event(ExecutionEvent::StepStarted {
                step_id: step.id.clone(),
                name: step.name.clone(),
            });

            let outcome = self.executor.execute(&step, context, &emit).await;

            pipeline.steps[index].state = match outcome {
                StepOutcome::Fatal { error } => {
                    error!("Step {} failed: {}", step.id, error);
                    self.emit_event(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        error: error.clone(),
                    });
                    aborted_by = Some(step.id.clone());
                    pipeline.state.fail();
                    StepState::Failed {
                        error,
                        started_at,
                        failed_at: Utc::now(),
                    }
                }
                StepOutcome::Success => self.complete_step(&step.id, Vec::new(), started_at),
                StepOutcome::Suppressed { errors } => self.complete_step(&step.id, errors, started_at),
            };

            pipeline.update_state_counts();
        }

        let status = if pipeline.has_failed() {
            ExecutionStatus::Failed
        } else {
            pipeline.state.complete();
            ExecutionStatus::Completed
        };

        info!(
            "Pipeline execution finished: {} - {:?}",
            pipeline.name, status
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        RunResult::from_pipeline(pipeline, event, flags)
    }
}
