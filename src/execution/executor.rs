//! Step executor - runs a single step's action through a command runner

use crate::{
    core::{FailurePolicy, RunContext, Step, StepAction, StepOutcome},
    execution::{commit::CommitAndPush, ExecutionEvent},
    runner::{CommandRunner, Invocation},
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Callback the executor reports command-level events through
pub type EventSink<'a> = &'a (dyn Fn(ExecutionEvent) + Send + Sync);

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute a step and return its outcome
    pub async fn execute(&self, step: &Step, context: &RunContext, emit: EventSink<'_>) -> StepOutcome {
        info!("Executing step: {}", step.id);

        let env = step.render_env(context);
        let working_dir = context.resolve_dir(step.working_dir.as_deref());
        let timeout = step.timeout_secs.map(Duration::from_secs);

        match &step.action {
            StepAction::Run(_) => {
                self.run_commands(step, context, env, working_dir, timeout, emit)
                    .await
            }
            StepAction::CommitAndPush(settings) => {
                CommitAndPush {
                    runner: &self.runner,
                    settings,
                    context,
                    step_id: &step.id,
                    env,
                    working_dir,
                    timeout,
                    emit,
                }
                .execute()
                .await
            }
        }
    }

    async fn run_commands(
        &self,
        step: &Step,
        context: &RunContext,
        env: Vec<(String, String)>,
        working_dir: std::path::PathBuf,
        timeout: Option<Duration>,
        emit: EventSink<'_>,
    ) -> StepOutcome {
        let StepAction::Run(commands) = &step.action else {
            return StepOutcome::Fatal {
                error: format!("Step {} has no commands", step.id),
            };
        };

        let mut suppressed = Vec::new();

        for command in commands {
            let failure = match command.render(context) {
                Err(e) => Some(format!("`{}`: {}", command.display(), e)),
                Ok((program, args)) => {
                    let invocation = Invocation::new(program, args)
                        .in_dir(&working_dir)
                        .with_env(env.clone())
                        .with_timeout(timeout)
                        .redacted(|s| context.redact(s));

                    emit(ExecutionEvent::CommandStarted {
                        step_id: step.id.clone(),
                        command: invocation.display.clone(),
                    });

                    match self.runner.run(&invocation).await {
                        Ok(output) if output.success() => {
                            debug!("`{}` succeeded", invocation.display);
                            None
                        }
                        Ok(output) => Some(format!(
                            "`{}` failed with {}",
                            invocation.display,
                            context.redact(&output.failure_summary())
                        )),
                        Err(e) => Some(format!(
                            "`{}`: {}",
                            invocation.display,
                            context.redact(&e.to_string())
                        )),
                    }
                }
            };

            let Some(error) = failure else {
                continue;
            };

            match command.on_failure {
                FailurePolicy::Suppress => {
                    warn!("Step {}: {} (suppressed)", step.id, error);
                    emit(ExecutionEvent::CommandSuppressed {
                        step_id: step.id.clone(),
                        error: error.clone(),
                    });
                    suppressed.push(error);
                }
                FailurePolicy::Fail => {
                    error!("Step {}: {}", step.id, error);
                    return StepOutcome::Fatal { error };
                }
            }
        }

        if suppressed.is_empty() {
            info!("Step {} completed successfully", step.id);
            StepOutcome::Success
        } else {
            info!(
                "Step {} completed with {} suppressed failure(s)",
                step.id,
                suppressed.len()
            );
            StepOutcome::Suppressed { errors: suppressed }
        }
    }
}
