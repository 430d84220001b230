//! CLI output formatting

use crate::{
    core::{ExecutionStatus, LabelFlags, Pipeline, StepState},
    execution::ExecutionEvent,
    report::{RunResult, StepCounts},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar over the pipeline's steps
///
/// Hidden when stdout is not a terminal (CI logs).
pub fn create_progress_bar(total: usize) -> ProgressBar {
    if !console::Term::stdout().is_term() {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { suppressed, .. } if !suppressed.is_empty() => {
            style(format!("COMPLETED ({} suppressed)", suppressed.len()))
                .yellow()
                .to_string()
        }
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format label flags, e.g. "js-rc, python-rc"
pub fn format_flags(flags: &LabelFlags) -> String {
    let mut enabled = Vec::new();
    if flags.has_js_rc {
        enabled.push("js-rc");
    }
    if flags.has_python_rc {
        enabled.push("python-rc");
    }
    if enabled.is_empty() {
        "no release labels".to_string()
    } else {
        enabled.join(", ")
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            branch,
            flags,
        } => format!(
            "{} Starting {} on {} [{}] ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(branch).cyan(),
            format_flags(flags),
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted { step_id, name } => {
            format!("{} {} {}", SPINNER, style(name).bold(), style(format!("({})", step_id)).dim())
        }
        ExecutionEvent::StepSkipped { step_id, reason } => {
            format!("{} {} {}", SKIP, style(step_id).dim(), style(format!("skipped: {}", reason)).dim())
        }
        ExecutionEvent::CommandStarted { command, .. } => {
            format!("  {} {}", style("$").dim(), command)
        }
        ExecutionEvent::CommandSuppressed { step_id, error } => format!(
            "{} {}: {} {}",
            WARN,
            style(step_id).yellow(),
            style(error).dim(),
            style("(ignored)").yellow()
        ),
        ExecutionEvent::NothingToCommit { step_id } => format!(
            "{} {}: nothing to commit, skipping push",
            INFO,
            style(step_id).cyan()
        ),
        ExecutionEvent::PushRetried {
            step_id,
            attempt,
            max_retries,
        } => format!(
            "{} {}: push rejected, rebasing (retry {}/{})",
            WARN,
            style(step_id).yellow(),
            attempt,
            max_retries
        ),
        ExecutionEvent::StepCompleted {
            step_id,
            suppressed,
        } => {
            if *suppressed > 0 {
                format!(
                    "{} {} {}",
                    CHECK,
                    style(step_id).green(),
                    style(format!("({} failure(s) suppressed)", suppressed)).yellow()
                )
            } else {
                format!("{} {}", CHECK, style(step_id).green())
            }
        }
        ExecutionEvent::StepFailed { step_id, error } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(error).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => {
                    format!("{} completed", style("successfully").green())
                }
                ExecutionStatus::Failed => style("failed").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format the planned steps for a set of flags
pub fn format_plan(pipeline: &Pipeline, flags: &LabelFlags) -> String {
    let mut lines = vec![format!(
        "{} Plan for {} [{}]",
        INFO,
        style(&pipeline.name).bold(),
        format_flags(flags)
    )];

    for (index, step) in pipeline.steps.iter().enumerate() {
        let line = if step.should_run(flags) {
            format!(
                "  {:>2}. {} {} {}",
                index + 1,
                CHECK,
                style(&step.name).bold(),
                style(format!("({})", step.id)).dim()
            )
        } else {
            format!(
                "  {:>2}. {} {}",
                index + 1,
                SKIP,
                style(format!("{} - requires {}", step.id, step.guard.describe())).dim()
            )
        };
        lines.push(line);
    }

    lines.join("\n")
}

/// Format the end-of-run summary
/// One-line tally of step states
pub fn format_counts(counts: &StepCounts) -> String {
    format!(
        "  {} of {} steps: {} completed, {} failed, {} skipped",
        counts.completed + counts.failed + counts.skipped,
        counts.total,
        counts.completed,
        counts.failed,
        counts.skipped
    )
}

pub fn format_run_summary(result: &RunResult) -> String {
    let mut lines = vec![format!(
        "{} {} {}",
        if result.is_success() { CHECK } else { CROSS },
        style(&result.pipeline_name).bold(),
        format_status(result.status)
    )];

    for step in &result.steps {
        lines.push(format!(
            "  {:<18} {}",
            step.id,
            format_step_state(&step.state)
        ));
    }

    lines.push(format_counts(&result.counts));

    for (step_id, error) in result.suppressed_failures() {
        lines.push(format!(
            "  {} {}: {}",
            WARN,
            style(step_id).yellow(),
            style(error).dim()
        ));
    }

    lines.join("\n")
}
