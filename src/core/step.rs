//! Step domain model

use crate::core::{
    condition::{Guard, LabelFlags},
    config::{CommandConfig, ConfigError, StepConfig},
    context::{compact_placeholders, RenderError, RunContext},
    state::StepState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Marker that keeps the platform from starting CI for a commit
pub const CI_SKIP_MARKER: &str = "[skip ci]";

/// What happens when a command exits non-zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the pipeline
    #[default]
    Fail,
    /// Record the failure and continue
    Suppress,
}

/// A single external command of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub on_failure: FailurePolicy,
}

impl CommandSpec {
    /// Split a command line into program and arguments (POSIX shell quoting, no expansion)
    pub fn parse(line: &str, on_failure: FailurePolicy) -> Option<Self> {
        let mut words = shlex::split(&compact_placeholders(line))?.into_iter();
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            on_failure,
        })
    }

    /// Command line as written, unrendered
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render placeholders in program and arguments
    pub fn render(&self, context: &RunContext) -> Result<(String, Vec<String>), RenderError> {
        let program = context.render(&self.program)?;
        let args = self
            .args
            .iter()
            .map(|arg| context.render(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((program, args))
    }
}

/// Settings of the commit-and-push action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSettings {
    pub message: String,
    pub user_name: String,
    pub user_email: String,
    pub remote: String,
    /// Push attempts after the first one, each preceded by a rebase
    pub push_retries: usize,
}

impl CommitSettings {
    /// Commit message, guaranteed to carry the CI skip marker
    pub fn message_with_marker(&self) -> String {
        if self.message.contains(CI_SKIP_MARKER) {
            self.message.clone()
        } else {
            format!("{} {}", CI_SKIP_MARKER, self.message)
        }
    }
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            message: format!("{} Release new versions", CI_SKIP_MARKER),
            user_name: "github-actions[bot]".to_string(),
            user_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
            remote: "origin".to_string(),
            push_retries: 2,
        }
    }
}

/// What a step does when its guard allows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Run commands in order
    Run(Vec<CommandSpec>),
    /// Commit version file changes and push them to the source branch
    CommitAndPush(CommitSettings),
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Guard deciding whether the step runs
    pub guard: Guard,

    pub action: StepAction,

    /// Directory relative to the repository root
    pub working_dir: Option<PathBuf>,

    /// Environment bindings (values may contain placeholders)
    pub env: BTreeMap<String, String>,

    /// Per-command timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig) -> Result<Self, ConfigError> {
        let action = match (&config.commit, config.run.is_empty()) {
            (Some(_), false) => return Err(ConfigError::ConflictingActions(config.id.clone())),
            (None, true) => return Err(ConfigError::EmptyStep(config.id.clone())),
            (Some(commit), true) => StepAction::CommitAndPush(commit.to_settings()),
            (None, false) => StepAction::Run(
                config
                    .run
                    .iter()
                    .map(|command| command_from_config(&config.id, command))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(Step {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            guard: config.when,
            action,
            working_dir: config.working_dir.as_ref().map(PathBuf::from),
            env: config.env.clone(),
            timeout_secs: config.timeout_secs,
            state: StepState::Pending,
        })
    }

    /// Whether the guard allows this step for the given flags
    pub fn should_run(&self, flags: &LabelFlags) -> bool {
        self.guard.allows(flags)
    }

    /// Render environment bindings, merged over the context's environment
    ///
    /// A binding whose value cannot be resolved (e.g. an unset secret) is
    /// left out, so the consuming tool fails on its own terms.
    pub fn render_env(&self, context: &RunContext) -> Vec<(String, String)> {
        let mut env: BTreeMap<String, String> = context.env.clone();
        for (key, value) in &self.env {
            match context.render(value) {
                Ok(rendered) => {
                    env.insert(key.clone(), rendered);
                }
                Err(e) => warn!("Step {}: not setting {}: {}", self.id, key, e),
            }
        }
        env.into_iter().collect()
    }

    /// Every template string the step contains (for validation)
    pub fn templates(&self) -> Vec<&str> {
        let mut templates: Vec<&str> = self.env.values().map(String::as_str).collect();
        match &self.action {
            StepAction::Run(commands) => {
                for command in commands {
                    templates.push(&command.program);
                    templates.extend(command.args.iter().map(String::as_str));
                }
            }
            StepAction::CommitAndPush(settings) => templates.push(&settings.message),
        }
        templates
    }
}

fn command_from_config(step_id: &str, config: &CommandConfig) -> Result<CommandSpec, ConfigError> {
    let (line, policy) = match config {
        CommandConfig::Line(line) => (line.as_str(), FailurePolicy::Fail),
        CommandConfig::Detailed { command, on_failure } => (command.as_str(), *on_failure),
    };
    CommandSpec::parse(line, policy).ok_or_else(|| ConfigError::InvalidCommand {
        step: step_id.to_string(),
        command: line.to_string(),
    })
}
