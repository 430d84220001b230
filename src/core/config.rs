//! Pipeline configuration from YAML

use crate::core::{
    condition::Guard,
    context::{placeholders, RunContext},
    step::{CommitSettings, FailurePolicy, Step},
    Pipeline,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Built-in release candidate pipeline definition
const RELEASE_CANDIDATE_YAML: &str = include_str!("release_candidate.yaml");

/// Errors loading or validating a pipeline definition
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pipeline has no steps")]
    NoSteps,

    #[error("Step ID must not be empty")]
    EmptyStepId,

    #[error("Duplicate step ID: {0}")]
    DuplicateStep(String),

    #[error("Step '{0}' has neither 'run' nor 'commit'")]
    EmptyStep(String),

    #[error("Step '{0}' has both 'run' and 'commit'")]
    ConflictingActions(String),

    #[error("Step '{step}' has an invalid command: {command}")]
    InvalidCommand { step: String, command: String },

    #[error("Step '{step}' uses unknown placeholder '{name}'")]
    UnknownPlaceholder { step: String, name: String },

    #[error("Step '{0}' has a zero timeout")]
    InvalidTimeout(String),
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Pipeline steps, in execution order
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name (defaults to the ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Guard: always, js-rc, python-rc or any-rc
    #[serde(default)]
    pub when: Guard,

    /// Directory the commands run in, relative to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Environment bindings for the step's commands
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Commands to run in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run: Vec<CommandConfig>,

    /// Commit-and-push action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitConfig>,

    /// Timeout for each command of this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A command line, optionally with a failure policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandConfig {
    Line(String),
    Detailed {
        command: String,
        #[serde(default)]
        on_failure: FailurePolicy,
    },
}

/// Commit-and-push configuration; unset fields use the bot defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_retries: Option<usize>,
}

impl CommitConfig {
    pub fn to_settings(&self) -> CommitSettings {
        let defaults = CommitSettings::default();
        CommitSettings {
            message: self.message.clone().unwrap_or(defaults.message),
            user_name: self.user_name.clone().unwrap_or(defaults.user_name),
            user_email: self.user_email.clone().unwrap_or(defaults.user_email),
            remote: self.remote.clone().unwrap_or(defaults.remote),
            push_retries: self.push_retries.unwrap_or(defaults.push_retries),
        }
    }
}

impl PipelineConfig {
    /// The built-in release candidate pipeline
    pub fn release_candidate() -> Result<Self, ConfigError> {
        Self::from_yaml(RELEASE_CANDIDATE_YAML)
    }

    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }

        let mut seen_ids = HashSet::new();
        for config in &self.steps {
            if config.id.trim().is_empty() {
                return Err(ConfigError::EmptyStepId);
            }
            if !seen_ids.insert(config.id.as_str()) {
                return Err(ConfigError::DuplicateStep(config.id.clone()));
            }
            if config.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidTimeout(config.id.clone()));
            }

            let step = Step::from_config(config)?;
            for template in step.templates() {
                if let Some(name) = placeholders(template)
                    .into_iter()
                    .find(|name| !RunContext::is_known_placeholder(name))
                {
                    return Err(ConfigError::UnknownPlaceholder {
                        step: config.id.clone(),
                        name,
                    });
                }
            }
        }

        Ok(())
    }

    /// Build the runtime pipeline
    pub fn to_pipeline(&self) -> Result<Pipeline, ConfigError> {
        Pipeline::from_config(self)
    }
}
