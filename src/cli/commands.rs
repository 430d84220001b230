//! CLI command definitions

use crate::core::{config::PipelineConfig, EventError, TriggerEvent};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Where the trigger event comes from
#[derive(Debug, Args, Clone)]
pub struct EventArgs {
    /// Path to the platform's pull request event payload (JSON)
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Pull request label (repeatable); used when no event payload is given
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Source branch of the pull request; used when no event payload is given
    #[arg(long, env = "GITHUB_HEAD_REF")]
    pub branch: Option<String>,

    /// Repository slug (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,
}

impl EventArgs {
    /// Build the trigger event. A payload file wins over flags.
    pub fn resolve(&self) -> Result<TriggerEvent, EventError> {
        let mut event = match &self.event_path {
            Some(path) => TriggerEvent::from_payload_file(path)?,
            None => TriggerEvent::pull_request(
                self.branch.clone().unwrap_or_default(),
                self.labels.iter().cloned(),
            )?,
        };

        if event.repository.is_none() {
            event.repository = self.repository.clone();
        }
        Ok(event)
    }
}

/// Run the pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub event: EventArgs,

    /// Pipeline YAML file (defaults to the built-in release candidate pipeline)
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// Repository root the steps run in
    #[arg(short = 'C', long, default_value = ".")]
    pub workdir: PathBuf,

    /// Directory used as the JS package store
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Don't echo command output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Show the steps a run would execute
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub event: EventArgs,

    /// Pipeline YAML file (defaults to the built-in release candidate pipeline)
    #[arg(short, long)]
    pub pipeline: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Load the pipeline from a file, or the built-in definition
pub fn load_pipeline_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load pipeline {}", path.display())),
        None => PipelineConfig::release_candidate()
            .context("Built-in release candidate pipeline is invalid"),
    }
}
