//! Trigger events delivered by the hosting platform

use crate::core::condition::LabelFlags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while building a trigger event
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to read event payload {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid event payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Event is not a pull request event")]
    NotPullRequest,

    #[error("Source branch name is empty")]
    EmptyBranch,
}

/// Kind of platform event that triggered the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Pull request lifecycle event (opened, labeled, synchronize, ...)
    PullRequest { action: Option<String> },
}

/// The event a run is started for. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: EventKind,

    /// Labels attached to the pull request
    pub labels: BTreeSet<String>,

    /// Source branch of the pull request
    pub branch: String,

    /// Repository slug (owner/name), when known
    pub repository: Option<String>,
}

// Subset of the platform's pull_request payload we read
#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    pull_request: Option<PullRequestPayload>,
    #[serde(default)]
    repository: Option<RepositoryPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    #[serde(default)]
    labels: Vec<LabelPayload>,
    head: HeadPayload,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct HeadPayload {
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: String,
}

impl TriggerEvent {
    /// Build a pull request event from a branch and labels
    pub fn pull_request<I, S>(branch: impl Into<String>, labels: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(EventError::EmptyBranch);
        }

        Ok(Self {
            kind: EventKind::PullRequest { action: None },
            labels: labels.into_iter().map(Into::into).collect(),
            branch,
            repository: None,
        })
    }

    /// Attach the repository slug
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Load an event from the platform's JSON payload file
    pub fn from_payload_file<P: AsRef<Path>>(path: P) -> Result<Self, EventError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EventError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_payload(&content)
    }

    /// Parse an event from the platform's JSON payload
    pub fn from_payload(json: &str) -> Result<Self, EventError> {
        let payload: EventPayload = serde_json::from_str(json)?;
        let pull_request = payload.pull_request.ok_or(EventError::NotPullRequest)?;

        let mut event = Self::pull_request(
            pull_request.head.git_ref,
            pull_request.labels.into_iter().map(|l| l.name),
        )?;
        event.kind = EventKind::PullRequest {
            action: payload.action,
        };
        event.repository = payload.repository.map(|r| r.full_name);

        Ok(event)
    }

    /// Check if the event carries a label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Derive the label flags for this event
    pub fn flags(&self) -> LabelFlags {
        LabelFlags::from_labels(&self.labels)
    }
}
