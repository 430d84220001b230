//! Commit-and-push action
//!
//! Commits changes to tracked files (the version bumps) and pushes them to the
//! pull request's source branch. Untracked files such as build output are
//! never staged. No tracked change is a success with no push. A rejected push is retried after rebasing onto the remote branch,
//! since other runs may push to the same branch concurrently.

use crate::{
    core::{context::GITHUB_TOKEN, CommitSettings, RunContext, StepOutcome},
    execution::{executor::EventSink, ExecutionEvent},
    runner::{CommandOutput, CommandRunner, Invocation},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub(crate) struct CommitAndPush<'a, R> {
    pub runner: &'a R,
    pub settings: &'a CommitSettings,
    pub context: &'a RunContext,
    pub step_id: &'a str,
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub emit: EventSink<'a>,
}

/// Where to push: an authenticated URL when token and repository are known
pub fn push_target(settings: &CommitSettings, context: &RunContext) -> String {
    match (context.secrets.get(GITHUB_TOKEN), context.repository.as_deref()) {
        (Some(token), Some(repository)) if settings.remote == "origin" => format!(
            "https://x-access-token:{}@github.com/{}.git",
            token, repository
        ),
        _ => settings.remote.clone(),
    }
}

impl<R: CommandRunner> CommitAndPush<'_, R> {
    async fn git(&self, args: &[&str]) -> Result<CommandOutput, String> {
        let invocation = Invocation::new("git", args.iter().copied())
            .in_dir(&self.working_dir)
            .with_env(self.env.clone())
            .with_timeout(self.timeout)
            .redacted(|s| self.context.redact(s));

        (self.emit)(ExecutionEvent::CommandStarted {
            step_id: self.step_id.to_string(),
            command: invocation.display.clone(),
        });

        match self.runner.run(&invocation).await {
            Ok(output) => Ok(output),
            Err(e) => Err(format!(
                "`{}`: {}",
                invocation.display,
                self.context.redact(&e.to_string())
            )),
        }
    }

    /// Run git and require a zero exit
    async fn git_ok(&self, args: &[&str]) -> Result<CommandOutput, String> {
        let output = self.git(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(self.context.redact(&format!(
                "`git {}` failed with {}",
                args.join(" "),
                output.failure_summary()
            )))
        }
    }

    pub async fn execute(self) -> StepOutcome {
        match self.commit_and_push().await {
            Ok(()) => StepOutcome::Success,
            Err(error) => StepOutcome::Fatal { error },
        }
    }

    async fn commit_and_push(&self) -> Result<(), String> {
        let branch = self.context.branch.as_str();

        self.git_ok(&["config", "user.name", self.settings.user_name.as_str()])
            .await?;
        self.git_ok(&["config", "user.email", self.settings.user_email.as_str()])
            .await?;
        self.git_ok(&["add", "--update"]).await?;

        let status = self
            .git_ok(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        if status.stdout.trim().is_empty() {
            info!("Step {}: nothing to commit", self.step_id);
            (self.emit)(ExecutionEvent::NothingToCommit {
                step_id: self.step_id.to_string(),
            });
            return Ok(());
        }
        debug!("Changed files:\n{}", status.stdout);

        let message = self
            .context
            .render(&self.settings.message_with_marker())
            .map_err(|e| format!("Failed to render commit message: {}", e))?;
        self.git_ok(&["commit", "-m", message.as_str()]).await?;

        let target = push_target(self.settings, self.context);
        let refspec = format!("HEAD:{}", branch);
        let mut attempt = 0;

        loop {
            let push = self.git(&["push", target.as_str(), refspec.as_str()]).await?;
            if push.success() {
                info!("Step {}: pushed to {}", self.step_id, branch);
                return Ok(());
            }

            let error = self.context.redact(&format!(
                "push to {} rejected: {}",
                branch,
                push.failure_summary()
            ));
            if attempt >= self.settings.push_retries {
                return Err(error);
            }

            attempt += 1;
            warn!(
                "Step {}: {}; rebasing and retrying ({}/{})",
                self.step_id, error, attempt, self.settings.push_retries
            );
            (self.emit)(ExecutionEvent::PushRetried {
                step_id: self.step_id.to_string(),
                attempt,
                max_retries: self.settings.push_retries,
            });

            self.git_ok(&["pull", "--rebase", target.as_str(), branch]).await?;
        }
    }
}
