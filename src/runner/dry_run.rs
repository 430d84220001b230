//! Dry-run runner - prints commands instead of running them

use crate::runner::{CommandOutput, CommandRunner, Invocation, RunnerError};
use async_trait::async_trait;
use console::style;
use tracing::info;

/// Reports every command as successful with empty output.
///
/// Because `git status --porcelain` comes back empty, a dry run always
/// ends at "nothing to commit" and never pushes.
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner;

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        info!("Dry run: {}", invocation.display);
        println!(
            "    {} {} {}",
            style("would run").dim(),
            style(&invocation.display).cyan(),
            style(format!("(in {})", invocation.working_dir.display())).dim()
        );
        Ok(CommandOutput::ok(""))
    }
}
