//! External command runners
//!
//! Every external tool the pipeline touches (git, npm, pnpm, poetry, ...)
//! is invoked through [`CommandRunner`], so the engine can be driven by a
//! real process runner, a dry-run printer, or a scripted mock in tests.

pub mod dry_run;
pub mod output;
pub mod process;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub use dry_run::DryRunRunner;
pub use output::{CommandOutput, RunnerError};
pub use process::ProcessRunner;

/// A fully rendered command ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    /// Printable command line with secrets redacted
    pub display: String,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            program,
            args,
            env: Vec::new(),
            working_dir: PathBuf::from("."),
            timeout: None,
            display,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pass the display string through a redaction function
    pub fn redacted(mut self, redact: impl Fn(&str) -> String) -> Self {
        self.display = redact(&self.display);
        self
    }

    /// Look up an environment binding
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Trait for running external commands - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion and capture its output
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`CommandOutput::success`]. Errors mean the command could not
    /// run at all (spawn failure, timeout).
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError>;
}
