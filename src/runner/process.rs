//! Process runner - spawns external tools as subprocesses

use crate::core::Secrets;
use crate::runner::{CommandOutput, CommandRunner, Invocation, RunnerError};
use async_trait::async_trait;
use console::style;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs commands as child processes, capturing stdout and stderr line by line
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Echo output lines to the terminal as they arrive
    echo: bool,

    /// Values masked in echoed lines
    secrets: Secrets,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo command output to the terminal while capturing it
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Mask these secrets in echoed output
    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }
}

fn echo_line(line: &str, secrets: &Secrets) -> String {
    format!("    {}", style(secrets.redact(line)).dim())
}

async fn collect_lines<R: AsyncRead + Unpin>(
    reader: Option<R>,
    echo: Option<&Secrets>,
) -> String {
    let Some(reader) = reader else {
        return String::new();
    };

    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(secrets) = echo {
                    println!("{}", echo_line(&line, secrets));
                }
                collected.push_str(&line);
                collected.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read command output: {}", e);
                break;
            }
        }
    }
    collected
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        debug!(
            "Spawning `{}` in {}",
            invocation.display,
            invocation.working_dir.display()
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let echo = self.echo.then_some(&self.secrets);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Dropping this future on timeout drops the child, which kills it
        let completion = async move {
            let (stdout, stderr) =
                tokio::join!(collect_lines(stdout, echo), collect_lines(stderr, echo));
            let status = child.wait().await;
            (stdout, stderr, status)
        };

        let (stdout, stderr, status) = match invocation.timeout {
            Some(limit) => timeout(limit, completion)
                .await
                .map_err(|_| RunnerError::Timeout {
                    program: invocation.program.clone(),
                    secs: limit.as_secs(),
                })?,
            None => completion.await,
        };

        let status = status.map_err(|source| RunnerError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        debug!(
            "`{}` exited with {:?} ({} bytes of output)",
            invocation.display,
            status.code(),
            stdout.len() + stderr.len()
        );

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}
