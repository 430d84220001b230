//! Test: Python Release - build and idempotent upload

use crate::helpers::*;
use rc_pipeline::core::context::{GITHUB_TOKEN, NPM_TOKEN};
use rc_pipeline::Secrets;
use std::path::PathBuf;

/// Poetry is pinned and configured before the release commands run in python/
#[tokio::test]
async fn test_python_release_commands() {
    let run = run_release(&["python-rc"], MockRunner::new().with_changes(), all_secrets()).await;

    assert_run_completed(&run);
    let release: Vec<&str> = run
        .commands()
        .into_iter()
        .filter(|c| c.starts_with("uv") || c.starts_with("poetry"))
        .collect();
    assert_eq!(
        release,
        vec![
            "uv python install 3.10",
            "uv tool install poetry==1.8.1 --python 3.10",
            "poetry config virtualenvs.in-project true",
            "poetry config installer.parallel true",
            "poetry version prerelease",
            "poetry build",
            "poetry config pypi-token.pypi ***",
            "poetry publish --skip-existing",
        ]
    );

    let publish = run.invocation("poetry publish").unwrap();
    assert_eq!(publish.working_dir, PathBuf::from("/repo/python"));
    assert!(publish.args.contains(&"--skip-existing".to_string()));
}

/// Poetry runs on the provisioned interpreter, not whatever pip is on PATH
#[tokio::test]
async fn test_poetry_bound_to_provisioned_python() {
    let run = run_release(&["python-rc"], MockRunner::new(), all_secrets()).await;

    let provision = run.invocation("uv python install").unwrap();
    let install = run.invocation("uv tool install poetry").unwrap();
    assert_eq!(provision.args.last(), install.args.last());
    assert_eq!(&install.args[install.args.len() - 2..], ["--python", "3.10"]);
    assert!(!run.ran("pip"));

    let commands = run.commands();
    let installed_at = commands.iter().position(|c| c.starts_with("uv tool install")).unwrap();
    let build_at = commands.iter().position(|c| *c == "poetry build").unwrap();
    assert!(installed_at < build_at);
}

/// The index token is passed to poetry but redacted from the display line
#[tokio::test]
async fn test_pypi_token_passed_and_redacted() {
    let run = run_release(&["python-rc"], MockRunner::new(), all_secrets()).await;

    let config = run.invocation("poetry config pypi-token.pypi").unwrap();
    assert_eq!(config.args.last().map(String::as_str), Some("pypi-secret"));
    assert!(!config.display.contains("pypi-secret"));
}

/// Without PYPI_TOKEN the release step fails before publishing and nothing is committed
#[tokio::test]
async fn test_missing_pypi_token_is_fatal() {
    let secrets = Secrets::new()
        .with(NPM_TOKEN, "npm-secret")
        .with(GITHUB_TOKEN, "gh-secret");
    let run = run_release(&["python-rc"], MockRunner::new().with_changes(), secrets).await;

    assert_run_failed(&run);
    assert_step_failed(&run, "release-python", "pypi_token");
    assert!(run.ran("poetry build"));
    assert!(!run.ran("poetry config pypi-token"));
    assert!(!run.ran("poetry publish"));
    assert_step_skipped(&run, "commit", "aborted after 'release-python' failed");
    assert!(!run.ran("git commit"));
}

/// A failed upload aborts the run
#[tokio::test]
async fn test_publish_failure_is_fatal() {
    let runner = MockRunner::new().fail(
        "poetry publish",
        "HTTP Error 403: Invalid or non-existent authentication",
    );
    let run = run_release(&["python-rc"], runner, all_secrets()).await;

    assert_run_failed(&run);
    assert_step_failed(&run, "release-python", "403");
    assert!(!run.ran("git commit"));
}
