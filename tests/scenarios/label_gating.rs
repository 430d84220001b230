//! Test: Label Gating - which steps run for which labels

use crate::helpers::*;
use rc_pipeline::{ExecutionEvent, StepCounts};

/// Without a release label only the checkout runs and nothing is committed
#[tokio::test]
async fn test_no_release_labels() {
    let run = run_release(&["bug", "documentation"], MockRunner::new(), all_secrets()).await;

    assert_run_completed(&run);
    assert_eq!(
        run.commands(),
        vec!["git fetch origin feature-x", "git checkout feature-x"]
    );
    assert_eq!(run.result.executed_steps(), vec!["checkout"]);
    assert_eq!(
        run.result.counts,
        StepCounts {
            total: 10,
            completed: 1,
            failed: 0,
            skipped: 9,
        }
    );
    assert_step_skipped(&run, "install-pnpm", "label 'js-rc'");
    assert_step_skipped(&run, "release-python", "label 'python-rc'");
    assert_step_skipped(&run, "commit", "'js-rc' or 'python-rc'");
    assert!(!run.ran("git push"));
}

/// A js-rc label runs the JS toolchain and the commit, never the Python steps
#[tokio::test]
async fn test_js_label_only() {
    let run = run_release(&["js-rc"], MockRunner::new().with_changes(), all_secrets()).await;

    assert_run_completed(&run);
    assert_eq!(
        run.result.executed_steps(),
        vec![
            "checkout",
            "install-pnpm",
            "setup-node",
            "configure-pnpm",
            "install-js-deps",
            "release-js",
            "commit",
        ]
    );
    assert_eq!(
        run.result.skipped_steps(),
        vec!["setup-python", "install-poetry", "release-python"]
    );
    assert!(!run.ran("poetry"));
    assert!(!run.ran("uv"));
}

/// A python-rc label runs the Python toolchain and the commit, never the JS steps
#[tokio::test]
async fn test_python_label_only() {
    let run = run_release(&["python-rc"], MockRunner::new().with_changes(), all_secrets()).await;

    assert_run_completed(&run);
    assert_eq!(
        run.result.executed_steps(),
        vec![
            "checkout",
            "setup-python",
            "install-poetry",
            "release-python",
            "commit",
        ]
    );
    assert!(!run.ran("pnpm"));
    assert!(!run.ran("npm"));
}

/// Both labels run every step in declaration order, JS before Python
#[tokio::test]
async fn test_both_labels_run_everything_once() {
    let run = run_release(
        &["python-rc", "js-rc"],
        MockRunner::new().with_changes(),
        all_secrets(),
    )
    .await;

    assert_run_completed(&run);
    assert_eq!(run.result.executed_steps().len(), 10);
    assert!(run.result.skipped_steps().is_empty());
    assert_eq!(run.count("git commit"), 1);
    assert_eq!(run.count("git push"), 1);

    let commands = run.commands();
    let js = commands.iter().position(|c| c.starts_with("pnpm publish")).unwrap();
    let py = commands.iter().position(|c| c.starts_with("poetry publish")).unwrap();
    let commit = commands.iter().position(|c| c.starts_with("git commit")).unwrap();
    assert!(js < py && py < commit);
}

/// Skip events are emitted in step order with their reasons
#[tokio::test]
async fn test_skip_events() {
    let run = run_release(&[], MockRunner::new(), all_secrets()).await;

    let skipped: Vec<&str> = run
        .events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::StepSkipped { step_id, .. } => Some(step_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 9);
    assert_eq!(skipped.first(), Some(&"install-pnpm"));
    assert_eq!(skipped.last(), Some(&"commit"));
}

/// Label matching is exact
#[tokio::test]
async fn test_label_lookalikes_do_not_match() {
    let run = run_release(&["JS-RC", "js-rc-2", "python"], MockRunner::new(), all_secrets()).await;

    assert_run_completed(&run);
    assert!(!run.result.flags.any());
    assert_eq!(run.result.executed_steps(), vec!["checkout"]);
}
