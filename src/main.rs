use anyhow::{Context, Result};
use rc_pipeline::cli::commands::{
    load_pipeline_config, EventArgs, PlanCommand, RunCommand, ValidateCommand,
};
use rc_pipeline::cli::output::*;
use rc_pipeline::cli::{Cli, Command};
use rc_pipeline::core::config::PipelineConfig;
use rc_pipeline::{
    CommandRunner, DryRunRunner, ExecutionEngine, ExecutionEvent, Pipeline, ProcessRunner,
    RunContext, RunResult, Secrets, StepState, TriggerEvent,
};
use std::path::PathBuf;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit status for a malformed event or pipeline definition
const EXIT_INVALID_INPUT: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Plan(cmd) => plan_pipeline(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

/// Print an input error and exit with the invalid-input status
fn invalid_input(what: &str, err: impl std::fmt::Display) -> ! {
    println!("{} {}:", CROSS, what);
    println!("  {}", style(err).red());
    std::process::exit(EXIT_INVALID_INPUT);
}

/// Resolve the event and pipeline, exiting with status 2 on bad input
fn load_inputs(
    event: &EventArgs,
    pipeline: Option<&PathBuf>,
) -> (TriggerEvent, Pipeline) {
    let event = match event.resolve() {
        Ok(event) => event,
        Err(e) => invalid_input("Invalid trigger event", e),
    };

    let pipeline = match load_pipeline_config(pipeline).and_then(|c| Ok(c.to_pipeline()?)) {
        Ok(pipeline) => pipeline,
        Err(e) => invalid_input("Invalid pipeline definition", format!("{:#}", e)),
    };

    (event, pipeline)
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let (event, mut pipeline) = load_inputs(&cmd.event, cmd.pipeline.as_ref());

    println!(
        "{} Loaded pipeline: {} ({} steps)",
        INFO,
        style(&pipeline.name).bold(),
        style(pipeline.steps.len()).cyan()
    );

    let secrets = Secrets::from_env();
    let missing = secrets.missing_env_vars();
    if !missing.is_empty() {
        println!(
            "{} Secrets not set: {}",
            WARN,
            style(missing.join(", ")).yellow()
        );
    }

    let mut context = RunContext::new(&cmd.workdir, &event, secrets);
    if let Some(cache_dir) = &cmd.cache_dir {
        context = context.with_cache_dir(cache_dir);
    }
    let context = context.with_pnpm_home(
        std::env::var("PNPM_HOME").ok().as_deref(),
        std::env::var("PATH").ok().as_deref(),
    );

    println!();
    let result = if cmd.dry_run {
        println!("{} Dry run: commands are printed, not executed", INFO);
        execute(DryRunRunner, &mut pipeline, &event, &context).await
    } else {
        let runner = ProcessRunner::new()
            .with_echo(!cmd.quiet)
            .with_secrets(context.secrets.clone());
        execute(runner, &mut pipeline, &event, &context).await
    };

    if let Some(path) = &cmd.report {
        result.save_json(path)?;
        println!(
            "\n{} Run report written to {}",
            INFO,
            style(path.display()).dim()
        );
    }

    println!("\n{}", format_run_summary(&result));

    if !result.is_success() {
        if let Some(step) = result
            .steps
            .iter()
            .find(|s| matches!(s.state, StepState::Failed { .. }))
        {
            error!("Pipeline aborted at step {}", step.id);
        }
    }
    std::process::exit(result.exit_code());
}

/// Run the pipeline against a runner, echoing events to the console
async fn execute<R: CommandRunner>(
    runner: R,
    pipeline: &mut Pipeline,
    event: &TriggerEvent,
    context: &RunContext,
) -> RunResult {
    let progress = create_progress_bar(pipeline.steps.len());
    let mut engine = ExecutionEngine::new(runner);

    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        let line = format_execution_event(&event);
        if bar.is_hidden() {
            println!("{}", line);
        } else {
            bar.println(line);
        }

        match &event {
            ExecutionEvent::StepStarted { name, .. } => bar.set_message(name.clone()),
            ExecutionEvent::StepCompleted { .. }
            | ExecutionEvent::StepFailed { .. }
            | ExecutionEvent::StepSkipped { .. } => bar.inc(1),
            _ => {}
        }
    });

    let result = engine.execute(pipeline, event, context).await;
    progress.finish_and_clear();
    result
}

fn plan_pipeline(cmd: &PlanCommand) -> Result<()> {
    let (event, pipeline) = load_inputs(&cmd.event, cmd.pipeline.as_ref());
    let flags = event.flags();

    if cmd.json {
        let steps: Vec<_> = pipeline
            .steps
            .iter()
            .map(|step| {
                serde_json::json!({
                    "id": step.id,
                    "name": step.name,
                    "guard": step.guard,
                    "runs": step.should_run(&flags),
                })
            })
            .collect();
        let data = serde_json::json!({
            "pipeline": pipeline.name,
            "branch": event.branch,
            "flags": flags,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", format_plan(&pipeline, &flags));
        println!(
            "\n  {} of {} steps would run",
            style(pipeline.planned_steps(&flags).len()).cyan(),
            pipeline.steps.len()
        );
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| {
        config.to_pipeline()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => invalid_input("Validation failed", e),
    }
}
