// deploy-action: Entry point for the deployment workflow step.
//
// Usage:
//   deploy-action [--step <name>] [--input name=value ...]
//
// Step inputs come from the `INPUT_<NAME>` environment variables the runner
// sets; `--input` overrides them for local runs. Workflow commands and
// plain console output go to stdout, diagnostics to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use deploy_lifecycle::{run_step, DeploymentContext, GitHubClient, Step};
use deploy_sdk::{
    output_sink_for, ActionContext, ActionPackage, ActionTraceWriter, Source, StringUtil,
    TraceWriter,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Command-line arguments for the action.
#[derive(Parser, Debug)]
#[command(name = "deploy-action", version, about = "Manage GitHub deployments from a workflow step")]
struct Args {
    /// Step to run. Defaults to the `step` input.
    #[arg(long)]
    step: Option<String>,

    /// Set a step input, overriding the environment. May be repeated.
    #[arg(long = "input", value_name = "NAME=VALUE", value_parser = parse_input)]
    inputs: Vec<(String, String)>,
}

fn parse_input(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Debug output is on when the `debug` input is set or the runner has step
/// debugging enabled.
fn debug_requested(action: &ActionContext) -> bool {
    let debug_input = action
        .get_input("debug", false)
        .ok()
        .flatten()
        .and_then(|v| StringUtil::convert_to_bool(&v))
        .unwrap_or(false);
    debug_input || action.is_debug()
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!(
        "{} {} (commit {})",
        ActionPackage::PRODUCT,
        ActionPackage::VERSION,
        Source::COMMIT_HASH
    );

    let mut action = ActionContext::from_env();
    for (name, value) in &args.inputs {
        action.set_input(name, value);
    }

    let trace: Arc<dyn TraceWriter> = Arc::new(ActionTraceWriter::new(debug_requested(&action)));

    match run(args.step, &action, Arc::clone(&trace)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The only place a failure is reported.
            trace.error(&format!("Action failed: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(step: Option<String>, action: &ActionContext, trace: Arc<dyn TraceWriter>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(execute(step, action, trace))
}

async fn execute(
    step: Option<String>,
    action: &ActionContext,
    trace: Arc<dyn TraceWriter>,
) -> Result<()> {
    let step_name = match step {
        Some(step) => step,
        None => action.get_input("step", true)?.unwrap_or_default(),
    };
    let step: Step = step_name.parse()?;

    let client = GitHubClient::from_action(action)?;
    let ctx = DeploymentContext::collect(action, Arc::new(client), trace)?;
    ctx.trace
        .info(&format!("targeting {}/{}", ctx.owner, ctx.repo));

    let outputs = output_sink_for(action);
    run_step(step, &ctx, action, outputs.as_ref())
        .await
        .with_context(|| format!("step '{step}' failed"))?;

    tracing::info!("step '{}' completed", step);
    Ok(())
}
