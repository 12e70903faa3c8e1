// Step dispatch – one handler per step the action can run.

use std::fmt;
use std::str::FromStr;

use deploy_sdk::{ActionContext, OutputSink, StringUtil};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::batch::join_all_reporting;
use crate::context::{input, required_input, CoreArgs, DeploymentContext};
use crate::deactivate::{deactivate_environment, DeactivateResult};
use crate::environments::{delete_environments, list_environments};
use crate::error::DeployError;
use crate::finalize::finalize_deployments;
use crate::inputs::{is_valid_status, parse_deployment_identifiers, parse_list_or_single};
use crate::types::{DeploymentStatus, NewDeployment, NewDeploymentStatus};

/// The steps the action can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    Finish,
    DeactivateEnv,
    DeleteEnv,
    GetEnv,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::Finish => "finish",
            Step::DeactivateEnv => "deactivate-env",
            Step::DeleteEnv => "delete-env",
            Step::GetEnv => "get-env",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Step::Start),
            "finish" => Ok(Step::Finish),
            "deactivate-env" => Ok(Step::DeactivateEnv),
            "delete-env" => Ok(Step::DeleteEnv),
            "get-env" => Ok(Step::GetEnv),
            other => Err(DeployError::UnknownStep(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Step arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStepArgs {
    #[serde(flatten)]
    pub core: CoreArgs,
    pub environment: String,
    /// Accepted for compatibility; has no effect.
    #[serde(rename = "override")]
    pub override_environment: Option<String>,
    pub git_ref: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishStepArgs {
    #[serde(flatten)]
    pub core: CoreArgs,
    pub status: String,
    pub deployment: String,
    #[serde(rename = "envURL")]
    pub env_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvStepArgs {
    #[serde(flatten)]
    pub core: CoreArgs,
    pub environment: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEnvStepArgs {
    #[serde(flatten)]
    pub core: CoreArgs,
    pub git_ref: String,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run one step to completion.
///
/// Outputs are only written once every API call of the step succeeded.
pub async fn run_step(
    step: Step,
    ctx: &DeploymentContext,
    action: &ActionContext,
    outputs: &dyn OutputSink,
) -> Result<(), DeployError> {
    tracing::info!("running step '{}'", step);
    match step {
        Step::Start => run_start(ctx, action, outputs).await,
        Step::Finish => run_finish(ctx, action).await,
        Step::DeactivateEnv => run_deactivate_env(ctx, action).await,
        Step::DeleteEnv => run_delete_env(ctx, action).await,
        Step::GetEnv => run_get_env(ctx, action, outputs).await,
    }
}

fn log_arguments<T: Serialize>(ctx: &DeploymentContext, step: Step, args: &T) {
    if ctx.core_args.is_debug {
        ctx.trace.verbose(&format!(
            "'{step}' arguments {}",
            StringUtil::convert_to_json(args)
        ));
    }
}

fn set_output(outputs: &dyn OutputSink, name: &str, value: &str) -> Result<(), DeployError> {
    outputs
        .set_output(name, value)
        .map_err(|e| DeployError::Output {
            name: name.to_string(),
            source: e.into(),
        })
}

/// First failure of a set of per-environment deactivations.
fn first_deactivation_failure(
    results: Vec<Result<DeactivateResult, DeployError>>,
) -> Result<Vec<DeactivateResult>, DeployError> {
    let mut done = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(r) => done.push(r),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => tracing::warn!("{e}"),
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(done),
    }
}

async fn run_start(
    ctx: &DeploymentContext,
    action: &ActionContext,
    outputs: &dyn OutputSink,
) -> Result<(), DeployError> {
    let args = StartStepArgs {
        core: ctx.core_args.clone(),
        environment: required_input(action, "env")?,
        override_environment: input(action, "override")?,
        git_ref: input(action, "ref")?.unwrap_or_else(|| ctx.git_ref.clone()),
    };
    log_arguments(ctx, Step::Start, &args);

    let environments = parse_list_or_single(&args.environment).into_vec();
    if args.core.is_debug {
        ctx.trace
            .verbose(&format!("Environment(s) : {}", environments.join(",")));
    }

    let deactivations = join_all(
        environments
            .iter()
            .map(|environment| deactivate_environment(ctx, environment)),
    );
    let creations = join_all_reporting(environments.iter().map(|environment| {
        let request = NewDeployment {
            owner: ctx.owner.clone(),
            repo: ctx.repo.clone(),
            git_ref: args.git_ref.clone(),
            environment: environment.clone(),
            auto_merge: false,
            transient_environment: true,
            required_contexts: Vec::new(),
            description: args.core.description.clone(),
        };
        async move { ctx.client.create_deployment(&request).await }
    }));

    let (deactivated, created) = futures::join!(deactivations, creations);
    first_deactivation_failure(deactivated)?;
    let deployments = created.map_err(|failure| DeployError::DeploymentCreationFailed { failure })?;

    if args.core.is_debug {
        ctx.trace.verbose(&format!(
            "Deployments data {}",
            StringUtil::convert_to_json(&deployments)
        ));
    }

    let statuses: Vec<NewDeploymentStatus> = deployments
        .iter()
        .map(|deployment| NewDeploymentStatus {
            git_ref: Some(ctx.git_ref.clone()),
            description: args.core.description.clone(),
            log_url: Some(args.core.logs_url.clone()),
            ..NewDeploymentStatus::state_only(
                &ctx.owner,
                &ctx.repo,
                deployment.id,
                DeploymentStatus::InProgress,
            )
        })
        .collect();
    join_all_reporting(
        statuses
            .iter()
            .map(|status| ctx.client.create_deployment_status(status)),
    )
    .await
    .map_err(|failure| DeployError::StatusWriteFailed { failure })?;

    let records: Vec<Value> = deployments
        .iter()
        .zip(&environments)
        .map(|(deployment, environment)| deployment.to_output(environment))
        .collect();
    set_output(outputs, "deployment_id", &Value::Array(records).to_string())?;
    set_output(outputs, "env", &args.environment)?;

    ctx.trace.info(&format!(
        "{} deployments started at {}",
        deployments.len(),
        args.git_ref
    ));
    Ok(())
}

async fn run_finish(ctx: &DeploymentContext, action: &ActionContext) -> Result<(), DeployError> {
    let args = FinishStepArgs {
        core: ctx.core_args.clone(),
        status: required_input(action, "status")?.to_lowercase(),
        deployment: required_input(action, "deployment_id")?,
        env_url: input(action, "env_url")?,
    };
    log_arguments(ctx, Step::Finish, &args);

    if !is_valid_status(&args.status) {
        return Err(DeployError::InvalidStatus(args.status));
    }
    let status: DeploymentStatus = args.status.parse()?;
    if args.core.is_debug {
        ctx.trace.verbose(&format!(
            "finishing deployment for {} with status {}",
            args.deployment, status
        ));
    }

    let deployments = parse_deployment_identifiers(&args.deployment)?;
    let env_urls = args
        .env_url
        .as_deref()
        .map(|raw| parse_list_or_single(raw).into_vec());

    finalize_deployments(ctx, &deployments, status, env_urls.as_deref()).await
}

async fn run_deactivate_env(
    ctx: &DeploymentContext,
    action: &ActionContext,
) -> Result<(), DeployError> {
    let args = EnvStepArgs {
        core: ctx.core_args.clone(),
        environment: required_input(action, "env")?,
    };
    log_arguments(ctx, Step::DeactivateEnv, &args);

    let environments = parse_list_or_single(&args.environment).into_vec();
    let results = join_all(
        environments
            .iter()
            .map(|environment| deactivate_environment(ctx, environment)),
    )
    .await;
    first_deactivation_failure(results)?;
    Ok(())
}

async fn run_delete_env(ctx: &DeploymentContext, action: &ActionContext) -> Result<(), DeployError> {
    let args = EnvStepArgs {
        core: ctx.core_args.clone(),
        environment: required_input(action, "env")?,
    };
    log_arguments(ctx, Step::DeleteEnv, &args);

    let environments = parse_list_or_single(&args.environment).into_vec();
    delete_environments(ctx, &environments).await
}

async fn run_get_env(
    ctx: &DeploymentContext,
    action: &ActionContext,
    outputs: &dyn OutputSink,
) -> Result<(), DeployError> {
    let args = GetEnvStepArgs {
        core: ctx.core_args.clone(),
        git_ref: input(action, "ref")?.unwrap_or_else(|| ctx.git_ref.clone()),
    };
    log_arguments(ctx, Step::GetEnv, &args);

    let environments = list_environments(ctx, &args.git_ref).await?;
    if args.core.is_debug {
        ctx.trace.verbose(&format!(
            "Deployment by environment for {} branch : {}",
            args.git_ref,
            environments.join(",")
        ));
    }

    set_output(outputs, "env", &Value::from(environments).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, Call, FakeApi};
    use crate::types::DeploymentQuery;
    use deploy_sdk::{CollectingOutputs, TraceLevel};
    use std::sync::Arc;

    fn inputs(pairs: &[(&str, &str)]) -> ActionContext {
        let mut action = ActionContext::new();
        for (name, value) in pairs {
            action.set_input(name, value);
        }
        action
    }

    #[test]
    fn step_names() {
        for step in [
            Step::Start,
            Step::Finish,
            Step::DeactivateEnv,
            Step::DeleteEnv,
            Step::GetEnv,
        ] {
            assert_eq!(step.as_str().parse::<Step>().unwrap(), step);
        }
        assert!(matches!(
            "deploy".parse::<Step>(),
            Err(DeployError::UnknownStep(s)) if s == "deploy"
        ));
        assert!("Start".parse::<Step>().is_err());
    }

    #[tokio::test]
    async fn start_creates_deployment_per_environment() {
        let api = Arc::new(FakeApi::new().with_deployment(1, "prod", "main"));
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        run_step(
            Step::Start,
            &ctx,
            &inputs(&[("env", r#"["prod","staging"]"#), ("ref", "topic")]),
            &outputs,
        )
        .await
        .unwrap();

        let creates = api.creates();
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[0].environment, "prod");
        assert_eq!(creates[1].environment, "staging");
        assert!(creates.iter().all(|c| c.git_ref == "topic"
            && !c.auto_merge
            && c.transient_environment
            && c.required_contexts.is_empty()
            && c.description.as_deref() == Some("release")));

        let statuses = api.status_writes();
        let inactive: Vec<u64> = statuses
            .iter()
            .filter(|s| s.state == DeploymentStatus::Inactive)
            .map(|s| s.deployment_id)
            .collect();
        assert_eq!(inactive, vec![1]);
        let in_progress: Vec<_> = statuses
            .iter()
            .filter(|s| s.state == DeploymentStatus::InProgress)
            .collect();
        assert_eq!(in_progress.len(), 2);
        assert!(in_progress
            .iter()
            .all(|s| s.git_ref.as_deref() == Some("main") && s.log_url.is_some()));

        let records: Vec<Value> =
            serde_json::from_str(&outputs.get("deployment_id").unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["deployment_url"], "prod");
        assert_eq!(records[0]["environment"], "prod");
        assert_eq!(records[1]["deployment_url"], "staging");
        assert_eq!(outputs.get("env").as_deref(), Some(r#"["prod","staging"]"#));
    }

    #[tokio::test]
    async fn start_with_comma_list_creates_one_deployment() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        run_step(Step::Start, &ctx, &inputs(&[("env", "prod,staging")]), &outputs)
            .await
            .unwrap();

        let creates = api.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].environment, "prod,staging");
        assert_eq!(creates[0].git_ref, "main");
    }

    #[tokio::test]
    async fn start_creation_failure_writes_no_in_progress_status() {
        let api = Arc::new(FakeApi::new().failing_create("staging"));
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        let err = run_step(
            Step::Start,
            &ctx,
            &inputs(&[("env", r#"["prod","staging"]"#)]),
            &outputs,
        )
        .await
        .unwrap_err();

        match err {
            DeployError::DeploymentCreationFailed { failure } => {
                assert_eq!((failure.total, failure.succeeded), (2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(api.status_writes().is_empty());
        assert!(outputs.outputs().is_empty());
    }

    #[tokio::test]
    async fn start_deactivation_failure_wins() {
        let api = Arc::new(
            FakeApi::new()
                .with_deployment(7, "prod", "main")
                .failing_status(7),
        );
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        let err = run_step(Step::Start, &ctx, &inputs(&[("env", "prod")]), &outputs)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::DeactivationFailed { ref environment, .. } if environment == "prod"
        ));
        assert!(api
            .status_writes()
            .iter()
            .all(|s| s.state == DeploymentStatus::Inactive));
        assert!(outputs.outputs().is_empty());
    }

    #[tokio::test]
    async fn start_in_progress_failure_sets_no_outputs() {
        // Created deployments are numbered from 1001.
        let api = Arc::new(FakeApi::new().failing_status(1001));
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        let err = run_step(Step::Start, &ctx, &inputs(&[("env", "prod")]), &outputs)
            .await
            .unwrap_err();
        match err {
            DeployError::StatusWriteFailed { failure } => {
                assert_eq!((failure.total, failure.succeeded), (1, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.creates().len(), 1);
        let statuses = api.status_writes();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].deployment_id, 1001);
        assert_eq!(statuses[0].state, DeploymentStatus::InProgress);
        assert!(outputs.outputs().is_empty());
    }

    #[tokio::test]
    async fn start_requires_env() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        let err = run_step(Step::Start, &ctx, &inputs(&[]), &CollectingOutputs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::MissingInput(name) if name == "env"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn start_logs_arguments_when_debugging() {
        let api = Arc::new(FakeApi::new());
        let (mut ctx, trace) = context(&api);
        ctx.core_args.is_debug = true;

        run_step(
            Step::Start,
            &ctx,
            &inputs(&[("env", "prod"), ("override", "false")]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();

        assert!(trace.contains(TraceLevel::Verbose, "'start' arguments"));
        assert!(trace.contains(TraceLevel::Verbose, "\"override\": \"false\""));
        assert!(trace.contains(TraceLevel::Verbose, "Environment(s) : prod"));
        assert!(trace.contains(TraceLevel::Verbose, "Deployments data"));
        assert!(!trace.contains(TraceLevel::Info, "arguments"));
    }

    #[tokio::test]
    async fn finish_cancelled_writes_inactive() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        run_step(
            Step::Finish,
            &ctx,
            &inputs(&[("status", "cancelled"), ("deployment_id", "[1,2]")]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();

        let writes = api.status_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].deployment_id, 1);
        assert_eq!(writes[1].deployment_id, 2);
        assert!(writes.iter().all(|w| w.state == DeploymentStatus::Inactive
            && w.environment_url.as_deref() == Some("")));
    }

    #[tokio::test]
    async fn finish_status_is_lowercased() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        run_step(
            Step::Finish,
            &ctx,
            &inputs(&[
                ("status", "Success"),
                ("deployment_id", r#"[{"id":"3","deployment_url":"https://app.example.com"}]"#),
            ]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();

        let writes = api.status_writes();
        assert_eq!(writes[0].state, DeploymentStatus::Success);
        assert_eq!(
            writes[0].environment_url.as_deref(),
            Some("https://app.example.com")
        );
    }

    #[tokio::test]
    async fn finish_env_url_list_maps_by_position() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        run_step(
            Step::Finish,
            &ctx,
            &inputs(&[
                ("status", "success"),
                ("deployment_id", "[5,6]"),
                ("env_url", r#"["https://a","https://b"]"#),
            ]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();

        let writes = api.status_writes();
        assert_eq!(writes[0].environment_url.as_deref(), Some("https://a"));
        assert_eq!(writes[1].environment_url.as_deref(), Some("https://b"));
    }

    #[tokio::test]
    async fn finish_rejects_unknown_status_before_writing() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        let err = run_step(
            Step::Finish,
            &ctx,
            &inputs(&[("status", "done"), ("deployment_id", "1")]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::InvalidStatus(s) if s == "done"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn finish_length_mismatch_writes_nothing() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        let err = run_step(
            Step::Finish,
            &ctx,
            &inputs(&[
                ("status", "success"),
                ("deployment_id", "[1,2]"),
                ("env_url", "https://only-one"),
            ]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::LengthMismatch { deployments: 2, urls: 1 }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn finish_malformed_identifiers() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        let err = run_step(
            Step::Finish,
            &ctx,
            &inputs(&[("status", "success"), ("deployment_id", "{malformed")]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::MalformedDeploymentInput(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn deactivate_env_handles_each_environment() {
        let api = Arc::new(
            FakeApi::new()
                .with_deployment(1, "pr-1", "topic")
                .with_deployment(2, "pr-2", "topic"),
        );
        let (ctx, _) = context(&api);

        run_step(
            Step::DeactivateEnv,
            &ctx,
            &inputs(&[("env", r#"["pr-1","pr-2","pr-3"]"#)]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();

        let lists: Vec<_> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::List(_)))
            .collect();
        assert_eq!(lists.len(), 3);
        assert_eq!(
            lists[2],
            Call::List(DeploymentQuery::for_environment("octo", "app", "pr-3"))
        );
        let mut ids: Vec<u64> = api.status_writes().iter().map(|s| s.deployment_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn deactivate_env_reports_failure() {
        let api = Arc::new(FakeApi::new().with_deployment(1, "pr-1", "topic").failing_status(1));
        let (ctx, _) = context(&api);

        let err = run_step(
            Step::DeactivateEnv,
            &ctx,
            &inputs(&[("env", "pr-1")]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::DeactivationFailed { .. }));
    }

    #[tokio::test]
    async fn delete_env_deletes_listed_environments() {
        let api = Arc::new(FakeApi::new());
        let (ctx, _) = context(&api);

        run_step(
            Step::DeleteEnv,
            &ctx,
            &inputs(&[("env", r#"["pr-1","pr-2"]"#)]),
            &CollectingOutputs::new(),
        )
        .await
        .unwrap();
        assert_eq!(api.deletes(), vec!["pr-1".to_string(), "pr-2".to_string()]);
    }

    #[tokio::test]
    async fn get_env_outputs_unique_environments() {
        let api = Arc::new(
            FakeApi::new()
                .with_deployment(1, "prod", "main")
                .with_deployment(2, "staging", "main")
                .with_deployment(3, "prod", "main")
                .with_deployment(4, "review", "topic"),
        );
        let (ctx, _) = context(&api);
        let outputs = CollectingOutputs::new();

        run_step(Step::GetEnv, &ctx, &inputs(&[]), &outputs)
            .await
            .unwrap();
        assert_eq!(outputs.get("env").as_deref(), Some(r#"["prod","staging"]"#));

        run_step(Step::GetEnv, &ctx, &inputs(&[("ref", "topic")]), &outputs)
            .await
            .unwrap();
        assert_eq!(outputs.get("env").as_deref(), Some(r#"["review"]"#));
    }
}
