// Finalisation – writes the terminal status of a set of deployments.

use deploy_sdk::UrlUtil;

use crate::batch::join_all_reporting;
use crate::context::DeploymentContext;
use crate::error::DeployError;
use crate::types::{DeploymentData, DeploymentStatus, NewDeploymentStatus};

/// The environment URL written for one deployment.
///
/// Only successful deployments get a URL: the positional `env_url` entry
/// when one was supplied, otherwise the deployment's own URL if it is an
/// http(s) URL.
pub fn resolve_environment_url(
    status: DeploymentStatus,
    deployment: &DeploymentData,
    env_url: Option<&str>,
) -> String {
    if status != DeploymentStatus::Success {
        return String::new();
    }
    match env_url {
        Some(url) => url.to_string(),
        None if UrlUtil::is_valid_http_url(&deployment.deployment_url) => {
            deployment.deployment_url.clone()
        }
        None => String::new(),
    }
}

/// Write the final `status` on every deployment.
///
/// Input problems (length mismatch, non-numeric ids) are reported before
/// any status is written.
pub async fn finalize_deployments(
    ctx: &DeploymentContext,
    deployments: &[DeploymentData],
    status: DeploymentStatus,
    env_urls: Option<&[String]>,
) -> Result<(), DeployError> {
    let status = status.normalized();

    if let Some(urls) = env_urls {
        if urls.len() != deployments.len() {
            ctx.trace
                .error("deployment_id and env_url must have the same length");
            return Err(DeployError::LengthMismatch {
                deployments: deployments.len(),
                urls: urls.len(),
            });
        }
    }

    let mut requests = Vec::with_capacity(deployments.len());
    for (i, deployment) in deployments.iter().enumerate() {
        let deployment_id: u64 = deployment.id.trim().parse().map_err(|_| {
            DeployError::MalformedDeploymentInput(format!(
                "deployment id '{}' is not a number",
                deployment.id
            ))
        })?;
        let env_url = env_urls.map(|urls| urls[i].as_str());

        requests.push(NewDeploymentStatus {
            git_ref: Some(ctx.git_ref.clone()),
            description: ctx.core_args.description.clone(),
            environment_url: Some(resolve_environment_url(status, deployment, env_url)),
            log_url: Some(ctx.core_args.logs_url.clone()),
            ..NewDeploymentStatus::state_only(&ctx.owner, &ctx.repo, deployment_id, status)
        });
    }

    let writes = requests
        .iter()
        .map(|request| ctx.client.create_deployment_status(request));

    join_all_reporting(writes)
        .await
        .map_err(|failure| DeployError::StatusWriteFailed { failure })?;

    tracing::info!("{} deployments set to {}", requests.len(), status);
    Ok(())
}
