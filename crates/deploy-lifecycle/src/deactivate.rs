// Deactivation – marks the existing deployments of an environment inactive.

use crate::batch::{join_all_reporting, BatchFailure};
use crate::context::DeploymentContext;
use crate::error::DeployError;
use crate::types::{DeploymentQuery, DeploymentStatus, NewDeploymentStatus};

/// How many deployments of an environment were marked inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateResult {
    pub environment: String,
    pub count: usize,
}

/// Mark every existing deployment of `environment` as inactive.
///
/// All status writes are issued at once. `count` is the number of
/// deployments found; an environment without deployments is a no-op.
pub async fn deactivate_environment(
    ctx: &DeploymentContext,
    environment: &str,
) -> Result<DeactivateResult, DeployError> {
    let query = DeploymentQuery::for_environment(&ctx.owner, &ctx.repo, environment);
    let deployments = ctx
        .client
        .list_deployments(&query)
        .await
        .map_err(|e| DeployError::DeactivationFailed {
            environment: environment.to_string(),
            failure: BatchFailure::single(e),
        })?;

    let existing = deployments.len();
    if existing == 0 {
        ctx.trace
            .info(&format!("found no existing deployments for env {environment}"));
        return Ok(DeactivateResult {
            environment: environment.to_string(),
            count: 0,
        });
    }

    let dead_state = DeploymentStatus::Inactive;
    ctx.trace.info(&format!(
        "found {existing} existing deployments for env {environment} - marking as {dead_state}"
    ));

    let writes = deployments.iter().map(|deployment| {
        ctx.trace.info(&format!(
            "setting deployment '{environment}.{}' ({}) state to \"{dead_state}\"",
            deployment.id, deployment.sha
        ));
        let request =
            NewDeploymentStatus::state_only(&ctx.owner, &ctx.repo, deployment.id, dead_state);
        async move { ctx.client.create_deployment_status(&request).await }
    });

    join_all_reporting(writes)
        .await
        .map_err(|failure| DeployError::DeactivationFailed {
            environment: environment.to_string(),
            failure,
        })?;

    ctx.trace.info(&format!("{existing} deployments updated"));
    Ok(DeactivateResult {
        environment: environment.to_string(),
        count: existing,
    })
}
