// Environment lookup and removal.

use std::collections::HashSet;

use crate::batch::join_all_reporting;
use crate::context::DeploymentContext;
use crate::error::DeployError;
use crate::types::DeploymentQuery;

/// The environments deployed at `git_ref`, each listed once in the order
/// first seen.
pub async fn list_environments(
    ctx: &DeploymentContext,
    git_ref: &str,
) -> Result<Vec<String>, DeployError> {
    let query = DeploymentQuery::for_ref(&ctx.owner, &ctx.repo, git_ref);
    let deployments = ctx
        .client
        .list_deployments(&query)
        .await
        .map_err(|source| DeployError::ListFailed {
            git_ref: git_ref.to_string(),
            source,
        })?;

    tracing::debug!("{} deployments found for ref {}", deployments.len(), git_ref);

    let mut seen = HashSet::new();
    let environments = deployments
        .into_iter()
        .map(|deployment| deployment.environment)
        .filter(|environment| seen.insert(environment.clone()))
        .collect();
    Ok(environments)
}

/// Delete every named environment.
///
/// Deletions run concurrently; when one fails the others may already
/// have been applied.
pub async fn delete_environments(
    ctx: &DeploymentContext,
    environments: &[String],
) -> Result<(), DeployError> {
    let deletions = environments.iter().map(|name| async move {
        ctx.client
            .delete_environment(&ctx.owner, &ctx.repo, name)
            .await
    });

    join_all_reporting(deletions)
        .await
        .map_err(|failure| DeployError::DeletionFailed { failure })?;

    ctx.trace
        .info(&format!("{} environments deleted", environments.len()));
    Ok(())
}
