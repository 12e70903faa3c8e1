use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Deployment, DeploymentQuery, NewDeployment, NewDeploymentStatus};

/// The slice of the hosting API the deployment steps depend on.
///
/// `GitHubClient` is the production implementation; handlers only ever see
/// this trait, so they can be driven against an in-memory fake.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Every deployment matching the query.
    async fn list_deployments(&self, query: &DeploymentQuery) -> Result<Vec<Deployment>, ApiError>;

    /// Create a deployment and return the new record.
    async fn create_deployment(&self, request: &NewDeployment) -> Result<Deployment, ApiError>;

    /// Append a status to an existing deployment.
    async fn create_deployment_status(&self, request: &NewDeploymentStatus) -> Result<(), ApiError>;

    /// Remove an environment together with its deployments.
    async fn delete_environment(
        &self,
        owner: &str,
        repo: &str,
        environment_name: &str,
    ) -> Result<(), ApiError>;
}
