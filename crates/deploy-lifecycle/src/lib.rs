// deploy-lifecycle: deployment records for a workflow run.
// Depends on deploy-sdk for step I/O; talks to the hosting API only
// through the `DeploymentApi` trait.

pub mod api;
pub mod batch;
pub mod context;
pub mod deactivate;
pub mod environments;
pub mod error;
pub mod finalize;
pub mod github_client;
pub mod inputs;
pub mod steps;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::DeploymentApi;
pub use batch::{join_all_reporting, BatchFailure};
pub use context::{parse_repository, CoreArgs, DeploymentContext};
pub use deactivate::{deactivate_environment, DeactivateResult};
pub use environments::{delete_environments, list_environments};
pub use error::{ApiError, DeployError};
pub use finalize::{finalize_deployments, resolve_environment_url};
pub use github_client::GitHubClient;
pub use inputs::{is_valid_status, parse_deployment_identifiers, parse_list_or_single, EnvironmentInput};
pub use steps::{run_step, Step};
pub use types::{
    Deployment, DeploymentData, DeploymentQuery, DeploymentStatus, NewDeployment,
    NewDeploymentStatus,
};
