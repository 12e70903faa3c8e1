// In-memory DeploymentApi used by the orchestration tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use deploy_sdk::CollectingTraceWriter;
use parking_lot::Mutex;
use serde_json::Map;

use crate::api::DeploymentApi;
use crate::context::{CoreArgs, DeploymentContext};
use crate::error::ApiError;
use crate::types::{Deployment, DeploymentQuery, NewDeployment, NewDeploymentStatus};

/// A recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(DeploymentQuery),
    Create(NewDeployment),
    Status(NewDeploymentStatus),
    Delete(String),
}

#[derive(Debug, Default)]
pub struct FakeApi {
    deployments: Vec<Deployment>,
    next_id: Mutex<u64>,
    calls: Mutex<Vec<Call>>,
    fail_list: bool,
    fail_create: HashSet<String>,
    fail_status: HashSet<u64>,
    fail_delete: HashSet<String>,
}

fn injected() -> ApiError {
    ApiError::Status {
        status: 500,
        message: "injected failure".to_string(),
        request_id: None,
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1000),
            ..Self::default()
        }
    }

    /// Seed an existing deployment.
    pub fn with_deployment(mut self, id: u64, environment: &str, git_ref: &str) -> Self {
        self.deployments.push(Deployment {
            id,
            sha: format!("sha{id}"),
            git_ref: git_ref.to_string(),
            environment: environment.to_string(),
            statuses_url: String::new(),
            extra: Map::new(),
        });
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_create(mut self, environment: &str) -> Self {
        self.fail_create.insert(environment.to_string());
        self
    }

    pub fn failing_status(mut self, deployment_id: u64) -> Self {
        self.fail_status.insert(deployment_id);
        self
    }

    pub fn failing_delete(mut self, environment: &str) -> Self {
        self.fail_delete.insert(environment.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn status_writes(&self) -> Vec<NewDeploymentStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn creates(&self) -> Vec<NewDeployment> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Every call except listings.
    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::List(_)))
            .count()
    }
}

#[async_trait]
impl DeploymentApi for FakeApi {
    async fn list_deployments(&self, query: &DeploymentQuery) -> Result<Vec<Deployment>, ApiError> {
        self.calls.lock().push(Call::List(query.clone()));
        if self.fail_list {
            return Err(injected());
        }
        Ok(self
            .deployments
            .iter()
            .filter(|d| query.environment.as_ref().map_or(true, |e| &d.environment == e))
            .filter(|d| query.git_ref.as_ref().map_or(true, |r| &d.git_ref == r))
            .cloned()
            .collect())
    }

    async fn create_deployment(&self, request: &NewDeployment) -> Result<Deployment, ApiError> {
        self.calls.lock().push(Call::Create(request.clone()));
        if self.fail_create.contains(&request.environment) {
            return Err(injected());
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        Ok(Deployment {
            id,
            sha: "abc123".to_string(),
            git_ref: request.git_ref.clone(),
            environment: request.environment.clone(),
            statuses_url: format!("https://api.github.com/deployments/{id}/statuses"),
            extra: Map::new(),
        })
    }

    async fn create_deployment_status(&self, request: &NewDeploymentStatus) -> Result<(), ApiError> {
        self.calls.lock().push(Call::Status(request.clone()));
        if self.fail_status.contains(&request.deployment_id) {
            return Err(injected());
        }
        Ok(())
    }

    async fn delete_environment(
        &self,
        _owner: &str,
        _repo: &str,
        environment_name: &str,
    ) -> Result<(), ApiError> {
        self.calls
            .lock()
            .push(Call::Delete(environment_name.to_string()));
        if self.fail_delete.contains(environment_name) {
            return Err(injected());
        }
        Ok(())
    }
}

/// A context for `octo/app` at `main` backed by `api`.
pub fn context(api: &Arc<FakeApi>) -> (DeploymentContext, Arc<CollectingTraceWriter>) {
    let trace = Arc::new(CollectingTraceWriter::new());
    let ctx = DeploymentContext {
        git_ref: "main".to_string(),
        sha: "abc123".to_string(),
        owner: "octo".to_string(),
        repo: "app".to_string(),
        client: api.clone(),
        trace: trace.clone(),
        core_args: CoreArgs {
            logs_url: "https://github.com/octo/app/commit/abc123/checks".to_string(),
            description: Some("release".to_string()),
            is_debug: false,
        },
    };
    (ctx, trace)
}
