// DeploymentContext – the per-run state every step borrows.

use std::fmt;
use std::sync::Arc;

use deploy_sdk::{ActionContext, StringUtil, TraceWriter};
use serde::Serialize;

use crate::api::DeploymentApi;
use crate::error::DeployError;

const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Arguments shared by every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreArgs {
    pub logs_url: String,
    pub description: Option<String>,
    pub is_debug: bool,
}

/// Everything a step needs to talk to the hosting API for one run.
///
/// Built once before dispatch and only ever borrowed afterwards.
#[derive(Clone)]
pub struct DeploymentContext {
    pub git_ref: String,
    pub sha: String,
    pub owner: String,
    pub repo: String,
    pub client: Arc<dyn DeploymentApi>,
    pub trace: Arc<dyn TraceWriter>,
    pub core_args: CoreArgs,
}

impl fmt::Debug for DeploymentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentContext")
            .field("git_ref", &self.git_ref)
            .field("sha", &self.sha)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("core_args", &self.core_args)
            .finish_non_exhaustive()
    }
}

impl DeploymentContext {
    /// Collect the run context from step inputs and runner variables.
    pub fn collect(
        action: &ActionContext,
        client: Arc<dyn DeploymentApi>,
        trace: Arc<dyn TraceWriter>,
    ) -> Result<Self, DeployError> {
        let repository = input(action, "repository")?
            .or_else(|| action.get_non_empty_variable("GITHUB_REPOSITORY").map(str::to_string))
            .unwrap_or_default();
        let (owner, repo) = parse_repository(&repository)?;

        let git_ref = action
            .get_non_empty_variable("GITHUB_HEAD_REF")
            .or_else(|| action.get_non_empty_variable("GITHUB_REF"))
            .unwrap_or_default()
            .to_string();
        let sha = action
            .get_non_empty_variable("GITHUB_SHA")
            .unwrap_or_default()
            .to_string();

        let server_url = action
            .get_non_empty_variable("GITHUB_SERVER_URL")
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/');
        let logs_url = format!("{server_url}/{owner}/{repo}/commit/{sha}/checks");

        let description = match input(action, "description")? {
            Some(description) => Some(description),
            None => input(action, "desc")?,
        };

        let debug_input = input(action, "debug")?
            .and_then(|v| StringUtil::convert_to_bool(&v))
            .unwrap_or(false);
        let is_debug = debug_input || action.is_debug();

        Ok(Self {
            git_ref,
            sha,
            owner,
            repo,
            client,
            trace,
            core_args: CoreArgs {
                logs_url,
                description,
                is_debug,
            },
        })
    }
}

/// Split `owner/repo`, requiring exactly two non-empty parts.
pub fn parse_repository(repository: &str) -> Result<(String, String), DeployError> {
    match repository.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(DeployError::InvalidRepository(repository.to_string())),
    }
}

/// Read an optional step input.
pub(crate) fn input(action: &ActionContext, name: &str) -> Result<Option<String>, DeployError> {
    action
        .get_input(name, false)
        .map_err(|_| DeployError::MissingInput(name.to_string()))
}

/// Read a step input that must be present and non-empty.
pub(crate) fn required_input(action: &ActionContext, name: &str) -> Result<String, DeployError> {
    input(action, name)?.ok_or_else(|| DeployError::MissingInput(name.to_string()))
}
