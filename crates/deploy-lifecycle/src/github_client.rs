// GitHubClient – a client wrapper around the GitHub deployments REST API.

use anyhow::Context;
use async_trait::async_trait;
use deploy_sdk::{ActionContext, HttpUtil, UrlUtil};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::api::DeploymentApi;
use crate::error::ApiError;
use crate::types::{Deployment, DeploymentQuery, NewDeployment, NewDeploymentStatus};

/// Characters left as-is in a path segment; everything else is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A wrapper around the GitHub REST API for deployment operations.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    /// Public API endpoint used when `GITHUB_API_URL` is not set.
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";
    /// REST API version requested on every call.
    pub const API_VERSION: &'static str = "2022-11-28";
    /// Page size used when listing deployments.
    pub const PAGE_SIZE: usize = 100;

    /// Create a new `GitHubClient`.
    ///
    /// * `client`   – a pre-configured `reqwest::Client`
    /// * `base_url` – the API root (e.g. `https://api.github.com`)
    /// * `token`    – the token sent as a bearer credential
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Build a client from the step's `token` input and the runner's
    /// `GITHUB_API_URL`.
    pub fn from_action(context: &ActionContext) -> anyhow::Result<Self> {
        let token = context.get_input("token", true)?.unwrap_or_default();
        let base_url = context
            .get_non_empty_variable("GITHUB_API_URL")
            .unwrap_or(Self::DEFAULT_API_URL)
            .to_string();
        let http = HttpUtil::create_http_client().context("Failed to create API client")?;
        Ok(Self::new(http, &base_url, &token))
    }

    // -----------------------------------------------------------------------
    // Internal: URLs and request plumbing
    // -----------------------------------------------------------------------

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{base}/repos/{owner}/{repo}",
            base = self.base_url,
            owner = utf8_percent_encode(owner, PATH_SEGMENT),
            repo = utf8_percent_encode(repo, PATH_SEGMENT),
        )
    }

    fn deployments_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/deployments", self.repo_url(owner, repo))
    }

    fn deployment_statuses_url(&self, owner: &str, repo: &str, deployment_id: u64) -> String {
        format!(
            "{}/deployments/{deployment_id}/statuses",
            self.repo_url(owner, repo)
        )
    }

    fn environment_url(&self, owner: &str, repo: &str, environment_name: &str) -> String {
        format!(
            "{}/environments/{}",
            self.repo_url(owner, repo),
            utf8_percent_encode(environment_name, PATH_SEGMENT)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", Self::API_VERSION)
    }

    /// Turn a non-success response into `ApiError::Status`.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let request_id = UrlUtil::get_github_request_id(response.headers());
        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

        tracing::debug!(
            "API call failed with HTTP {} (request id {})",
            status,
            request_id.as_deref().unwrap_or("unknown")
        );

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
            request_id,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pull the `message` field out of a GitHub error body.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[async_trait]
impl DeploymentApi for GitHubClient {
    /// Lists deployments page by page until a short page comes back.
    async fn list_deployments(&self, query: &DeploymentQuery) -> Result<Vec<Deployment>, ApiError> {
        let url = self.deployments_url(&query.owner, &query.repo);
        let mut deployments = Vec::new();

        for page in 1usize.. {
            let mut params: Vec<(&str, String)> = vec![
                ("per_page", Self::PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(environment) = &query.environment {
                params.push(("environment", environment.clone()));
            }
            if let Some(git_ref) = &query.git_ref {
                params.push(("ref", git_ref.clone()));
            }

            let response = self.request(Method::GET, &url).query(&params).send().await?;
            let batch: Vec<Deployment> = Self::decode(Self::check(response).await?).await?;

            let fetched = batch.len();
            deployments.extend(batch);
            if fetched < Self::PAGE_SIZE {
                break;
            }
        }

        tracing::debug!(
            "listed {} deployments for {}/{}",
            deployments.len(),
            query.owner,
            query.repo
        );
        Ok(deployments)
    }

    async fn create_deployment(&self, request: &NewDeployment) -> Result<Deployment, ApiError> {
        let url = self.deployments_url(&request.owner, &request.repo);

        let response = self
            .request(Method::POST, &url)
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        // 202 means the API merged the default branch instead of creating a deployment.
        if response.status() == StatusCode::ACCEPTED {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: StatusCode::ACCEPTED.as_u16(),
                message: error_message(&text)
                    .unwrap_or_else(|| "deployment was not created".to_string()),
                request_id: None,
            });
        }

        Self::decode(response).await
    }

    async fn create_deployment_status(&self, request: &NewDeploymentStatus) -> Result<(), ApiError> {
        let url = self.deployment_statuses_url(&request.owner, &request.repo, request.deployment_id);

        let response = self
            .request(Method::POST, &url)
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_environment(
        &self,
        owner: &str,
        repo: &str,
        environment_name: &str,
    ) -> Result<(), ApiError> {
        let url = self.environment_url(owner, repo, environment_name);

        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
