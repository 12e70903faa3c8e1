use thiserror::Error;

use crate::batch::BatchFailure;

/// Error returned by a single hosting API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("request failed")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Step-level failures. Every handler returns this type and the binary
/// reports it once at its outer boundary.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid target repository: {0}")]
    InvalidRepository(String),

    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("failed to parse deployment_id: {0}")]
    MalformedDeploymentInput(String),

    #[error("unexpected status {0}")]
    InvalidStatus(String),

    #[error("deployment_id and env_url must have the same length: deployment_id has {deployments} items, env_url has {urls} items")]
    LengthMismatch { deployments: usize, urls: usize },

    #[error("cannot generate deployments")]
    DeploymentCreationFailed {
        #[source]
        failure: BatchFailure,
    },

    #[error("cannot deactivate deployments for env {environment}")]
    DeactivationFailed {
        environment: String,
        #[source]
        failure: BatchFailure,
    },

    #[error("cannot delete env")]
    DeletionFailed {
        #[source]
        failure: BatchFailure,
    },

    #[error("cannot generate deployment status")]
    StatusWriteFailed {
        #[source]
        failure: BatchFailure,
    },

    #[error("cannot list deployments for ref {git_ref}")]
    ListFailed {
        git_ref: String,
        #[source]
        source: ApiError,
    },

    #[error("unknown step type {0}")]
    UnknownStep(String),

    #[error("cannot set step output '{name}'")]
    Output {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DeployError {
    /// The batch outcome behind a failed fan-out, if this error came from one.
    pub fn batch_failure(&self) -> Option<&BatchFailure> {
        match self {
            DeployError::DeploymentCreationFailed { failure }
            | DeployError::DeactivationFailed { failure, .. }
            | DeployError::DeletionFailed { failure }
            | DeployError::StatusWriteFailed { failure } => Some(failure),
            _ => None,
        }
    }
}
