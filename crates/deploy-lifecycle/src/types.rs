// Deployment domain types shared by the API client and the step handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::DeployError;

// ---------------------------------------------------------------------------
// Deployment records returned by the hosting API
// ---------------------------------------------------------------------------

/// A deployment record as returned by the REST API.
///
/// Only the fields the action reads are typed; everything else is kept in
/// `extra` so the full record can be echoed back as a step output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,

    #[serde(default)]
    pub sha: String,

    #[serde(rename = "ref", default)]
    pub git_ref: String,

    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub statuses_url: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deployment {
    /// The record as a JSON object with `deployment_url` attached.
    pub fn to_output(&self, deployment_url: &str) -> Value {
        let mut object = self.extra.clone();
        object.insert("id".to_string(), Value::from(self.id));
        object.insert("sha".to_string(), Value::from(self.sha.clone()));
        object.insert("ref".to_string(), Value::from(self.git_ref.clone()));
        object.insert(
            "environment".to_string(),
            Value::from(self.environment.clone()),
        );
        object.insert(
            "statuses_url".to_string(),
            Value::from(self.statuses_url.clone()),
        );
        object.insert(
            "deployment_url".to_string(),
            Value::from(deployment_url.to_string()),
        );
        Value::Object(object)
    }
}

/// A deployment reference supplied to the finish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentData {
    pub id: String,
    pub deployment_url: String,
}

impl DeploymentData {
    pub fn new(id: impl Into<String>, deployment_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            deployment_url: deployment_url.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Deployment status
// ---------------------------------------------------------------------------

/// The closed set of deployment states the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failure,
    Cancelled,
    Error,
    Inactive,
    InProgress,
    Queued,
    Pending,
}

impl DeploymentStatus {
    pub const ALL: [DeploymentStatus; 8] = [
        DeploymentStatus::Success,
        DeploymentStatus::Failure,
        DeploymentStatus::Cancelled,
        DeploymentStatus::Error,
        DeploymentStatus::Inactive,
        DeploymentStatus::InProgress,
        DeploymentStatus::Queued,
        DeploymentStatus::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failure => "failure",
            DeploymentStatus::Cancelled => "cancelled",
            DeploymentStatus::Error => "error",
            DeploymentStatus::Inactive => "inactive",
            DeploymentStatus::InProgress => "in_progress",
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::Pending => "pending",
        }
    }

    /// The state actually written: `cancelled` is recorded as `inactive`.
    pub fn normalized(self) -> Self {
        match self {
            DeploymentStatus::Cancelled => DeploymentStatus::Inactive,
            other => other,
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = DeployError;

    /// Exact, case-sensitive match against the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DeployError::InvalidStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// API requests
// ---------------------------------------------------------------------------

/// Filter for listing deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentQuery {
    pub owner: String,
    pub repo: String,
    pub environment: Option<String>,
    pub git_ref: Option<String>,
}

impl DeploymentQuery {
    pub fn for_environment(owner: &str, repo: &str, environment: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            environment: Some(environment.to_string()),
            git_ref: None,
        }
    }

    pub fn for_ref(owner: &str, repo: &str, git_ref: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            environment: None,
            git_ref: Some(git_ref.to_string()),
        }
    }
}

/// Body of a create-deployment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDeployment {
    #[serde(skip)]
    pub owner: String,
    #[serde(skip)]
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
    pub auto_merge: bool,
    pub transient_environment: bool,
    pub required_contexts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of a create-deployment-status call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDeploymentStatus {
    #[serde(skip)]
    pub owner: String,
    #[serde(skip)]
    pub repo: String,
    #[serde(skip)]
    pub deployment_id: u64,
    pub state: DeploymentStatus,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

impl NewDeploymentStatus {
    /// A bare state change with no metadata.
    pub fn state_only(owner: &str, repo: &str, deployment_id: u64, state: DeploymentStatus) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            deployment_id,
            state,
            git_ref: None,
            description: None,
            environment_url: None,
            log_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trips_wire_names() {
        for status in DeploymentStatus::ALL {
            assert_eq!(status.as_str().parse::<DeploymentStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                Value::from(status.as_str())
            );
        }
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert!(matches!(
            "Success".parse::<DeploymentStatus>(),
            Err(DeployError::InvalidStatus(s)) if s == "Success"
        ));
        assert!("IN_PROGRESS".parse::<DeploymentStatus>().is_err());
        assert!("in-progress".parse::<DeploymentStatus>().is_err());
        assert!("".parse::<DeploymentStatus>().is_err());
    }

    #[test]
    fn cancelled_normalizes_to_inactive() {
        assert_eq!(
            DeploymentStatus::Cancelled.normalized(),
            DeploymentStatus::Inactive
        );
        assert_eq!(
            DeploymentStatus::Success.normalized(),
            DeploymentStatus::Success
        );
    }

    #[test]
    fn deployment_keeps_unknown_fields() {
        let raw = json!({
            "id": 42,
            "sha": "abc",
            "ref": "main",
            "environment": "prod",
            "statuses_url": "https://api/x/statuses",
            "creator": {"login": "octocat"},
            "transient_environment": true
        });
        let deployment: Deployment = serde_json::from_value(raw).unwrap();
        assert_eq!(deployment.id, 42);
        assert_eq!(deployment.git_ref, "main");
        assert!(deployment.extra.contains_key("creator"));

        let output = deployment.to_output("prod");
        assert_eq!(output["id"], 42);
        assert_eq!(output["ref"], "main");
        assert_eq!(output["deployment_url"], "prod");
        assert_eq!(output["creator"]["login"], "octocat");
        assert_eq!(output["transient_environment"], true);
    }

    #[test]
    fn new_deployment_body() {
        let body = NewDeployment {
            owner: "octo".into(),
            repo: "app".into(),
            git_ref: "main".into(),
            environment: "prod".into(),
            auto_merge: false,
            transient_environment: true,
            required_contexts: vec![],
            description: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            json!({
                "ref": "main",
                "environment": "prod",
                "auto_merge": false,
                "transient_environment": true,
                "required_contexts": []
            })
        );
    }

    #[test]
    fn status_body_omits_unset_fields() {
        let body = NewDeploymentStatus::state_only("o", "r", 7, DeploymentStatus::Inactive);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"state": "inactive"})
        );

        let body = NewDeploymentStatus {
            environment_url: Some(String::new()),
            ..body
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"state": "inactive", "environment_url": ""})
        );
    }
}
