// Input normalisation – turns raw step input strings into typed values.

use serde_json::Value;

use crate::error::DeployError;
use crate::types::{DeploymentData, DeploymentStatus};

/// One or more environment names taken from a single input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentInput {
    Single(String),
    Many(Vec<String>),
}

impl EnvironmentInput {
    /// The names in input order. Never empty.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            EnvironmentInput::Single(name) => vec![name],
            EnvironmentInput::Many(names) => names,
        }
    }
}

/// Accept either a JSON array of names or a single bare value.
///
/// Anything that is not a non-empty JSON array comes back as `Single` with
/// the raw text untouched, so `a,b` is one name and `[]` is the literal `[]`.
pub fn parse_list_or_single(raw: &str) -> EnvironmentInput {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) if !items.is_empty() => {
            EnvironmentInput::Many(items.into_iter().map(element_text).collect())
        }
        _ => EnvironmentInput::Single(raw.to_string()),
    }
}

fn element_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse the `deployment_id` input.
///
/// Accepts a bare id, an object `{ "id": .., "deployment_url": .. }`, or an
/// array mixing both forms.
pub fn parse_deployment_identifiers(raw: &str) -> Result<Vec<DeploymentData>, DeployError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DeployError::MalformedDeploymentInput(format!("{raw}: {e}")))?;

    match value {
        Value::Array(items) => items.into_iter().map(deployment_data).collect(),
        other => Ok(vec![deployment_data(other)?]),
    }
}

fn deployment_data(value: Value) -> Result<DeploymentData, DeployError> {
    match value {
        Value::String(id) => Ok(DeploymentData::new(id, "")),
        Value::Number(id) => Ok(DeploymentData::new(id.to_string(), "")),
        Value::Object(object) => {
            let id = match object.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            };
            let url = object
                .get("deployment_url")
                .and_then(Value::as_str)
                .unwrap_or_default();
            match id {
                Some(id) => Ok(DeploymentData::new(id, url)),
                None => Err(DeployError::MalformedDeploymentInput(format!(
                    "missing id in {}",
                    Value::Object(object.clone())
                ))),
            }
        }
        other => Err(DeployError::MalformedDeploymentInput(format!(
            "unsupported element {other}"
        ))),
    }
}

/// Exact, case-sensitive membership in the set of deployment states.
pub fn is_valid_status(status: &str) -> bool {
    DeploymentStatus::ALL.iter().any(|s| s.as_str() == status)
}
