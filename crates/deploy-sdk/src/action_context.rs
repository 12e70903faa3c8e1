// ActionContext – the inputs and environment a workflow step runs with.
//
// The runner hands step inputs to the process as `INPUT_<NAME>` environment
// variables; everything else in the environment is kept as a variable so
// callers can read `GITHUB_*` / `RUNNER_*` values without touching the
// process environment again.

use crate::string_util::StringUtil;
use std::collections::HashMap;

/// Prefix the runner puts in front of every step input variable.
pub const INPUT_PREFIX: &str = "INPUT_";

/// Inputs and environment variables available to a step.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Step inputs keyed by their normalised name (`DEPLOYMENT_ID`).
    pub inputs: HashMap<String, String>,

    /// All remaining environment variables (e.g. `GITHUB_REPOSITORY`).
    pub variables: HashMap<String, String>,
}

impl ActionContext {
    /// Create a new empty `ActionContext`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build a context from an arbitrary set of environment pairs.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut context = Self::new();
        for (key, value) in vars {
            match key.strip_prefix(INPUT_PREFIX) {
                Some(name) if !name.is_empty() => {
                    context.inputs.insert(name.to_string(), value);
                }
                _ => {
                    context.variables.insert(key, value);
                }
            }
        }
        context
    }

    /// Set (or replace) an input value.
    pub fn set_input(&mut self, name: &str, value: &str) {
        self.inputs
            .insert(normalize_input_name(name), value.to_string());
    }

    /// Get an input value by name, trimmed.
    ///
    /// Empty and missing inputs both come back as `None`. If `required` is
    /// true, either case is an error.
    pub fn get_input(&self, name: &str, required: bool) -> anyhow::Result<Option<String>> {
        let key = normalize_input_name(name);
        let value = self
            .inputs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if required && value.is_none() {
            anyhow::bail!("Input required and not supplied: {name}");
        }

        Ok(value)
    }

    /// Get a variable value by name (case-insensitive).
    pub fn get_variable(&self, name: &str) -> Option<&String> {
        self.variables
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Get a variable value, treating an empty value as unset.
    pub fn get_non_empty_variable(&self, name: &str) -> Option<&str> {
        self.get_variable(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Whether the runner has step debug logging turned on
    /// (`RUNNER_DEBUG=1` or `ACTIONS_STEP_DEBUG=true`).
    pub fn is_debug(&self) -> bool {
        ["RUNNER_DEBUG", "ACTIONS_STEP_DEBUG"].iter().any(|name| {
            self.get_variable(name)
                .and_then(|v| StringUtil::convert_to_bool(v))
                .unwrap_or(false)
        })
    }
}

/// Turn an input name into the form the runner uses in its variable names.
fn normalize_input_name(name: &str) -> String {
    name.replace(' ', "_").to_uppercase()
}
