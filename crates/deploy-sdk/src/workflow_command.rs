// WorkflowCommand – formats `::command key=value::data` lines that the
// runner picks up from a step's stdout.

use std::fmt;

/// A workflow command to be written to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowCommand {
    /// The command name (e.g. "error", "set-output", "debug").
    pub command: String,
    /// Properties in the order they were added.
    pub properties: Vec<(String, String)>,
    /// The command data / body text.
    pub data: String,
}

/// The command delimiter (`::`) used both as prefix and as separator.
pub const COMMAND_KEY: &str = "::";

// ---------------------------------------------------------------------------
// Escape mappings
// ---------------------------------------------------------------------------

struct EscapeMapping {
    token: &'static str,
    replacement: &'static str,
}

/// Data escape mappings. `%` must be handled first.
const ESCAPE_DATA_MAPPINGS: &[EscapeMapping] = &[
    EscapeMapping { token: "%",  replacement: "%25" },
    EscapeMapping { token: "\r", replacement: "%0D" },
    EscapeMapping { token: "\n", replacement: "%0A" },
];

/// Property escape mappings. `%` must be handled first.
const ESCAPE_PROPERTY_MAPPINGS: &[EscapeMapping] = &[
    EscapeMapping { token: "%",  replacement: "%25" },
    EscapeMapping { token: "\r", replacement: "%0D" },
    EscapeMapping { token: "\n", replacement: "%0A" },
    EscapeMapping { token: ":",  replacement: "%3A" },
    EscapeMapping { token: ",",  replacement: "%2C" },
];

impl WorkflowCommand {
    /// Create a new `WorkflowCommand` with the given command name.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            properties: Vec::new(),
            data: String::new(),
        }
    }

    /// Attach a property (`key=value`).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Set the command body.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Escape command body text.
    pub fn escape_data(value: &str) -> String {
        apply(value, ESCAPE_DATA_MAPPINGS)
    }

    /// Escape a property value.
    pub fn escape_property(value: &str) -> String {
        apply(value, ESCAPE_PROPERTY_MAPPINGS)
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_KEY}{}", self.command)?;

        let mut first = true;
        for (key, value) in &self.properties {
            if value.is_empty() {
                continue;
            }
            let sep = if first { " " } else { "," };
            write!(f, "{sep}{key}={}", Self::escape_property(value))?;
            first = false;
        }

        write!(f, "{COMMAND_KEY}{}", Self::escape_data(&self.data))
    }
}

fn apply(value: &str, mappings: &[EscapeMapping]) -> String {
    let mut escaped = value.to_string();
    for mapping in mappings {
        escaped = escaped.replace(mapping.token, mapping.replacement);
    }
    escaped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
