// Step outputs – how a step hands values back to the workflow.
//
// Current runners expose a `GITHUB_OUTPUT` file that accepts
// `NAME<<DELIMITER\nVALUE\nDELIMITER` records. Older runners only understand
// the `::set-output` workflow command, which is kept as a fallback.

use crate::action_context::ActionContext;
use crate::workflow_command::WorkflowCommand;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the variable pointing at the output file.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Destination for step outputs.
pub trait OutputSink: Send + Sync {
    /// Publish `value` as the step output `name`.
    fn set_output(&self, name: &str, value: &str) -> Result<()>;
}

/// Pick the output sink for the current runner: the `GITHUB_OUTPUT` file when
/// it is advertised, otherwise `::set-output` commands on stdout.
pub fn output_sink_for(context: &ActionContext) -> Box<dyn OutputSink> {
    match context.get_non_empty_variable(GITHUB_OUTPUT) {
        Some(path) => Box::new(FileCommandOutput::new(path)),
        None => Box::new(WorkflowCommandOutput),
    }
}

// ---------------------------------------------------------------------------
// File command output
// ---------------------------------------------------------------------------

/// Appends heredoc records to the `GITHUB_OUTPUT` file.
#[derive(Debug, Clone)]
pub struct FileCommandOutput {
    path: PathBuf,
}

impl FileCommandOutput {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Format one `name<<delimiter` record.
    ///
    /// The delimiter must not appear in the name or value, otherwise the
    /// runner would cut the value short.
    pub fn format_record(name: &str, value: &str, delimiter: &str) -> Result<String> {
        if name.contains(delimiter) {
            anyhow::bail!("Unexpected input: name should not contain the delimiter \"{delimiter}\"");
        }
        if value.contains(delimiter) {
            anyhow::bail!("Unexpected input: value should not contain the delimiter \"{delimiter}\"");
        }
        Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
    }
}

impl OutputSink for FileCommandOutput {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let record = Self::format_record(name, value, &delimiter)?;

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open output file {}", self.path.display()))?;
        file.write_all(record.as_bytes())
            .with_context(|| format!("Failed to write output '{name}'"))?;

        tracing::debug!("set output {name} via {}", self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Workflow command output
// ---------------------------------------------------------------------------

/// Emits `::set-output name=...::value` on stdout.
#[derive(Debug, Clone)]
pub struct WorkflowCommandOutput;

impl WorkflowCommandOutput {
    pub fn command(name: &str, value: &str) -> WorkflowCommand {
        WorkflowCommand::new("set-output")
            .with_property("name", name)
            .with_data(value)
    }
}

impl OutputSink for WorkflowCommandOutput {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        println!();
        println!("{}", Self::command(name, value));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collecting output (tests)
// ---------------------------------------------------------------------------

/// Keeps outputs in memory.
#[derive(Debug, Default)]
pub struct CollectingOutputs {
    outputs: parking_lot::Mutex<Vec<(String, String)>>,
}

impl CollectingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent value set for `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.outputs
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Every output in the order it was set.
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs.lock().clone()
    }
}

impl OutputSink for CollectingOutputs {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.outputs
            .lock()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}
