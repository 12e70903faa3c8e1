use crate::workflow_command::WorkflowCommand;

/// Trace / logging abstraction for step console output.
///
/// Implementations decide where messages go: the runner console (as plain
/// lines and workflow commands), the `tracing` subscriber, or a buffer in tests.
pub trait TraceWriter: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log a verbose / debug message.
    fn verbose(&self, message: &str);

    /// Log a warning message.
    fn warning(&self, message: &str) {
        self.info(&format!("Warning: {message}"));
    }

    /// Log an error message.
    fn error(&self, message: &str) {
        self.info(&format!("Error: {message}"));
    }
}

/// Writes to stdout using the workflow command protocol.
///
/// Plain info lines go straight to the step log and warnings and errors become
/// `::warning::` / `::error::` annotations. Verbose lines are printed as plain
/// lines when debug output was requested for this step, and as `::debug::`
/// commands otherwise (the runner only shows those with step debugging on).
#[derive(Debug, Clone)]
pub struct ActionTraceWriter {
    debug_enabled: bool,
}

impl ActionTraceWriter {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }

    /// The stdout lines a verbose message turns into.
    pub fn verbose_lines(&self, message: &str) -> Vec<String> {
        if self.debug_enabled {
            return vec![message.to_string()];
        }
        message
            .replace("\r\n", "\n")
            .split('\n')
            .map(|line| WorkflowCommand::new("debug").with_data(line).to_string())
            .collect()
    }
}

impl TraceWriter for ActionTraceWriter {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn verbose(&self, message: &str) {
        tracing::debug!("{}", message);
        for line in self.verbose_lines(message) {
            println!("{line}");
        }
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
        println!("{}", WorkflowCommand::new("warning").with_data(message));
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
        println!("{}", WorkflowCommand::new("error").with_data(message));
    }
}

/// A trace writer that collects all messages into a `Vec`.
/// Useful for testing output.
#[derive(Debug)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

/// The level of a collected trace message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Verbose,
    Warning,
    Error,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self {
            messages: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Return all collected messages.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Whether any collected message at `level` contains `needle`.
    pub fn contains(&self, level: TraceLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Default for CollectingTraceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Info, message.to_string()));
    }

    fn verbose(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Verbose, message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Warning, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Error, message.to_string()));
    }
}
