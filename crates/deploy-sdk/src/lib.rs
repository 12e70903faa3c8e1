// deploy-sdk: Foundation layer for the deploy action.
// This crate has ZERO dependencies on other workspace crates and provides
// the step context, workflow command plumbing and shared utilities.

pub mod action_context;
pub mod build_constants;
pub mod http_util;
pub mod step_output;
pub mod string_util;
pub mod trace;
pub mod url_util;
pub mod workflow_command;

// Re-export commonly used items at crate root
pub use action_context::ActionContext;
pub use build_constants::{ActionPackage, Source};
pub use http_util::HttpUtil;
pub use step_output::{
    output_sink_for, CollectingOutputs, FileCommandOutput, OutputSink, WorkflowCommandOutput,
};
pub use string_util::StringUtil;
pub use trace::{ActionTraceWriter, CollectingTraceWriter, TraceLevel, TraceWriter};
pub use url_util::UrlUtil;
pub use workflow_command::WorkflowCommand;
