use thiserror::Error;

/// Errors that can occur while resolving or running a tool call.
///
/// These errors indicate failures in parsing arguments, actually
/// running the tool, or locating the requested tool.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolExecutionError {
    /// The tool call payload or its arguments could not be parsed.
    #[error("Tool argument parsing error: {0}")]
    ArgumentParsingError(String),
    /// The tool failed during execution (runtime failure inside the handle).
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
    /// The requested tool is not in the registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

/// Errors raised while assembling a [`ToolRegistry`](crate::ToolRegistry).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryError {
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
}
