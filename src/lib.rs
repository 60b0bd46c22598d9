//! A session-oriented client for the [Ollama](https://ollama.com) REST API.
//!
//! A [`Session`] keeps the state a conversation with a local or remote model
//! needs (active model, request mode, options, thinking, tools and chat
//! history) and talks to the server through a [`Transport`], by default the
//! HTTP [`OllamaClient`].

pub mod observability;
pub mod options;
pub mod services;
pub mod session;
pub mod tools;

pub use observability::{init_default_tracing, init_json_tracing};
pub use options::{OptionKind, OptionName, OptionValue, OptionsSet};
pub use services::ollama::models::{InferenceStats, Message, Role, TransportError};
pub use services::ollama::{OllamaClient, Timeouts, Transport, DEFAULT_SERVER_ADDRESS};
pub use session::{
    AssistantReply, Error, History, HistoryClear, Image, Mode, ModelInfo, ModelRef, QueryResponse,
    RemoteError, Result, Session, SessionBuilder, SessionConfig, Think, ThinkLevel, Turn,
    TurnInput,
};
pub use tools::{
    parse_tool_calls, tool_fn, Tool, ToolBuilder, ToolBuilderError, ToolCall, ToolCallFunction,
    ToolExecutionError, ToolFn, ToolOutput, ToolParameter, ToolRegistry, ToolRegistryError,
    ToolType,
};
