pub mod config;
pub mod error;
pub mod history;
pub mod model_ref;
#[allow(clippy::module_inception)]
pub mod session;
pub mod session_builder;
pub mod think;
pub mod turn;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{Mode, SessionConfig, OLLAMA_HOST_ENV};
pub use error::{Error, RemoteError, Result, TIMEOUT_HINT};
pub use history::{History, HistoryClear};
pub use model_ref::ModelRef;
pub use session::{ModelInfo, QueryResponse, Session};
pub use session_builder::SessionBuilder;
pub use think::{Think, ThinkLevel};
pub use turn::{validate_query_images, AssistantReply, Image, Turn, TurnInput};
