use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::Think;

use super::base::{BaseRequest, InferenceStats, Message};

/// Request for the `/api/chat` endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<Think>,
    /// Tool definitions as produced by [`ToolRegistry::to_wire`](crate::ToolRegistry::to_wire).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

/// Response from the `/api/chat` endpoint with streaming disabled.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub model: String,
    #[serde(default)]
    pub created_at: String,
    pub message: Message,
    pub done: bool,
    #[serde(flatten)]
    pub stats: InferenceStats,
}
