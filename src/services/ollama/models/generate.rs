use serde::{Deserialize, Serialize};

use crate::session::Think;

use super::base::{BaseRequest, InferenceStats};

/// Request for the `/api/generate` endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think: Option<Think>,
    /// Base64 encoded images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Response from the `/api/generate` endpoint with streaming disabled.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    pub model: String,
    #[serde(default)]
    pub created_at: String,
    /// The generated response content.
    #[serde(default)]
    pub response: String,
    /// Reasoning trace, present when thinking was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    pub done: bool,
    #[serde(flatten)]
    pub stats: InferenceStats,
}
