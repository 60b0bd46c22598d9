use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model details block shared by `/api/tags`, `/api/ps` and `/api/show`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ModelDetails {
    #[serde(default)]
    pub parent_model: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub families: Option<Vec<String>>,
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

/// One locally available model as listed by `/api/tags`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: ModelDetails,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One model currently held in memory, as listed by `/api/ps`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RunningModelEntry {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: ModelDetails,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub size_vram: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RunningModelsResponse {
    #[serde(default)]
    pub models: Vec<RunningModelEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShowRequest {
    pub model: String,
}

/// Response from `/api/show`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ShowResponse {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub details: ModelDetails,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Map<String, Value>>,
}

/// Empty-prompt generate request used to load a model into memory, or with
/// `keep_alive: 0` to evict it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub model: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct LoadResponse {
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub model: String,
    pub insecure: bool,
    pub stream: bool,
}

/// Non-streaming status reply of `/api/pull`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CopyRequest {
    pub source: String,
    pub destination: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub model: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct VersionResponse {
    pub version: String,
}

/// Error body the server sends with non-success statuses.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
