use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolCall;

/// Represents the role of a message sender in a chat.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One role-tagged entry of a chat transcript as the server sees it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Base64 encoded images attached to a user message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Name of the tool whose output this message carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn new<T: Into<String>>(role: Role, content: T) -> Self {
        Self {
            role,
            content: content.into(),
            thinking: None,
            images: None,
            tool_calls: None,
            tool_name: None,
        }
    }

    pub fn system<T: Into<String>>(content: T) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user<T: Into<String>>(content: T) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool<T, S>(content: T, tool_name: S) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        if !images.is_empty() {
            self.images = Some(images);
        }
        self
    }
}

/// Fields shared by generate and chat requests.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct BaseRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl BaseRequest {
    pub fn new<T: Into<String>>(model: T) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Timing and token counters reported alongside a completed inference.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct InferenceStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Total time spent on the request (nanoseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// Time spent loading the model (nanoseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    /// Number of tokens in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    /// Number of tokens in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}
