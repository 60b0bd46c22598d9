use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::services::ollama::models::Message;
use crate::tools::{ToolCall, ToolOutput};

use super::error::{Error, Result};

/// An image attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Image {
    /// Path to an image file, read and encoded when the request is sent.
    #[serde(rename = "imageFile")]
    File(PathBuf),
    /// Already base64 encoded image data.
    #[serde(rename = "imageBase64")]
    Base64(String),
}

impl Image {
    /// Classifies `s` as a file path if it contains a `.`, otherwise as base64
    /// data (the base64 alphabet has no period).
    pub fn classify<S: AsRef<str>>(s: S) -> Self {
        let s = s.as_ref();
        if s.contains('.') {
            Image::File(PathBuf::from(s))
        } else {
            Image::Base64(s.to_string())
        }
    }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Image::File(path.into())
    }

    pub fn base64<S: Into<String>>(data: S) -> Self {
        Image::Base64(data.into())
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Image::File(_))
    }

    /// The base64 payload sent to the server.
    pub async fn encode(&self) -> Result<String> {
        match self {
            Image::Base64(data) => Ok(data.clone()),
            Image::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    Error::validation(format!("unable to read image file '{}': {e}", path.display()))
                })?;
                Ok(STANDARD.encode(bytes))
            }
        }
    }
}

/// Encodes every image, preserving order.
pub async fn encode_images(images: &[Image]) -> Result<Vec<String>> {
    let mut encoded = Vec::with_capacity(images.len());
    for image in images {
        encoded.push(image.encode().await?);
    }
    Ok(encoded)
}

/// The one-shot query path takes either file images or base64 images, not both.
pub fn validate_query_images(images: &[Image]) -> Result<()> {
    let files = images.iter().filter(|i| i.is_file()).count();
    if files != 0 && files != images.len() {
        return Err(Error::validation(
            "a query cannot mix image files and base64 images; use chat mode for mixed images",
        ));
    }
    Ok(())
}

/// What the caller contributed to a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnInput {
    User { text: String, images: Vec<Image> },
    ToolOutputs(Vec<ToolOutput>),
}

/// The assistant side of a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    fn to_message(&self) -> Message {
        let mut message = Message::assistant(self.content.clone());
        message.thinking = self.thinking.clone();
        if !self.tool_calls.is_empty() {
            message.tool_calls = Some(self.tool_calls.clone());
        }
        message
    }
}

impl From<Message> for AssistantReply {
    fn from(message: Message) -> Self {
        Self {
            content: message.content,
            thinking: message.thinking.filter(|t| !t.is_empty()),
            tool_calls: message.tool_calls.unwrap_or_default(),
        }
    }
}

/// One exchange of a chat: the caller's input and, once answered, the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub input: TurnInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<AssistantReply>,
}

impl Turn {
    /// A user turn; `text` must contain something besides whitespace.
    pub fn user<T: Into<String>>(text: T, images: Vec<Image>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::validation("prompt cannot be empty"));
        }
        Ok(Self { input: TurnInput::User { text, images }, reply: None })
    }

    /// A turn feeding tool results back to the model.
    pub fn tool_outputs(outputs: Vec<ToolOutput>) -> Result<Self> {
        if outputs.is_empty() {
            return Err(Error::validation("at least one tool output is required"));
        }
        Ok(Self { input: TurnInput::ToolOutputs(outputs), reply: None })
    }

    /// Fills in the assistant side.
    pub fn complete(mut self, reply: AssistantReply) -> Self {
        self.reply = Some(reply);
        self
    }

    /// The user's text; empty for tool output turns.
    pub fn user_text(&self) -> &str {
        match &self.input {
            TurnInput::User { text, .. } => text,
            TurnInput::ToolOutputs(_) => "",
        }
    }

    pub fn user_images(&self) -> &[Image] {
        match &self.input {
            TurnInput::User { images, .. } => images,
            TurnInput::ToolOutputs(_) => &[],
        }
    }

    pub fn assistant_text(&self) -> Option<&str> {
        self.reply.as_ref().map(|r| r.content.as_str())
    }

    /// Appends this turn's wire messages to `messages`.
    pub(crate) async fn append_messages(&self, messages: &mut Vec<Message>) -> Result<()> {
        match &self.input {
            TurnInput::User { text, images } => {
                messages.push(Message::user(text.clone()).with_images(encode_images(images).await?));
            }
            TurnInput::ToolOutputs(outputs) => {
                messages.extend(
                    outputs
                        .iter()
                        .map(|o| Message::tool(o.result.clone(), o.tool_name.clone())),
                );
            }
        }
        if let Some(reply) = &self.reply {
            messages.push(reply.to_message());
        }
        Ok(())
    }
}
