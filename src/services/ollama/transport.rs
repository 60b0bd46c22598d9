use std::time::Duration;

use async_trait::async_trait;

use super::models::{
    ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse,
    ModelEntry, RunningModelEntry, ShowResponse, TransportError,
};

/// Read and write timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(300),
            write: Duration::from_secs(300),
        }
    }
}

/// The server-facing half of a [`Session`](crate::Session).
///
/// Every method issues exactly one request and reports the server's verdict;
/// retries and timeouts beyond [`Timeouts`] are not this trait's concern.
/// [`OllamaClient`](crate::OllamaClient) is the HTTP implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    fn server_address(&self) -> &str;

    /// Re-points the transport at another server. Does not probe it.
    fn set_server_address(&mut self, address: &str) -> Result<(), TransportError>;

    fn timeouts(&self) -> Timeouts;

    fn set_timeouts(&mut self, timeouts: Timeouts);

    /// Whether the server at [`server_address`](Self::server_address) answers.
    async fn is_running(&self) -> bool;

    async fn version(&self) -> Result<String, TransportError>;

    async fn list_models(&self) -> Result<Vec<ModelEntry>, TransportError>;

    async fn list_running_models(&self) -> Result<Vec<RunningModelEntry>, TransportError>;

    async fn model_info(&self, model: &str) -> Result<ShowResponse, TransportError>;

    async fn load_model(&self, model: &str) -> Result<(), TransportError>;

    async fn unload_model(&self, model: &str) -> Result<(), TransportError>;

    async fn pull_model(&self, model: &str) -> Result<(), TransportError>;

    async fn copy_model(&self, source: &str, destination: &str) -> Result<(), TransportError>;

    async fn delete_model(&self, model: &str) -> Result<(), TransportError>;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, TransportError>;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TransportError>;

    async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse, TransportError>;
}
