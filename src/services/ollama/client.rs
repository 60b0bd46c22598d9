use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info_span, instrument, trace, Instrument};

use super::models::{
    ChatRequest, ChatResponse, CopyRequest, DeleteRequest, EmbedRequest, EmbedResponse,
    ErrorResponse, GenerateRequest, GenerateResponse, LoadRequest, LoadResponse, ModelEntry,
    ModelsResponse, PullRequest, RunningModelEntry, RunningModelsResponse, ShowRequest,
    ShowResponse, StatusResponse, TransportError, VersionResponse,
};
use super::transport::{Timeouts, Transport};

/// The address a stock Ollama installation listens on.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:11434";

/// Body the server's root endpoint answers with when it is up.
const RUNNING_BANNER: &str = "Ollama is running";

/// The HTTP [`Transport`] for the Ollama REST API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    pub client: Client,
    pub base_url: String,
    timeouts: Timeouts,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_SERVER_ADDRESS.into(),
            timeouts: Timeouts::default(),
        }
    }
}

impl OllamaClient {
    /// Creates a new `OllamaClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the Ollama API (e.g., "http://localhost:11434").
    pub fn new<T: AsRef<str>>(base_url: T, timeouts: Timeouts) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::new(),
            base_url: normalize_address(base_url.as_ref())?,
            timeouts,
        })
    }

    /// Sends `body` (if any) to `endpoint` and returns the raw reply text of a
    /// successful response.
    async fn send<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<String, TransportError>
    where
        T: serde::Serialize + fmt::Debug,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let span = info_span!("http.request", %method, %url);
        async {
            let mut request = self
                .client
                .request(method, &url)
                .timeout(self.timeouts.read + self.timeouts.write);
            if let Some(body) = body {
                trace!(?body, "request body");
                request = request.json(body);
            }

            let response = request.send().await.map_err(TransportError::from)?;

            let status = response.status();
            debug!(%status, "received response");

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to read error body".into());

                error!(%status, body = %error_text, "request failed");

                let message = serde_json::from_str::<ErrorResponse>(&error_text)
                    .map(|e| e.error)
                    .unwrap_or(error_text);
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .text()
                .await
                .map_err(|e| TransportError::Request(format!("Failed to read response text: {e}")))
        }
        .instrument(span)
        .await
    }

    /// Executes a request whose reply is a JSON document of type `R`.
    #[instrument(name = "ollama.request", skip_all, fields(endpoint = %endpoint))]
    async fn request_json<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<R, TransportError>
    where
        T: serde::Serialize + fmt::Debug,
        R: DeserializeOwned + fmt::Debug,
    {
        let response_text = self.send(method, endpoint, body).await?;
        decode(&response_text)
    }

    async fn get_json<R>(&self, endpoint: &str) -> Result<R, TransportError>
    where
        R: DeserializeOwned + fmt::Debug,
    {
        self.request_json::<(), R>(Method::GET, endpoint, None).await
    }

    async fn post_json<T, R>(&self, endpoint: &str, body: &T) -> Result<R, TransportError>
    where
        T: serde::Serialize + fmt::Debug,
        R: DeserializeOwned + fmt::Debug,
    {
        self.request_json(Method::POST, endpoint, Some(body)).await
    }
}

#[async_trait]
impl Transport for OllamaClient {
    fn server_address(&self) -> &str {
        &self.base_url
    }

    fn set_server_address(&mut self, address: &str) -> Result<(), TransportError> {
        self.base_url = normalize_address(address)?;
        Ok(())
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    #[instrument(name = "ollama.is_running", skip_all, fields(server = %self.base_url))]
    async fn is_running(&self) -> bool {
        match self.send::<()>(Method::GET, "/", None).await {
            Ok(body) => body.trim() == RUNNING_BANNER,
            Err(e) => {
                debug!(%e, "server probe failed");
                false
            }
        }
    }

    async fn version(&self) -> Result<String, TransportError> {
        let response: VersionResponse = self.get_json("/api/version").await?;
        Ok(response.version)
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, TransportError> {
        let response: ModelsResponse = self.get_json("/api/tags").await?;
        Ok(response.models)
    }

    async fn list_running_models(&self) -> Result<Vec<RunningModelEntry>, TransportError> {
        let response: RunningModelsResponse = self.get_json("/api/ps").await?;
        Ok(response.models)
    }

    async fn model_info(&self, model: &str) -> Result<ShowResponse, TransportError> {
        let request = ShowRequest { model: model.into() };
        self.post_json("/api/show", &request).await
    }

    async fn load_model(&self, model: &str) -> Result<(), TransportError> {
        let request = LoadRequest { model: model.into(), stream: false, keep_alive: None };
        let response: LoadResponse = self.post_json("/api/generate", &request).await?;
        if !response.done {
            return Err(TransportError::Incomplete(format!("model '{model}' was not loaded")));
        }
        Ok(())
    }

    async fn unload_model(&self, model: &str) -> Result<(), TransportError> {
        let request = LoadRequest { model: model.into(), stream: false, keep_alive: Some(0) };
        let response: LoadResponse = self.post_json("/api/generate", &request).await?;
        if !response.done {
            return Err(TransportError::Incomplete(format!("model '{model}' was not unloaded")));
        }
        Ok(())
    }

    async fn pull_model(&self, model: &str) -> Result<(), TransportError> {
        let request = PullRequest { model: model.into(), insecure: false, stream: false };
        let response: StatusResponse = self.post_json("/api/pull", &request).await?;
        if response.status != "success" {
            return Err(TransportError::Incomplete(format!(
                "pulling model '{model}' ended with status '{}'",
                response.status
            )));
        }
        Ok(())
    }

    async fn copy_model(&self, source: &str, destination: &str) -> Result<(), TransportError> {
        let request = CopyRequest { source: source.into(), destination: destination.into() };
        self.send(Method::POST, "/api/copy", Some(&request)).await?;
        Ok(())
    }

    async fn delete_model(&self, model: &str) -> Result<(), TransportError> {
        let request = DeleteRequest { model: model.into() };
        self.send(Method::DELETE, "/api/delete", Some(&request)).await?;
        Ok(())
    }

    /// Sends a one-shot completion request to `/api/generate`.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, TransportError> {
        self.post_json("/api/generate", &request).await
    }

    /// Sends a chat request carrying the whole transcript to `/api/chat`.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        self.post_json("/api/chat", &request).await
    }

    /// Generates one embedding per input item via `/api/embed`.
    async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse, TransportError> {
        self.post_json("/api/embed", &request).await
    }
}

fn decode<R>(response_text: &str) -> Result<R, TransportError>
where
    R: DeserializeOwned + fmt::Debug,
{
    match serde_json::from_str::<R>(response_text) {
        Ok(parsed) => {
            trace!(?parsed, "deserialized response");
            Ok(parsed)
        }
        Err(e) => {
            error!(%e, raw = %response_text, "deserialization error");
            Err(TransportError::Serialization(format!(
                "Error decoding response body: {e}. Raw JSON was: '{response_text}'"
            )))
        }
    }
}

/// Checks that `address` is an http(s) URL and strips trailing slashes so
/// endpoint paths can be appended verbatim.
fn normalize_address(address: &str) -> Result<String, TransportError> {
    let trimmed = address.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| TransportError::Request(format!("invalid server address '{address}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::Request(format!(
            "invalid server address '{address}': scheme must be http or https"
        )));
    }
    Ok(trimmed.to_string())
}
