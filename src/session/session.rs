use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, field, info, instrument, warn, Span};

use crate::options::{OptionName, OptionValue, OptionsSet};
use crate::services::ollama::models::{
    BaseRequest, ChatRequest, EmbedRequest, GenerateRequest, InferenceStats, ModelEntry,
    RunningModelEntry, TransportError,
};
use crate::services::ollama::{OllamaClient, Timeouts, Transport};
use crate::tools::{ToolOutput, ToolRegistry};

use super::config::{timeout_secs, Mode, SessionConfig};
use super::error::{Error, Result};
use super::history::{History, HistoryClear};
use super::model_ref::ModelRef;
use super::think::Think;
use super::turn::{encode_images, validate_query_images, AssistantReply, Image, Turn};

const CAP_COMPLETION: &str = "completion";
const CAP_EMBEDDING: &str = "embedding";
const CAP_THINKING: &str = "thinking";
const CAP_TOOLS: &str = "tools";

/// Answer to a one-shot [`Session::query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub text: String,
    /// Reasoning trace; only present while thinking is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default)]
    pub stats: InferenceStats,
}

/// Metadata about one model, as returned by [`Session::model_info`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub capabilities: Vec<String>,
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,
    pub format: String,
    pub parameter_size: String,
    pub quantization: String,
    /// Size on disk in bytes, from the model listing.
    pub size_bytes: u64,
    pub modified_at: String,
}

/// A conversation with an Ollama server.
///
/// The session owns the active model, the request mode, the inference
/// options and the chat history, and issues one request at a time through its
/// [`Transport`]. Every method that talks to the server validates its
/// arguments and the session state first, so a rejected call never reaches
/// the network and never leaves the session half-updated.
///
/// ```no_run
/// use ollama_session::{Mode, Session, SessionConfig};
///
/// async {
///     let mut session = Session::connect(SessionConfig::default()).await?;
///     session.load_model("llama3.2").await?;
///     let answer = session.query("Why is the sky blue?", vec![]).await?;
///     println!("{}", answer.text);
///
///     session.set_mode(Mode::Chat)?;
///     session.chat("Hi, I'm Ada.", vec![]).await?;
///     let reply = session.chat("What's my name?", vec![]).await?;
///     println!("{}", reply.content);
///     Ok::<_, ollama_session::Error>(())
/// };
/// ```
#[derive(Debug)]
pub struct Session<T: Transport = OllamaClient> {
    transport: T,
    connected: bool,
    active_model: Option<String>,
    mode: Mode,
    system_message: String,
    options: OptionsSet,
    thinking: Option<Think>,
    tools: Option<ToolRegistry>,
    history: History,
    available_models: Vec<ModelEntry>,
    running_models: Vec<RunningModelEntry>,
    capabilities: Vec<String>,
    keep_alive: String,
    truncate: bool,
}

impl Session<OllamaClient> {
    /// Connects to the server named in `config` over HTTP.
    #[instrument(name = "session.connect", skip_all, fields(server = %config.server_address))]
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let client = OllamaClient::new(&config.server_address, config.timeouts()?)
            .map_err(|e| Error::validation(e.to_string()))?;
        Self::with_transport(client, config).await
    }
}

impl<T: Transport> Session<T> {
    /// Wraps an existing transport. The transport keeps its own server
    /// address; everything else comes from `config`.
    ///
    /// Fails with [`Error::Unavailable`] if the server does not answer.
    pub async fn with_transport(mut transport: T, config: SessionConfig) -> Result<Self> {
        transport.set_timeouts(config.timeouts()?);
        let mut session = Self {
            transport,
            connected: false,
            active_model: None,
            mode: config.mode,
            system_message: String::new(),
            options: config.options,
            thinking: None,
            tools: None,
            history: History::new(),
            available_models: Vec::new(),
            running_models: Vec::new(),
            capabilities: Vec::new(),
            keep_alive: config.keep_alive,
            truncate: config.truncate,
        };
        session.set_system_message(config.system_message);
        session.probe().await?;
        session.refresh_models().await?;
        session.refresh_running_models().await?;
        info!(server = %session.server_address(), models = session.available_models.len(), "session connected");
        Ok(session)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn server_address(&self) -> &str {
        self.transport.server_address()
    }

    /// `false` after [`set_server_address`](Self::set_server_address) pointed
    /// the session at a server that did not answer.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Re-points the session at another server.
    ///
    /// A malformed address is a validation error and changes nothing. If the
    /// new server does not answer, the session stays pointed at it and every
    /// server call fails with [`Error::Unavailable`] until an address that
    /// answers is set. An active model the new server does not list is
    /// dropped.
    #[instrument(level = "debug", skip(self))]
    pub async fn set_server_address(&mut self, address: &str) -> Result<()> {
        self.transport
            .set_server_address(address)
            .map_err(|e| Error::validation(e.to_string()))?;
        self.probe().await?;
        self.refresh_models().await?;
        self.refresh_running_models().await?;

        let missing = self
            .active_model
            .as_ref()
            .filter(|model| !self.available_models.iter().any(|m| &m.name == *model))
            .cloned();
        if let Some(model) = missing {
            warn!(%model, "active model is not available on the new server");
            self.reset_model();
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> u64 {
        self.transport.timeouts().read.as_secs()
    }

    pub fn write_timeout(&self) -> u64 {
        self.transport.timeouts().write.as_secs()
    }

    /// Read share of the per-request timeout. Requests time out after
    /// `read + write` seconds in total. Zero is rejected.
    pub fn set_read_timeout(&mut self, secs: u64) -> Result<()> {
        let read = timeout_secs("read", secs)?;
        let timeouts = self.transport.timeouts();
        self.transport.set_timeouts(Timeouts { read, ..timeouts });
        Ok(())
    }

    /// Write share of the per-request timeout. Requests time out after
    /// `read + write` seconds in total. Zero is rejected.
    pub fn set_write_timeout(&mut self, secs: u64) -> Result<()> {
        let write = timeout_secs("write", secs)?;
        let timeouts = self.transport.timeouts();
        self.transport.set_timeouts(Timeouts { write, ..timeouts });
        Ok(())
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Sets the system message sent with every query and chat request. An
    /// empty message, or the literal `"default"`, uses the model's own.
    pub fn set_system_message<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        self.system_message = if message == "default" { String::new() } else { message };
    }

    pub fn options(&self) -> &OptionsSet {
        &self.options
    }

    pub fn set_options(&mut self, options: OptionsSet) {
        self.options = options;
    }

    /// Sets one option, or removes it when `value` is `None`.
    pub fn set_option(&mut self, name: OptionName, value: Option<OptionValue>) -> Result<()> {
        self.options.assign(name, value)
    }

    pub fn keep_alive(&self) -> &str {
        &self.keep_alive
    }

    pub fn set_keep_alive<S: Into<String>>(&mut self, keep_alive: S) {
        self.keep_alive = keep_alive.into();
    }

    pub fn truncate(&self) -> bool {
        self.truncate
    }

    pub fn set_truncate(&mut self, truncate: bool) {
        self.truncate = truncate;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches between query, chat and embed requests. An embedding-only
    /// model cannot serve queries or chats.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if mode != Mode::Embed && self.is_embedding_only() {
            return Err(Error::not_ready(format!(
                "model '{}' only produces embeddings; load a completion model for {mode} mode",
                self.active_model.as_deref().unwrap_or_default()
            )));
        }
        debug!(from = %self.mode, to = %mode, "mode changed");
        self.mode = mode;
        Ok(())
    }

    pub fn active_model(&self) -> Option<&str> {
        self.active_model.as_deref()
    }

    /// Capabilities the server reported for the active model.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    pub fn thinking(&self) -> Option<Think> {
        self.thinking
    }

    /// Sets the `think` flag sent with queries and chats.
    ///
    /// Enabling thinking needs an active model with the `thinking`
    /// capability. Disabling it is always accepted; on a model without the
    /// capability the flag is simply left unset.
    pub fn set_thinking(&mut self, thinking: Option<Think>) -> Result<()> {
        match thinking {
            None => self.thinking = None,
            Some(think) if !self.has_capability(CAP_THINKING) => {
                if think.is_enabled() {
                    return Err(self.missing_capability(CAP_THINKING));
                }
                self.thinking = None;
            }
            Some(think) => self.thinking = Some(think),
        }
        Ok(())
    }

    pub fn tools(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref()
    }

    /// Offers `tools` to the model in chat requests. Needs an active model
    /// with the `tools` capability.
    pub fn set_tools<R: Into<ToolRegistry>>(&mut self, tools: R) -> Result<()> {
        if !self.has_capability(CAP_TOOLS) {
            return Err(self.missing_capability(CAP_TOOLS));
        }
        self.tools = Some(tools.into());
        Ok(())
    }

    pub fn clear_tools(&mut self) {
        self.tools = None;
    }

    /// Model names the server listed at the last refresh.
    pub fn available_models(&self) -> &[ModelEntry] {
        &self.available_models
    }

    /// Models the server held in memory at the last refresh.
    pub fn running_models(&self) -> &[RunningModelEntry] {
        &self.running_models
    }

    /// Sends a one-shot prompt to `/api/generate`. History is not involved.
    ///
    /// Images must all be files or all be base64 data.
    #[instrument(level = "debug", skip_all, fields(model = ?self.active_model))]
    pub async fn query<P: Into<String>>(&mut self, prompt: P, images: Vec<Image>) -> Result<QueryResponse> {
        self.ensure_connected()?;
        self.require_mode(Mode::Query)?;
        let model = self.require_model()?;
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt cannot be empty"));
        }
        validate_query_images(&images)?;
        let images = encode_images(&images).await?;

        let request = GenerateRequest {
            base: BaseRequest {
                options: self.options.to_wire(),
                keep_alive: Some(self.keep_alive.clone()),
                ..BaseRequest::new(model)
            },
            prompt,
            system: (!self.system_message.is_empty()).then(|| self.system_message.clone()),
            think: self.thinking,
            images: (!images.is_empty()).then_some(images),
        };

        let response = self.transport.generate(request).await.map_err(Error::inference)?;
        debug!(eval_count = ?response.stats.eval_count, "query answered");

        Ok(QueryResponse {
            text: response.response,
            thinking: response.thinking.filter(|t| self.thinking_enabled() && !t.is_empty()),
            stats: response.stats,
        })
    }

    /// Sends `prompt` with the whole history to `/api/chat`. The turn joins
    /// the history only if the server answers.
    #[instrument(level = "debug", skip_all, fields(model = ?self.active_model, turns = self.history.len()))]
    pub async fn chat<P: Into<String>>(&mut self, prompt: P, images: Vec<Image>) -> Result<AssistantReply> {
        self.ensure_connected()?;
        self.require_mode(Mode::Chat)?;
        self.require_model()?;
        let pending = Turn::user(prompt, images)?;
        self.exchange(pending).await
    }

    /// Feeds tool results back to the model as the next chat turn.
    #[instrument(level = "debug", skip_all, fields(model = ?self.active_model, outputs = outputs.len()))]
    pub async fn chat_tool_outputs(&mut self, outputs: Vec<ToolOutput>) -> Result<AssistantReply> {
        self.ensure_connected()?;
        self.require_mode(Mode::Chat)?;
        self.require_model()?;
        if self.tools.is_none() {
            return Err(Error::not_ready("no tools are set for this session"));
        }
        let pending = Turn::tool_outputs(outputs)?;
        self.exchange(pending).await
    }

    /// Runs the tool calls of `reply` through the session's tools.
    pub async fn call_tools(&self, reply: &AssistantReply) -> Result<Vec<ToolOutput>> {
        let Some(tools) = &self.tools else {
            return Err(Error::not_ready("no tools are set for this session"));
        };
        Ok(tools.dispatch(&reply.tool_calls).await?)
    }

    async fn exchange(&mut self, pending: Turn) -> Result<AssistantReply> {
        let model = self.require_model()?;
        let messages = self.history.to_messages(&self.system_message, Some(&pending)).await?;

        let request = ChatRequest {
            base: BaseRequest {
                options: self.options.to_wire(),
                keep_alive: Some(self.keep_alive.clone()),
                ..BaseRequest::new(model)
            },
            messages,
            think: self.thinking,
            tools: self.tools.as_ref().map(ToolRegistry::to_wire),
        };

        let response = self.transport.chat(request).await.map_err(Error::inference)?;

        let mut reply = AssistantReply::from(response.message);
        if !self.thinking_enabled() {
            reply.thinking = None;
        }
        debug!(tool_calls = reply.tool_calls.len(), "chat answered");
        self.history.push(pending.complete(reply.clone()));
        Ok(reply)
    }

    /// Embeds every input with the active model. `dimensions == 0` keeps the
    /// model's native vector length.
    #[instrument(level = "debug", skip_all, fields(model = ?self.active_model, inputs = inputs.len()))]
    pub async fn embed<S: AsRef<str>>(&mut self, inputs: &[S], dimensions: u32) -> Result<Vec<Vec<f64>>> {
        self.ensure_connected()?;
        self.require_mode(Mode::Embed)?;
        let model = self.require_model()?;
        if !self.has_capability(CAP_EMBEDDING) {
            return Err(self.missing_capability(CAP_EMBEDDING));
        }
        if inputs.is_empty() {
            return Err(Error::validation("at least one input is required"));
        }
        if inputs.iter().any(|i| i.as_ref().is_empty()) {
            return Err(Error::validation("embedding inputs cannot be empty"));
        }

        let request = EmbedRequest {
            model,
            input: inputs.iter().map(|i| i.as_ref().to_string()).collect(),
            dimensions: (dimensions > 0).then_some(dimensions),
            options: self.options.to_wire(),
            truncate: self.truncate,
            keep_alive: Some(self.keep_alive.clone()),
        };

        let response = self.transport.embed(request).await.map_err(Error::inference)?;
        if response.embeddings.len() != inputs.len() {
            return Err(Error::inference(TransportError::Incomplete(format!(
                "expected {} embeddings, the server returned {}",
                inputs.len(),
                response.embeddings.len()
            ))));
        }
        Ok(response.embeddings)
    }

    /// Loads a model into server memory and makes it the active model.
    ///
    /// Thinking is switched on for models that can think, unless the session
    /// is in [`Mode::Embed`]. Loading an embedding model switches the session
    /// to [`Mode::Embed`].
    #[instrument(level = "debug", skip_all, fields(model = field::Empty))]
    pub async fn load_model<M: Into<ModelRef>>(&mut self, model: M) -> Result<()> {
        self.ensure_connected()?;
        let name = model.into().resolve(&self.model_names())?;
        Span::current().record("model", name.as_str());

        self.thinking = None;
        self.tools = None;

        let loaded = match self.transport.load_model(&name).await {
            Ok(()) => self.transport.model_info(&name).await,
            Err(e) => Err(e),
        };
        let info = match loaded {
            Ok(info) => info,
            Err(e) => {
                self.reset_model();
                return Err(Error::management(e));
            }
        };

        self.active_model = Some(name);
        self.capabilities = info.capabilities;
        if self.has_capability(CAP_EMBEDDING) {
            self.mode = Mode::Embed;
        } else if self.mode != Mode::Embed && self.has_capability(CAP_THINKING) {
            self.thinking = Some(Think::Enabled(true));
        }
        info!(model = ?self.active_model, capabilities = ?self.capabilities, mode = %self.mode, "model loaded");
        Ok(())
    }

    /// Evicts a model from server memory.
    #[instrument(level = "debug", skip_all, fields(model = field::Empty))]
    pub async fn unload_model<M: Into<ModelRef>>(&mut self, model: M) -> Result<()> {
        self.ensure_connected()?;
        let name = model.into().resolve(&self.model_names())?;
        Span::current().record("model", name.as_str());
        self.transport.unload_model(&name).await.map_err(Error::management)?;
        self.forget_if_active(&name);
        self.refresh_running_models().await
    }

    /// Deletes a model from the server.
    #[instrument(level = "debug", skip_all, fields(model = field::Empty))]
    pub async fn delete_model<M: Into<ModelRef>>(&mut self, model: M) -> Result<()> {
        self.ensure_connected()?;
        let name = model.into().resolve(&self.model_names())?;
        Span::current().record("model", name.as_str());
        self.transport.delete_model(&name).await.map_err(Error::management)?;
        self.forget_if_active(&name);
        self.refresh_models().await
    }

    /// Downloads a model from the registry.
    #[instrument(level = "debug", skip(self))]
    pub async fn pull_model(&mut self, name: &str) -> Result<()> {
        self.ensure_connected()?;
        if name.trim().is_empty() {
            return Err(Error::validation("model name cannot be empty"));
        }
        self.transport.pull_model(name).await.map_err(Error::management)?;
        self.refresh_models().await
    }

    /// Copies `source` to a new model called `destination`.
    #[instrument(level = "debug", skip(self))]
    pub async fn copy_model(&mut self, source: &str, destination: &str) -> Result<()> {
        self.ensure_connected()?;
        if source.trim().is_empty() || destination.trim().is_empty() {
            return Err(Error::validation("source and destination model names cannot be empty"));
        }
        self.transport
            .copy_model(source, destination)
            .await
            .map_err(Error::management)?;
        self.refresh_models().await
    }

    /// Refreshes and returns the names of the models available on the server,
    /// in server order.
    pub async fn list_models(&mut self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        self.refresh_models().await?;
        Ok(self.model_names())
    }

    /// Refreshes and returns the names of the models loaded in memory.
    pub async fn list_running_models(&mut self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        self.refresh_running_models().await?;
        Ok(self.running_models.iter().map(|m| m.name.clone()).collect())
    }

    #[instrument(level = "debug", skip_all, fields(model = field::Empty))]
    pub async fn model_info<M: Into<ModelRef>>(&mut self, model: M) -> Result<ModelInfo> {
        self.ensure_connected()?;
        let name = model.into().resolve(&self.model_names())?;
        Span::current().record("model", name.as_str());
        let show = self.transport.model_info(&name).await.map_err(Error::management)?;
        let size_bytes = self
            .available_models
            .iter()
            .find(|m| m.name == name)
            .map_or(0, |m| m.size);

        Ok(ModelInfo {
            name,
            capabilities: show.capabilities,
            family: show.details.family,
            families: show.details.families,
            format: show.details.format,
            parameter_size: show.details.parameter_size,
            quantization: show.details.quantization_level,
            size_bytes,
            modified_at: show.modified_at,
        })
    }

    pub async fn server_version(&self) -> Result<String> {
        self.ensure_connected()?;
        self.transport.version().await.map_err(Error::management)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clear_history(&mut self, which: HistoryClear) -> Result<()> {
        self.history.clear(which)
    }

    pub fn save_history<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.history.save(path)
    }

    /// Replaces the history with one saved by
    /// [`save_history`](Self::save_history). Only in chat mode.
    pub fn load_history<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.require_mode(Mode::Chat)?;
        self.history = History::load(path)?;
        Ok(())
    }

    async fn probe(&mut self) -> Result<()> {
        self.connected = self.transport.is_running().await;
        if !self.connected {
            warn!(server = %self.server_address(), "server is not answering");
            return Err(Error::Unavailable(format!(
                "no Ollama server is answering at {}",
                self.server_address()
            )));
        }
        Ok(())
    }

    async fn refresh_models(&mut self) -> Result<()> {
        self.available_models = self.transport.list_models().await.map_err(Error::management)?;
        Ok(())
    }

    async fn refresh_running_models(&mut self) -> Result<()> {
        self.running_models = self
            .transport
            .list_running_models()
            .await
            .map_err(Error::management)?;
        Ok(())
    }

    fn model_names(&self) -> Vec<String> {
        self.available_models.iter().map(|m| m.name.clone()).collect()
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::Unavailable(format!(
                "no Ollama server is answering at {}; set a reachable server address",
                self.server_address()
            )));
        }
        Ok(())
    }

    fn require_mode(&self, mode: Mode) -> Result<()> {
        if self.mode != mode {
            return Err(Error::not_ready(format!(
                "this call needs {mode} mode but the session is in {} mode",
                self.mode
            )));
        }
        Ok(())
    }

    fn require_model(&self) -> Result<String> {
        self.active_model
            .clone()
            .ok_or_else(|| Error::not_ready("no model is loaded"))
    }

    fn missing_capability(&self, capability: &str) -> Error {
        match &self.active_model {
            Some(model) => Error::not_ready(format!("model '{model}' lacks the '{capability}' capability")),
            None => Error::not_ready(format!("load a model with the '{capability}' capability first")),
        }
    }

    fn is_embedding_only(&self) -> bool {
        self.has_capability(CAP_EMBEDDING) && !self.has_capability(CAP_COMPLETION)
    }

    fn thinking_enabled(&self) -> bool {
        self.thinking.is_some_and(Think::is_enabled)
    }

    fn forget_if_active(&mut self, name: &str) {
        if self.active_model.as_deref() == Some(name) {
            self.reset_model();
        }
    }

    fn reset_model(&mut self) {
        self.active_model = None;
        self.thinking = None;
        self.tools = None;
        self.capabilities.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use serde_json::json;

    use super::*;
    use crate::services::ollama::models::{Message, Role};
    use crate::session::mock::{chat_reply, embed_reply, generate_reply, MockTransport};
    use crate::session::think::ThinkLevel;
    use crate::tools::{Tool, ToolBuilder, ToolCall};

    const CHAT: &[&str] = &["completion", "tools", "thinking"];
    const PLAIN: &[&str] = &["completion"];
    const EMBED: &[&str] = &["embedding"];

    async fn session() -> Session<MockTransport> {
        let transport = MockTransport::with_models(&[
            ("qwen3", CHAT),
            ("llama3", PLAIN),
            ("nomic-embed", EMBED),
        ]);
        Session::with_transport(transport, SessionConfig::default()).await.unwrap()
    }

    fn adder(counter: Arc<AtomicUsize>) -> Tool {
        ToolBuilder::new()
            .function_name("add")
            .function_description("adds two numbers")
            .add_parameter("a", "number", "left")
            .add_parameter("b", "number", "right")
            .handler(move |args| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
                }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn connect_fails_when_server_is_down() {
        let transport = MockTransport::with_models(&[]);
        transport.state().down.push(transport.server_address().to_string());
        let err = Session::with_transport(transport, SessionConfig::default()).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[tokio::test]
    async fn connect_fetches_model_lists_and_applies_config() {
        let config = SessionConfig {
            read_timeout: 20,
            write_timeout: 10,
            system_message: "default".into(),
            ..Default::default()
        };
        let transport = MockTransport::with_models(&[("llama3", PLAIN)]);
        let s = Session::with_transport(transport, config).await.unwrap();
        assert_eq!(s.available_models().len(), 1);
        assert_eq!(s.read_timeout(), 20);
        assert_eq!(s.write_timeout(), 10);
        assert_eq!(s.system_message(), "");
        assert_eq!(s.active_model(), None);
        assert_eq!(s.mode(), Mode::Query);
    }

    #[tokio::test]
    async fn load_by_index_is_one_based() {
        let mut s = session().await;
        s.load_model(2usize).await.unwrap();
        assert_eq!(s.active_model(), Some("llama3"));

        let err = s.load_model(4usize).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(s.active_model(), Some("llama3"), "rejected load leaves state alone");
    }

    #[tokio::test]
    async fn thinking_follows_capabilities_on_load() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        assert_eq!(s.thinking(), Some(Think::Enabled(true)));

        s.load_model("llama3").await.unwrap();
        assert_eq!(s.thinking(), None);
        assert!(matches!(s.set_thinking(Some(Think::Enabled(true))), Err(Error::NotReady(_))));
        s.set_thinking(Some(Think::Enabled(false))).unwrap();
        assert_eq!(s.thinking(), None);
    }

    #[tokio::test]
    async fn embedding_model_forces_embed_mode() {
        let mut s = session().await;
        s.load_model("nomic-embed").await.unwrap();
        assert_eq!(s.mode(), Mode::Embed);
        assert_eq!(s.thinking(), None);
        assert!(matches!(s.set_mode(Mode::Chat), Err(Error::NotReady(_))));
        assert!(matches!(s.set_mode(Mode::Query), Err(Error::NotReady(_))));
        assert_eq!(s.mode(), Mode::Embed);
    }

    #[tokio::test]
    async fn embed_mode_keeps_thinking_off_for_thinking_models() {
        let mut s = session().await;
        s.set_mode(Mode::Embed).unwrap();
        s.load_model("qwen3").await.unwrap();
        assert_eq!(s.mode(), Mode::Embed);
        assert_eq!(s.thinking(), None);

        let mut s = session().await;
        s.load_model("nomic-embed").await.unwrap();
        s.load_model("qwen3").await.unwrap();
        assert_eq!(s.mode(), Mode::Embed);
        assert_eq!(s.thinking(), None);

        s.set_mode(Mode::Chat).unwrap();
        s.load_model("qwen3").await.unwrap();
        assert_eq!(s.thinking(), Some(Think::Enabled(true)));
    }

    #[tokio::test]
    async fn list_models_is_idempotent() {
        let mut s = session().await;
        let first = s.list_models().await.unwrap();
        let second = s.list_models().await.unwrap();
        assert_eq!(first, vec!["qwen3", "llama3", "nomic-embed"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failed_load_resets_model_state() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        s.set_tools(adder(Arc::default())).unwrap();

        s.transport().state().fail_load = true;
        let err = s.load_model("llama3").await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert_eq!(s.active_model(), None);
        assert_eq!(s.thinking(), None);
        assert!(s.tools().is_none());
        assert!(s.capabilities().is_empty());
    }

    #[tokio::test]
    async fn tools_need_the_capability() {
        let mut s = session().await;
        assert!(matches!(s.set_tools(adder(Arc::default())), Err(Error::NotReady(_))));
        s.load_model("llama3").await.unwrap();
        assert!(matches!(s.set_tools(adder(Arc::default())), Err(Error::NotReady(_))));
        s.load_model("qwen3").await.unwrap();
        s.set_tools(adder(Arc::default())).unwrap();
        assert_eq!(s.tools().map(ToolRegistry::len), Some(1));

        s.load_model("qwen3").await.unwrap();
        assert!(s.tools().is_none(), "switching models clears tools");
    }

    #[tokio::test]
    async fn query_requires_model_and_mode() {
        let mut s = session().await;
        assert!(matches!(s.query("hi", vec![]).await, Err(Error::NotReady(_))));

        s.load_model("llama3").await.unwrap();
        s.set_mode(Mode::Chat).unwrap();
        assert!(matches!(s.query("hi", vec![]).await, Err(Error::NotReady(_))));

        s.set_mode(Mode::Query).unwrap();
        assert!(matches!(s.query("  ", vec![]).await, Err(Error::Validation(_))));
        let mixed = vec![Image::file("a.png"), Image::base64("QUJD")];
        assert!(matches!(s.query("hi", mixed).await, Err(Error::Validation(_))));
        assert!(s.transport().state().generate_requests.is_empty());
    }

    #[tokio::test]
    async fn query_sends_options_system_and_think() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        s.set_system_message("be terse");
        s.set_option(OptionName::Temperature, Some(0.2.into())).unwrap();
        s.set_thinking(Some(Think::Level(ThinkLevel::High))).unwrap();
        s.transport()
            .state()
            .generate_replies
            .push_back(Ok(generate_reply("blue", Some("rayleigh"))));

        let answer = s.query("sky colour?", vec![Image::base64("QUJD")]).await.unwrap();
        assert_eq!(answer.text, "blue");
        assert_eq!(answer.thinking.as_deref(), Some("rayleigh"));

        let state = s.transport().state();
        let request = &state.generate_requests[0];
        assert_eq!(request.base.model, "qwen3");
        assert!(!request.base.stream);
        assert_eq!(request.system.as_deref(), Some("be terse"));
        assert_eq!(request.think, Some(Think::Level(ThinkLevel::High)));
        assert_eq!(request.images, Some(vec!["QUJD".to_string()]));
        assert_eq!(request.base.options.as_ref().unwrap()["temperature"], json!(0.2));
        assert_eq!(request.base.keep_alive.as_deref(), Some("5m"));
        drop(state);
        assert!(s.history().is_empty(), "queries never touch the history");
    }

    #[tokio::test]
    async fn thinking_text_is_hidden_when_disabled() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        s.set_thinking(Some(Think::Enabled(false))).unwrap();
        s.transport()
            .state()
            .generate_replies
            .push_back(Ok(generate_reply("ok", Some("hmm"))));
        let answer = s.query("hi", vec![]).await.unwrap();
        assert_eq!(answer.thinking, None);
    }

    #[tokio::test]
    async fn inference_failures_carry_the_timeout_hint() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.transport().state().generate_replies.push_back(Err(TransportError::Api {
            status: 500,
            message: "boom".into(),
        }));
        match s.query("hi", vec![]).await.unwrap_err() {
            Error::Remote(remote) => assert!(remote.hint.is_some()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_sends_history_and_appends_on_success() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.set_mode(Mode::Chat).unwrap();
        s.set_system_message("you are kind");
        {
            let mut state = s.transport().state();
            state.chat_replies.push_back(Ok(chat_reply(Message::assistant("hello Ada"))));
            state.chat_replies.push_back(Ok(chat_reply(Message::assistant("Ada"))));
        }

        s.chat("I'm Ada", vec![]).await.unwrap();
        let reply = s.chat("my name?", vec![]).await.unwrap();
        assert_eq!(reply.content, "Ada");
        assert_eq!(s.history().len(), 2);

        let state = s.transport().state();
        let second = &state.chat_requests[1];
        let roles: Vec<Role> = second.messages.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(second.base.keep_alive.as_deref(), Some("5m"));
        assert!(second.tools.is_none());
    }

    #[tokio::test]
    async fn failed_chat_leaves_history_unchanged() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.set_mode(Mode::Chat).unwrap();
        {
            let mut state = s.transport().state();
            state.chat_replies.push_back(Ok(chat_reply(Message::assistant("first"))));
            state
                .chat_replies
                .push_back(Err(TransportError::Timeout("operation timed out".into())));
        }
        s.chat("one", vec![]).await.unwrap();
        let before = s.history().clone();

        assert!(matches!(s.chat("two", vec![]).await, Err(Error::Remote(_))));
        assert_eq!(s.history(), &before);
        assert!(matches!(s.chat("", vec![]).await, Err(Error::Validation(_))));
        assert_eq!(s.history(), &before);
    }

    #[tokio::test]
    async fn tool_round_trip() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        s.set_mode(Mode::Chat).unwrap();
        s.set_tools(adder(counter.clone())).unwrap();

        let mut call = Message::assistant("");
        call.tool_calls = Some(vec![ToolCall::new("add", json!({"a": 2, "b": 3}))]);
        {
            let mut state = s.transport().state();
            state.chat_replies.push_back(Ok(chat_reply(call)));
            state.chat_replies.push_back(Ok(chat_reply(Message::assistant("2 + 3 = 5"))));
        }

        let reply = s.chat("what is 2 + 3?", vec![]).await.unwrap();
        assert!(reply.has_tool_calls());
        let outputs = s.call_tools(&reply).await.unwrap();
        assert_eq!(outputs, vec![ToolOutput::new("5", "add")]);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let answer = s.chat_tool_outputs(outputs).await.unwrap();
        assert_eq!(answer.content, "2 + 3 = 5");
        assert_eq!(s.history().len(), 2);

        let state = s.transport().state();
        let last = &state.chat_requests[1];
        assert_eq!(last.tools.as_ref().map(Vec::len), Some(1));
        let tool_message = last.messages.last().unwrap();
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.content, "5");
        assert_eq!(tool_message.tool_name.as_deref(), Some("add"));
    }

    #[tokio::test]
    async fn unknown_tool_calls_are_reported() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        s.set_tools(adder(Arc::default())).unwrap();
        let reply = AssistantReply {
            tool_calls: vec![ToolCall::new("mul", json!({"a": 1, "b": 2}))],
            ..Default::default()
        };
        assert!(matches!(s.call_tools(&reply).await, Err(Error::UnknownTool(name)) if name == "mul"));
    }

    #[tokio::test]
    async fn embed_returns_one_vector_per_input() {
        let mut s = session().await;
        s.load_model("nomic-embed").await.unwrap();
        s.transport()
            .state()
            .embed_replies
            .push_back(Ok(embed_reply(vec![vec![0.1, 0.2], vec![0.3, 0.4]])));

        let vectors = s.embed(&["a", "b"], 0).await.unwrap();
        assert_eq!(vectors.len(), 2);

        let state = s.transport().state();
        assert_eq!(state.embed_requests[0].dimensions, None);
        assert!(state.embed_requests[0].truncate);
    }

    #[tokio::test]
    async fn embed_validates_inputs_and_reply_length() {
        let mut s = session().await;
        s.load_model("nomic-embed").await.unwrap();
        assert!(matches!(s.embed::<&str>(&[], 0).await, Err(Error::Validation(_))));
        assert!(matches!(s.embed(&["a", ""], 0).await, Err(Error::Validation(_))));

        s.transport()
            .state()
            .embed_replies
            .push_back(Ok(embed_reply(vec![vec![0.1]])));
        assert!(matches!(s.embed(&["a", "b"], 8).await, Err(Error::Remote(_))));
        assert_eq!(s.transport().state().embed_requests[0].dimensions, Some(8));
    }

    #[tokio::test]
    async fn embed_needs_an_embedding_model() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.set_mode(Mode::Embed).unwrap();
        assert!(matches!(s.embed(&["a"], 0).await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn unload_and_delete_forget_the_active_model() {
        let mut s = session().await;
        s.load_model("qwen3").await.unwrap();
        assert_eq!(s.list_running_models().await.unwrap(), vec!["qwen3"]);

        s.unload_model("qwen3").await.unwrap();
        assert_eq!(s.active_model(), None);
        assert_eq!(s.thinking(), None);
        assert!(s.running_models().is_empty());

        s.load_model("llama3").await.unwrap();
        s.delete_model(1usize).await.unwrap();
        assert_eq!(s.active_model(), Some("llama3"), "deleting another model keeps the active one");
        assert_eq!(s.list_models().await.unwrap(), vec!["llama3", "nomic-embed"]);
    }

    #[tokio::test]
    async fn pull_and_copy_refresh_the_listing() {
        let mut s = session().await;
        s.pull_model("phi4").await.unwrap();
        s.copy_model("phi4", "phi4-copy").await.unwrap();
        let names: Vec<&str> = s.available_models().iter().map(|m| m.name.as_str()).collect();
        assert!(names.ends_with(&["phi4", "phi4-copy"]));
        assert!(matches!(s.pull_model(" ").await, Err(Error::Validation(_))));
        assert!(matches!(s.copy_model("phi4", "").await, Err(Error::Validation(_))));
        assert_eq!(s.transport().state().calls, vec!["pull:phi4", "copy:phi4:phi4-copy"]);
    }

    #[tokio::test]
    async fn model_info_combines_show_and_listing() {
        let mut s = session().await;
        let info = s.model_info("qwen3").await.unwrap();
        assert_eq!(info.name, "qwen3");
        assert_eq!(info.capabilities, vec!["completion", "tools", "thinking"]);
        assert_eq!(info.size_bytes, 1_000);
        assert_eq!(info.quantization, "Q4_K_M");
        assert_eq!(s.server_version().await.unwrap(), "0.9.0");
    }

    #[tokio::test]
    async fn unreachable_address_disconnects_until_fixed() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.transport().state().down.push("http://10.0.0.9:11434".into());

        assert!(matches!(s.set_server_address("ftp://x").await, Err(Error::Validation(_))));
        assert!(s.is_connected());

        let err = s.set_server_address("http://10.0.0.9:11434").await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
        assert!(!s.is_connected());
        assert!(matches!(s.list_models().await, Err(Error::Unavailable(_))));
        assert!(matches!(s.query("hi", vec![]).await, Err(Error::Unavailable(_))));

        s.set_server_address("http://localhost:11434").await.unwrap();
        assert!(s.is_connected());
        assert_eq!(s.active_model(), Some("llama3"));
    }

    #[tokio::test]
    async fn timeouts_reject_zero() {
        let mut s = session().await;
        assert!(matches!(s.set_read_timeout(0), Err(Error::Validation(_))));
        assert!(matches!(s.set_write_timeout(0), Err(Error::Validation(_))));
        s.set_read_timeout(30).unwrap();
        assert_eq!(s.read_timeout(), 30);
        assert_eq!(s.write_timeout(), 300);
    }

    #[tokio::test]
    async fn history_can_be_saved_and_reloaded_in_chat_mode() {
        let mut s = session().await;
        s.load_model("llama3").await.unwrap();
        s.set_mode(Mode::Chat).unwrap();
        s.transport()
            .state()
            .chat_replies
            .push_back(Ok(chat_reply(Message::assistant("hey"))));
        s.chat("hi", vec![]).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        s.save_history(&path).unwrap();
        s.clear_history(HistoryClear::All).unwrap();
        assert!(s.history().is_empty());

        s.load_history(&path).unwrap();
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history().turns()[0].assistant_text(), Some("hey"));

        s.set_mode(Mode::Query).unwrap();
        assert!(matches!(s.load_history(&path), Err(Error::NotReady(_))));
    }
}
