use crate::options::{OptionName, OptionValue};
use crate::services::ollama::{OllamaClient, Transport};
use crate::tools::{Tool, ToolRegistry};

use super::config::{Mode, SessionConfig};
use super::error::{Error, Result};
use super::model_ref::ModelRef;
use super::session::Session;
use super::think::Think;

/// A builder for [`Session`].
///
/// Collects the connection settings, the model to load and the per-model
/// settings (thinking, tools) that can only be applied once the model's
/// capabilities are known.
///
/// ```no_run
/// use ollama_session::{Mode, SessionBuilder};
///
/// async {
///     let mut session = SessionBuilder::default()
///         .set_server_address("http://localhost:11434")
///         .set_model("qwen3:0.6b")
///         .set_mode(Mode::Chat)
///         .set_system_message("You are a helpful assistant.")
///         .set_temperature(0.6)
///         .set_num_ctx(2048)
///         .build()
///         .await?;
///     let reply = session.chat("Hello!", vec![]).await?;
///     Ok::<_, ollama_session::Error>(())
/// };
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    /// Option assignments, validated at build time
    options: Vec<(OptionName, OptionValue)>,
    /// Model loaded right after connecting
    model: Option<ModelRef>,
    /// Mode applied after the model is loaded
    mode: Option<Mode>,
    /// Thinking override applied after the model is loaded
    thinking: Option<Think>,
    /// Tools offered to the model, registered after the model is loaded
    tools: Vec<Tool>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration instead of the defaults.
    pub fn import_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_server_address<T: Into<String>>(mut self, address: T) -> Self {
        self.config.server_address = address.into();
        self
    }

    pub fn set_read_timeout(mut self, secs: u64) -> Self {
        self.config.read_timeout = secs;
        self
    }

    pub fn set_write_timeout(mut self, secs: u64) -> Self {
        self.config.write_timeout = secs;
        self
    }

    pub fn set_model<M: Into<ModelRef>>(mut self, model: M) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn set_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn set_system_message<T: Into<String>>(mut self, message: T) -> Self {
        self.config.system_message = message.into();
        self
    }

    pub fn set_keep_alive<T: Into<String>>(mut self, keep_alive: T) -> Self {
        self.config.keep_alive = keep_alive.into();
        self
    }

    pub fn set_truncate(mut self, truncate: bool) -> Self {
        self.config.truncate = truncate;
        self
    }

    pub fn set_thinking<T: Into<Think>>(mut self, thinking: T) -> Self {
        self.thinking = Some(thinking.into());
        self
    }

    pub fn set_option<V: Into<OptionValue>>(mut self, name: OptionName, value: V) -> Self {
        self.options.push((name, value.into()));
        self
    }

    pub fn set_temperature(self, v: f32) -> Self {
        self.set_option(OptionName::Temperature, v)
    }

    pub fn set_top_p(self, v: f32) -> Self {
        self.set_option(OptionName::TopP, v)
    }

    pub fn set_top_k(self, v: u32) -> Self {
        self.set_option(OptionName::TopK, v)
    }

    pub fn set_num_ctx(self, v: u32) -> Self {
        self.set_option(OptionName::NumCtx, v)
    }

    pub fn set_num_predict(self, v: u32) -> Self {
        self.set_option(OptionName::NumPredict, v)
    }

    pub fn set_repeat_penalty(self, v: f32) -> Self {
        self.set_option(OptionName::RepeatPenalty, v)
    }

    pub fn set_seed(self, v: u32) -> Self {
        self.set_option(OptionName::Seed, v)
    }

    pub fn add_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Connects over HTTP and applies every setting.
    pub async fn build(self) -> Result<Session<OllamaClient>> {
        let timeouts = self.checked_config()?.timeouts()?;
        let client = OllamaClient::new(&self.config.server_address, timeouts)
            .map_err(|e| Error::validation(e.to_string()))?;
        self.build_with_transport(client).await
    }

    /// Like [`build`](Self::build) over a caller-supplied transport.
    pub async fn build_with_transport<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let config = self.checked_config()?;
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(ToolRegistry::new(self.tools).map_err(|e| Error::validation(e.to_string()))?)
        };

        let mut session = Session::with_transport(transport, config).await?;
        if let Some(model) = self.model {
            session.load_model(model).await?;
        }
        if let Some(mode) = self.mode {
            session.set_mode(mode)?;
        }
        if let Some(thinking) = self.thinking {
            session.set_thinking(Some(thinking))?;
        }
        if let Some(tools) = tools {
            session.set_tools(tools)?;
        }
        Ok(session)
    }

    /// The configuration with every queued option validated into it.
    fn checked_config(&self) -> Result<SessionConfig> {
        let mut config = self.config.clone();
        for (name, value) in &self.options {
            config.options.set(*name, *value)?;
        }
        config.timeouts()?;
        Ok(config)
    }
}
