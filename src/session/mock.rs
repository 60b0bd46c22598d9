//! Scripted in-memory transport for session tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::services::ollama::models::{
    ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse,
    InferenceStats, Message, ModelDetails, ModelEntry, RunningModelEntry, ShowResponse,
    TransportError,
};
use crate::services::ollama::{Timeouts, Transport, DEFAULT_SERVER_ADDRESS};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    /// Addresses whose probe fails.
    pub down: Vec<String>,
    pub models: Vec<ModelEntry>,
    pub running: Vec<RunningModelEntry>,
    pub capabilities: HashMap<String, Vec<String>>,
    pub fail_load: bool,
    pub generate_replies: VecDeque<Result<GenerateResponse, TransportError>>,
    pub chat_replies: VecDeque<Result<ChatResponse, TransportError>>,
    pub embed_replies: VecDeque<Result<EmbedResponse, TransportError>>,
    pub generate_requests: Vec<GenerateRequest>,
    pub chat_requests: Vec<ChatRequest>,
    pub embed_requests: Vec<EmbedRequest>,
    /// Management calls in order, e.g. `load:llama3`.
    pub calls: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct MockTransport {
    address: String,
    timeouts: Timeouts,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport serving `models`, each with the given capabilities.
    pub fn with_models(models: &[(&str, &[&str])]) -> Self {
        let mut state = MockState::default();
        for (name, caps) in models {
            state.models.push(model_entry(name));
            state
                .capabilities
                .insert(name.to_string(), caps.iter().map(|c| c.to_string()).collect());
        }
        Self {
            address: DEFAULT_SERVER_ADDRESS.into(),
            timeouts: Timeouts::default(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

pub(crate) fn model_entry(name: &str) -> ModelEntry {
    ModelEntry {
        name: name.into(),
        model: name.into(),
        modified_at: "2025-05-01T10:00:00Z".into(),
        size: 1_000,
        digest: format!("sha256:{name}"),
        details: ModelDetails {
            format: "gguf".into(),
            family: "llama".into(),
            parameter_size: "8B".into(),
            quantization_level: "Q4_K_M".into(),
            ..Default::default()
        },
    }
}

pub(crate) fn generate_reply(text: &str, thinking: Option<&str>) -> GenerateResponse {
    GenerateResponse {
        model: "m".into(),
        created_at: String::new(),
        response: text.into(),
        thinking: thinking.map(Into::into),
        done: true,
        stats: InferenceStats { eval_count: Some(3), ..Default::default() },
    }
}

pub(crate) fn chat_reply(message: Message) -> ChatResponse {
    ChatResponse {
        model: "m".into(),
        created_at: String::new(),
        message,
        done: true,
        stats: InferenceStats::default(),
    }
}

pub(crate) fn embed_reply(vectors: Vec<Vec<f64>>) -> EmbedResponse {
    EmbedResponse {
        model: "m".into(),
        embeddings: vectors,
        total_duration: None,
        load_duration: None,
        prompt_eval_count: None,
    }
}

fn scripted<R>(queue: &mut VecDeque<Result<R, TransportError>>) -> Result<R, TransportError> {
    queue
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into())))
}

#[async_trait]
impl Transport for MockTransport {
    fn server_address(&self) -> &str {
        &self.address
    }

    fn set_server_address(&mut self, address: &str) -> Result<(), TransportError> {
        if !address.starts_with("http") {
            return Err(TransportError::Request(format!("invalid server address '{address}'")));
        }
        self.address = address.into();
        Ok(())
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    async fn is_running(&self) -> bool {
        !self.state().down.contains(&self.address)
    }

    async fn version(&self) -> Result<String, TransportError> {
        Ok("0.9.0".into())
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, TransportError> {
        Ok(self.state().models.clone())
    }

    async fn list_running_models(&self) -> Result<Vec<RunningModelEntry>, TransportError> {
        Ok(self.state().running.clone())
    }

    async fn model_info(&self, model: &str) -> Result<ShowResponse, TransportError> {
        let state = self.state();
        let capabilities = state.capabilities.get(model).cloned().ok_or_else(|| {
            TransportError::Api { status: 404, message: format!("model '{model}' not found") }
        })?;
        Ok(ShowResponse {
            capabilities,
            details: model_entry(model).details,
            modified_at: "2025-05-01T10:00:00Z".into(),
            ..Default::default()
        })
    }

    async fn load_model(&self, model: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(format!("load:{model}"));
        if state.fail_load {
            return Err(TransportError::Api { status: 500, message: "out of memory".into() });
        }
        state.running.push(RunningModelEntry {
            name: model.into(),
            model: model.into(),
            size: 1_000,
            digest: String::new(),
            details: ModelDetails::default(),
            expires_at: String::new(),
            size_vram: 1_000,
        });
        Ok(())
    }

    async fn unload_model(&self, model: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(format!("unload:{model}"));
        state.running.retain(|m| m.name != model);
        Ok(())
    }

    async fn pull_model(&self, model: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(format!("pull:{model}"));
        state.models.push(model_entry(model));
        state.capabilities.insert(model.into(), vec!["completion".into()]);
        Ok(())
    }

    async fn copy_model(&self, source: &str, destination: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(format!("copy:{source}:{destination}"));
        let caps = state.capabilities.get(source).cloned().unwrap_or_default();
        state.models.push(model_entry(destination));
        state.capabilities.insert(destination.into(), caps);
        Ok(())
    }

    async fn delete_model(&self, model: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        state.calls.push(format!("delete:{model}"));
        state.models.retain(|m| m.name != model);
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, TransportError> {
        let mut state = self.state();
        state.generate_requests.push(request);
        scripted(&mut state.generate_replies)
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        let mut state = self.state();
        state.chat_requests.push(request);
        scripted(&mut state.chat_replies)
    }

    async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse, TransportError> {
        let mut state = self.state();
        state.embed_requests.push(request);
        scripted(&mut state.embed_replies)
    }
}
