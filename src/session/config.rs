use std::{env, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::options::OptionsSet;
use crate::services::ollama::{Timeouts, DEFAULT_SERVER_ADDRESS};

use super::error::{Error, Result};

/// Environment variable naming the server, as the Ollama CLI reads it.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// Which kind of request a session issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One-shot completions through `/api/generate`.
    #[default]
    Query,
    /// Multi-turn conversation through `/api/chat`.
    Chat,
    /// Vector embeddings through `/api/embed`.
    Embed,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Query => "query",
            Mode::Chat => "chat",
            Mode::Embed => "embed",
        })
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Mode::Query),
            "chat" => Ok(Mode::Chat),
            "embed" => Ok(Mode::Embed),
            other => Err(Error::validation(format!(
                "mode must be query, chat or embed, got '{other}'"
            ))),
        }
    }
}

/// Everything a session is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the server.
    pub server_address: String,
    /// Read share of the per-request timeout. A request times out after
    /// `read_timeout + write_timeout` seconds in total.
    pub read_timeout: u64,
    /// Write share of the per-request timeout.
    pub write_timeout: u64,
    pub mode: Mode,
    /// Empty means the model's own default system prompt.
    pub system_message: String,
    pub options: OptionsSet,
    /// How long the server keeps the model loaded after a query, chat or
    /// embed request, in Ollama duration syntax.
    pub keep_alive: String,
    /// Whether over-long embedding inputs are truncated instead of rejected.
    pub truncate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.into(),
            read_timeout: timeouts.read.as_secs(),
            write_timeout: timeouts.write.as_secs(),
            mode: Mode::default(),
            system_message: String::new(),
            options: OptionsSet::default(),
            keep_alive: "5m".into(),
            truncate: true,
        }
    }
}

impl SessionConfig {
    /// The defaults, with the server address taken from `OLLAMA_HOST` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = env::var(OLLAMA_HOST_ENV) {
            if !host.trim().is_empty() {
                config.server_address = host_to_address(&host);
            }
        }
        config
    }

    /// Checks the timeouts and converts them for the transport.
    pub fn timeouts(&self) -> Result<Timeouts> {
        Ok(Timeouts {
            read: timeout_secs("read", self.read_timeout)?,
            write: timeout_secs("write", self.write_timeout)?,
        })
    }
}

pub(crate) fn timeout_secs(which: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::validation(format!("the {which} timeout must be at least one second")));
    }
    Ok(Duration::from_secs(secs))
}

/// `OLLAMA_HOST` may omit the scheme (`127.0.0.1:11434`).
fn host_to_address(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
