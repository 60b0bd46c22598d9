use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Reasoning effort for models that accept graded thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkLevel {
    Low,
    Medium,
    High,
}

/// The `think` flag of generate and chat requests: a plain switch, or a level
/// for models that grade their reasoning effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Think {
    Enabled(bool),
    Level(ThinkLevel),
}

impl Think {
    /// Whether the server will produce a reasoning trace.
    pub fn is_enabled(self) -> bool {
        !matches!(self, Think::Enabled(false))
    }
}

impl From<bool> for Think {
    fn from(enabled: bool) -> Self {
        Think::Enabled(enabled)
    }
}

impl From<ThinkLevel> for Think {
    fn from(level: ThinkLevel) -> Self {
        Think::Level(level)
    }
}

impl FromStr for Think {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Think::Enabled(true)),
            "false" => Ok(Think::Enabled(false)),
            "low" => Ok(Think::Level(ThinkLevel::Low)),
            "medium" => Ok(Think::Level(ThinkLevel::Medium)),
            "high" => Ok(Think::Level(ThinkLevel::High)),
            other => Err(Error::validation(format!(
                "thinking must be true, false, low, medium or high, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Think {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Think::Enabled(b) => write!(f, "{b}"),
            Think::Level(ThinkLevel::Low) => f.write_str("low"),
            Think::Level(ThinkLevel::Medium) => f.write_str("medium"),
            Think::Level(ThinkLevel::High) => f.write_str("high"),
        }
    }
}
