use std::fmt;

use super::error::{Error, Result};

/// Identifies a model either by name or by its 1-based position in the
/// server's model listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    Name(String),
    Index(usize),
}

impl ModelRef {
    /// Resolves against `available`, the server's model names in listing order.
    pub fn resolve(&self, available: &[String]) -> Result<String> {
        match self {
            ModelRef::Name(name) if name.trim().is_empty() => {
                Err(Error::validation("model name cannot be empty"))
            }
            ModelRef::Name(name) => available
                .iter()
                .find(|m| *m == name)
                .cloned()
                .ok_or_else(|| Error::validation(format!("model '{name}' is not available on the server"))),
            ModelRef::Index(index) => index
                .checked_sub(1)
                .and_then(|i| available.get(i))
                .cloned()
                .ok_or_else(|| {
                    Error::validation(format!(
                        "model index {index} is out of range; {} models are available",
                        available.len()
                    ))
                }),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Name(name) => f.write_str(name),
            ModelRef::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        ModelRef::Name(name.to_string())
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        ModelRef::Name(name)
    }
}

impl From<&String> for ModelRef {
    fn from(name: &String) -> Self {
        ModelRef::Name(name.clone())
    }
}

impl From<usize> for ModelRef {
    fn from(index: usize) -> Self {
        ModelRef::Index(index)
    }
}
