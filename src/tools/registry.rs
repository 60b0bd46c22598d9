use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use super::errors::{ToolExecutionError, ToolRegistryError};
use super::tool::{Tool, ToolCall, ToolOutput};

/// Tools available to a chat session, keyed by unique name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Builds a registry, failing if two tools share a name.
    pub fn new<I>(tools: I) -> Result<Self, ToolRegistryError>
    where
        I: IntoIterator<Item = Tool>,
    {
        let mut registry = Self::default();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), ToolRegistryError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolRegistryError::DuplicateTool(tool.name.clone()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions for a chat request.
    pub fn to_wire(&self) -> Vec<Value> {
        self.tools.iter().map(Tool::to_wire).collect()
    }

    /// Runs every call in payload order and collects their outputs.
    ///
    /// All names are resolved before any handle runs, so an unknown tool
    /// aborts the whole batch without side effects. A call whose argument keys
    /// differ from the tool's declared parameters is skipped and contributes
    /// no output.
    #[instrument(level = "debug", skip_all, fields(calls = calls.len()))]
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Result<Vec<ToolOutput>, ToolExecutionError> {
        let resolved = calls
            .iter()
            .map(|call| {
                self.get(&call.function.name)
                    .map(|tool| (tool, call))
                    .ok_or_else(|| ToolExecutionError::ToolNotFound(call.function.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(resolved.len());
        for (tool, call) in resolved {
            let arguments = argument_map(&call.function.arguments)?;
            let Some(args) = tool.positional_arguments(&arguments) else {
                warn!(
                    target: "tool",
                    tool = %tool.name,
                    expected = ?tool.parameter_names().collect::<Vec<_>>(),
                    received = ?arguments.keys().collect::<Vec<_>>(),
                    "tool call arguments do not match declared parameters; skipping",
                );
                continue;
            };

            info!(target: "tool", tool = %tool.name, args = ?args, "executing tool call");
            let result = tool.invoke(args).await?;
            outputs.push(ToolOutput::new(stringify(result), tool.name.clone()));
        }
        Ok(outputs)
    }

    /// Like [`dispatch`](Self::dispatch) for a JSON-encoded payload: a single
    /// tool call object, an array of them, or a message carrying `tool_calls`.
    pub async fn dispatch_json(&self, payload: &str) -> Result<Vec<ToolOutput>, ToolExecutionError> {
        let calls = parse_tool_calls(payload)?;
        self.dispatch(&calls).await
    }
}

impl From<Tool> for ToolRegistry {
    fn from(tool: Tool) -> Self {
        Self { tools: vec![tool] }
    }
}

impl TryFrom<Vec<Tool>> for ToolRegistry {
    type Error = ToolRegistryError;

    fn try_from(tools: Vec<Tool>) -> Result<Self, Self::Error> {
        Self::new(tools)
    }
}

/// Decodes the tool calls contained in a JSON payload.
pub fn parse_tool_calls(payload: &str) -> Result<Vec<ToolCall>, ToolExecutionError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ToolExecutionError::ArgumentParsingError(format!("invalid tool call JSON: {e}")))?;

    let calls = match value {
        Value::Object(mut obj) if obj.contains_key("tool_calls") => {
            obj.remove("tool_calls").unwrap_or(Value::Null)
        }
        Value::Object(obj) => Value::Array(vec![Value::Object(obj)]),
        other => other,
    };

    serde_json::from_value(calls)
        .map_err(|e| ToolExecutionError::ArgumentParsingError(format!("malformed tool call: {e}")))
}

fn argument_map(arguments: &Value) -> Result<Map<String, Value>, ToolExecutionError> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ToolExecutionError::ArgumentParsingError(format!(
                "tool arguments are not a JSON object: {encoded}"
            ))),
        },
        other => Err(ToolExecutionError::ArgumentParsingError(format!(
            "tool arguments are not a JSON object: {other}"
        ))),
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
