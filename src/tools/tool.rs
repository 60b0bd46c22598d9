use std::{fmt, future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::errors::ToolExecutionError;

/// Defines the type of tool available. Currently, only 'function' is supported.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Function,
}

/// Signature of a tool handle.
///
/// Receives the call's arguments positionally, in the order the tool declares
/// its parameters, and produces a JSON result or a [`ToolExecutionError`].
pub type ToolFn =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, ToolExecutionError>> + Send + Sync>;

/// Wraps an async closure into a [`ToolFn`].
pub fn tool_fn<F, Fut>(f: F) -> ToolFn
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolExecutionError>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// One declared argument of a tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    /// Closed set of admissible values, if any.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// A function the model may ask the session to run.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order; the handle receives arguments in this order.
    pub parameters: Vec<ToolParameter>,
    pub handle: ToolFn,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("handle", &"<async_fn>")
            .finish()
    }
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Runs the handle with positional arguments.
    pub async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolExecutionError> {
        (self.handle)(args).await
    }

    /// Orders `arguments` by parameter declaration.
    ///
    /// Returns `None` unless the argument keys are exactly the declared
    /// parameter names.
    pub fn positional_arguments(&self, arguments: &Map<String, Value>) -> Option<Vec<Value>> {
        if arguments.len() != self.parameters.len() {
            return None;
        }
        self.parameters
            .iter()
            .map(|p| arguments.get(&p.name).cloned())
            .collect()
    }

    /// The definition sent to the server in a chat request's `tools` array.
    /// Every declared parameter is required.
    pub fn to_wire(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), Value::String(p.param_type.clone()));
            property.insert("description".into(), Value::String(p.description.clone()));
            if let Some(values) = &p.enum_values {
                property.insert("enum".into(), json!(values));
            }
            properties.insert(p.name.clone(), Value::Object(property));
        }
        let required: Vec<&str> = self.parameter_names().collect();

        json!({
            "type": ToolType::Function,
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Represents a tool call requested by the model.
///
/// Tool calls reference a function name and include JSON arguments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Optional identifier for the tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The type of the tool (defaults to [`ToolType::Function`]).
    ///
    /// Ollama omits this field, so a default is supplied.
    #[serde(default = "default_tool_call_type", skip_serializing_if = "is_default_tool_call_type")]
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    /// Function being called.
    pub function: ToolCallFunction,
}

impl ToolCall {
    pub fn new<T: Into<String>>(name: T, arguments: Value) -> Self {
        Self {
            id: None,
            tool_type: ToolType::Function,
            function: ToolCallFunction { name: name.into(), arguments },
        }
    }
}

fn default_tool_call_type() -> ToolType {
    ToolType::Function
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_tool_call_type(tool_type: &ToolType) -> bool {
    *tool_type == default_tool_call_type()
}

/// Contains the name and arguments for a function call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCallFunction {
    pub name: String,
    /// An argument object, or a string holding a JSON-encoded object.
    #[serde(default)]
    pub arguments: Value,
}

/// The result of one dispatched tool call, fed back to the model as a
/// `tool` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub result: String,
    pub tool_name: String,
}

impl ToolOutput {
    pub fn new<T: Into<String>, S: Into<String>>(result: T, tool_name: S) -> Self {
        Self { result: result.into(), tool_name: tool_name.into() }
    }
}
