use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use super::errors::ToolExecutionError;
use super::tool::{tool_fn, Tool, ToolFn, ToolParameter};

/// JSON schema type names a parameter may declare.
const PARAMETER_TYPES: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolBuilderError {
    #[error("Function name is required.")]
    MissingFunctionName,
    #[error("Function description is required.")]
    MissingFunctionDescription,
    #[error("Executor function is required for the tool.")]
    MissingExecutor,
    #[error("Parameter '{0}' is declared more than once.")]
    DuplicateParameter(String),
    #[error("Parameter '{0}' has unsupported type '{1}'.")]
    InvalidParameterType(String, String),
    #[error("Parameter '{0}' declares an empty enum.")]
    EmptyEnum(String),
}

#[derive(Default)]
pub struct ToolBuilder {
    function_name: Option<String>,
    function_description: Option<String>,
    parameters: Vec<ToolParameter>,
    executor: Option<ToolFn>,
}

impl std::fmt::Debug for ToolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBuilder")
            .field("function_name", &self.function_name)
            .field("function_description", &self.function_description)
            .field("parameters", &self.parameters)
            .field("executor", &self.executor.as_ref().map(|_| "<async_fn>"))
            .finish()
    }
}

impl ToolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the function for the tool. (Required)
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Sets the description of the function for the tool. (Required)
    pub fn function_description<T>(mut self, description: T) -> Self
    where
        T: Into<String>,
    {
        self.function_description = Some(description.into());
        self
    }

    /// Appends a parameter. Declaration order is the order the handle
    /// receives its arguments in.
    ///
    /// # parameters
    /// * `name` - The name of the parameter.
    /// * `param_type` - The JSON schema type (e.g., "string", "number", "boolean").
    /// * `description` - A description of what the parameter represents.
    pub fn add_parameter(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            enum_values: None,
        });
        self
    }

    /// Appends a parameter restricted to a closed set of values.
    pub fn add_enum_parameter<I, S>(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.push(ToolParameter {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            enum_values: Some(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Sets the asynchronous executor function for the tool. (Required for building)
    pub fn executor(mut self, exec: ToolFn) -> Self {
        self.executor = Some(exec);
        self
    }

    /// Sets the executor from an async closure.
    pub fn handler<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolExecutionError>> + Send + 'static,
    {
        self.executor(tool_fn(f))
    }

    /// Consumes the builder and attempts to create a `Tool`.
    ///
    /// # Errors
    /// Returns a `ToolBuilderError` if required fields are missing or a
    /// parameter is malformed.
    pub fn build(self) -> Result<Tool, ToolBuilderError> {
        let name = self.function_name.ok_or(ToolBuilderError::MissingFunctionName)?;
        let description = self
            .function_description
            .ok_or(ToolBuilderError::MissingFunctionDescription)?;
        let handle = self.executor.ok_or(ToolBuilderError::MissingExecutor)?;

        for (i, p) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|q| q.name == p.name) {
                return Err(ToolBuilderError::DuplicateParameter(p.name.clone()));
            }
            if !PARAMETER_TYPES.contains(&p.param_type.as_str()) {
                return Err(ToolBuilderError::InvalidParameterType(
                    p.name.clone(),
                    p.param_type.clone(),
                ));
            }
            if matches!(&p.enum_values, Some(values) if values.is_empty()) {
                return Err(ToolBuilderError::EmptyEnum(p.name.clone()));
            }
        }

        Ok(Tool {
            name,
            description,
            parameters: self.parameters,
            handle,
        })
    }
}
