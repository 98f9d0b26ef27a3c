use async_trait::async_trait;
use replyflow_core::SharedState;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{Result, ToolError};

/// Capability every pipeline tool implements.
///
/// Tools read whatever they need from the shared state and return a JSON
/// value. They never write to the state themselves: [`invoke_guarded`] stores
/// the returned value (or the converted fault) under [`Tool::output_key`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's unique name
    fn name(&self) -> &str;

    /// Get the tool's description
    fn description(&self) -> &str;

    /// Get the tool's category
    fn category(&self) -> ToolCategory;

    /// Get parameter schema for the tool
    fn parameter_schema(&self) -> Value;

    /// State key the tool's outcome is written under.
    fn output_key(&self) -> String {
        format!("{}_result", self.name())
    }

    /// Run the tool.
    async fn invoke(&self, parameters: ToolParameters, state: &SharedState) -> Result<Value>;

    /// Validate parameters before execution (optional override)
    fn validate_parameters(&self, parameters: &ToolParameters) -> Result<()> {
        let schema = self.parameter_schema();
        let compiled = jsonschema::Validator::new(&schema)
            .map_err(|e| ToolError::validation(format!("Invalid schema: {e}")))?;

        match compiled.validate(parameters.inner()) {
            Ok(()) => Ok(()),
            Err(error) => Err(ToolError::validation(format!(
                "Parameter validation failed: {error}"
            ))),
        }
    }
}

/// Structured failure value written into the state when a tool faults.
pub fn error_value(message: impl Into<String>) -> Value {
    json!({"status": "error", "message": message.into()})
}

/// Invoke a tool so that it can never fault the caller.
///
/// Parameters are validated against the tool's schema, the tool is invoked,
/// and any [`ToolError`] is converted into `{"status": "error", "message"}`.
/// Success and failure values alike are written into `state` under the
/// tool's output key and returned.
pub async fn invoke_guarded(
    tool: &dyn Tool,
    parameters: ToolParameters,
    state: &mut SharedState,
) -> Value {
    info!(tool = tool.name(), category = ?tool.category(), "invoking tool");

    let outcome = match tool.validate_parameters(&parameters) {
        Ok(()) => tool.invoke(parameters, state).await,
        Err(e) => Err(e),
    };

    let value = match outcome {
        Ok(value) => value,
        Err(e) => {
            warn!(
                tool = tool.name(),
                category = %e.category(),
                error = %e,
                "tool failed"
            );
            error_value(e.to_string())
        }
    };

    if let Some(status) = value.get("status").and_then(Value::as_str) {
        info!(tool = tool.name(), status, "tool finished");
    }
    state.set_raw(tool.output_key(), value.clone());
    value
}

/// Tool category for organization and discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolCategory {
    /// Web-related tools (HTTP, scraping, APIs)
    Web,
    /// File system operations
    File,
    /// Communication tools (email, chat, ...)
    Communication,
    /// Custom user-defined tools
    Custom,
}

/// Tool parameters wrapper with typed accessors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    inner: Value,
}

impl ToolParameters {
    pub fn new(value: Value) -> Self {
        Self { inner: value }
    }

    pub fn empty() -> Self {
        Self {
            inner: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn new_schema() -> Self {
        Self {
            inner: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn inner(&self) -> &Value {
        &self.inner
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .inner
            .get(key)
            .ok_or_else(|| ToolError::invalid_field(key, "Parameter not found"))?;
        serde_json::from_value(value.clone())
            .map_err(|_| ToolError::invalid_field(key, "Invalid parameter type"))
    }

    pub fn get_optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.inner.get(key) {
            Some(value) if value.is_null() => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone()).map_err(
                |_| ToolError::invalid_field(key, "Invalid parameter type"),
            )?)),
            None => Ok(None),
        }
    }

    /// Optional string parameter; blank strings count as absent.
    pub fn get_string_optional(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_optional::<String>(key)?
            .filter(|value| !value.trim().is_empty()))
    }

    // Schema building methods
    pub fn add_required(self, name: &str, param_type: &str, description: &str) -> Self {
        let mut schema = self.add_property(name, param_type, description, None);
        if let Some(required) = schema
            .inner
            .get_mut("required")
            .and_then(Value::as_array_mut)
            && !required.contains(&json!(name))
        {
            required.push(json!(name));
        }
        schema
    }

    pub fn add_optional(
        self,
        name: &str,
        param_type: &str,
        description: &str,
        default_value: Option<Value>,
    ) -> Self {
        self.add_property(name, param_type, description, default_value)
    }

    fn add_property(
        mut self,
        name: &str,
        param_type: &str,
        description: &str,
        default_value: Option<Value>,
    ) -> Self {
        let mut obj = match self.inner {
            Value::Object(o) => o,
            _ => serde_json::Map::new(),
        };

        let mut properties = obj
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let mut param_schema = json!({
            "type": param_type,
            "description": description
        });
        if let Some(default) = default_value
            && let Some(fields) = param_schema.as_object_mut()
        {
            fields.insert("default".to_string(), default);
        }
        properties.insert(name.to_string(), param_schema);

        obj.insert("properties".to_string(), Value::Object(properties));
        obj.entry("required".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        obj.insert("type".to_string(), json!("object"));

        self.inner = Value::Object(obj);
        self
    }
}

impl From<Value> for ToolParameters {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<ToolParameters> for Value {
    fn from(params: ToolParameters) -> Self {
        params.inner
    }
}

impl std::fmt::Display for ToolParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}
