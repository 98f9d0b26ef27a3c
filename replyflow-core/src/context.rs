//! Session-scoped shared state for replyflow pipelines.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FlowError, Result};

/// Mutable key/value scope threaded through every step of one pipeline run.
///
/// Values are stored as JSON so that tools, gates and the LLM executor all see
/// the same representation. Readers must tolerate missing keys: every lookup
/// returns `None` (or a caller supplied default) rather than an error when a
/// key or a nested field is absent.
#[derive(Clone, Debug)]
pub struct SharedState {
    session_id: String,
    started_at: DateTime<Utc>,
    data: HashMap<String, Value>,
    metadata: HashMap<String, Value>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    /// Create an empty state with a generated session id.
    pub fn new() -> Self {
        Self::with_session(format!("session_{}", Uuid::new_v4()))
    }

    /// Create an empty state for the given session id.
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            data: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Create a state pre-populated from JSON data.
    pub fn from_json(data: HashMap<String, Value>) -> Self {
        Self {
            data,
            ..Self::new()
        }
    }

    /// Session id this state belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// When this state was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Set a value by key, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Insert an already-built JSON value.
    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value by key and deserialize it.
    pub fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.data
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(FlowError::from)
    }

    /// Get the raw JSON value stored at a top-level key.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Resolve a dotted path such as `fetched_email_data.status`.
    ///
    /// The first segment is a top-level key, the rest walk into nested
    /// objects. Any missing segment yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = segments.next()?;
        segments.try_fold(self.data.get(root)?, |value, segment| value.get(segment))
    }

    /// Resolve a dotted path to a string slice, if it holds a string.
    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// Resolve a dotted path to an owned string, falling back to `default`.
    pub fn string_or(&self, path: &str, default: &str) -> String {
        self.lookup_str(path).unwrap_or(default).to_string()
    }

    /// Remove a value by key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Check if a top-level key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// All top-level keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Set run metadata. Metadata is not part of the data snapshot.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.metadata.insert(key.into(), json_value);
        Ok(())
    }

    /// Get run metadata.
    pub fn get_metadata<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.metadata
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(FlowError::from)
    }

    /// Number of data keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no data keys are set.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// JSON object snapshot of the data keys.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

/// Builder for creating states with initial data.
#[derive(Default)]
pub struct SharedStateBuilder {
    state: SharedState,
}

impl SharedStateBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific session id.
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.state.session_id = session_id.into();
        self
    }

    /// Set a data key.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.state.set(key, value)?;
        Ok(self)
    }

    /// Set metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.state.set_metadata(key, value)?;
        Ok(self)
    }

    /// Build the state.
    pub fn build(self) -> SharedState {
        self.state
    }
}
