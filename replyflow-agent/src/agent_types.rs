use serde::{Deserialize, Serialize};

/// Default model; any model name `genai` can route works.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Executor configuration shared by every step of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model rounds per step (tool call and response counts as one)
    pub max_steps: usize,
    /// Model configuration
    pub model_config: ModelConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            model_config: ModelConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = config;
        self
    }
}

/// Model configuration for genai integration. The provider is resolved by
/// genai from the model name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name
    pub model_name: String,
    /// Model parameters
    pub parameters: ModelParameters,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            parameters: ModelParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: Some(4096),
            top_p: None,
        }
    }
}

impl ModelParameters {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}
