//! Step execution: one instruction, optionally one bound tool, one text result.

use std::sync::Arc;

use async_trait::async_trait;
use genai::{
    Client,
    chat::{ChatMessage, ChatOptions, ChatRequest, ToolResponse},
};
use replyflow_core::SharedState;
use replyflow_tools::{Tool, ToolParameters, error_value, invoke_guarded};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{agent_types::AgentConfig, error::Result, template::render_instruction};

/// Metadata key holding the user message that started the run.
pub const TRIGGER_METADATA_KEY: &str = "trigger";

/// Trigger used when the state carries none.
pub const DEFAULT_TRIGGER: &str = "Check for new emails and process.";

/// One tool invocation made while executing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    pub result: Value,
}

/// What a step produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl StepOutput {
    /// Final output of a step. Blank model text falls back to the last tool
    /// result.
    pub fn new(text: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        let mut text = text.into();
        if text.trim().is_empty()
            && let Some(last) = tool_calls.last()
        {
            text = last.result.to_string();
        }
        Self { text, tool_calls }
    }
}

/// Interprets a step instruction against the shared state.
///
/// Bound tools must be run through [`invoke_guarded`] so that their outcome
/// lands in the state under the tool's output key. An `Err` means the
/// executor itself failed (e.g. the model could not be reached).
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn run_step(
        &self,
        name: &str,
        instruction: &str,
        tools: &[Arc<dyn Tool>],
        state: &mut SharedState,
    ) -> Result<StepOutput>;
}

/// [`StepExecutor`] backed by a chat model through `genai`.
///
/// The system message is the rendered instruction, the user message the run
/// trigger followed by a JSON snapshot of the state. Tool calls requested by
/// the model are executed and answered until it replies with text or
/// `max_steps` rounds have been spent.
pub struct LlmStepExecutor {
    client: Client,
    config: AgentConfig,
}

impl std::fmt::Debug for LlmStepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmStepExecutor")
            .field("config", &self.config)
            .finish()
    }
}

impl LlmStepExecutor {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_client(Client::default(), config)
    }

    pub fn with_client(client: Client, config: AgentConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn chat_options(&self) -> ChatOptions {
        let params = &self.config.model_config.parameters;
        let mut options = ChatOptions::default().with_temperature(f64::from(params.temperature));
        if let Some(max_tokens) = params.max_tokens {
            options = options.with_max_tokens(u32::try_from(max_tokens).unwrap_or(u32::MAX));
        }
        if let Some(top_p) = params.top_p {
            options = options.with_top_p(f64::from(top_p));
        }
        options
    }
}

/// User message: the trigger plus the current state.
pub fn user_message(state: &SharedState) -> Result<String> {
    let trigger = state
        .get_metadata::<String>(TRIGGER_METADATA_KEY)?
        .unwrap_or_else(|| DEFAULT_TRIGGER.to_string());
    let snapshot = serde_json::to_string_pretty(&state.to_json())?;
    Ok(format!("{trigger}\n\nCurrent session state:\n{snapshot}"))
}

/// Models sometimes send `null` or a non-object for argument-less calls.
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Object(_) => arguments,
        _ => Value::Object(serde_json::Map::new()),
    }
}

fn advertise(tool: &dyn Tool) -> genai::chat::Tool {
    genai::chat::Tool::new(tool.name())
        .with_description(tool.description())
        .with_schema(tool.parameter_schema())
}

#[async_trait]
impl StepExecutor for LlmStepExecutor {
    async fn run_step(
        &self,
        name: &str,
        instruction: &str,
        tools: &[Arc<dyn Tool>],
        state: &mut SharedState,
    ) -> Result<StepOutput> {
        let model = self.config.model_config.model_name.as_str();
        let options = self.chat_options();

        let mut request = ChatRequest::new(vec![
            ChatMessage::system(render_instruction(instruction, state)),
            ChatMessage::user(user_message(state)?),
        ]);
        if !tools.is_empty() {
            request = request.with_tools(
                tools
                    .iter()
                    .map(|tool| advertise(tool.as_ref()))
                    .collect::<Vec<_>>(),
            );
        }

        let mut calls = Vec::new();
        for round in 1..=self.config.max_steps.max(1) {
            debug!(step = name, model, round, "calling model");
            let response = self
                .client
                .exec_chat(model, request.clone(), Some(&options))
                .await?;
            let text = response.content_text_as_str().unwrap_or_default().to_string();

            let tool_calls = match response.into_tool_calls() {
                Some(tool_calls) if !tool_calls.is_empty() => tool_calls,
                _ => return Ok(StepOutput::new(text, calls)),
            };

            request = request.append_message(tool_calls.clone());
            for call in tool_calls {
                let arguments = normalize_arguments(call.fn_arguments);
                let result = match tools.iter().find(|tool| tool.name() == call.fn_name) {
                    Some(tool) => {
                        invoke_guarded(
                            tool.as_ref(),
                            ToolParameters::new(arguments.clone()),
                            state,
                        )
                        .await
                    }
                    None => {
                        warn!(step = name, tool = %call.fn_name, "model called an unbound tool");
                        error_value(format!("Unknown tool: {}", call.fn_name))
                    }
                };
                info!(step = name, tool = %call.fn_name, "tool call answered");
                request =
                    request.append_message(ToolResponse::new(call.call_id, result.to_string()));
                calls.push(ToolCallRecord {
                    tool: call.fn_name,
                    arguments,
                    result,
                });
            }
        }

        warn!(
            step = name,
            max_steps = self.config.max_steps,
            "model round limit reached"
        );
        Ok(StepOutput::new(String::new(), calls))
    }
}
