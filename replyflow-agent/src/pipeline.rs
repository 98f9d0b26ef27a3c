//! Gated sequential pipeline.
//!
//! A [`Pipeline`] is an ordered, non-empty list of [`Step`]s run against one
//! [`SharedState`]. Unconditional steps go to the [`StepExecutor`]; a gate
//! step evaluates its predicate and either runs its continuation pipeline in
//! place or ends the whole run.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use replyflow_core::{FlowError, Predicate, SharedState, evaluate};
use replyflow_tools::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    error::Result,
    executor::{StepExecutor, ToolCallRecord},
};

/// A step that always runs.
#[derive(Clone)]
pub struct UnconditionalStep {
    pub name: String,
    pub instruction: String,
    pub tool: Option<Arc<dyn Tool>>,
    pub output_key: Option<String>,
}

impl UnconditionalStep {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            tool: None,
            output_key: None,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Store the step's text output in the state under `key`.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }
}

impl std::fmt::Debug for UnconditionalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnconditionalStep")
            .field("name", &self.name)
            .field("tool", &self.tool.as_ref().map(|tool| tool.name().to_string()))
            .field("output_key", &self.output_key)
            .finish()
    }
}

/// A step that decides whether the run goes on.
#[derive(Clone)]
pub struct GateStep {
    pub name: String,
    pub predicate: Predicate,
    pub continuation: Pipeline,
}

impl std::fmt::Debug for GateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateStep")
            .field("name", &self.name)
            .field("predicate", &self.predicate.name())
            .field("continuation", &self.continuation)
            .finish()
    }
}

/// One pipeline step.
#[derive(Debug, Clone)]
pub enum Step {
    Unconditional(UnconditionalStep),
    Gate(GateStep),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Self::Unconditional(step) => &step.name,
            Self::Gate(step) => &step.name,
        }
    }
}

impl From<UnconditionalStep> for Step {
    fn from(step: UnconditionalStep) -> Self {
        Self::Unconditional(step)
    }
}

impl From<GateStep> for Step {
    fn from(step: GateStep) -> Self {
        Self::Gate(step)
    }
}

/// Named, non-empty sequence of steps. Built with [`PipelineBuilder`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Step>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every reachable step ran. `output` is the text of the last
    /// unconditional step that executed.
    Completed { output: String },
    /// A gate evaluated false and nothing after it ran.
    Skipped { gate: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Unconditional,
    Gate,
}

/// Trace entry for one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    /// Name of the pipeline the step belongs to.
    pub pipeline: String,
    pub kind: StepKind,
    /// Gate verdict; `None` for unconditional steps.
    pub passed: Option<bool>,
    pub output: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub pipeline: String,
    pub session_id: String,
    pub outcome: RunOutcome,
    pub steps: Vec<StepRecord>,
    pub duration: Duration,
}

impl RunReport {
    /// Names of the steps that ran, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, RunOutcome::Skipped { .. })
    }
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order against `state`.
    ///
    /// A passing gate runs its continuation before the steps that follow it;
    /// a failing gate ends the run, including any enclosing pipelines. Tool
    /// faults are already values in the state by the time a step returns, so
    /// only executor failures abort the run.
    pub async fn run(
        &self,
        executor: &dyn StepExecutor,
        state: &mut SharedState,
    ) -> Result<RunReport> {
        let started = Instant::now();
        info!(pipeline = %self.name, session = state.session_id(), "pipeline run started");
        #[cfg(feature = "metrics")]
        metrics::counter!("replyflow_pipeline_runs_total", "pipeline" => self.name.clone())
            .increment(1);

        let mut records = Vec::new();
        let mut last_output: Option<String> = None;
        let mut frames = vec![(self.name.as_str(), self.steps.iter())];

        while let Some((pipeline, steps)) = frames.last_mut() {
            let pipeline = *pipeline;
            let Some(step) = steps.next() else {
                frames.pop();
                continue;
            };

            let step_started = Instant::now();
            let started_at = Utc::now();
            #[cfg(feature = "metrics")]
            metrics::counter!("replyflow_pipeline_steps_total", "step" => step.name().to_string())
                .increment(1);

            match step {
                Step::Unconditional(step) => {
                    info!(pipeline, step = %step.name, "step started");
                    let tools: Vec<Arc<dyn Tool>> = step.tool.iter().cloned().collect();
                    let output = executor
                        .run_step(&step.name, &step.instruction, &tools, state)
                        .await
                        .inspect_err(|e| {
                            error!(pipeline, step = %step.name, error = %e, "step failed");
                        })?;

                    if let Some(key) = &step.output_key {
                        state.set_raw(key.clone(), Value::String(output.text.clone()));
                    }
                    info!(
                        pipeline,
                        step = %step.name,
                        tool_calls = output.tool_calls.len(),
                        "step finished"
                    );

                    records.push(StepRecord {
                        name: step.name.clone(),
                        pipeline: pipeline.to_string(),
                        kind: StepKind::Unconditional,
                        passed: None,
                        output: Some(output.text.clone()),
                        tool_calls: output.tool_calls,
                        started_at,
                        duration: step_started.elapsed(),
                    });
                    last_output = Some(output.text);
                }
                Step::Gate(gate) => {
                    let passed = evaluate(&gate.predicate, state);
                    records.push(StepRecord {
                        name: gate.name.clone(),
                        pipeline: pipeline.to_string(),
                        kind: StepKind::Gate,
                        passed: Some(passed),
                        output: None,
                        tool_calls: Vec::new(),
                        started_at,
                        duration: step_started.elapsed(),
                    });

                    if !passed {
                        warn!(
                            pipeline,
                            gate = %gate.name,
                            predicate = gate.predicate.name(),
                            "gate closed, stopping run"
                        );
                        #[cfg(feature = "metrics")]
                        metrics::counter!("replyflow_pipeline_skipped_total", "gate" => gate.name.clone())
                            .increment(1);
                        return Ok(RunReport {
                            pipeline: self.name.clone(),
                            session_id: state.session_id().to_string(),
                            outcome: RunOutcome::Skipped {
                                gate: gate.name.clone(),
                            },
                            steps: records,
                            duration: started.elapsed(),
                        });
                    }

                    info!(
                        pipeline,
                        gate = %gate.name,
                        continuation = %gate.continuation.name,
                        "gate open"
                    );
                    frames.push((
                        gate.continuation.name.as_str(),
                        gate.continuation.steps.iter(),
                    ));
                }
            }
        }

        info!(pipeline = %self.name, steps = records.len(), "pipeline run completed");
        Ok(RunReport {
            pipeline: self.name.clone(),
            session_id: state.session_id().to_string(),
            outcome: RunOutcome::Completed {
                output: last_output.unwrap_or_default(),
            },
            steps: records,
            duration: started.elapsed(),
        })
    }
}

/// Builder for [`Pipeline`]; `build` enforces the structural invariants.
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    steps: Vec<Step>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn unconditional(self, step: UnconditionalStep) -> Self {
        self.step(step)
    }

    pub fn gate(
        self,
        name: impl Into<String>,
        predicate: Predicate,
        continuation: Pipeline,
    ) -> Self {
        self.step(GateStep {
            name: name.into(),
            predicate,
            continuation,
        })
    }

    /// Rejects an empty pipeline, unnamed steps and empty output keys.
    pub fn build(self) -> std::result::Result<Pipeline, FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::construction("pipeline name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(FlowError::construction(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }
        for step in &self.steps {
            if step.name().trim().is_empty() {
                return Err(FlowError::construction(format!(
                    "pipeline '{}' has a step without a name",
                    self.name
                )));
            }
            if let Step::Unconditional(step) = step
                && step
                    .output_key
                    .as_deref()
                    .is_some_and(|key| key.trim().is_empty())
            {
                return Err(FlowError::construction(format!(
                    "step '{}' declares an empty output key",
                    step.name
                )));
            }
        }

        Ok(Pipeline {
            name: self.name,
            steps: self.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use replyflow_tools::{ToolCategory, ToolParameters, invoke_guarded};
    use serde_json::json;

    use super::*;
    use crate::{error::AgentError, executor::StepOutput};

    /// Runs the bound tool with no arguments and returns a canned text for
    /// tool-less steps, recording the order of calls.
    #[derive(Default)]
    struct ScriptedExecutor {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl ScriptedExecutor {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepExecutor for ScriptedExecutor {
        async fn run_step(
            &self,
            name: &str,
            _instruction: &str,
            tools: &[Arc<dyn Tool>],
            state: &mut SharedState,
        ) -> Result<StepOutput> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(AgentError::model("model unavailable"));
            }
            let mut records = Vec::new();
            for tool in tools {
                let result = invoke_guarded(tool.as_ref(), ToolParameters::empty(), state).await;
                records.push(ToolCallRecord {
                    tool: tool.name().to_string(),
                    arguments: json!({}),
                    result,
                });
            }
            let text = if records.is_empty() {
                format!("text from {name}")
            } else {
                String::new()
            };
            Ok(StepOutput::new(text, records))
        }
    }

    /// Writes a fixed value (or fails) under its output key.
    struct Fixed {
        name: &'static str,
        key: &'static str,
        value: Option<Value>,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed value"
        }

        fn category(&self) -> ToolCategory {
            ToolCategory::Custom
        }

        fn parameter_schema(&self) -> Value {
            ToolParameters::new_schema().into()
        }

        fn output_key(&self) -> String {
            self.key.to_string()
        }

        async fn invoke(
            &self,
            _parameters: ToolParameters,
            _state: &SharedState,
        ) -> replyflow_tools::Result<Value> {
            self.value
                .clone()
                .ok_or_else(|| replyflow_tools::ToolError::transport("connection refused"))
        }
    }

    fn fetch_returning(value: Value) -> Arc<dyn Tool> {
        Arc::new(Fixed {
            name: "fetch",
            key: "fetched_email_data",
            value: Some(value),
        })
    }

    fn email_pipeline(fetch: Arc<dyn Tool>, send: Arc<dyn Tool>) -> Pipeline {
        let processing = Pipeline::builder("Processing")
            .unconditional(UnconditionalStep::new("Draft", "draft").with_output_key("drafted_reply"))
            .unconditional(UnconditionalStep::new("Send", "send").with_tool(send))
            .unconditional(UnconditionalStep::new("Log", "log"))
            .build()
            .unwrap();

        Pipeline::builder("Workflow")
            .unconditional(UnconditionalStep::new("Fetch", "fetch").with_tool(fetch))
            .gate(
                "Gate",
                Predicate::status_is("fetched_email_data", "success"),
                processing,
            )
            .build()
            .unwrap()
    }

    fn ok_send() -> Arc<dyn Tool> {
        Arc::new(Fixed {
            name: "send",
            key: "send_result",
            value: Some(json!({"status": "success"})),
        })
    }

    #[tokio::test]
    async fn closed_gate_runs_nothing_after_it() {
        for fetched in [
            json!({"status": "no_email", "message": "No new unread emails."}),
            json!({"status": "error", "message": "Email credentials not configured."}),
            json!({"status": 1}),
        ] {
            let executor = ScriptedExecutor::default();
            let mut state = SharedState::new();

            let report = email_pipeline(fetch_returning(fetched), ok_send())
                .run(&executor, &mut state)
                .await
                .unwrap();

            assert_eq!(
                report.outcome,
                RunOutcome::Skipped {
                    gate: "Gate".to_string()
                }
            );
            assert_eq!(executor.calls(), vec!["Fetch"]);
            assert_eq!(report.executed(), vec!["Fetch", "Gate"]);
            assert!(!state.contains("drafted_reply"));
        }
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn closed_gate_is_logged() {
        let executor = ScriptedExecutor::default();
        let fetched = json!({"status": "no_email", "message": "No new unread emails."});

        email_pipeline(fetch_returning(fetched), ok_send())
            .run(&executor, &mut SharedState::new())
            .await
            .unwrap();

        assert!(logs_contain("gate closed, stopping run"));
        assert!(!logs_contain("pipeline run completed"));
    }

    #[tokio::test]
    async fn open_gate_runs_continuation_in_order() {
        let executor = ScriptedExecutor::default();
        let mut state = SharedState::new();
        let fetched = json!({"status": "success", "sender": "jane@example.com", "body": "hi"});

        let report = email_pipeline(fetch_returning(fetched), ok_send())
            .run(&executor, &mut state)
            .await
            .unwrap();

        assert_eq!(executor.calls(), vec!["Fetch", "Draft", "Send", "Log"]);
        assert_eq!(report.executed(), vec!["Fetch", "Gate", "Draft", "Send", "Log"]);
        assert_eq!(
            report.outcome,
            RunOutcome::Completed {
                output: "text from Log".to_string()
            }
        );
        assert_eq!(state.lookup_str("drafted_reply"), Some("text from Draft"));
        assert_eq!(report.steps[1].passed, Some(true));
        assert_eq!(report.steps[2].pipeline, "Processing");
    }

    #[tokio::test]
    async fn tool_fault_is_written_and_run_continues() {
        let executor = ScriptedExecutor::default();
        let mut state = SharedState::new();
        let failing_send: Arc<dyn Tool> = Arc::new(Fixed {
            name: "send",
            key: "send_result",
            value: None,
        });
        let fetched = json!({"status": "success", "sender": "jane@example.com", "body": "hi"});

        let report = email_pipeline(fetch_returning(fetched), failing_send)
            .run(&executor, &mut state)
            .await
            .unwrap();

        assert_eq!(
            state.get_raw("send_result"),
            Some(&json!({"status": "error", "message": "Transport error: connection refused"}))
        );
        assert_eq!(executor.calls(), vec!["Fetch", "Draft", "Send", "Log"]);
        assert!(!report.is_skipped());
    }

    #[tokio::test]
    async fn nested_closed_gate_halts_enclosing_pipeline() {
        let inner = Pipeline::builder("Inner")
            .unconditional(UnconditionalStep::new("A", "a"))
            .gate(
                "InnerGate",
                Predicate::key_present("never_set"),
                Pipeline::builder("Unreached")
                    .unconditional(UnconditionalStep::new("B", "b"))
                    .build()
                    .unwrap(),
            )
            .unconditional(UnconditionalStep::new("C", "c"))
            .build()
            .unwrap();
        let outer = Pipeline::builder("Outer")
            .gate("OuterGate", Predicate::new("always", |_| true), inner)
            .unconditional(UnconditionalStep::new("D", "d"))
            .build()
            .unwrap();

        let executor = ScriptedExecutor::default();
        let report = outer
            .run(&executor, &mut SharedState::new())
            .await
            .unwrap();

        assert_eq!(executor.calls(), vec!["A"]);
        assert_eq!(
            report.outcome,
            RunOutcome::Skipped {
                gate: "InnerGate".to_string()
            }
        );
    }

    #[tokio::test]
    async fn steps_after_an_open_gate_still_run() {
        let pipeline = Pipeline::builder("Outer")
            .gate(
                "Open",
                Predicate::new("always", |_| true),
                Pipeline::builder("Inner")
                    .unconditional(UnconditionalStep::new("A", "a"))
                    .build()
                    .unwrap(),
            )
            .unconditional(UnconditionalStep::new("B", "b"))
            .build()
            .unwrap();

        let executor = ScriptedExecutor::default();
        let report = pipeline
            .run(&executor, &mut SharedState::new())
            .await
            .unwrap();

        assert_eq!(executor.calls(), vec!["A", "B"]);
        assert_eq!(
            report.outcome,
            RunOutcome::Completed {
                output: "text from B".to_string()
            }
        );
    }

    #[tokio::test]
    async fn executor_failure_aborts_run() {
        let executor = ScriptedExecutor {
            fail_on: Some("Draft"),
            ..ScriptedExecutor::default()
        };
        let fetched = json!({"status": "success", "sender": "jane@example.com", "body": "hi"});

        let result = email_pipeline(fetch_returning(fetched), ok_send())
            .run(&executor, &mut SharedState::new())
            .await;

        assert!(matches!(result, Err(AgentError::Model(_))));
        assert_eq!(executor.calls(), vec!["Fetch", "Draft"]);
    }

    #[test]
    fn construction_rejects_invalid_pipelines() {
        assert!(matches!(
            Pipeline::builder("Empty").build(),
            Err(FlowError::Construction(_))
        ));
        assert!(matches!(
            Pipeline::builder("Keys")
                .unconditional(UnconditionalStep::new("Draft", "draft").with_output_key(" "))
                .build(),
            Err(FlowError::Construction(_))
        ));
        assert!(matches!(
            Pipeline::builder("Names")
                .unconditional(UnconditionalStep::new("", "x"))
                .build(),
            Err(FlowError::Construction(_))
        ));
        assert!(
            Pipeline::builder("Ok")
                .unconditional(UnconditionalStep::new("Draft", "draft"))
                .build()
                .is_ok()
        );
    }
}
