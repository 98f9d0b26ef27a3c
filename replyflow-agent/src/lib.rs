//! # replyflow-agent
//!
//! Gated pipelines of LLM-driven steps, and the customer email workflow built
//! from them.
//!
//! A [`Pipeline`] runs its steps in order against one
//! [`SharedState`](replyflow_core::SharedState). Each unconditional step is
//! handed to a [`StepExecutor`] together with its bound tool; a gate step
//! either runs its continuation or ends the run. The [`Driver`] repeats the
//! pipeline on a fixed interval with a fresh state until shutdown.

pub mod agent_types;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod template;
pub mod workflow;

// Re-exports for convenience
pub use agent_types::*;
pub use config::RuntimeConfig;
pub use driver::Driver;
pub use error::*;
pub use executor::{LlmStepExecutor, StepExecutor, StepOutput, ToolCallRecord};
pub use pipeline::{
    GateStep, Pipeline, PipelineBuilder, RunOutcome, RunReport, Step, StepRecord,
    UnconditionalStep,
};
pub use workflow::{WorkflowTools, customer_email_workflow, email_tool_registry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use replyflow_core::{Predicate, SharedState};
    pub use replyflow_tools::{Tool, ToolParameters, invoke_guarded};

    pub use crate::{
        agent_types::*,
        config::RuntimeConfig,
        driver::Driver,
        error::{AgentError, Result},
        executor::{LlmStepExecutor, StepExecutor, StepOutput},
        pipeline::{Pipeline, RunOutcome, RunReport, Step, UnconditionalStep},
        workflow::{WorkflowTools, customer_email_workflow, email_tool_registry},
    };
}
