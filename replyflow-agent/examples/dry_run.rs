//! One pass of the customer email workflow without a model.
//!
//! Tool-bound steps call their tool directly; the drafting step returns a
//! canned reply. With `SENDER_EMAIL`/`SENDER_PASSWORD` unset the pass stops
//! at the gate.

use std::sync::Arc;

use async_trait::async_trait;
use replyflow_agent::{executor::ToolCallRecord, prelude::*};
use replyflow_tools::{InteractionLog, MailConfig};

struct DirectExecutor;

#[async_trait]
impl StepExecutor for DirectExecutor {
    async fn run_step(
        &self,
        name: &str,
        _instruction: &str,
        tools: &[Arc<dyn Tool>],
        state: &mut SharedState,
    ) -> Result<StepOutput> {
        let Some(tool) = tools.first() else {
            return Ok(StepOutput::new(
                "Hello,\n\nThank you for reaching out. We are looking into it.\n\nBest regards,\nCustomer Support Team",
                Vec::new(),
            ));
        };
        println!("{name}: calling {}", tool.name());
        let arguments = serde_json::json!({});
        let result =
            invoke_guarded(tool.as_ref(), ToolParameters::new(arguments.clone()), state).await;
        Ok(StepOutput::new(
            "",
            vec![ToolCallRecord {
                tool: tool.name().to_string(),
                arguments,
                result,
            }],
        ))
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let log = InteractionLog::new(std::env::temp_dir().join("replyflow_dry_run.csv"));
    let registry = email_tool_registry(MailConfig::from_env(), log).await?;
    let tools = WorkflowTools::from_registry(&registry).await?;
    let pipeline = customer_email_workflow(tools)?;
    let driver = Driver::new(pipeline, Arc::new(DirectExecutor));

    let report = driver.run_pass().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
