//! The customer email workflow.

use std::sync::Arc;

use replyflow_core::{FlowError, Predicate};
use replyflow_tools::{
    FetchLatestUnreadTool, InteractionLog, LogInteractionTool, MailConfig, SendEmailTool, Tool,
    ToolRegistry,
    keys::{DRAFTED_REPLY, FETCHED_EMAIL_DATA},
};

use crate::pipeline::{Pipeline, UnconditionalStep};

pub const WORKFLOW_NAME: &str = "CustomerEmailWorkflow";
pub const PROCESSING_SEQUENCE_NAME: &str = "EmailProcessingSequence";

pub const FETCH_TOOL: &str = "fetch_latest_unread_email_tool";
pub const SEND_TOOL: &str = "send_email";
pub const LOG_TOOL: &str = "log_interaction";

const FETCHER_INSTRUCTION: &str = "Call 'fetch_latest_unread_email_tool'.";

const DRAFTER_INSTRUCTION: &str = r#"You are a customer service representative drafting a reply email. Write a complete, professional email response to the customer's inquiry.

CRITICAL RULES - NEVER BREAK THESE:
1. NO PLACEHOLDERS: Never write [recipient name], [your name], [company name], [contact info], or any text in brackets
2. NO TEMPLATE LANGUAGE: Never write "Dear [Name]" - always write "Dear Customer" or "Hello"
3. BE SPECIFIC: Address their actual question from the email content
4. BE COMPLETE: Write the full email ready to send, not a template

Format your response like this real example:
Hello,

Thank you for reaching out to us. I understand you're having an issue with your order.

I'd be happy to help you resolve this. Based on your message, I can see that you're concerned about the delivery status. Let me look into this for you and provide an update within the next business day.

In the meantime, if you have any other questions, please don't hesitate to contact us.

Best regards,
Customer Support Team

Remember: Write the COMPLETE email body with NO placeholders or brackets anywhere."#;

const SENDER_INSTRUCTION: &str = "Use 'send_email'. Recipient is {fetched_email_data.sender}. \
Subject 'Re: Your Inquiry'. The body is the drafted reply in the session state.";

const LOGGER_INSTRUCTION: &str = "Call 'log_interaction'.";

/// The three tools the workflow binds.
#[derive(Clone)]
pub struct WorkflowTools {
    pub fetch: Arc<dyn Tool>,
    pub send: Arc<dyn Tool>,
    pub log: Arc<dyn Tool>,
}

impl WorkflowTools {
    /// Resolve the workflow's tools by name.
    pub async fn from_registry(registry: &ToolRegistry) -> replyflow_tools::Result<Self> {
        Ok(Self {
            fetch: registry.require_tool(FETCH_TOOL).await?,
            send: registry.require_tool(SEND_TOOL).await?,
            log: registry.require_tool(LOG_TOOL).await?,
        })
    }
}

/// Registry with the IMAP/SMTP mail tools and the CSV interaction log.
pub async fn email_tool_registry(
    mail: MailConfig,
    log: InteractionLog,
) -> replyflow_tools::Result<ToolRegistry> {
    let registry = ToolRegistry::new();
    registry.register_tool(Arc::new(FetchLatestUnreadTool::new(mail.clone()))).await?;
    registry.register_tool(Arc::new(SendEmailTool::new(mail))).await?;
    registry.register_tool(Arc::new(LogInteractionTool::new(log))).await?;
    Ok(registry)
}

/// Fetch the latest unread email and, only if one was fetched, draft a reply,
/// send it and log the exchange.
pub fn customer_email_workflow(tools: WorkflowTools) -> Result<Pipeline, FlowError> {
    let processing = Pipeline::builder(PROCESSING_SEQUENCE_NAME)
        .unconditional(
            UnconditionalStep::new("DraftingAgent", DRAFTER_INSTRUCTION)
                .with_output_key(DRAFTED_REPLY),
        )
        .unconditional(
            UnconditionalStep::new("SendingAgent", SENDER_INSTRUCTION).with_tool(tools.send),
        )
        .unconditional(
            UnconditionalStep::new("LoggingAgent", LOGGER_INSTRUCTION).with_tool(tools.log),
        )
        .build()?;

    Pipeline::builder(WORKFLOW_NAME)
        .unconditional(
            UnconditionalStep::new("FetcherAgent", FETCHER_INSTRUCTION).with_tool(tools.fetch),
        )
        .gate(
            "GateAgent",
            Predicate::status_is(FETCHED_EMAIL_DATA, "success"),
            processing,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use replyflow_core::SharedState;
    use replyflow_tools::{ToolParameters, invoke_guarded};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        error::Result,
        executor::{StepExecutor, StepOutput, ToolCallRecord},
        pipeline::{RunOutcome, Step},
    };

    /// Stands in for the model: the drafting step answers with a fixed reply,
    /// every other step calls its bound tool with no arguments.
    #[derive(Default)]
    struct ScriptedModel {
        instructions: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl StepExecutor for ScriptedModel {
        async fn run_step(
            &self,
            name: &str,
            instruction: &str,
            tools: &[Arc<dyn Tool>],
            state: &mut SharedState,
        ) -> Result<StepOutput> {
            self.instructions.lock().unwrap().push((
                name.to_string(),
                crate::template::render_instruction(instruction, state),
            ));
            if name == "DraftingAgent" {
                return Ok(StepOutput::new("Hello,\n\nThanks for writing.", Vec::new()));
            }
            let mut calls = Vec::new();
            for tool in tools {
                let result = invoke_guarded(tool.as_ref(), ToolParameters::empty(), state).await;
                calls.push(ToolCallRecord {
                    tool: tool.name().to_string(),
                    arguments: json!({}),
                    result,
                });
            }
            Ok(StepOutput::new("", calls))
        }
    }

    async fn unconfigured_tools(dir: &TempDir) -> WorkflowTools {
        let registry = email_tool_registry(
            MailConfig::default(),
            InteractionLog::new(dir.path().join("email_log.csv")),
        )
        .await
        .unwrap();
        WorkflowTools::from_registry(&registry).await.unwrap()
    }

    #[tokio::test]
    async fn registry_holds_the_workflow_tools() {
        let dir = TempDir::new().unwrap();
        let registry = email_tool_registry(
            MailConfig::default(),
            InteractionLog::new(dir.path().join("email_log.csv")),
        )
        .await
        .unwrap();

        assert_eq!(registry.list_tools().await, vec![FETCH_TOOL, LOG_TOOL, SEND_TOOL]);
        let tools = WorkflowTools::from_registry(&registry).await.unwrap();
        assert_eq!(tools.fetch.name(), FETCH_TOOL);
        assert_eq!(tools.send.name(), SEND_TOOL);
        assert_eq!(tools.log.name(), LOG_TOOL);
    }

    #[tokio::test]
    async fn missing_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let result = WorkflowTools::from_registry(&registry).await;
        assert!(matches!(
            result,
            Err(replyflow_tools::ToolError::NotFound(ref name)) if name == FETCH_TOOL
        ));
    }

    #[tokio::test]
    async fn workflow_shape() {
        let dir = TempDir::new().unwrap();
        let pipeline = customer_email_workflow(unconfigured_tools(&dir).await).unwrap();

        assert_eq!(pipeline.name(), WORKFLOW_NAME);
        let names: Vec<&str> = pipeline.steps().iter().map(Step::name).collect();
        assert_eq!(names, vec!["FetcherAgent", "GateAgent"]);

        let Step::Gate(gate) = &pipeline.steps()[1] else {
            panic!("second step must be the gate");
        };
        assert_eq!(gate.continuation.name(), PROCESSING_SEQUENCE_NAME);
        let inner: Vec<&str> = gate.continuation.steps().iter().map(Step::name).collect();
        assert_eq!(inner, vec!["DraftingAgent", "SendingAgent", "LoggingAgent"]);

        let Step::Unconditional(draft) = &gate.continuation.steps()[0] else {
            panic!("drafting step must be unconditional");
        };
        assert_eq!(draft.output_key.as_deref(), Some(DRAFTED_REPLY));
        assert!(draft.tool.is_none());
    }

    #[tokio::test]
    async fn missing_credentials_stop_at_the_gate() {
        let dir = TempDir::new().unwrap();
        let pipeline = customer_email_workflow(unconfigured_tools(&dir).await).unwrap();
        let executor = ScriptedModel::default();
        let mut state = SharedState::new();

        let report = pipeline.run(&executor, &mut state).await.unwrap();

        assert_eq!(
            report.outcome,
            RunOutcome::Skipped {
                gate: "GateAgent".to_string()
            }
        );
        assert_eq!(
            state.get_raw(FETCHED_EMAIL_DATA),
            Some(&json!({"status": "error", "message": "Email credentials not configured."}))
        );
        assert!(!state.contains(DRAFTED_REPLY));
        assert!(!dir.path().join("email_log.csv").exists());
    }

    #[tokio::test]
    async fn fetched_email_is_drafted_sent_and_logged() {
        use replyflow_tools::mail::{MailCredentials, Mailer};

        struct Accepting(Mutex<Vec<String>>);

        impl Mailer for Accepting {
            fn send(
                &self,
                _config: &MailConfig,
                _credentials: &MailCredentials,
                recipient: &str,
                _subject: &str,
                _body: &str,
            ) -> replyflow_tools::Result<()> {
                self.0.lock().unwrap().push(recipient.to_string());
                Ok(())
            }
        }

        /// Always returns the same successfully fetched email.
        struct Fetched;

        #[async_trait]
        impl Tool for Fetched {
            fn name(&self) -> &str {
                FETCH_TOOL
            }

            fn description(&self) -> &str {
                "canned fetch"
            }

            fn category(&self) -> replyflow_tools::ToolCategory {
                replyflow_tools::ToolCategory::Communication
            }

            fn parameter_schema(&self) -> serde_json::Value {
                ToolParameters::new_schema().into()
            }

            fn output_key(&self) -> String {
                FETCHED_EMAIL_DATA.to_string()
            }

            async fn invoke(
                &self,
                _parameters: ToolParameters,
                _state: &SharedState,
            ) -> replyflow_tools::Result<serde_json::Value> {
                Ok(json!({
                    "status": "success",
                    "sender": "jane@example.com",
                    "subject": "Order",
                    "body": "Where is my order?"
                }))
            }
        }

        let dir = TempDir::new().unwrap();
        let log = InteractionLog::new(dir.path().join("email_log.csv"));
        let mail =
            MailConfig::default().with_credentials(MailCredentials::new("me@example.com", "pw"));
        let mailer = Arc::new(Accepting(Mutex::new(Vec::new())));
        let registry = ToolRegistry::new();
        registry.register_tool(Arc::new(Fetched)).await.unwrap();
        registry
            .register_tool(Arc::new(SendEmailTool::with_mailer(mail, mailer.clone())))
            .await
            .unwrap();
        registry
            .register_tool(Arc::new(LogInteractionTool::new(log.clone())))
            .await
            .unwrap();
        let tools = WorkflowTools::from_registry(&registry).await.unwrap();

        let executor = ScriptedModel::default();
        let mut state = SharedState::new();
        let report = customer_email_workflow(tools)
            .unwrap()
            .run(&executor, &mut state)
            .await
            .unwrap();

        assert_eq!(
            report.executed(),
            vec![
                "FetcherAgent",
                "GateAgent",
                "DraftingAgent",
                "SendingAgent",
                "LoggingAgent"
            ]
        );
        assert_eq!(mailer.0.lock().unwrap().clone(), vec!["jane@example.com"]);
        assert_eq!(state.lookup_str("send_email_result.status"), Some("success"));

        let rows = log.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sender, "jane@example.com");
        assert_eq!(rows[0].sender_name, "jane");
        assert_eq!(rows[0].original_email, "Where is my order?");
        assert_eq!(rows[0].reply_sent, "Hello,\n\nThanks for writing.");

        let instructions = executor.instructions.lock().unwrap();
        let (_, sending) = instructions
            .iter()
            .find(|(name, _)| name == "SendingAgent")
            .unwrap();
        assert!(sending.contains("Recipient is jane@example.com."));
    }
}
