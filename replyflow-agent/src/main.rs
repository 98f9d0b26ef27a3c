use std::sync::Arc;

use eyre::WrapErr;
use replyflow_agent::{
    Driver, LlmStepExecutor, RunOutcome, RuntimeConfig, WorkflowTools, customer_email_workflow,
    email_tool_registry,
};
use replyflow_tools::InteractionLog;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RuntimeConfig::from_env();
    if config.mail.credentials.is_none() {
        warn!("SENDER_EMAIL/SENDER_PASSWORD not set; every pass will stop at the gate");
    }
    info!(model = %config.model, log_file = %config.log_file.display(), "configuration loaded");

    let registry =
        email_tool_registry(config.mail.clone(), InteractionLog::new(config.log_file.clone()))
            .await
            .wrap_err("failed to register the email tools")?;
    info!(tools = ?registry.list_tools().await, "tools registered");
    let tools = WorkflowTools::from_registry(&registry).await?;
    let pipeline =
        customer_email_workflow(tools).wrap_err("failed to build the email workflow")?;
    let executor = Arc::new(LlmStepExecutor::new(config.agent_config()));
    let driver = Driver::new(pipeline, executor).with_interval(config.poll_interval);

    println!("Starting integrated email processing workflow...");
    println!("Press Ctrl+C to stop.");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let interval = driver.interval().as_secs();
    driver
        .run_until(shutdown, |result| {
            match result {
                Ok(report) => match &report.outcome {
                    RunOutcome::Completed { output } => {
                        println!("Workflow finished. Final message: {output}");
                    }
                    RunOutcome::Skipped { gate } => {
                        println!("Workflow finished. No email to process ({gate} closed).");
                    }
                },
                Err(e) => println!("An error occurred in the main loop: {e}"),
            }
            println!("\nWaiting for {interval} seconds before next check...");
        })
        .await;

    println!("\nWorkflow stopped by user.");
    Ok(())
}
