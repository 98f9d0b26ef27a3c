//! Polling driver: one full pipeline pass per tick until shutdown.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use replyflow_core::SharedState;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::DEFAULT_POLL_INTERVAL_SECS,
    error::Result,
    executor::{DEFAULT_TRIGGER, StepExecutor, TRIGGER_METADATA_KEY},
    pipeline::{Pipeline, RunOutcome, RunReport},
};

/// Metadata key holding the unique id of a pass.
pub const RUN_ID_METADATA_KEY: &str = "run_id";

/// Runs a pipeline on a fixed interval with a fresh state per pass.
pub struct Driver {
    pipeline: Pipeline,
    executor: Arc<dyn StepExecutor>,
    interval: Duration,
    trigger: String,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("pipeline", &self.pipeline.name())
            .field("interval", &self.interval)
            .field("trigger", &self.trigger)
            .finish()
    }
}

impl Driver {
    pub fn new(pipeline: Pipeline, executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            pipeline,
            executor,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            trigger: DEFAULT_TRIGGER.to_string(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Fresh state for one pass, identified by the current unix time.
    pub fn new_state(&self) -> Result<SharedState> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let mut state = SharedState::with_session(format!("workflow_run_{secs}"));
        state.set_metadata(RUN_ID_METADATA_KEY, Uuid::new_v4().to_string())?;
        state.set_metadata(TRIGGER_METADATA_KEY, &self.trigger)?;
        Ok(state)
    }

    /// One complete pass with a fresh state.
    pub async fn run_pass(&self) -> Result<RunReport> {
        let mut state = self.new_state()?;
        let report = self.pipeline.run(self.executor.as_ref(), &mut state).await;

        match &report {
            Ok(report) => match &report.outcome {
                RunOutcome::Completed { .. } => {
                    info!(
                        session = %report.session_id,
                        steps = report.steps.len(),
                        "pass completed"
                    );
                }
                RunOutcome::Skipped { gate } => {
                    info!(session = %report.session_id, gate = %gate, "pass skipped");
                }
            },
            Err(e) => {
                error!(
                    session = state.session_id(),
                    error = %e,
                    category = e.category(),
                    "pass failed"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!("replyflow_pass_failures_total").increment(1);
            }
        }
        report
    }

    /// Run passes until `shutdown` resolves, sleeping the interval between
    /// them. `on_pass` sees every pass result; a failed pass does not stop
    /// the loop. Returns the number of passes that finished.
    pub async fn run_until<S, F>(&self, shutdown: S, mut on_pass: F) -> usize
    where
        S: Future<Output = ()>,
        F: FnMut(&Result<RunReport>),
    {
        tokio::pin!(shutdown);
        let mut passes = 0;

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    warn!(passes, "shutdown requested during a pass");
                    break;
                }
                result = self.run_pass() => {
                    passes += 1;
                    on_pass(&result);
                }
            }

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(passes, "shutdown requested");
                    break;
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        passes
    }
}
