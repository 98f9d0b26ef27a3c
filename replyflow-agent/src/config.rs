//! Runtime configuration read from the environment.

use std::{path::PathBuf, time::Duration};

use replyflow_tools::{MailConfig, interaction_log::DEFAULT_LOG_FILE};

use crate::agent_types::{AgentConfig, DEFAULT_MODEL, ModelConfig};

pub const MODEL_VAR: &str = "REPLYFLOW_MODEL";
pub const POLL_INTERVAL_VAR: &str = "REPLYFLOW_POLL_INTERVAL_SECS";
pub const LOG_FILE_VAR: &str = "REPLYFLOW_LOG_FILE";

/// Seconds between two passes when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Everything the `replyflow` binary needs to start.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub model: String,
    pub poll_interval: Duration,
    pub log_file: PathBuf,
    pub mail: MailConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            mail: MailConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset; an unparseable or zero interval falls
    /// back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let poll_interval = non_empty(POLL_INTERVAL_VAR)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        Self {
            model: non_empty(MODEL_VAR).unwrap_or(defaults.model),
            poll_interval,
            log_file: non_empty(LOG_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            mail: MailConfig::from_lookup(&lookup),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Executor configuration for the configured model.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::default().with_model_config(ModelConfig::new(self.model.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = RuntimeConfig::from_lookup(lookup(&[]));

        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.log_file, PathBuf::from("email_log.csv"));
        assert!(config.mail.credentials.is_none());
        assert_eq!(config.agent_config().model_config.model_name, DEFAULT_MODEL);
    }

    #[test]
    fn reads_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("REPLYFLOW_MODEL", "gpt-4o-mini"),
            ("REPLYFLOW_POLL_INTERVAL_SECS", "5"),
            ("REPLYFLOW_LOG_FILE", "/tmp/replies.csv"),
            ("SENDER_EMAIL", "support@example.com"),
            ("SENDER_PASSWORD", "app-password"),
        ]));

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.log_file, PathBuf::from("/tmp/replies.csv"));
        assert_eq!(
            config.mail.credentials.as_ref().map(|c| c.address.clone()),
            Some("support@example.com".to_string())
        );
        let agent = config.agent_config();
        assert_eq!(agent.model_config.model_name, "gpt-4o-mini");
        assert_eq!(agent.max_steps, 5);
    }

    #[test]
    fn bad_interval_falls_back() {
        for value in ["0", "soon", " "] {
            let config =
                RuntimeConfig::from_lookup(lookup(&[("REPLYFLOW_POLL_INTERVAL_SECS", value)]));
            assert_eq!(config.poll_interval, Duration::from_secs(30));
        }
    }
}
