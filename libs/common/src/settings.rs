//! Studio settings
//!
//! Values come from built-in defaults overridden by `STUDIO_*` environment
//! variables (e.g. `STUDIO_POLL_INTERVAL_SECS=5`).

use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use crate::capability::RetryPolicy;
use crate::genai::{DEFAULT_BASE_URL, DEFAULT_SCRIPT_MODEL, DEFAULT_VIDEO_MODEL, GenAiConfig};
use crate::ledger::WELCOME_CREDITS;
use crate::orchestrator::PollPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    /// Address the HTTP service binds to
    pub bind_addr: String,
    /// Base URL of the generative API
    pub api_base_url: String,
    pub video_model: String,
    pub script_model: String,
    /// Wait between two polls of a running job
    pub poll_interval_secs: u64,
    /// Ceiling on a single job's wait; 0 waits indefinitely
    pub max_wait_secs: u64,
    /// Balance of a fresh session
    pub initial_credits: i64,
    /// Checks performed after a credential selection request
    pub credential_retry_attempts: u32,
    /// Delay before the first credential re-check
    pub credential_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl StudioConfig {
    /// Load the configuration from `STUDIO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::with_prefix("STUDIO"))
    }

    /// Load the configuration from defaults and the given environment source
    pub fn load(environment: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("bind_addr", "0.0.0.0:3002")?
            .set_default("api_base_url", DEFAULT_BASE_URL)?
            .set_default("video_model", DEFAULT_VIDEO_MODEL)?
            .set_default("script_model", DEFAULT_SCRIPT_MODEL)?
            .set_default("poll_interval_secs", 5_i64)?
            .set_default("max_wait_secs", 900_i64)?
            .set_default("initial_credits", WELCOME_CREDITS)?
            .set_default("credential_retry_attempts", 2_i64)?
            .set_default("credential_retry_delay_ms", 1000_i64)?
            .set_default("request_timeout_secs", 60_i64)?
            .add_source(environment.try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            max_wait: (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.credential_retry_attempts.max(1),
            initial_delay: Duration::from_millis(self.credential_retry_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn genai_config(&self) -> GenAiConfig {
        GenAiConfig {
            base_url: self.api_base_url.clone(),
            video_model: self.video_model.clone(),
            script_model: self.script_model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
