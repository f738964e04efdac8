//! Credential capability check
//!
//! No job may be submitted without a usable API credential. Selecting a new
//! credential is fire-and-forget, so completion is detected by re-checking
//! with a bounded backoff.

use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{GenerationError, GenerationResult};

/// Environment variables consulted for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Source of the credential used to call the generative API
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn has_usable_credential(&self) -> bool;

    /// Hand off to whatever selects a credential; completion is not signalled
    async fn request_credential_selection(&self);
}

/// Shared, swappable API key
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    pub fn new(key: Option<String>) -> Self {
        let store = Self::default();
        store.set(key);
        store
    }

    /// Read the key from `GEMINI_API_KEY`, falling back to `API_KEY`
    pub fn from_env() -> Self {
        Self::new(Self::key_from_env())
    }

    fn key_from_env() -> Option<String> {
        API_KEY_VARS.iter().find_map(|var| env::var(var).ok())
    }

    pub fn set(&self, key: Option<String>) {
        let key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = key;
    }

    pub fn get(&self) -> Option<String> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialProvider for ApiKeyStore {
    async fn has_usable_credential(&self) -> bool {
        self.get().is_some()
    }

    async fn request_credential_selection(&self) {
        match Self::key_from_env() {
            Some(key) => self.set(Some(key)),
            None => warn!("No API key found in {:?}", API_KEY_VARS),
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of checks after a selection request, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Factor by which the delay grows after each failed check
    pub multiplier: f64,
    /// Upper bound on the delay between checks
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Next delay, clamped to `max_delay`
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

/// Gate in front of every remote call
#[derive(Clone)]
pub struct CapabilityGate {
    provider: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
}

impl CapabilityGate {
    pub fn new(provider: Arc<dyn CredentialProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn is_usable(&self) -> bool {
        self.provider.has_usable_credential().await
    }

    pub async fn ensure(&self) -> GenerationResult<()> {
        if self.is_usable().await {
            Ok(())
        } else {
            Err(GenerationError::Capability)
        }
    }

    /// Request a selection, then re-check until usable or out of attempts
    pub async fn select_credential(&self) -> bool {
        self.provider.request_credential_selection().await;

        let attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay;

        for attempt in 1..=attempts {
            if self.provider.has_usable_credential().await {
                info!(attempt, "Credential is usable");
                return true;
            }

            if attempt < attempts {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Credential not usable yet, re-checking"
                );
                tokio::time::sleep(delay).await;
                delay = self.policy.next_delay(delay);
            }
        }

        false
    }
}
