use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::messages::Locale;
use crate::retry::RetryPolicy;

/// Knobs for the client layer. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long a cached ledger read stays fresh.
    pub cache_ttl_secs: u64,
    /// How long a reader waits for a busy cache key before falling back.
    pub lock_wait_ms: u64,
    /// Lease length; a holder that never releases loses the lock after this.
    pub lock_lease_ms: u64,
    pub lock_poll_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    /// Draws attempted before a random pick is surfaced as-is.
    pub reroll_attempts: u32,
    pub autosave_interval_secs: u64,
    /// How long a local skip keeps a bottle out of discovery.
    pub skip_ttl_secs: u64,
    pub snapshot_path: Option<PathBuf>,
    pub locale: Locale,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 60,
            lock_wait_ms: 5_000,
            lock_lease_ms: 10_000,
            lock_poll_ms: 50,
            max_retries: 2,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 8_000,
            reroll_attempts: 3,
            autosave_interval_secs: 60,
            skip_ttl_secs: 24 * 60 * 60,
            snapshot_path: None,
            locale: Locale::En,
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> ClientResult<Self> {
        let config: ClientConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.lock_poll_ms == 0 {
            return Err(ClientError::Config("lock_poll_ms must be positive".into()));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(ClientError::Config(
                "backoff_cap_ms must not be below backoff_base_ms".into(),
            ));
        }
        if self.reroll_attempts == 0 {
            return Err(ClientError::Config("reroll_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_millis(self.lock_lease_ms)
    }

    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn skip_ttl(&self) -> Duration {
        Duration::from_secs(self.skip_ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_cap_ms),
        }
    }
}
