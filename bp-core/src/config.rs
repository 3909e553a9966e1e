//! Bonus Points Configuration
//!
//! Supports loading from environment variables with the `BP_` prefix.

use crate::error::{BpError, BpResult};
use crate::points::{DEFAULT_CAP, DEFAULT_PRESTIGE_RATIO};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default bounded wait for the award lock
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

/// Default preview artifact lifetime (24h)
pub const DEFAULT_PREVIEW_TTL_SECS: u64 = 86_400;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpConfig {
    /// Maximum spendable balance
    #[serde(default = "default_cap")]
    pub cap: u64,
    /// Overflow points per prestige level
    #[serde(default = "default_prestige_ratio")]
    pub prestige_ratio: u64,
    /// Bounded wait for the process-wide award lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Preview artifact TTL
    #[serde(default = "default_preview_ttl_secs")]
    pub preview_ttl_secs: u64,
    /// Store id stamped on every audit entry
    #[serde(default = "default_store_id")]
    pub store_id: String,
    /// Data directory for the persistent backend
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_cap() -> u64 {
    DEFAULT_CAP
}

fn default_prestige_ratio() -> u64 {
    DEFAULT_PRESTIGE_RATIO
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_preview_ttl_secs() -> u64 {
    DEFAULT_PREVIEW_TTL_SECS
}

fn default_store_id() -> String {
    "main".to_string()
}

fn default_data_dir() -> String {
    "./bp_data".to_string()
}

impl Default for BpConfig {
    fn default() -> Self {
        Self {
            cap: default_cap(),
            prestige_ratio: default_prestige_ratio(),
            lock_timeout_ms: default_lock_timeout_ms(),
            preview_ttl_secs: default_preview_ttl_secs(),
            store_id: default_store_id(),
            data_dir: default_data_dir(),
        }
    }
}

impl BpConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - BP_CAP: Balance cap
    /// - BP_PRESTIGE_RATIO: Overflow points per prestige
    /// - BP_LOCK_TIMEOUT_MS: Award lock wait in milliseconds
    /// - BP_PREVIEW_TTL_SECS: Preview lifetime in seconds
    /// - BP_STORE_ID: Store id for audit entries
    /// - BP_DATA_DIR: Persistent data directory
    ///
    /// Unparseable numbers fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cap: env_u64("BP_CAP").unwrap_or(defaults.cap),
            prestige_ratio: env_u64("BP_PRESTIGE_RATIO").unwrap_or(defaults.prestige_ratio),
            lock_timeout_ms: env_u64("BP_LOCK_TIMEOUT_MS").unwrap_or(defaults.lock_timeout_ms),
            preview_ttl_secs: env_u64("BP_PREVIEW_TTL_SECS").unwrap_or(defaults.preview_ttl_secs),
            store_id: env::var("BP_STORE_ID").unwrap_or(defaults.store_id),
            data_dir: env::var("BP_DATA_DIR").unwrap_or(defaults.data_dir),
        }
    }

    /// Small lock wait and a distinct store id for tests
    pub fn test() -> Self {
        Self {
            lock_timeout_ms: 200,
            store_id: "test".to_string(),
            ..Self::default()
        }
    }

    pub fn with_cap(mut self, cap: u64) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_lock_timeout_ms(mut self, ms: u64) -> Self {
        self.lock_timeout_ms = ms;
        self
    }

    pub fn with_preview_ttl_secs(mut self, secs: u64) -> Self {
        self.preview_ttl_secs = secs;
        self
    }

    pub fn with_store_id(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = store_id.into();
        self
    }

    pub fn validate(&self) -> BpResult<()> {
        if self.cap == 0 {
            return Err(BpError::Config("cap must be positive".to_string()));
        }
        if self.prestige_ratio == 0 {
            return Err(BpError::Config("prestige_ratio must be positive".to_string()));
        }
        if self.preview_ttl_secs == 0 {
            return Err(BpError::Config("preview_ttl_secs must be positive".to_string()));
        }
        if self.store_id.trim().is_empty() {
            return Err(BpError::Config("store_id must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn preview_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.preview_ttl_secs.min(i64::MAX as u64) as i64)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
