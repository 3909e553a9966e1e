//! Award Lock
//!
//! One lock serializes every award and resync across all players. Waiting is
//! bounded; a timed-out caller gets `LockTimeout` and has mutated nothing.

use bp_core::{BpError, BpResult};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Held for the duration of one pipeline run
pub type AwardGuard<'a> = MutexGuard<'a, ()>;

#[derive(Debug)]
pub struct AwardLock {
    inner: Mutex<()>,
    timeout: Duration,
}

impl AwardLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait at most the configured timeout
    pub async fn acquire(&self) -> BpResult<AwardGuard<'_>> {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.inner.lock()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!(waited_ms, "Award lock not acquired");
                Err(BpError::LockTimeout { waited_ms })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_free_lock() {
        let lock = AwardLock::new(Duration::from_millis(50));
        assert!(lock.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_while_held() {
        let lock = AwardLock::new(Duration::from_millis(30));
        let _held = lock.acquire().await.unwrap();

        let err = lock.acquire().await.unwrap_err();
        assert!(matches!(err, BpError::LockTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let lock = AwardLock::new(Duration::from_millis(30));
        {
            let _held = lock.acquire().await.unwrap();
        }
        assert!(lock.acquire().await.is_ok());
    }
}
