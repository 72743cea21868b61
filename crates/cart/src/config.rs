//! Cart store configuration.

use std::time::Duration;

/// Storage key the cart snapshot is written under.
pub const CART_STORAGE_KEY: &str = "@GoMarketplace:products";

/// What hydration does when the stored value cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptSnapshotPolicy {
    /// Surface `CartError::CorruptPersistedData` to the caller of `hydrate`.
    #[default]
    Fail,
    /// Log a warning and start from an empty cart. The stored value is left
    /// as is until the next mutation overwrites it.
    Reset,
}

/// Retry schedule for durable writes.
///
/// Delays double after every failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRetryPolicy {
    /// Total number of attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl WriteRetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        }
    }

    /// A single attempt and no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for WriteRetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50), Duration::from_secs(1))
    }
}

/// Configuration for a [`CartStore`](crate::CartStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    pub storage_key: String,
    pub write_retry: WriteRetryPolicy,
    pub corrupt_policy: CorruptSnapshotPolicy,
}

impl CartConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Uses a different write retry policy.
    pub fn with_write_retry(mut self, policy: WriteRetryPolicy) -> Self {
        self.write_retry = policy;
        self
    }

    /// Uses a different corrupt-data policy.
    pub fn with_corrupt_policy(mut self, policy: CorruptSnapshotPolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: CART_STORAGE_KEY.to_string(),
            write_retry: WriteRetryPolicy::default(),
            corrupt_policy: CorruptSnapshotPolicy::default(),
        }
    }
}
