use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection-level options for the live-update feed.
///
/// Controls transport selection, poll cadence, and the reconnect policy.
///
/// # Example
///
/// ```rust
/// use arena_link::ConnectionOptions;
///
/// let options = ConnectionOptions::new()
///     .with_enable_push(false)
///     .with_polling_interval_ms(10_000)
///     .with_max_reconnect_attempts(5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Prefer the push transport when one is available.
    /// Default: true
    #[serde(default = "default_enable_push")]
    pub enable_push: bool,

    /// Allow falling back to (or running on) the poll transport.
    /// Default: true
    #[serde(default = "default_enable_polling")]
    pub enable_polling: bool,

    /// Interval between poll requests in milliseconds. Doubled while the
    /// page is hidden.
    /// Default: 30000ms (30 seconds)
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Fixed delay in milliseconds between reconnection attempts.
    /// Default: 5000ms (5 seconds)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Number of consecutive failures after which the manager stops retrying
    /// the failing transport and settles on polling permanently.
    /// Default: 10
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Cap on opening the push transport, in milliseconds. An open that
    /// exceeds this counts as an open failure.
    /// Default: 10000ms (10 seconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_enable_push() -> bool {
    true
}

fn default_enable_polling() -> bool {
    true
}

fn default_polling_interval_ms() -> u64 {
    30_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            enable_push: true,
            enable_polling: true,
            polling_interval_ms: 30_000,
            reconnect_delay_ms: 5_000,
            max_reconnect_attempts: 10,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ConnectionOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the push transport is preferred when available.
    pub fn with_enable_push(mut self, enabled: bool) -> Self {
        self.enable_push = enabled;
        self
    }

    /// Set whether the poll transport may be used.
    pub fn with_enable_polling(mut self, enabled: bool) -> Self {
        self.enable_polling = enabled;
        self
    }

    /// Set the poll interval in milliseconds.
    pub fn with_polling_interval_ms(mut self, interval_ms: u64) -> Self {
        self.polling_interval_ms = interval_ms;
        self
    }

    /// Set the fixed delay between reconnection attempts in milliseconds.
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the reconnect attempt ceiling.
    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Set the push transport open timeout in milliseconds.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Poll interval as a [`Duration`].
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Push open timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
