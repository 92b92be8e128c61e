//! Optional connection status indicator.
//!
//! Purely cosmetic: the manager reports coarse connection health to an
//! injected sink (a DOM badge, a TUI widget, a log line). Correctness never
//! depends on it.

/// Coarse connection health shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStatus {
    /// Live via the push transport.
    Connected,
    /// Degraded to periodic polling.
    Polling,
    /// Reconnecting after a failure.
    Error,
    /// No transport active.
    Disconnected,
}

impl std::fmt::Display for IndicatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Polling => "polling",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// Sink for status indicator updates.
pub trait StatusSink: Send + Sync {
    /// Called on every status change.
    fn status_changed(&self, status: IndicatorStatus);

    /// Called once when the manager is destroyed and the indicator should be
    /// removed entirely.
    fn cleared(&self) {}
}

/// A [`StatusSink`] that writes status changes to the log.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn status_changed(&self, status: IndicatorStatus) {
        log::info!("[arena-link] connection status: {}", status);
    }
}
