//! Connection lifecycle for the live-update feed.
//!
//! This module contains:
//! - [`state`]: the connection state machine's states
//! - [`manager`]: the public [`LiveUpdatesManager`] handle and its builder
//! - `task`: the background task that owns all connection state and
//!   serializes every transition

pub mod manager;
pub mod state;
pub(crate) mod task;

pub use manager::{LiveUpdatesManager, LiveUpdatesManagerBuilder};
pub use state::ConnectionState;

/// Capacity of the command channel between the handle and the task.
pub(crate) const CMD_CHANNEL_CAPACITY: usize = 64;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
pub(crate) const FAR_FUTURE: std::time::Duration =
    std::time::Duration::from_secs(100 * 365 * 24 * 3600);
