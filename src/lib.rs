//! # arena-link
//!
//! Rust client for the Arena tournament platform's live-update feed.
//!
//! The central type is [`LiveUpdatesManager`]: one per tournament page view.
//! It keeps a near-real-time feed of tournament state flowing to subscribers,
//! transparently switching between a push transport (WebSocket) and a pull
//! transport (HTTP polling), with fixed-delay reconnection and
//! visibility-aware throttling. Failures degrade the feed; they never
//! surface as panics or unhandled errors.
//!
//! ```rust,no_run
//! use arena_link::{LiveUpdatesManager, TournamentStatus, UpdateEvent, UpdateEventKind};
//!
//! # async fn example() -> arena_link::Result<()> {
//! let manager = LiveUpdatesManager::builder("t-42", TournamentStatus::InProgress)
//!     .base_url("https://arena.example")
//!     .build()?;
//!
//! manager.on(UpdateEventKind::StatisticsUpdate, |event| {
//!     if let UpdateEvent::StatisticsUpdate { statistics } = event {
//!         println!("stats: {:?}", statistics);
//!     }
//! });
//!
//! manager.start().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod status;
pub mod transport;

pub use connection::{ConnectionState, LiveUpdatesManager, LiveUpdatesManagerBuilder};
pub use error::{ArenaLinkError, Result};
pub use event_handlers::HandlerId;
pub use models::{
    ConnectionOptions, MatchSnapshot, ParticipantSnapshot, PollSnapshot, ServerMessage,
    StatisticsSnapshot, TournamentStatus, UpdateEvent, UpdateEventKind,
};
pub use status::{IndicatorStatus, LogStatusSink, StatusSink};
pub use transport::{
    AuthContext, HttpPoll, PollTransport, PushStream, PushTransport, WebSocketPush,
};
