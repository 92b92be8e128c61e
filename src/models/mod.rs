//! Data models for the arena-link client library.
//!
//! Defines the wire messages exchanged with the tournament server, the
//! normalized events delivered to subscribers, and the connection options.

pub mod connection_options;
pub mod poll_response;
pub mod server_message;
pub mod snapshots;
pub mod update_event;

pub use connection_options::ConnectionOptions;
pub use poll_response::PollSnapshot;
pub use server_message::{parse_message, ServerMessage};
pub use snapshots::{
    MatchSnapshot, ParticipantSnapshot, StatisticsSnapshot, TournamentStatus,
};
pub use update_event::{UpdateEvent, UpdateEventKind};
