use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ArenaLinkError, Result};

use super::snapshots::{
    MatchSnapshot, ParticipantSnapshot, StatisticsSnapshot, TournamentStatus,
};
use super::update_event::{UpdateEvent, UpdateEventKind};

/// Wire messages sent from server to client.
///
/// The same format is used on both transports: a JSON object with a required
/// `type` discriminant in snake_case and a payload whose shape depends on the
/// tag. Use [`parse_message`] rather than deserializing this enum directly —
/// it distinguishes unrecognized tags (forward-compatible drop) from
/// malformed payloads (parse errors).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A single match changed.
    MatchUpdate { r#match: MatchSnapshot },

    /// A single participant changed.
    ParticipantUpdate { participant: ParticipantSnapshot },

    /// Tournament-level change, optionally with fresh statistics.
    TournamentUpdate {
        status: TournamentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        statistics: Option<StatisticsSnapshot>,
    },

    /// Fresh statistics snapshot.
    StatisticsUpdate { statistics: StatisticsSnapshot },

    /// Complete refresh of the tournament page state.
    FullUpdate {
        live_matches: Vec<MatchSnapshot>,
        recent_matches: Vec<MatchSnapshot>,
        upcoming_matches: Vec<MatchSnapshot>,
        statistics: StatisticsSnapshot,
        participants: Vec<ParticipantSnapshot>,
    },

    /// The tournament reached a terminal status. The only server-driven
    /// terminal transition: the client disconnects and emits
    /// [`UpdateEvent::TournamentEnded`] exactly once.
    TournamentEnded { status: TournamentStatus },

    /// Liveness marker.
    Heartbeat,

    /// Server-reported error.
    Error { message: String },
}

impl From<ServerMessage> for UpdateEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::MatchUpdate { r#match } => UpdateEvent::MatchUpdate {
                match_data: r#match,
            },
            ServerMessage::ParticipantUpdate { participant } => {
                UpdateEvent::ParticipantUpdate { participant }
            }
            ServerMessage::TournamentUpdate { status, statistics } => {
                UpdateEvent::TournamentUpdate { status, statistics }
            }
            ServerMessage::StatisticsUpdate { statistics } => {
                UpdateEvent::StatisticsUpdate { statistics }
            }
            ServerMessage::FullUpdate {
                live_matches,
                recent_matches,
                upcoming_matches,
                statistics,
                participants,
            } => UpdateEvent::FullUpdate {
                live_matches,
                recent_matches,
                upcoming_matches,
                statistics,
                participants,
            },
            ServerMessage::TournamentEnded { status } => {
                UpdateEvent::TournamentEnded { status }
            }
            ServerMessage::Heartbeat => UpdateEvent::Heartbeat,
            ServerMessage::Error { message } => UpdateEvent::Error { message },
        }
    }
}

/// Parse one inbound wire message into an [`UpdateEvent`].
///
/// - Malformed JSON, a missing `type` field, or a bad payload for a known tag
///   is a [`ArenaLinkError::ParseError`]. The caller logs and drops it.
/// - A well-formed message with an unrecognized tag parses to
///   [`UpdateEvent::Unknown`] so new server message types degrade to a logged
///   drop instead of an error.
pub fn parse_message(text: &str) -> Result<UpdateEvent> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| ArenaLinkError::ParseError(format!("invalid JSON: {}", e)))?;

    let tag = value
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| {
            ArenaLinkError::ParseError("message has no string `type` field".to_string())
        })?
        .to_string();

    match serde_json::from_value::<ServerMessage>(value) {
        Ok(msg) => Ok(msg.into()),
        Err(e) => {
            if UpdateEventKind::from_tag(&tag).is_none() {
                Ok(UpdateEvent::Unknown { raw_type: tag })
            } else {
                Err(ArenaLinkError::ParseError(format!(
                    "malformed '{}' message: {}",
                    tag, e
                )))
            }
        }
    }
}
