use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Lifecycle status of a tournament.
///
/// Live updates are only meaningful while a tournament is in `CheckIn` or
/// `InProgress`; `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    CheckIn,
    InProgress,
    Completed,
    Cancelled,
    /// Status value this client version does not recognize.
    #[serde(other)]
    Unknown,
}

impl TournamentStatus {
    /// Returns true while the tournament can still produce live updates.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::CheckIn | Self::InProgress)
    }

    /// Returns true once no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CheckIn => "check_in",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Server-owned snapshot of a single match.
///
/// The client never interprets or mutates the fields; it forwards the record
/// to subscribers as-is. The server controls the shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchSnapshot(pub Map<String, JsonValue>);

/// Server-owned snapshot of a single participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantSnapshot(pub Map<String, JsonValue>);

/// Server-owned snapshot of tournament statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsSnapshot(pub Map<String, JsonValue>);

macro_rules! snapshot_accessors {
    ($ty:ident) => {
        impl $ty {
            /// Look up a field by key.
            pub fn get(&self, key: &str) -> Option<&JsonValue> {
                self.0.get(key)
            }

            /// The underlying field map.
            pub fn as_map(&self) -> &Map<String, JsonValue> {
                &self.0
            }
        }
    };
}

snapshot_accessors!(MatchSnapshot);
snapshot_accessors!(ParticipantSnapshot);
snapshot_accessors!(StatisticsSnapshot);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_live_and_terminal_partition() {
        assert!(TournamentStatus::CheckIn.is_live());
        assert!(TournamentStatus::InProgress.is_live());
        assert!(!TournamentStatus::Completed.is_live());
        assert!(!TournamentStatus::Cancelled.is_live());

        assert!(TournamentStatus::Completed.is_terminal());
        assert!(TournamentStatus::Cancelled.is_terminal());
        assert!(!TournamentStatus::InProgress.is_terminal());
        assert!(!TournamentStatus::Unknown.is_live());
        assert!(!TournamentStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_status_wire_format_is_snake_case() {
        let status: TournamentStatus = serde_json::from_value(json!("in_progress")).unwrap();
        assert_eq!(status, TournamentStatus::InProgress);

        let status: TournamentStatus = serde_json::from_value(json!("check_in")).unwrap();
        assert_eq!(status, TournamentStatus::CheckIn);

        // Forward-compatible: unrecognized statuses parse instead of failing.
        let status: TournamentStatus = serde_json::from_value(json!("archived")).unwrap();
        assert_eq!(status, TournamentStatus::Unknown);
    }

    #[test]
    fn test_snapshots_are_transparent_records() {
        let snap: StatisticsSnapshot =
            serde_json::from_value(json!({"matches_played": 12, "upsets": 3})).unwrap();
        assert_eq!(snap.get("matches_played"), Some(&json!(12)));
        assert_eq!(snap.as_map().len(), 2);

        // Round-trips without the client touching the shape.
        let back = serde_json::to_value(&snap).unwrap();
        assert_eq!(back, json!({"matches_played": 12, "upsets": 3}));
    }
}
