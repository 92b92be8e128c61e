use super::snapshots::{
    MatchSnapshot, ParticipantSnapshot, StatisticsSnapshot, TournamentStatus,
};

/// Normalized update event delivered to subscribers.
///
/// Events originate from either transport (push frame or poll response) and
/// are dispatched to handlers registered for the matching [`UpdateEventKind`].
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// A single match changed.
    MatchUpdate { match_data: MatchSnapshot },

    /// A single participant changed.
    ParticipantUpdate { participant: ParticipantSnapshot },

    /// The tournament itself changed (status, optionally fresh statistics).
    TournamentUpdate {
        status: TournamentStatus,
        statistics: Option<StatisticsSnapshot>,
    },

    /// Fresh statistics snapshot (also synthesized from poll responses).
    StatisticsUpdate { statistics: StatisticsSnapshot },

    /// Complete refresh of the tournament page state.
    FullUpdate {
        live_matches: Vec<MatchSnapshot>,
        recent_matches: Vec<MatchSnapshot>,
        upcoming_matches: Vec<MatchSnapshot>,
        statistics: StatisticsSnapshot,
        participants: Vec<ParticipantSnapshot>,
    },

    /// The tournament reached a terminal status; the feed shuts down after
    /// emitting this exactly once.
    TournamentEnded { status: TournamentStatus },

    /// Liveness marker; refreshes the last-update timestamp, carries no state.
    Heartbeat,

    /// Server-reported error, forwarded verbatim.
    Error { message: String },

    /// Wire message with an unrecognized `type` tag. Logged and dropped
    /// before dispatch; kept explicit so new server message types are
    /// visible in logs rather than silently swallowed.
    Unknown { raw_type: String },
}

impl UpdateEvent {
    /// The subscription kind this event dispatches to.
    ///
    /// `None` for [`UpdateEvent::Unknown`], which is never dispatched.
    pub fn kind(&self) -> Option<UpdateEventKind> {
        match self {
            Self::MatchUpdate { .. } => Some(UpdateEventKind::MatchUpdate),
            Self::ParticipantUpdate { .. } => Some(UpdateEventKind::ParticipantUpdate),
            Self::TournamentUpdate { .. } => Some(UpdateEventKind::TournamentUpdate),
            Self::StatisticsUpdate { .. } => Some(UpdateEventKind::StatisticsUpdate),
            Self::FullUpdate { .. } => Some(UpdateEventKind::FullUpdate),
            Self::TournamentEnded { .. } => Some(UpdateEventKind::TournamentEnded),
            Self::Heartbeat => Some(UpdateEventKind::Heartbeat),
            Self::Error { .. } => Some(UpdateEventKind::Error),
            Self::Unknown { .. } => None,
        }
    }
}

/// Field-less discriminant of [`UpdateEvent`], used as the subscription key
/// for [`LiveUpdatesManager::on`](crate::LiveUpdatesManager::on) /
/// [`off`](crate::LiveUpdatesManager::off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateEventKind {
    MatchUpdate,
    ParticipantUpdate,
    TournamentUpdate,
    StatisticsUpdate,
    FullUpdate,
    TournamentEnded,
    Heartbeat,
    Error,
}

impl UpdateEventKind {
    /// The snake_case wire tag for this kind.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::MatchUpdate => "match_update",
            Self::ParticipantUpdate => "participant_update",
            Self::TournamentUpdate => "tournament_update",
            Self::StatisticsUpdate => "statistics_update",
            Self::FullUpdate => "full_update",
            Self::TournamentEnded => "tournament_ended",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
        }
    }

    /// Resolve a wire tag to a kind, if recognized.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "match_update" => Some(Self::MatchUpdate),
            "participant_update" => Some(Self::ParticipantUpdate),
            "tournament_update" => Some(Self::TournamentUpdate),
            "statistics_update" => Some(Self::StatisticsUpdate),
            "full_update" => Some(Self::FullUpdate),
            "tournament_ended" => Some(Self::TournamentEnded),
            "heartbeat" => Some(Self::Heartbeat),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for UpdateEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_round_trip() {
        let kinds = [
            UpdateEventKind::MatchUpdate,
            UpdateEventKind::ParticipantUpdate,
            UpdateEventKind::TournamentUpdate,
            UpdateEventKind::StatisticsUpdate,
            UpdateEventKind::FullUpdate,
            UpdateEventKind::TournamentEnded,
            UpdateEventKind::Heartbeat,
            UpdateEventKind::Error,
        ];
        for kind in kinds {
            assert_eq!(UpdateEventKind::from_tag(kind.as_tag()), Some(kind));
        }
        assert_eq!(UpdateEventKind::from_tag("bracket_reseeded"), None);
    }

    #[test]
    fn test_unknown_events_have_no_dispatch_kind() {
        let event = UpdateEvent::Unknown {
            raw_type: "bracket_reseeded".to_string(),
        };
        assert!(event.kind().is_none());

        assert_eq!(
            UpdateEvent::Heartbeat.kind(),
            Some(UpdateEventKind::Heartbeat)
        );
    }
}
