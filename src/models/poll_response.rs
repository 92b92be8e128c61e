use serde::{Deserialize, Serialize};

use super::snapshots::{StatisticsSnapshot, TournamentStatus};

/// Response body of the poll endpoint
/// (`GET …/tournaments/{id}/stats`).
///
/// `success = false` is treated by the manager as a fetch failure, exactly
/// like a non-2xx response or a network error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub success: bool,

    #[serde(default)]
    pub statistics: StatisticsSnapshot,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TournamentStatus>,

    /// Server-side epoch millis at snapshot time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl PollSnapshot {
    /// A successful snapshot carrying the given statistics (test scaffolding
    /// and internal defaults).
    pub fn ok(statistics: StatisticsSnapshot) -> Self {
        Self {
            success: true,
            statistics,
            status: None,
            timestamp: None,
        }
    }
}
