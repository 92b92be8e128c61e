use crate::status::IndicatorStatus;

/// Connection lifecycle state of the live-update feed.
///
/// Exactly one state is active at a time. All transitions happen on the
/// background connection task, which serializes them; the public handle
/// observes the current state through an atomic mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport active.
    Disconnected,
    /// Push transport open in flight.
    ConnectingPush,
    /// Live on the push transport.
    ConnectedPush,
    /// Live on the poll transport.
    Polling,
    /// Recovering from a failure; a retry is scheduled.
    Erroring,
}

impl ConnectionState {
    /// Encode for the atomic mirror shared with the public handle.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::ConnectingPush => 1,
            Self::ConnectedPush => 2,
            Self::Polling => 3,
            Self::Erroring => 4,
        }
    }

    /// Decode from the atomic mirror. Unknown encodings read as
    /// `Disconnected`; the mirror is only ever written by `as_u8`.
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::ConnectingPush,
            2 => Self::ConnectedPush,
            3 => Self::Polling,
            4 => Self::Erroring,
            _ => Self::Disconnected,
        }
    }

    /// True in any state other than `Disconnected`.
    pub fn is_active(self) -> bool {
        self != Self::Disconnected
    }

    /// The cosmetic indicator value for this state.
    pub(crate) fn indicator(self) -> IndicatorStatus {
        match self {
            Self::Disconnected => IndicatorStatus::Disconnected,
            Self::ConnectingPush => IndicatorStatus::Error,
            Self::ConnectedPush => IndicatorStatus::Connected,
            Self::Polling => IndicatorStatus::Polling,
            Self::Erroring => IndicatorStatus::Error,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::ConnectingPush => "connecting_push",
            Self::ConnectedPush => "connected_push",
            Self::Polling => "polling",
            Self::Erroring => "erroring",
        };
        write!(f, "{}", s)
    }
}
