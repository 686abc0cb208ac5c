use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::RoundState;

/// Room state exposed to clients over REST.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// Waiting for enough players to join.
    WaitingForPlayers,
    /// Waiting for every seated player to signal ready.
    WaitingForReady,
    /// Round in progress.
    Running,
    /// Round finished.
    Over,
}

impl From<RoundState> for VisibleRoomPhase {
    fn from(value: RoundState) -> Self {
        match value {
            RoundState::WaitingForPlayers => VisibleRoomPhase::WaitingForPlayers,
            RoundState::WaitingForReady => VisibleRoomPhase::WaitingForReady,
            RoundState::Running => VisibleRoomPhase::Running,
            RoundState::Over => VisibleRoomPhase::Over,
        }
    }
}
