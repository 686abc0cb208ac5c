use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::board::GameBoard;

/// Lifecycle notice broadcast when a round begins.
pub const GAME_STARTED_NOTICE: &str = "Game started";
/// Lifecycle notice broadcast when a round ends.
pub const GAME_OVER_NOTICE: &str = "Game is over";
/// Acknowledgement sent back to a session for every dispatched command.
pub const ACK_NOTICE: &str = "Acked";

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Arguments carried by a structured command envelope.
pub struct SocketPayload {
    /// Display name (used by `connect`).
    #[serde(default)]
    pub name: String,
    /// Room to join (used by `join`).
    #[serde(default)]
    pub room_name: String,
    /// Grid cell hit, 0 to 8 row by row (used by `send`).
    #[serde(default)]
    pub hit: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Structured command envelope accepted on the game WebSocket.
///
/// Plain text lines of the form `/join <room>`, `/ready` or `/leave` are
/// accepted as well; any other line is treated as game input.
pub struct SocketRequest {
    /// One of `connect`, `join`, `ready`, `leave` or `send`.
    pub command: String,
    #[serde(default)]
    pub payload: SocketPayload,
}

/// Frame decoded by the transport from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text frame carrying a command.
    Text(String),
    /// The peer closed the connection.
    Close,
}

/// Frame queued for delivery to a session's peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Board snapshot, delivered as JSON.
    Board(GameBoard),
    /// Plain-text notice, acknowledgement or error.
    Notice(String),
}

impl OutboundFrame {
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice(text.into())
    }

    /// Encode the frame as the text the transport writes to the wire.
    ///
    /// Returns `None` when a board cannot be serialized; the failure is logged
    /// and the frame skipped.
    pub fn encode(&self) -> Option<String> {
        match self {
            OutboundFrame::Notice(text) => Some(text.clone()),
            OutboundFrame::Board(board) => match serde_json::to_string(board) {
                Ok(json) => Some(json),
                Err(err) => {
                    warn!(error = %err, "failed to serialize board snapshot");
                    None
                }
            },
        }
    }
}
