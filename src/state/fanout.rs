use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::{dto::ws::OutboundFrame, state::SessionConnection};

/// A session seated in a room.
#[derive(Debug, Clone)]
pub struct Member {
    /// Player identifier (the session identifier).
    pub player_id: String,
    /// Outbound queue of the member's session.
    pub connection: SessionConnection,
}

/// Push `frame` to every member without waiting on any of them.
///
/// A member whose queue is full, or already closed, is removed from `members`
/// and its identifier returned; the room's clone of its sender is dropped with
/// it so the room never writes to that queue again.
pub fn broadcast(room: &str, members: &mut Vec<Member>, frame: &OutboundFrame) -> Vec<String> {
    let mut dropped = Vec::new();

    members.retain(|member| match member.connection.tx.try_send(frame.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(
                room = %room,
                player = %member.player_id,
                "outbound queue full; dropping slow member from room"
            );
            dropped.push(member.player_id.clone());
            false
        }
        Err(TrySendError::Closed(_)) => {
            warn!(
                room = %room,
                player = %member.player_id,
                "outbound queue closed; dropping member from room"
            );
            dropped.push(member.player_id.clone());
            false
        }
    });

    dropped
}
