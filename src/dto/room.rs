use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::{phase::VisibleRoomPhase, rfc3339},
    state::state_machine::RoomSnapshot,
};

/// Default page size used when the query does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Pagination parameters for the room listing.
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct RoomListQuery {
    /// Zero-based page number.
    #[serde(default)]
    pub page: usize,
    /// Number of rooms per page.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,
}

/// Public description of a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    pub name: String,
    pub state: VisibleRoomPhase,
    pub min_players: usize,
    pub max_players: usize,
    /// Seated player identifiers, in join order.
    pub players: Vec<String>,
    /// Players that signaled ready (only while waiting for ready).
    pub ready_players: Vec<String>,
    /// Remaining round time in milliseconds once a round has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
    /// Current scores once a round has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<std::collections::HashMap<String, u32>>)]
    pub scores: Option<IndexMap<String, u32>>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<(RoomSnapshot, SystemTime)> for RoomSummary {
    fn from((snapshot, created_at): (RoomSnapshot, SystemTime)) -> Self {
        Self {
            name: snapshot.name,
            state: snapshot.state.into(),
            min_players: snapshot.min_players,
            max_players: snapshot.max_players,
            players: snapshot.players,
            ready_players: snapshot.ready_players,
            remaining_ms: snapshot.remaining_ms,
            scores: snapshot.board.map(|board| board.scores),
            created_at: rfc3339(created_at),
        }
    }
}

/// One page of the room listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
    pub page: usize,
    pub limit: usize,
    /// Total number of rooms known to the registry.
    pub total: usize,
}
