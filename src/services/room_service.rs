//! Service helpers that expose read-only projections of the room registry.

use validator::Validate;

use crate::{
    dto::room::{RoomListQuery, RoomListResponse, RoomSummary},
    error::ServiceError,
    state::{Room, SharedState},
};

/// Return one page of rooms. Pages past the end are empty, not an error.
pub async fn list_rooms(
    state: &SharedState,
    query: RoomListQuery,
) -> Result<RoomListResponse, ServiceError> {
    query.validate()?;

    let registry = state.registry();
    let total = registry.len().await;
    let mut rooms = Vec::new();
    for room in registry.list(query.page, query.limit).await {
        rooms.push(summarize(&room).await);
    }

    Ok(RoomListResponse {
        rooms,
        page: query.page,
        limit: query.limit,
        total,
    })
}

/// Return the summary of a single room by name.
pub async fn get_room(state: &SharedState, name: &str) -> Result<RoomSummary, ServiceError> {
    let room = state
        .registry()
        .get(name)
        .await
        .ok_or_else(|| ServiceError::RoomNotFound(name.to_string()))?;
    Ok(summarize(&room).await)
}

async fn summarize(room: &Room) -> RoomSummary {
    (room.snapshot().await, room.created_at()).into()
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        dto::{phase::VisibleRoomPhase, ws::OutboundFrame},
        state::{AppState, SessionConnection},
    };

    async fn seed(state: &SharedState, names: &[&str]) -> Vec<mpsc::Receiver<OutboundFrame>> {
        let mut receivers = Vec::new();
        for name in names {
            let (tx, rx) = mpsc::channel(4);
            receivers.push(rx);
            let connection = SessionConnection {
                id: format!("{name}-host"),
                name: name.to_string(),
                tx,
            };
            state
                .registry()
                .join_or_create(name, connection)
                .await
                .unwrap();
        }
        receivers
    }

    #[tokio::test]
    async fn listing_paginates_with_zero_based_pages() {
        let state = AppState::new(AppConfig::default());
        let _rx = seed(&state, &["a", "b", "c"]).await;

        let page = list_rooms(&state, RoomListQuery { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rooms.len(), 1);
        assert_eq!(page.rooms[0].name, "c");
        assert_eq!(page.rooms[0].state, VisibleRoomPhase::WaitingForPlayers);
        assert_eq!(page.rooms[0].players, ["c-host"]);

        let empty = list_rooms(&state, RoomListQuery { page: 9, limit: 2 })
            .await
            .unwrap();
        assert!(empty.rooms.is_empty());
    }

    #[tokio::test]
    async fn invalid_page_size_is_rejected() {
        let state = AppState::new(AppConfig::default());
        let err = list_rooms(&state, RoomListQuery { page: 0, limit: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let state = AppState::new(AppConfig::default());
        let err = get_room(&state, "nowhere").await.unwrap_err();
        assert!(matches!(err, ServiceError::RoomNotFound(_)));
    }
}
