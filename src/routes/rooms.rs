use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::room::{RoomListQuery, RoomListResponse, RoomSummary},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Read-only endpoints describing the rooms known to the registry.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{name}", get(get_room))
}

#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    params(RoomListQuery),
    responses(
        (status = 200, description = "One page of rooms", body = RoomListResponse),
        (status = 400, description = "Invalid pagination parameters")
    )
)]
/// Return the rooms on the requested zero-based page.
pub async fn list_rooms(
    State(state): State<SharedState>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<RoomListResponse>, AppError> {
    let payload = room_service::list_rooms(&state, query).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{name}",
    tag = "rooms",
    params(("name" = String, Path, description = "Room name")),
    responses(
        (status = 200, description = "Room summary", body = RoomSummary),
        (status = 404, description = "No room with this name")
    )
)]
/// Return a single room by name.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let payload = room_service::get_room(&state, &name).await?;
    Ok(Json(payload))
}
