use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
};

use crate::{services::websocket_service, state::SharedState};

/// Largest inbound frame a player may send. Commands are a few dozen bytes.
const MAX_FRAME_BYTES: usize = 4 * 1024;

/// Player entry point: one WebSocket per session.
pub fn router() -> Router<SharedState> {
    Router::new().route("/connect", get(connect))
}

#[utoipa::path(
    get,
    path = "/connect",
    tag = "players",
    responses(
        (status = 101, description = "Upgraded to a player session"),
        (status = 400, description = "Request is not a WebSocket upgrade")
    )
)]
/// Upgrade the request into a player session speaking the JSON or line protocol.
pub async fn connect(State(state): State<SharedState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade
        .max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| websocket_service::handle_socket(state, socket))
}
