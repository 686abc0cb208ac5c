use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document covering the health, room listing and player endpoints.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::websocket::connect,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomSummary,
            crate::dto::room::RoomListResponse,
            crate::dto::phase::VisibleRoomPhase,
            crate::dto::ws::SocketRequest,
            crate::dto::ws::SocketPayload,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Game room listing"),
        (name = "players", description = "WebSocket sessions for players"),
    )
)]
pub struct ApiDoc;
