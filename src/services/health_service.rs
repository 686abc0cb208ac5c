use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload carrying room and session counts.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.registry().len().await;
    HealthResponse::ok(rooms, state.sessions().len())
}
