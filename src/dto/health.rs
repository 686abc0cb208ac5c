use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status (always "ok" while the process serves requests).
    pub status: String,
    /// Number of rooms currently registered.
    pub rooms: usize,
    /// Number of sessions currently connected.
    pub sessions: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(rooms: usize, sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            sessions,
        }
    }
}
