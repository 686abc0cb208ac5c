/// Normalization of inbound frames into session commands.
pub mod command;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only projections of the room registry.
pub mod room_service;
/// Per-connection session actor.
pub mod session;
/// WebSocket connection adapter for sessions.
pub mod websocket_service;
