//! Wire-level payloads exchanged over REST and the game WebSocket.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod health;
pub mod phase;
pub mod room;
pub mod ws;

/// Render a wall-clock instant as an RFC 3339 string for JSON payloads.
fn rfc3339(time: SystemTime) -> String {
    match OffsetDateTime::from(time).format(&Rfc3339) {
        Ok(text) => text,
        Err(_) => String::from("invalid-timestamp"),
    }
}
