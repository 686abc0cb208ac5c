//! Normalization of the two inbound protocols (JSON envelope and slash lines)
//! into a single [`SessionCommand`].

use thiserror::Error;

use crate::{dto::ws::SocketRequest, state::board::input_for_hit};

/// Command a session can dispatch, independent of the wire protocol it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Set the display name; joins a room named after it when not seated yet.
    Connect { name: String },
    /// Join (or create) the named room.
    Join { room: String },
    /// Signal readiness in the current room.
    Ready,
    /// Leave the current room.
    Leave,
    /// Game input for the current round.
    Input(String),
}

/// Reasons an inbound frame could not be turned into a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty frame")]
    Empty,
    #[error("malformed command envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("command `{command}` is missing its `{argument}` argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("hit code {0} does not map to a grid cell")]
    InvalidHit(i64),
}

/// Parse a raw text frame.
///
/// Frames starting with `{` must be a JSON [`SocketRequest`]; anything else is
/// read as a whitespace-separated line where `/join <room>`, `/ready` and
/// `/leave` are commands and every other line is game input.
pub fn parse_frame(text: &str) -> Result<SessionCommand, CommandError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CommandError::Empty);
    }
    if trimmed.starts_with('{') {
        let request: SocketRequest = serde_json::from_str(trimmed)?;
        return from_envelope(request);
    }
    parse_line(trimmed)
}

fn from_envelope(request: SocketRequest) -> Result<SessionCommand, CommandError> {
    let SocketRequest { command, payload } = request;
    match command.as_str() {
        "connect" => {
            let name = required(payload.name, "connect", "name")?;
            Ok(SessionCommand::Connect { name })
        }
        "join" => {
            let room = required(payload.room_name, "join", "roomName")?;
            Ok(SessionCommand::Join { room })
        }
        "ready" => Ok(SessionCommand::Ready),
        "leave" => Ok(SessionCommand::Leave),
        "send" => {
            let hit = payload.hit.ok_or(CommandError::MissingArgument {
                command: "send",
                argument: "hit",
            })?;
            let key = input_for_hit(hit).ok_or(CommandError::InvalidHit(hit))?;
            Ok(SessionCommand::Input(key.to_string()))
        }
        _ => Err(CommandError::UnknownCommand(command)),
    }
}

fn parse_line(line: &str) -> Result<SessionCommand, CommandError> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("/join") => {
            let room = parts.next().ok_or(CommandError::MissingArgument {
                command: "join",
                argument: "room",
            })?;
            Ok(SessionCommand::Join {
                room: room.to_string(),
            })
        }
        Some("/ready") => Ok(SessionCommand::Ready),
        Some("/leave") => Ok(SessionCommand::Leave),
        _ => Ok(SessionCommand::Input(line.to_string())),
    }
}

fn required(
    value: String,
    command: &'static str,
    argument: &'static str,
) -> Result<String, CommandError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandError::MissingArgument { command, argument });
    }
    Ok(value.to_string())
}
