//! Per-connection session actor.
//!
//! A session runs two loops: the inbound loop reads one frame at a time and
//! dispatches it against the session's room, while a separate writer task
//! drains the session's bounded outbound queue into the transport. The loops
//! only talk through that queue and a shutdown signal.

use std::{
    fmt::Display,
    pin::pin,
    time::{SystemTime, UNIX_EPOCH},
};

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ACK_NOTICE, InboundFrame, OutboundFrame},
    services::command::{SessionCommand, parse_frame},
    state::{Room, RoomError, RoomRegistry, SessionConnection, SharedState, action_log::Action},
};

/// Server-side state of one connected player.
pub struct Session {
    id: String,
    name: String,
    room: Option<Room>,
    outbox: mpsc::Sender<OutboundFrame>,
}

impl Session {
    /// Create a session with a bounded outbound queue of `capacity` frames.
    ///
    /// The returned receiver is the only consumer of that queue.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (outbox, outbox_rx) = mpsc::channel(capacity.max(1));
        let session = Self {
            id: id.into(),
            name: name.into(),
            room: None,
            outbox,
        };
        (session, outbox_rx)
    }

    /// Create a session with a random identifier and a placeholder display name.
    pub fn anonymous(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let id = Uuid::new_v4().simple().to_string();
        let name = format!("player-{}", &id[..6]);
        Self::new(id, name, capacity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Handle rooms use to push frames to this session.
    pub fn connection(&self) -> SessionConnection {
        SessionConnection {
            id: self.id.clone(),
            name: self.name.clone(),
            tx: self.outbox.clone(),
        }
    }

    /// Parse and dispatch one raw text frame.
    ///
    /// Malformed frames are logged and ignored; they never end the session.
    pub async fn handle_text(&mut self, registry: &RoomRegistry, text: &str) {
        match parse_frame(text) {
            Ok(command) => self.dispatch(registry, command).await,
            Err(err) => {
                warn!(session = %self.id, error = %err, "ignoring malformed command");
            }
        }
    }

    /// Execute a command, then acknowledge it on the session's own queue.
    pub async fn dispatch(&mut self, registry: &RoomRegistry, command: SessionCommand) {
        match command {
            SessionCommand::Connect { name } => {
                self.name = name;
                info!(session = %self.id, name = %self.name, "session name set");
                if self.room.is_none() {
                    let room = self.name.clone();
                    self.join(registry, &room).await;
                }
            }
            SessionCommand::Join { room } => self.join(registry, &room).await,
            SessionCommand::Ready => match &self.room {
                Some(room) => {
                    if room.mark_ready(&self.id).await {
                        info!(session = %self.id, room = %room.name(), "player is ready");
                    }
                }
                None => debug!(session = %self.id, "ready ignored; not in a room"),
            },
            SessionCommand::Leave => self.leave_room().await,
            SessionCommand::Input(input) => {
                if let Some(room) = &self.room {
                    let action = Action {
                        timestamp_ms: now_millis(),
                        player_id: self.id.clone(),
                        input,
                    };
                    if !room.record_action(action).await {
                        debug!(session = %self.id, room = %room.name(), "input ignored; round not running");
                    }
                }
            }
        }

        self.send_to_self(OutboundFrame::notice(ACK_NOTICE));
    }

    /// Leave the current room, if any.
    pub async fn leave_room(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };
        if room.leave(&self.id).await {
            info!(session = %self.id, room = %room.name(), "player left room");
        }
    }

    async fn join(&mut self, registry: &RoomRegistry, room_name: &str) {
        if let Some(current) = &self.room {
            if current.is_seated(&self.id).await {
                if current.name() == room_name {
                    debug!(
                        session = %self.id,
                        room = %room_name,
                        "already seated; join is a no-op"
                    );
                    return;
                }
                let err = RoomError::AlreadyInRoom(current.name().to_string());
                warn!(session = %self.id, error = %err, "join refused");
                self.send_to_self(OutboundFrame::notice(err.to_string()));
                return;
            }
            // Round over, or the room dropped this session as a slow consumer.
            self.room = None;
        }

        match registry.join_or_create(room_name, self.connection()).await {
            Ok(room) => {
                info!(session = %self.id, name = %self.name, room = %room_name, "player joined game");
                self.room = Some(room);
            }
            Err(err) => {
                warn!(session = %self.id, room = %room_name, error = %err, "failed to join game");
                self.send_to_self(OutboundFrame::notice(err.to_string()));
            }
        }
    }

    /// Queue a frame for this session only, without waiting.
    fn send_to_self(&self, frame: OutboundFrame) {
        match self.outbox.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(session = %self.id, "outbound queue full; dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session = %self.id, "outbound queue closed; dropping frame");
            }
        }
    }
}

/// Drive a session until its inbound stream ends, fails or sends a close frame.
///
/// Frames queued for the session are written to `writer` by a dedicated task so
/// a slow peer never holds up command dispatch. On exit the session leaves its
/// room and the writer task is shut down before this function returns.
pub async fn run<S, E, W>(
    state: SharedState,
    mut session: Session,
    outbox_rx: mpsc::Receiver<OutboundFrame>,
    inbound: S,
    writer: W,
) where
    S: Stream<Item = Result<InboundFrame, E>>,
    E: Display,
    W: Sink<String> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let writer_task = tokio::spawn(write_loop(outbox_rx, writer, shutdown_rx));

    state
        .sessions()
        .insert(session.id().to_string(), session.connection());
    info!(session = %session.id(), name = %session.name(), "session connected");

    let mut inbound = pin!(inbound);
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(InboundFrame::Text(text)) => {
                debug!(session = %session.id(), payload = %text, "received frame");
                session.handle_text(state.registry(), &text).await;
            }
            Ok(InboundFrame::Close) => {
                info!(session = %session.id(), "peer closed connection");
                break;
            }
            Err(err) => {
                warn!(session = %session.id(), error = %err, "error reading from peer");
                break;
            }
        }
    }

    session.leave_room().await;
    state.sessions().remove(session.id());
    info!(session = %session.id(), "session disconnected");

    finalize(writer_task, shutdown_tx).await;
}

async fn write_loop<W>(
    mut outbox_rx: mpsc::Receiver<OutboundFrame>,
    writer: W,
    mut shutdown: oneshot::Receiver<()>,
) where
    W: Sink<String>,
{
    let mut writer = pin!(writer);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            frame = outbox_rx.recv() => {
                let Some(frame) = frame else { break };
                let Some(text) = frame.encode() else { continue };
                if writer.send(text).await.is_err() {
                    warn!("failed to write frame to peer; stopping writer");
                    break;
                }
            }
        }
    }

    // Producers still holding a sender now see the queue as closed.
    outbox_rx.close();
    let _ = writer.close().await;
}

/// Ensure the writer task winds down before we return from the session.
async fn finalize(writer_task: JoinHandle<()>, shutdown_tx: oneshot::Sender<()>) {
    let _ = shutdown_tx.send(());
    let _ = writer_task.await;
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
