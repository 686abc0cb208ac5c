use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt, future};

use crate::{
    dto::ws::InboundFrame,
    services::session::{self, Session},
    state::SharedState,
};

/// Handle the full lifecycle for an individual player WebSocket connection.
///
/// The socket is split so reads and writes never share the connection handle:
/// text frames feed the session's inbound loop, and the session's writer task
/// owns the sending half.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (sender, receiver) = socket.split();
    let (session, outbox_rx) = Session::anonymous(state.config().outbound_capacity());

    let inbound = receiver.filter_map(|message| future::ready(inbound_frame(message)));
    let writer = sender.with(|text: String| {
        future::ready(Ok::<Message, axum::Error>(Message::Text(text.into())))
    });

    session::run(state, session, outbox_rx, inbound, writer).await;
}

/// Map a socket message onto the session's inbound frames.
///
/// Keep-alive and binary frames carry no commands and are skipped.
fn inbound_frame(
    message: Result<Message, axum::Error>,
) -> Option<Result<InboundFrame, axum::Error>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(InboundFrame::Text(text.to_string()))),
        Ok(Message::Close(_)) => Some(Ok(InboundFrame::Close)),
        Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_)) => None,
        Err(err) => Some(Err(err)),
    }
}
