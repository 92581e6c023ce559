//! Binds one WebSocket to the relay: a forwarder task drains the session's
//! outbound queue into the socket, the inbound loop parses frames and hands
//! them to the coordinator. Whatever ends the connection, `leave_all` runs.

use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::event::ClientEvent;
use super::registry::SessionHandle;
use super::Relay;

#[debug_handler(state = crate::AppState)]
pub async fn relay_ws(State(relay): State<Relay>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(relay, socket))
}

async fn handle_socket(relay: Relay, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (session, mut rx) = SessionHandle::new();
    info!(session = %session.id(), "client connected");

    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(frame) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let event = match serde_json::from_slice::<ClientEvent>(&frame.into_data()) {
            Ok(event) => event,
            Err(err) => {
                debug!(session = %session.id(), error = %err, "dropping malformed frame");
                continue;
            }
        };

        match event {
            ClientEvent::JoinRoom { room_id } => relay.handle_join(&session, &room_id),
            ClientEvent::SendMessage(draft) => {
                if let Err(err) = relay.handle_send(&session, draft).await {
                    warn!(session = %session.id(), error = %err, "send_message failed");
                }
            }
        }
    }

    relay.handle_disconnect(&session);
    forward.abort();
    info!(session = %session.id(), "client disconnected");
}
