//! Wire events, framed as `{"event": "...", "data": {...}}` JSON with
//! camelCase field names. The framing is transport-agnostic; the WebSocket
//! layer is just the channel they happen to travel over today.

use serde::{Deserialize, Serialize};

use super::store::StoredMessage;

/// Events a client submits to the relay.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    SendMessage(MessageDraft),
}

/// A message as submitted: no identity or timestamp yet, those are assigned
/// by the store. Sender identity and role were asserted by the auth layer
/// before the event reached us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub sender_id: String,
    pub sender_role: String,
    pub room_id: String,
    pub text: String,
}

/// Events the relay pushes to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A persisted message, broadcast to every current member of its room.
    ReceiveMessage(StoredMessage),
    /// A send that could not be persisted; pushed to the sender only.
    #[serde(rename_all = "camelCase")]
    SendFailed { room_id: String, reason: String },
}
