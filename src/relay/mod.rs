//! Real-time message relay: sessions join rooms over a WebSocket, submit
//! messages, and receive everything sent to their rooms live. Each message
//! is persisted before fan-out; a failed write aborts that one send only.

mod coordinator;
mod error;
mod event;
mod registry;
mod store;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use coordinator::RelayCoordinator;
pub use error::RelayError;
pub use event::{ClientEvent, MessageDraft, ServerEvent};
pub use registry::{RoomRegistry, SessionHandle, SessionId};
pub use store::{MessageStore, SqliteMessageStore, StoredMessage};

/// The coordinator wired to the production store.
pub type Relay = RelayCoordinator<SqliteMessageStore>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::relay_ws))
}
