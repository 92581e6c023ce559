//! Orchestrates join, send and disconnect events: validate, persist, then
//! fan out to the room's membership snapshot. A send moves through
//! received → persisting → broadcasting, or stops at failed; there are no
//! retries at any step.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::RelayError;
use super::event::{MessageDraft, ServerEvent};
use super::registry::{RoomRegistry, SessionHandle};
use super::store::MessageStore;

#[derive(Clone)]
pub struct RelayCoordinator<S> {
    registry: Arc<RoomRegistry>,
    store: S,
}

impl<S: MessageStore> RelayCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new()),
            store,
        }
    }

    /// Join a room. An empty room key is dropped silently; everything else
    /// always succeeds.
    pub fn handle_join(&self, session: &SessionHandle, room_id: &str) {
        if room_id.is_empty() {
            debug!(session = %session.id(), "dropping join with empty room key");
            return;
        }
        self.registry.join(room_id, session);
        debug!(session = %session.id(), room = room_id, "joined room");
    }

    /// Persist a draft, then push the stored message to every session in
    /// the room at that moment, the sender included. Membership is not
    /// required to send; an empty body passes through unchanged. On a
    /// failed write nothing is broadcast and only the sender is told.
    pub async fn handle_send(
        &self,
        session: &SessionHandle,
        draft: MessageDraft,
    ) -> Result<(), RelayError> {
        if draft.room_id.is_empty() {
            return Err(RelayError::InvalidEvent {
                event: "send_message",
                reason: "empty room key",
            });
        }

        let room_id = draft.room_id.clone();
        match self.store.append(draft).await {
            Ok(message) => {
                // snapshot taken only after the write completed; sessions
                // joining from here on don't get this message
                let members = self.registry.members_of(&message.room_id);
                debug!(
                    room = %message.room_id,
                    id = %message.id,
                    members = members.len(),
                    "broadcasting message"
                );
                for member in &members {
                    member.push(ServerEvent::ReceiveMessage(message.clone()));
                }
                Ok(())
            }
            Err(err) => {
                warn!(session = %session.id(), room = %room_id, error = %err, "message persistence failed");
                session.push(ServerEvent::SendFailed {
                    room_id,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Transport closed: drop the session from every room. No broadcast,
    /// no persistence.
    pub fn handle_disconnect(&self, session: &SessionHandle) {
        self.registry.leave_all(session.id());
        debug!(session = %session.id(), "session disconnected");
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &RoomRegistry {
        &self.registry
    }
}
