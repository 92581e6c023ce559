//! In-memory membership index: which sessions are in which room right now.
//! The one piece of shared mutable state in the relay. Every mutation and
//! snapshot takes the same lock, and the lock is never held across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::ServerEvent;

pub type SessionId = Uuid;

/// Outbound half of one live connection. Cloneable so the registry can hand
/// out snapshots; pushes through any clone land on the same per-session
/// FIFO queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl SessionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::now_v7(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue an event for this session. A session whose transport is gone
    /// has dropped its receiver; the event is discarded silently.
    pub fn push(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Default)]
struct Index {
    rooms: HashMap<String, HashMap<SessionId, SessionHandle>>,
    // reverse index: every room a session is currently in, for disconnect cleanup
    memberships: HashMap<SessionId, HashSet<String>>,
}

#[derive(Default)]
pub struct RoomRegistry {
    index: Mutex<Index>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a session to a room. Idempotent; rooms exist from the first join.
    pub fn join(&self, room: &str, session: &SessionHandle) {
        let mut index = self.index();
        index
            .rooms
            .entry(room.to_owned())
            .or_default()
            .insert(session.id, session.clone());
        index
            .memberships
            .entry(session.id)
            .or_default()
            .insert(room.to_owned());
    }

    /// Remove a session from one room. Idempotent; no error if absent.
    pub fn leave(&self, room: &str, session: SessionId) {
        let mut index = self.index();
        if let Some(members) = index.rooms.get_mut(room) {
            members.remove(&session);
            if members.is_empty() {
                index.rooms.remove(room);
            }
        }
        if let Some(rooms) = index.memberships.get_mut(&session) {
            rooms.remove(room);
            if rooms.is_empty() {
                index.memberships.remove(&session);
            }
        }
    }

    /// Remove a session from every room it belongs to. The guaranteed
    /// disconnect cleanup hook; leaves no orphaned membership behind.
    pub fn leave_all(&self, session: SessionId) {
        let mut index = self.index();
        let Some(rooms) = index.memberships.remove(&session) else {
            return;
        };
        for room in rooms {
            if let Some(members) = index.rooms.get_mut(&room) {
                members.remove(&session);
                if members.is_empty() {
                    index.rooms.remove(&room);
                }
            }
        }
    }

    /// Snapshot of the room's members at call time. Later joins and leaves
    /// never mutate a snapshot already handed out.
    pub fn members_of(&self, room: &str) -> Vec<SessionHandle> {
        self.index()
            .rooms
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }
}
