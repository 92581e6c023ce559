//! Durable append-only persistence for relayed messages. The store is the
//! authority for message identity and creation time; the relay never
//! broadcasts anything the store has not already accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::RelayError;
use super::event::MessageDraft;

/// A message after persistence: identity and timestamp assigned, `read`
/// always false on the write path (read receipts are flipped elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub sender_role: String,
    pub room_id: String,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Persistence seam for the coordinator. `append` must complete, success or
/// failure, before any fan-out happens.
pub trait MessageStore: Send + Sync {
    fn append(
        &self,
        draft: MessageDraft,
    ) -> impl Future<Output = Result<StoredMessage, RelayError>> + Send;
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    db_pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Create the messages table and its room index if absent. Idempotent,
    /// run once at startup.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                sender_role TEXT NOT NULL,
                text TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.db_pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_room_id ON messages (room_id)")
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }
}

impl MessageStore for SqliteMessageStore {
    async fn append(&self, draft: MessageDraft) -> Result<StoredMessage, RelayError> {
        let message = StoredMessage {
            id: Uuid::now_v7(),
            sender_id: draft.sender_id,
            sender_role: draft.sender_role,
            room_id: draft.room_id,
            text: draft.text,
            read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO messages (id,room_id,sender_id,sender_role,text,read,created_at)
             VALUES (?,?,?,?,?,?,?)",
        )
        .bind(message.id.to_string())
        .bind(&message.room_id)
        .bind(&message.sender_id)
        .bind(&message.sender_role)
        .bind(&message.text)
        .bind(message.read)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.db_pool)
        .await?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn memory_store() -> SqliteMessageStore {
        // a single connection, otherwise every pooled connection gets its own
        // private in-memory database
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteMessageStore::new(db_pool);
        store.migrate().await.unwrap();
        store
    }

    fn draft(room_id: &str, text: &str) -> MessageDraft {
        MessageDraft {
            sender_id: "u1".to_owned(),
            sender_role: "tenant".to_owned(),
            room_id: room_id.to_owned(),
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn append_assigns_identity_and_timestamp() {
        let store = memory_store().await;
        let before = Utc::now();

        let stored = store.append(draft("R1", "hi")).await.unwrap();

        assert!(!stored.id.is_nil());
        assert!(!stored.read);
        assert!(stored.created_at >= before);
        assert_eq!(stored.room_id, "R1");
        assert_eq!(stored.text, "hi");
    }

    #[tokio::test]
    async fn append_writes_exactly_one_row() {
        let store = memory_store().await;
        store.append(draft("R1", "hi")).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_id=?")
                .bind("R1")
                .fetch_one(&store.db_pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn appended_messages_get_distinct_ids() {
        let store = memory_store().await;
        let first = store.append(draft("R1", "one")).await.unwrap();
        let second = store.append(draft("R1", "two")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn empty_body_is_accepted() {
        let store = memory_store().await;
        let stored = store.append(draft("R1", "")).await.unwrap();
        assert_eq!(stored.text, "");
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = memory_store().await;
        store.migrate().await.unwrap();
        store.append(draft("R1", "hi")).await.unwrap();
    }
}
