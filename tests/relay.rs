//! End-to-end relay flow against a real SQLite-backed store: join, send,
//! persisted echo to every member.

use nestline::relay::{MessageDraft, Relay, ServerEvent, SessionHandle, SqliteMessageStore};
use pretty_assertions::assert_eq;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::mpsc::error::TryRecvError;

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn relay_over(db_pool: SqlitePool) -> Relay {
    let store = SqliteMessageStore::new(db_pool);
    store.migrate().await.unwrap();
    Relay::new(store)
}

fn expect_message(event: ServerEvent) -> nestline::relay::StoredMessage {
    match event {
        ServerEvent::ReceiveMessage(message) => message,
        other => panic!("expected receive_message, got {other:?}"),
    }
}

#[tokio::test]
async fn both_members_receive_the_persisted_message() {
    let db_pool = memory_pool().await;
    let relay = relay_over(db_pool.clone()).await;

    let (a, mut rx_a) = SessionHandle::new();
    let (b, mut rx_b) = SessionHandle::new();
    relay.handle_join(&a, "R1");
    relay.handle_join(&b, "R1");

    relay
        .handle_send(
            &a,
            MessageDraft {
                sender_id: "u1".to_owned(),
                sender_role: "tenant".to_owned(),
                room_id: "R1".to_owned(),
                text: "hi".to_owned(),
            },
        )
        .await
        .unwrap();

    let to_a = expect_message(rx_a.try_recv().unwrap());
    let to_b = expect_message(rx_b.try_recv().unwrap());

    for message in [&to_a, &to_b] {
        assert_eq!(message.room_id, "R1");
        assert_eq!(message.sender_id, "u1");
        assert_eq!(message.sender_role, "tenant");
        assert_eq!(message.text, "hi");
        assert!(!message.read);
        assert!(!message.id.is_nil());
    }
    // the exact same stored record went to everyone
    assert_eq!(to_a.id, to_b.id);
    assert_eq!(to_a.created_at, to_b.created_at);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_id=?")
        .bind("R1")
        .fetch_one(&db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn sender_outside_the_room_still_persists() {
    let db_pool = memory_pool().await;
    let relay = relay_over(db_pool.clone()).await;

    let (c, mut rx_c) = SessionHandle::new();
    relay
        .handle_send(
            &c,
            MessageDraft {
                sender_id: "u9".to_owned(),
                sender_role: "landlord".to_owned(),
                room_id: "R1".to_owned(),
                text: "anyone home?".to_owned(),
            },
        )
        .await
        .unwrap();

    assert!(matches!(rx_c.try_recv(), Err(TryRecvError::Empty)));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_id=?")
        .bind("R1")
        .fetch_one(&db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn disconnected_session_receives_nothing_further() {
    let db_pool = memory_pool().await;
    let relay = relay_over(db_pool).await;

    let (a, mut rx_a) = SessionHandle::new();
    let (b, _rx_b) = SessionHandle::new();
    relay.handle_join(&a, "R1");
    relay.handle_join(&b, "R1");
    relay.handle_disconnect(&a);

    relay
        .handle_send(
            &b,
            MessageDraft {
                sender_id: "u2".to_owned(),
                sender_role: "landlord".to_owned(),
                room_id: "R1".to_owned(),
                text: "still there?".to_owned(),
            },
        )
        .await
        .unwrap();

    assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Empty)));
}
