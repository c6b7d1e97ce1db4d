use authgate_server::session::{session_key, KeyValueBackend, Session, SessionStore};
use authgate_server::MemoryBackend;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use test_log::test;
use uuid::Uuid;

const OP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

fn store() -> (SessionStore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let store = SessionStore::new(backend.clone(), Duration::hours(24), OP_TIMEOUT)
        .expect("valid ttl");
    (store, backend)
}

#[test(tokio::test)]
async fn test_created_session_resolves_to_its_user() {
    let (store, _) = store();
    let user_id = Uuid::new_v4();

    let token = store.create(user_id).await.unwrap();
    let session = store.resolve(&token).await.unwrap().expect("live session");

    assert_eq!(session.user_id, user_id);
    assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
    assert_eq!(store.resolve(&token).await.unwrap(), Some(session));
}

#[test(tokio::test)]
async fn test_deleted_session_stays_gone() {
    let (store, backend) = store();
    let token = store.create(Uuid::new_v4()).await.unwrap();

    store.delete(&token).await.unwrap();
    store.delete(&token).await.unwrap();

    assert!(store.resolve(&token).await.unwrap().is_none());
    assert_eq!(backend.live_keys().await, 0);
}

#[test(tokio::test)]
async fn test_expired_record_is_evicted_on_read() {
    let (store, backend) = store();
    let expired = Session {
        user_id: Uuid::new_v4(),
        created_at: Utc::now() - Duration::hours(24),
        expires_at: Utc::now() - Duration::seconds(1),
    };
    let key = session_key("lagging-backend");
    backend
        .set(&key, &serde_json::to_vec(&expired).unwrap(), std::time::Duration::from_secs(60))
        .await
        .unwrap();

    assert!(store.resolve("lagging-backend").await.unwrap().is_none());
    assert!(backend.get(&key).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn test_backend_ttl_reclaims_unread_sessions() {
    let backend = Arc::new(MemoryBackend::new());
    let store = SessionStore::new(backend.clone(), Duration::milliseconds(50), OP_TIMEOUT)
        .expect("valid ttl");

    let token = store.create(Uuid::new_v4()).await.unwrap();
    assert_eq!(backend.live_keys().await, 1);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(backend.live_keys().await, 0);
    assert!(store.resolve(&token).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn test_concurrent_creates_yield_distinct_tokens() {
    let (store, backend) = store();
    let store = Arc::new(store);
    let user_id = Uuid::new_v4();

    let tokens = futures::future::join_all((0..64).map(|_| {
        let store = store.clone();
        async move { store.create(user_id).await.unwrap() }
    }))
    .await;

    let distinct: HashSet<_> = tokens.iter().collect();
    assert_eq!(distinct.len(), tokens.len());
    assert_eq!(backend.live_keys().await, tokens.len());

    // One user may hold several sessions; ending one leaves the rest.
    store.delete(&tokens[0]).await.unwrap();
    assert!(store.resolve(&tokens[0]).await.unwrap().is_none());
    assert!(store.resolve(&tokens[1]).await.unwrap().is_some());
}
