//! Tests for the session registry.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use strictly_sessions::{
    ActionMessage, AuthService, Registry, RegistryError, Request, SeatMapping, SessionError,
    SessionOptions, TicTacToe, is_valid_game_id,
};

fn registry() -> Registry {
    Registry::new(SessionOptions::default())
}

fn seats() -> SeatMapping {
    SeatMapping::new(2, Arc::new(AuthService::default()))
}

#[tokio::test]
async fn test_create_and_get() {
    let registry = registry();
    let created = registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();

    let found = registry.get("ABCDE").await.unwrap();
    assert!(Arc::ptr_eq(&created, &found));
    assert_eq!(found.game_type(), "tictactoe");
    assert_eq!(found.metadata()["max_players"], json!(2));

    registry.shutdown_all().await;
}

#[tokio::test]
async fn test_duplicate_create_keeps_existing_session() {
    let registry = registry();
    let original = registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();

    let duplicate = registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await;
    assert_eq!(
        duplicate.unwrap_err(),
        RegistryError::AlreadyExists("ABCDE".to_string())
    );

    let found = registry.get("ABCDE").await.unwrap();
    assert!(Arc::ptr_eq(&original, &found));
    assert!(!found.is_closed());
    assert_eq!(registry.len().await, 1);

    registry.shutdown_all().await;
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let registry = registry();
    assert_eq!(
        registry.get("ZZZZZ").await.unwrap_err(),
        RegistryError::NotFound("ZZZZZ".to_string())
    );
}

#[tokio::test]
async fn test_remove_twice_is_noop() {
    let registry = registry();
    let session = registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();

    registry.remove("ABCDE").await;
    assert!(session.is_closed());
    assert!(registry.get("ABCDE").await.is_err());

    registry.remove("ABCDE").await;
    assert!(registry.is_empty().await);

    let late = ActionMessage::new(
        "alice".to_string(),
        Request::session("join_position", json!({ "position": 0 })),
    );
    assert_eq!(session.submit(late).await, Err(SessionError::Closed));
}

#[tokio::test]
async fn test_removed_id_can_be_reused() {
    let registry = registry();
    registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();
    registry.remove("ABCDE").await;

    let again = registry
        .create("ABCDE".to_string(), TicTacToe::new(), seats())
        .await;
    assert!(again.is_ok());

    registry.shutdown_all().await;
}

#[tokio::test]
async fn test_generated_ids_are_well_formed_and_free() {
    let registry = registry();
    for id in ["AAAAA", "BBBBB", "CCCCC"] {
        registry
            .create(id.to_string(), TicTacToe::new(), seats())
            .await
            .unwrap();
    }
    let live: HashSet<String> = registry.list().await.into_iter().collect();

    for _ in 0..500 {
        let id = registry.generate_unique_id().await;
        assert!(is_valid_game_id(&id), "bad id {id}");
        assert!(!live.contains(&id));
    }

    registry.shutdown_all().await;
}

#[tokio::test]
async fn test_create_with_unique_id() {
    let registry = registry();
    let mut ids = HashSet::new();
    for _ in 0..10 {
        let session = registry
            .create_with_unique_id(|_| (TicTacToe::new(), seats()))
            .await;
        assert!(is_valid_game_id(session.id()));
        ids.insert(session.id().clone());
    }

    assert_eq!(ids.len(), 10);
    assert_eq!(registry.list().await.len(), 10);

    registry.shutdown_all().await;
}

#[tokio::test]
async fn test_shutdown_all_closes_everything() {
    let registry = registry();
    let a = registry
        .create("AAAAA".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();
    let b = registry
        .create("BBBBB".to_string(), TicTacToe::new(), seats())
        .await
        .unwrap();

    registry.shutdown_all().await;

    assert!(registry.is_empty().await);
    assert!(a.is_closed());
    assert!(b.is_closed());
}

#[tokio::test]
async fn test_concurrent_creates_same_id_one_wins() {
    let registry = Arc::new(registry());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry
                .create("RACEY".to_string(), TicTacToe::new(), seats())
                .await
                .is_ok()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    registry.shutdown_all().await;
}
