use std::sync::Arc;

use trashday::session::{DialogState, SessionManager};

#[tokio::test]
async fn test_concurrent_registration_stays_within_capacity() {
    let manager = Arc::new(SessionManager::new(50));

    let mut handles = Vec::new();
    for task in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            for i in 0..100 {
                manager.register(&format!("U{}-{}", task, i)).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(manager.session_count().await, 50);
}

#[tokio::test]
async fn test_same_sender_from_many_tasks_is_one_session() {
    let manager = Arc::new(SessionManager::default());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.register("U-shared").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(manager.session_count().await, 1);
    assert_eq!(
        manager.read_context("U-shared").await,
        Some(DialogState::AwaitingMenu)
    );
}

#[tokio::test]
async fn test_recently_updated_sender_survives_eviction() {
    let manager = SessionManager::new(2);
    manager.register("A").await;
    manager.register("B").await;

    // Updating A makes B the least recently accessed
    manager
        .update_context("A", DialogState::AwaitingTerm)
        .await
        .unwrap();
    manager.register("C").await;

    assert_eq!(
        manager.read_context("A").await,
        Some(DialogState::AwaitingTerm)
    );
    assert!(manager.read_context("B").await.is_none());
    assert!(manager.read_context("C").await.is_some());
}
