//! Per-name locking under concurrent callers

use cryypt_transit::{
    InMemoryStorage, KeyType, PolicyRequest, PolicyStore, Storage, TransitConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn shared_store() -> Arc<PolicyStore<InMemoryStorage>> {
    Arc::new(PolicyStore::new(
        InMemoryStorage::new(),
        TransitConfig::default(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_concurrent_creator_wins() {
    let store = shared_store();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let (policy, created) = store
                    .get_or_create(&PolicyRequest::new("race", KeyType::Ed25519))
                    .await
                    .unwrap();
                let public_key = policy
                    .unwrap()
                    .version(1)
                    .unwrap()
                    .formatted_public_key()
                    .unwrap()
                    .to_string();
                (created, public_key)
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|(created, _)| *created).count(), 1);
    let first = &results[0].1;
    assert!(results.iter().all(|(_, key)| key == first));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotations_never_reuse_versions() {
    let store = shared_store();
    store
        .get_or_create(&PolicyRequest::new("rot", KeyType::Aes256Gcm96))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.rotate("rot").await.unwrap() })
        })
        .collect();

    let mut versions = Vec::new();
    for task in tasks {
        versions.push(task.await.unwrap());
    }
    versions.sort_unstable();
    assert_eq!(versions, (2..=9).collect::<Vec<u32>>());

    let policy = store.get("rot").await.unwrap().unwrap();
    assert_eq!(policy.latest_version, 9);
    assert_eq!(policy.keys().len(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_waits_for_readers() {
    let store = shared_store();
    store
        .get_or_create(&PolicyRequest::new("held", KeyType::Aes128Gcm96))
        .await
        .unwrap();

    let reader = store.get("held").await.unwrap().unwrap();
    assert!(reader.is_locked());

    let mut deleter = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.delete("held").await })
    };

    let blocked = tokio::time::timeout(Duration::from_millis(200), &mut deleter).await;
    assert!(blocked.is_err(), "delete finished while a reader held the lock");
    assert!(store.storage().get("policy/held").await.unwrap().is_some());
    assert_eq!(reader.name, "held");

    drop(reader);
    deleter.await.unwrap().unwrap();
    assert!(store.get("held").await.unwrap().is_none());
}
