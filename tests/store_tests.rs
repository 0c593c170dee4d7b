/// Lifecycle and concurrency tests for the blob store
use file_relay::blob_store::{BlobStore, BlobStoreConfig};
use file_relay::error::RelayError;
use futures::{stream, StreamExt};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::io::AsyncReadExt;

fn test_store(root: &Path) -> Arc<BlobStore> {
    Arc::new(BlobStore::new(BlobStoreConfig {
        root: root.to_path_buf(),
        max_upload_size: 16 * 1024 * 1024,
    }))
}

fn dir_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

async fn read_all(store: &BlobStore, name: &str) -> Vec<u8> {
    let mut blob = store.retrieve(name).await.unwrap();
    let mut data = Vec::new();
    blob.file.read_to_end(&mut data).await.unwrap();
    data
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_are_distinct_and_retrievable() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let payload = format!("payload number {}", i).into_bytes();
                let body = stream::iter(vec![Ok::<_, std::io::Error>(payload.clone())]);
                let object = store.store(body, Some("file.dat")).await.unwrap();
                (object.stored_name, payload)
            })
        })
        .collect();

    let mut names = HashSet::new();
    let mut stored = Vec::new();
    for handle in handles {
        let (name, payload) = handle.await.unwrap();
        assert!(names.insert(name.clone()), "duplicate stored name {}", name);
        stored.push((name, payload));
    }

    for (name, payload) in &stored {
        assert!(name.ends_with(".dat"));
        assert_eq!(&read_all(&store, name).await, payload);
    }

    // No temp files left behind
    assert_eq!(dir_entries(dir.path()).len(), 100);
}

#[tokio::test]
async fn test_multi_chunk_round_trip() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());

    let chunks: Vec<Vec<u8>> = (0..64u8).map(|i| vec![i; 4096]).collect();
    let expected: Vec<u8> = chunks.concat();
    let body = stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));

    let object = store.store(body, Some("blob.bin")).await.unwrap();
    assert_eq!(object.size_bytes, expected.len() as u64);
    assert_eq!(read_all(&store, &object.stored_name).await, expected);
}

#[tokio::test]
async fn test_cancelled_upload_leaves_nothing_visible() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let (written_tx, written_rx) = tokio::sync::oneshot::channel::<()>();

    // One chunk, then hang as if the client stalled mid-upload
    let body = stream::once(async { Ok::<_, std::io::Error>(b"partial bytes".to_vec()) }).chain(
        stream::once(async move {
            let _ = written_tx.send(());
            futures::future::pending::<Result<Vec<u8>, std::io::Error>>().await
        }),
    );

    let task = {
        let store = store.clone();
        tokio::spawn(async move { store.store(body, Some("big.bin")).await })
    };

    written_rx.await.unwrap();
    let entries = dir_entries(dir.path());
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with(".upload-"), "only a temp file exists mid-upload");

    task.abort();
    let err = task.await.unwrap_err();
    assert!(err.is_cancelled());

    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_retrieve_during_upload_is_not_found() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let (written_tx, written_rx) = tokio::sync::oneshot::channel::<()>();
    let (finish_tx, finish_rx) = tokio::sync::oneshot::channel::<()>();

    let body = stream::once(async { Ok::<_, std::io::Error>(b"first half ".to_vec()) }).chain(
        stream::once(async move {
            let _ = written_tx.send(());
            let _ = finish_rx.await;
            Ok::<_, std::io::Error>(b"second half".to_vec())
        }),
    );

    let task = {
        let store = store.clone();
        tokio::spawn(async move { store.store(body, Some("a.txt")).await })
    };

    written_rx.await.unwrap();
    let temp_name = dir_entries(dir.path()).remove(0);
    let pending_name = temp_name
        .trim_start_matches(".upload-")
        .trim_end_matches(".part")
        .to_string()
        + ".txt";

    // The would-be name is not visible yet, and the temp file is not addressable
    assert!(matches!(
        store.retrieve(&pending_name).await,
        Err(RelayError::NotFound(_))
    ));
    assert!(matches!(
        store.retrieve(&temp_name).await,
        Err(RelayError::InvalidIdentifier(_))
    ));

    finish_tx.send(()).unwrap();
    let object = task.await.unwrap().unwrap();
    assert_eq!(object.stored_name, pending_name);
    assert_eq!(read_all(&store, &object.stored_name).await, b"first half second half");
}
