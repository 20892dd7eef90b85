//! Shared helpers for engine integration tests.

use std::path::Path;
use std::sync::Arc;
use veilsync_connector::{MemoryConnector, ObjectStoreConnector};
use veilsync_crypto::AesEaxCipher;
use veilsync_engine::{SyncConfig, SyncEngine};

pub const PASSPHRASE: &str = "integration test passphrase";
pub const BASE: &str = "/Applications/demo";

/// Honors `RUST_LOG` when debugging a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn config() -> SyncConfig {
    SyncConfig {
        app_base_path: BASE.to_string(),
        ..SyncConfig::default()
    }
}

/// Fresh engine over a fresh in-memory store with the managed root created.
pub async fn engine_with_store() -> (SyncEngine, Arc<MemoryConnector>) {
    init_tracing();
    let store = Arc::new(MemoryConnector::new());
    store.mkdir_all(BASE).await.unwrap();
    let engine = engine_over(store.clone(), PASSPHRASE);
    (engine, store)
}

/// Engine sharing an existing store, keyed from `passphrase`.
pub fn engine_over(store: Arc<MemoryConnector>, passphrase: &str) -> SyncEngine {
    let connector: Arc<dyn ObjectStoreConnector> = store;
    SyncEngine::new(
        config(),
        connector,
        Arc::new(AesEaxCipher::from_passphrase(passphrase)),
    )
    .unwrap()
}

/// Writes the reference tree: `A/x.txt` (5 bytes), `A/sub/y.txt` (3 bytes).
pub fn write_reference_tree(root: &Path) {
    let a = root.join("A");
    std::fs::create_dir_all(a.join("sub")).unwrap();
    std::fs::write(a.join("x.txt"), b"12345").unwrap();
    std::fs::write(a.join("sub").join("y.txt"), b"abc").unwrap();
}

/// Asserts two local trees are structurally and byte-for-byte identical.
pub fn assert_trees_equal(expected: &Path, actual: &Path) {
    let mut expected_entries = list_relative(expected);
    let mut actual_entries = list_relative(actual);
    expected_entries.sort();
    actual_entries.sort();
    assert_eq!(expected_entries, actual_entries, "tree shapes differ");

    for rel in &expected_entries {
        let e = expected.join(rel);
        let a = actual.join(rel);
        assert_eq!(e.is_dir(), a.is_dir(), "kind mismatch at {rel}");
        if e.is_file() {
            assert_eq!(
                std::fs::read(&e).unwrap(),
                std::fs::read(&a).unwrap(),
                "content mismatch at {rel}"
            );
        }
    }
}

fn list_relative(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            out.push(
                path.strip_prefix(root)
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .to_string(),
            );
            if path.is_dir() {
                stack.push(path);
            }
        }
    }
    out
}
