//! Identity state persisted on disk between process runs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use medusa_storefront_client::storage::{FileStore, KeyValueStore, keys};
use medusa_storefront_client::{MedusaClient, Storefront};
use medusa_storefront_core::VariantId;
use medusa_storefront_integration_tests::TestBackend;

fn open(backend: &TestBackend, dir: &std::path::Path) -> Storefront {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir).unwrap());
    Storefront::from_client(MedusaClient::new(&backend.config(), store).unwrap())
}

#[tokio::test]
async fn test_identity_survives_restart() {
    let backend = TestBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    let first = open(&backend, dir.path());
    first.client().set_token("tok_1").unwrap();
    first
        .add_to_basket(&VariantId::new("v1"), 2)
        .await
        .unwrap();
    let fingerprint = first.analytics().fingerprint_id().to_string();
    drop(first);

    let second = open(&backend, dir.path());
    assert!(second.client().has_token());
    assert_eq!(second.basket().item_count(), 2);
    assert_eq!(second.analytics().fingerprint_id(), fingerprint);
    assert_ne!(
        second.analytics().session_id(),
        fingerprint,
        "session ids are per process"
    );

    let store = FileStore::open(dir.path()).unwrap();
    assert!(store.get(keys::ANONYMOUS_BASKET).is_some());
}
