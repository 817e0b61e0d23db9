use connectify_common::PreferenceStore;
use connectify_db::{DbClient, SqlPreferenceStore};
use serde_json::json;

async fn memory_store() -> SqlPreferenceStore {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let store = SqlPreferenceStore::new(client);
    store.init_schema().await.unwrap();
    store
}

#[tokio::test]
async fn test_missing_key_reads_none() {
    let store = memory_store().await;
    assert_eq!(store.value("channel_id").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_value_overwrites() {
    let store = memory_store().await;

    store.set_value("channel_id", json!("abc123")).await.unwrap();
    store.set_value("channel_id", json!("def456")).await.unwrap();

    assert_eq!(store.value("channel_id").await.unwrap(), Some(json!("def456")));
}

#[tokio::test]
async fn test_structured_values_survive() {
    let store = memory_store().await;
    let payload = json!({
        "channel": { "device_type": "ios", "opt_in": true, "tags": ["a", "b"] }
    });

    store.set_value("ChannelRegistrar.payload", payload.clone()).await.unwrap();

    assert_eq!(store.value("ChannelRegistrar.payload").await.unwrap(), Some(payload));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let store = memory_store().await;
    store.set_value("deviceID", json!("device-1")).await.unwrap();

    store.remove("deviceID").await.unwrap();
    store.remove("deviceID").await.unwrap();

    assert_eq!(store.value("deviceID").await.unwrap(), None);
}

#[tokio::test]
async fn test_file_store_persists_across_clients() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("prefs.db").display());

    {
        let store = SqlPreferenceStore::new(DbClient::from_url(&url).await.unwrap());
        store.init_schema().await.unwrap();
        store.set_value("channel_id", json!("abc123")).await.unwrap();
    }

    let store = SqlPreferenceStore::new(DbClient::from_url(&url).await.unwrap());
    store.init_schema().await.unwrap();
    assert_eq!(store.value("channel_id").await.unwrap(), Some(json!("abc123")));
}
