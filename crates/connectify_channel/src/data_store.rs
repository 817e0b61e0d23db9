// --- File: crates/connectify_channel/src/data_store.rs ---
//! Typed, app-namespaced access to a [`PreferenceStore`].

use connectify_common::{ConnectifyError, PreferenceStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Wraps a shared preference store and prefixes every key with the app key,
/// so several apps can share one backing store.
#[derive(Clone)]
pub struct ChannelDataStore {
    store: Arc<dyn PreferenceStore>,
    key_prefix: String,
}

impl ChannelDataStore {
    pub fn new(store: Arc<dyn PreferenceStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// The fully qualified key stored in the backing store.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub async fn string(&self, key: &str) -> Result<Option<String>, ConnectifyError> {
        match self.store.value(&self.key(key)).await? {
            Some(Value::String(value)) => Ok(Some(value)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(ConnectifyError::ParseError(format!(
                "expected a string under {}, found {}",
                key, other
            ))),
        }
    }

    /// Store `value`, or remove the key when `value` is `None`.
    pub async fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), ConnectifyError> {
        match value {
            Some(value) => {
                self.store
                    .set_value(&self.key(key), Value::String(value.to_string()))
                    .await
            }
            None => self.remove(key).await,
        }
    }

    pub async fn object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConnectifyError> {
        match self.store.value(&self.key(key)).await? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Store `value` as JSON, or remove the key when `value` is `None`.
    pub async fn set_object<T: Serialize>(
        &self,
        key: &str,
        value: Option<&T>,
    ) -> Result<(), ConnectifyError> {
        match value {
            Some(value) => {
                let value = serde_json::to_value(value)?;
                self.store.set_value(&self.key(key), value).await
            }
            None => self.remove(key).await,
        }
    }

    pub async fn remove(&self, key: &str) -> Result<(), ConnectifyError> {
        self.store.remove(&self.key(key)).await
    }
}

impl std::fmt::Debug for ChannelDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelDataStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use connectify_common::MemoryPreferenceStore;
    use serde_json::json;

    fn stores() -> (Arc<MemoryPreferenceStore>, ChannelDataStore) {
        let backing = Arc::new(MemoryPreferenceStore::new());
        let data_store = ChannelDataStore::new(backing.clone(), "app-key");
        (backing, data_store)
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let (backing, data_store) = stores();
        data_store.set_string("channel_id", Some("abc123")).await.unwrap();

        assert_eq!(
            backing.value("app-keychannel_id").await.unwrap(),
            Some(json!("abc123"))
        );
        assert_eq!(backing.value("channel_id").await.unwrap(), None);
        assert_eq!(
            data_store.string("channel_id").await.unwrap(),
            Some("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn test_none_removes_value() {
        let (backing, data_store) = stores();
        data_store.set_string("channel_id", Some("abc123")).await.unwrap();
        data_store.set_string("channel_id", None).await.unwrap();

        assert!(backing.is_empty().await);
        assert_eq!(data_store.string("channel_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_objects_round_trip_through_json() {
        let (_backing, data_store) = stores();
        let at = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
        data_store.set_object("last_update", Some(&at)).await.unwrap();

        let read: Option<chrono::DateTime<Utc>> = data_store.object("last_update").await.unwrap();
        assert_eq!(read, Some(at));
    }

    #[tokio::test]
    async fn test_wrong_type_is_a_parse_error() {
        let (backing, data_store) = stores();
        backing.set_value("app-keychannel_id", json!(42)).await.unwrap();

        assert!(matches!(
            data_store.string("channel_id").await,
            Err(ConnectifyError::ParseError(_))
        ));
    }
}
