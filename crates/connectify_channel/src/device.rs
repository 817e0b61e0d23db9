// --- File: crates/connectify_channel/src/device.rs ---
//! Device identifier sources used for app-restore detection.

use async_trait::async_trait;
use connectify_common::{ConnectifyError, PreferenceStore};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Provides the identifier of the physical device (or installation) the
/// process runs on. A change means the stored channel belongs to another
/// device.
#[async_trait]
pub trait DeviceIdProvider: Send + Sync {
    async fn current_device_id(&self) -> Result<String, ConnectifyError>;
}

/// A device ID the host already knows.
#[derive(Debug, Clone)]
pub struct StaticDeviceIdProvider {
    device_id: String,
}

impl StaticDeviceIdProvider {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

#[async_trait]
impl DeviceIdProvider for StaticDeviceIdProvider {
    async fn current_device_id(&self) -> Result<String, ConnectifyError> {
        Ok(self.device_id.clone())
    }
}

/// Generates a random device ID once and keeps it in its own store.
///
/// The store should not be restored together with the registrar's store,
/// otherwise restores are never detected.
pub struct StoredDeviceIdProvider {
    store: Arc<dyn PreferenceStore>,
    key: String,
    // Serializes generation so concurrent callers see the same ID
    generation: Mutex<()>,
}

impl StoredDeviceIdProvider {
    pub fn new(store: Arc<dyn PreferenceStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            generation: Mutex::new(()),
        }
    }
}

#[async_trait]
impl DeviceIdProvider for StoredDeviceIdProvider {
    async fn current_device_id(&self) -> Result<String, ConnectifyError> {
        let _guard = self.generation.lock().await;

        if let Some(Value::String(existing)) = self.store.value(&self.key).await? {
            if !existing.is_empty() {
                debug!("Using stored device ID");
                return Ok(existing);
            }
        }

        let device_id = Uuid::new_v4().to_string();
        self.store
            .set_value(&self.key, Value::String(device_id.clone()))
            .await?;
        info!("Generated new device ID {}", device_id);
        Ok(device_id)
    }
}

/// Reads the host's machine ID, e.g. `/etc/machine-id`.
///
/// The file is re-read on every call. When it is missing or empty a random
/// ID is generated once per process, so each restart looks like a restore.
pub struct MachineDeviceIdProvider {
    path: PathBuf,
    fallback: OnceCell<String>,
}

impl MachineDeviceIdProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: OnceCell::new(),
        }
    }

    async fn fallback_id(&self) -> String {
        self.fallback
            .get_or_init(|| async {
                warn!(
                    "No machine ID at {}, using a per-process device ID",
                    self.path.display()
                );
                Uuid::new_v4().to_string()
            })
            .await
            .clone()
    }
}

#[async_trait]
impl DeviceIdProvider for MachineDeviceIdProvider {
    async fn current_device_id(&self) -> Result<String, ConnectifyError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let machine_id = contents.trim();
                if machine_id.is_empty() {
                    Ok(self.fallback_id().await)
                } else {
                    Ok(machine_id.to_string())
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(self.fallback_id().await),
            Err(e) => Err(e.into()),
        }
    }
}
