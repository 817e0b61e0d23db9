// --- File: crates/services/connectify_agent/src/store_factory.rs ---
use connectify_channel::{DeviceIdProvider, MachineDeviceIdProvider};
use connectify_common::{config_error, ConnectifyError, MemoryPreferenceStore, PreferenceStore};
use connectify_config::AppConfig;
use std::sync::Arc;
use tracing::info;

/// Key of the generated device ID inside the device store.
#[cfg(feature = "database")]
pub const DEVICE_ID_KEY: &str = "connectify.device_id";

/// Pick the preference store backing the registrar.
///
/// Uses the SQL store when a `database` section is configured and the
/// `database` feature is enabled, the in-memory store otherwise.
#[cfg_attr(not(feature = "database"), allow(unused_variables))]
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn PreferenceStore>, ConnectifyError> {
    #[cfg(feature = "database")]
    {
        if let Some(database) = &config.database {
            use connectify_db::{DbClient, SqlPreferenceStore};

            let client = DbClient::from_config(database).await?;
            let store = SqlPreferenceStore::new(client);
            store.init_schema().await?;
            info!("Using SQL preference store");
            return Ok(Arc::new(store));
        }
    }

    info!("Using in-memory preference store, channel state is lost on exit");
    Ok(Arc::new(MemoryPreferenceStore::new()))
}

/// Pick the device ID source for the app-restore check.
///
/// A configured `device.store_url` gets its own SQL store, which must not be
/// the registrar's database. Otherwise the machine ID file is used.
#[cfg_attr(not(feature = "database"), allow(unused_variables))]
pub async fn build_device_ids(
    config: &AppConfig,
) -> Result<Arc<dyn DeviceIdProvider>, ConnectifyError> {
    if let Some(store_url) = &config.device.store_url {
        let shares_database = config
            .database
            .as_ref()
            .is_some_and(|database| database.url.trim() == store_url.trim());
        if shares_database {
            return Err(config_error(
                "device.store_url must not point at the registrar database",
            ));
        }

        #[cfg(feature = "database")]
        {
            use connectify_channel::StoredDeviceIdProvider;
            use connectify_db::{DbClient, SqlPreferenceStore};

            let client = DbClient::from_url(store_url).await?;
            let store = SqlPreferenceStore::new(client);
            store.init_schema().await?;
            info!("Using separate device ID store");
            return Ok(Arc::new(StoredDeviceIdProvider::new(
                Arc::new(store),
                DEVICE_ID_KEY,
            )));
        }

        #[cfg(not(feature = "database"))]
        return Err(config_error(
            "device.store_url requires the database feature",
        ));
    }

    info!("Using machine ID from {}", config.device.machine_id_path);
    Ok(Arc::new(MachineDeviceIdProvider::new(
        &config.device.machine_id_path,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectify_config::{
        ChannelApiConfig, DatabaseConfig, DeviceConfig, LoggingConfig, RegistrationConfig,
    };

    fn config(database: Option<DatabaseConfig>) -> AppConfig {
        config_with_device(database, DeviceConfig::default())
    }

    fn config_with_device(database: Option<DatabaseConfig>, device: DeviceConfig) -> AppConfig {
        AppConfig {
            channel: ChannelApiConfig {
                device_api_url: "https://device.example.com".to_string(),
                app_key: "app-key".to_string(),
                app_secret: "app-secret".to_string(),
                request_timeout_secs: 5,
            },
            registration: RegistrationConfig::default(),
            logging: LoggingConfig::default(),
            device,
            database,
        }
    }

    #[cfg(feature = "database")]
    fn sqlite_url(path: &std::path::Path) -> String {
        format!("sqlite:{}", path.display())
    }

    #[tokio::test]
    async fn test_memory_store_without_database() {
        let store = build_store(&config(None)).await.unwrap();
        assert_eq!(store.value("missing").await.unwrap(), None);
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_sql_store_with_database() {
        let store = build_store(&config(Some(DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        })))
        .await
        .unwrap();

        store
            .set_value("channel_id", "abc123".into())
            .await
            .unwrap();
        assert_eq!(
            store.value("channel_id").await.unwrap(),
            Some("abc123".into())
        );
    }

    #[tokio::test]
    async fn test_machine_id_without_device_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        std::fs::write(&path, "host-42\n").unwrap();

        let device_ids = build_device_ids(&config_with_device(
            None,
            DeviceConfig {
                store_url: None,
                machine_id_path: path.display().to_string(),
            },
        ))
        .await
        .unwrap();

        assert_eq!(device_ids.current_device_id().await.unwrap(), "host-42");
    }

    #[tokio::test]
    async fn test_device_store_must_differ_from_database() {
        let url = "sqlite:data/preferences.db".to_string();
        let result = build_device_ids(&config_with_device(
            Some(DatabaseConfig { url: url.clone() }),
            DeviceConfig {
                store_url: Some(url),
                ..DeviceConfig::default()
            },
        ))
        .await;

        assert!(matches!(result, Err(ConnectifyError::ConfigError(_))));
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_device_id_stays_out_of_registrar_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_device(
            Some(DatabaseConfig {
                url: sqlite_url(&dir.path().join("preferences.db")),
            }),
            DeviceConfig {
                store_url: Some(sqlite_url(&dir.path().join("device.db"))),
                ..DeviceConfig::default()
            },
        );

        let store = build_store(&config).await.unwrap();
        let device_ids = build_device_ids(&config).await.unwrap();

        let device_id = device_ids.current_device_id().await.unwrap();

        // Restoring preferences.db elsewhere does not bring the device ID along
        assert_eq!(store.value(DEVICE_ID_KEY).await.unwrap(), None);
        assert_eq!(device_ids.current_device_id().await.unwrap(), device_id);

        let fresh_ids = build_device_ids(&config_with_device(
            config.database.clone(),
            DeviceConfig {
                store_url: Some(sqlite_url(&dir.path().join("other-device.db"))),
                ..DeviceConfig::default()
            },
        ))
        .await
        .unwrap();
        assert_ne!(fresh_ids.current_device_id().await.unwrap(), device_id);
    }
}
