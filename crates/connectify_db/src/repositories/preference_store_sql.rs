//! SQL implementation of the preference store
//!
//! Values are stored as JSON text in a single `preferences` table keyed by
//! the preference key.

use crate::error::DbError;
use crate::DbClient;
use async_trait::async_trait;
use connectify_common::{ConnectifyError, PreferenceStore};
use serde_json::Value;
use sqlx::Row;
use tracing::{debug, error, info};

/// SQL implementation of [`PreferenceStore`]
#[derive(Debug, Clone)]
pub struct SqlPreferenceStore {
    /// The database client
    db_client: DbClient,
}

impl SqlPreferenceStore {
    /// Create a new SQL preference store
    ///
    /// Call [`SqlPreferenceStore::init_schema`] once before first use.
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Create the `preferences` table if it doesn't exist
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing preference store schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS preferences (
                pref_key TEXT PRIMARY KEY NOT NULL,
                pref_value TEXT NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        self.db_client.execute(query).await?;

        info!("Preference store schema initialized successfully");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, DbError> {
        let query = r#"
            SELECT pref_value
            FROM preferences
            WHERE pref_key = $1
        "#;

        let row = sqlx::query(query)
            .bind(key)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to read preference {}: {}", key, e);
                DbError::QueryError(e.to_string())
            })?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("pref_value")?;
                let value =
                    serde_json::from_str(&raw).map_err(|e| DbError::ValueError(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), DbError> {
        let raw = serde_json::to_string(value).map_err(|e| DbError::ValueError(e.to_string()))?;

        let query = r#"
            INSERT INTO preferences (pref_key, pref_value, updated_at)
            VALUES ($1, $2, CURRENT_TIMESTAMP)
            ON CONFLICT (pref_key)
            DO UPDATE SET pref_value = excluded.pref_value, updated_at = CURRENT_TIMESTAMP
        "#;

        sqlx::query(query)
            .bind(key)
            .bind(raw)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to write preference {}: {}", key, e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DbError> {
        let query = r#"
            DELETE FROM preferences
            WHERE pref_key = $1
        "#;

        sqlx::query(query)
            .bind(key)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete preference {}: {}", key, e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqlPreferenceStore {
    async fn value(&self, key: &str) -> Result<Option<Value>, ConnectifyError> {
        Ok(self.read(key).await?)
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<(), ConnectifyError> {
        Ok(self.write(key, &value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), ConnectifyError> {
        Ok(self.delete(key).await?)
    }
}
