// --- File: crates/connectify_common/src/services.rs ---
//! Service abstractions for host-provided collaborators.
//!
//! These traits allow for dependency injection and easier testing by
//! decoupling the registrar from the concrete persistence layer and from the
//! wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::error::{internal_error, ConnectifyError};

/// A persistent key/value store for JSON values.
///
/// Implementations must make a completed `set_value` visible to every later
/// `value` call on the same key.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn value(&self, key: &str) -> Result<Option<Value>, ConnectifyError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_value(&self, key: &str, value: Value) -> Result<(), ConnectifyError>;

    /// Remove the value stored under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), ConnectifyError>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// In-memory preference store.
///
/// Used when no database is configured and in tests. Contents are lost when
/// the process exits.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn value(&self, key: &str) -> Result<Option<Value>, ConnectifyError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<(), ConnectifyError> {
        if key.is_empty() {
            return Err(internal_error("preference key must not be empty"));
        }
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ConnectifyError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
