// --- File: crates/connectify_config/src/models.rs ---

use serde::{Deserialize, Serialize};

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_update_interval_hours() -> u64 {
    24
}

fn default_initial_backoff_secs() -> u64 {
    30
}

fn default_max_backoff_secs() -> u64 {
    600
}

fn default_task_timeout_secs() -> u64 {
    60
}

fn default_machine_id_path() -> String {
    "/etc/machine-id".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// --- Channel API Config ---
// Holds the device API endpoint and app credentials. The secret is usually
// set to "secret_from_env" and loaded from CHANNEL_APP_SECRET.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChannelApiConfig {
    pub device_api_url: String, // Mandatory, e.g. https://device-api.example.com
    pub app_key: String,        // Mandatory
    pub app_secret: String,     // Mandatory
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// --- Registration Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistrationConfig {
    /// Forces an update once this many hours passed since the last success.
    #[serde(default = "default_update_interval_hours")]
    pub update_interval_hours: u64,
    /// First retry delay after a failed registration attempt.
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,
    /// Upper bound for the exponential retry delay.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Attempts per request before giving up. `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Time budget for a single attempt before it is expired.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            update_interval_hours: default_update_interval_hours(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_attempts: None,
            task_timeout_secs: default_task_timeout_secs(),
        }
    }
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/preferences.db, loaded via CONNECTIFY__DATABASE__URL
}

// --- Device Config ---
// Where the device identifier comes from. It must live outside the
// registrar's store, otherwise a restored store carries the old ID along.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    /// Separate store for a generated device ID, e.g. sqlite:/var/lib/connectify/device.db
    #[serde(default)]
    pub store_url: Option<String>,
    /// Read when no `store_url` is set.
    #[serde(default = "default_machine_id_path")]
    pub machine_id_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            machine_id_path: default_machine_id_path(),
        }
    }
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files. Console only when absent.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Channel API config is mandatory
    pub channel: ChannelApiConfig,

    #[serde(default)]
    pub registration: RegistrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>, // Memory store when absent
}
