//! Environment variable handling for the Connectify agent.
//!
//! This module provides utilities for working with environment variables in a
//! standardized way. It includes functions for getting environment variables
//! with consistent naming patterns and for converting between different naming
//! patterns.

use std::env;
use tracing::warn;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "CONNECTIFY";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Marker value replaced by an environment variable after loading
pub const SECRET_MARKER: &str = "secret_from_env";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// # Arguments
///
/// * `path` - The configuration path (e.g., "channel.device_api_url")
///
/// # Returns
///
/// The environment variable name (e.g., "CONNECTIFY__CHANNEL__DEVICE_API_URL")
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to an environment variable name
///
/// # Arguments
///
/// * `path` - The secret path (e.g., "channel.app_secret")
///
/// # Returns
///
/// The environment variable name (e.g., "CHANNEL_APP_SECRET")
pub fn secret_path_to_env_var(path: &str) -> String {
    path.replace('.', SECRET_SEPARATOR).to_uppercase()
}

/// Check if a path is a secret path
///
/// Paths containing "secret", "key", "password" or "token" are considered secret.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
}

/// Get an environment variable for a path
///
/// Secret paths are looked up by their flat name first and fall back to the
/// prefixed configuration name.
pub fn get_env_var(path: &str) -> Option<String> {
    if is_secret_path(path) {
        if let Ok(value) = env::var(secret_path_to_env_var(path)) {
            return Some(value);
        }
    }
    env::var(config_path_to_env_var(path)).ok()
}

/// Inject environment variables into a JSON value
///
/// Recursively replaces every `"secret_from_env"` string with the value of the
/// environment variable derived from its path.
///
/// # Returns
///
/// `true` if any values were replaced, `false` otherwise
pub fn inject_env_vars(value: &mut serde_json::Value) -> bool {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                if let Some(env_val) = get_env_var(&path_str) {
                    *s = env_val;
                    replaced = true;
                } else {
                    warn!("Environment variable for {} not found", path_str);
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_path_to_env_var() {
        assert_eq!(
            config_path_to_env_var("channel.device_api_url"),
            "CONNECTIFY__CHANNEL__DEVICE_API_URL"
        );
        assert_eq!(
            config_path_to_env_var("database.url"),
            "CONNECTIFY__DATABASE__URL"
        );
    }

    #[test]
    fn test_secret_path_to_env_var() {
        assert_eq!(
            secret_path_to_env_var("channel.app_secret"),
            "CHANNEL_APP_SECRET"
        );
    }

    #[test]
    fn test_is_secret_path() {
        assert!(is_secret_path("channel.app_secret"));
        assert!(is_secret_path("channel.app_key"));
        assert!(!is_secret_path("channel.device_api_url"));
        assert!(!is_secret_path("database.url"));
    }

    #[test]
    fn test_inject_env_vars_replaces_marker() {
        env::set_var("TESTSECTION_INJECTED_SECRET", "s3cr3t");
        let mut value = json!({
            "testsection": { "injected_secret": "secret_from_env", "plain": "keep" }
        });

        assert!(inject_env_vars(&mut value));
        assert_eq!(value["testsection"]["injected_secret"], "s3cr3t");
        assert_eq!(value["testsection"]["plain"], "keep");
    }

    #[test]
    fn test_inject_env_vars_leaves_missing_marker() {
        let mut value = json!({ "nowhere": { "missing_secret": "secret_from_env" } });

        assert!(!inject_env_vars(&mut value));
        assert_eq!(value["nowhere"]["missing_secret"], SECRET_MARKER);
    }
}
