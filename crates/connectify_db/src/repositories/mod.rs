//! Repository modules for database access
//!
//! This module contains the SQL implementations of the service traits from
//! connectify_common.

pub mod preference_store_sql;

// Re-export the preference store for ease of use
pub use preference_store_sql::SqlPreferenceStore;
