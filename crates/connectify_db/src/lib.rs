//! Database integration for Connectify
//!
//! This crate provides a database client that is designed to be database agnostic,
//! using SQLx as the underlying database library, and a SQL-backed
//! implementation of the `PreferenceStore` service trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use connectify_db::{DbClient, SqlPreferenceStore};
//!
//! async fn setup_store() -> Result<SqlPreferenceStore, Box<dyn std::error::Error>> {
//!     let db_client = DbClient::from_url("sqlite:data/preferences.db").await?;
//!     let store = SqlPreferenceStore::new(db_client);
//!     store.init_schema().await?;
//!     Ok(store)
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

// Re-export the client and store for ease of use
pub use client::DbClient;
pub use error::DbError;
pub use repositories::SqlPreferenceStore;
