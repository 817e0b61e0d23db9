// --- File: crates/connectify_common/src/lib.rs ---

// Declare modules within this crate
pub mod error;    // Error handling
pub mod http;     // HTTP utilities
pub mod logging;  // Logging utilities
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{config_error, internal_error, store_error, ConnectifyError};

// Re-export HTTP utilities for easier access
pub use http::client::create_client;

// Re-export logging utilities for easier access
pub use logging::init_with_config;

// Re-export service abstractions for easier access
pub use services::{Clock, ManualClock, MemoryPreferenceStore, PreferenceStore, SystemClock};

// This crate provides common functionality that can be used across the workspace.
// It includes error handling, logging, HTTP client construction and the
// service traits that the registrar depends on.
