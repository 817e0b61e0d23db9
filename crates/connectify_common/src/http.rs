// --- File: crates/connectify_common/src/http.rs ---

// Include the client module
pub mod client;

/// User agent sent with every outgoing request.
pub const USER_AGENT: &str = concat!("connectify/", env!("CARGO_PKG_VERSION"));
