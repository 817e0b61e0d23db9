// --- File: crates/connectify_channel/src/lib.rs ---
// Declare modules within this crate
pub mod api_client;
pub mod data_store;
pub mod delegate;
pub mod device;
pub mod error;
pub mod events;
pub mod payload;
pub mod registrar;
#[cfg(test)]
mod registrar_proptest;
pub mod task;

pub use api_client::{ChannelApiClient, ChannelApiResponse, HttpChannelApiClient};
pub use delegate::ChannelRegistrarDelegate;
pub use device::{
    DeviceIdProvider, MachineDeviceIdProvider, StaticDeviceIdProvider, StoredDeviceIdProvider,
};
pub use error::{ChannelApiError, FailureKind, RegistrationError, RegistrationFailure};
pub use events::{InvalidationReason, RegistrarEvent};
pub use payload::{ChannelPayload, ChannelRegistrationPayload, IdentityHints};
pub use registrar::{ChannelRegistrar, RegistrarDependencies, RegistrationOutcome};
pub use task::{
    ConflictPolicy, NetworkMonitor, RetryPolicy, Task, TaskHandler, TaskManager, TaskQueue,
    TaskRequestOptions, TaskResult,
};
