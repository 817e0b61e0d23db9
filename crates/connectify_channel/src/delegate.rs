// --- File: crates/connectify_channel/src/delegate.rs ---
use async_trait::async_trait;

use crate::payload::ChannelRegistrationPayload;

/// Host hooks for the channel registrar.
///
/// The registrar only keeps a weak reference, so the host owns the delegate.
/// Callbacks run on the registrar's task and must not block.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelRegistrarDelegate: Send + Sync {
    /// Build the payload describing the channel right now.
    ///
    /// Returning `None` fails the registration attempt, which is retried later.
    async fn create_channel_payload(&self) -> Option<ChannelRegistrationPayload>;

    /// The backend rejected the registration.
    fn registration_failed(&self);

    /// The backend acknowledged the registration.
    fn registration_succeeded(&self);

    /// A channel was created. `existing` is true when the backend already had it.
    fn channel_created(&self, channel_id: &str, existing: bool);
}
