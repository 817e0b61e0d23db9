// --- File: crates/services/connectify_agent/src/host_delegate.rs ---
use async_trait::async_trait;
use connectify_channel::{ChannelRegistrarDelegate, ChannelRegistrationPayload};
use tracing::{info, warn};

/// Registrar delegate for a long-running host process.
///
/// The payload is derived once from the process environment.
pub struct HostDelegate {
    payload: ChannelRegistrationPayload,
}

impl HostDelegate {
    pub fn new(payload: ChannelRegistrationPayload) -> Self {
        Self { payload }
    }

    pub fn from_environment() -> Self {
        let mut payload = ChannelRegistrationPayload::new(std::env::consts::OS)
            .with_opt_in(true)
            .with_background(true)
            .with_sdk_version(env!("CARGO_PKG_VERSION"))
            .with_device_model(std::env::consts::ARCH);

        if let Some((language, country)) = std::env::var("LANG").ok().as_deref().and_then(parse_locale) {
            payload = payload.with_locale(language, country);
        }
        if let Ok(timezone) = std::env::var("TZ") {
            if !timezone.is_empty() {
                payload = payload.with_timezone(timezone);
            }
        }
        if let Ok(named_user) = std::env::var("CONNECTIFY_NAMED_USER") {
            if !named_user.is_empty() {
                payload = payload.with_named_user(named_user);
            }
        }

        Self::new(payload)
    }
}

/// Split a POSIX locale like `de_CH.UTF-8` into language and country.
fn parse_locale(locale: &str) -> Option<(String, String)> {
    let name = locale.split(['.', '@']).next()?;
    let (language, country) = name.split_once('_')?;
    if language.is_empty() || country.is_empty() {
        return None;
    }
    Some((language.to_string(), country.to_string()))
}

#[async_trait]
impl ChannelRegistrarDelegate for HostDelegate {
    async fn create_channel_payload(&self) -> Option<ChannelRegistrationPayload> {
        Some(self.payload.clone())
    }

    fn registration_failed(&self) {
        warn!("Channel registration was rejected");
    }

    fn registration_succeeded(&self) {
        info!("Channel registration succeeded");
    }

    fn channel_created(&self, channel_id: &str, existing: bool) {
        if existing {
            info!("Reusing existing channel {}", channel_id);
        } else {
            info!("Created channel {}", channel_id);
        }
    }
}
