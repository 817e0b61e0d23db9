// --- File: crates/connectify_channel/src/payload.rs ---
//! The channel registration payload.
//!
//! The same JSON shape is sent to the channel API and persisted as the last
//! successfully acknowledged payload, so equality here is what decides
//! whether a registration is up to date.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of everything the backend knows about this device's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChannelRegistrationPayload {
    pub channel: ChannelPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_hints: Option<IdentityHints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChannelPayload {
    pub device_type: String,
    pub opt_in: bool,
    pub background: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_address: Option<String>,
    /// When true the backend replaces the channel's tags with `tags`
    pub set_tags: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// Hints that let the backend associate a new channel with an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IdentityHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ChannelRegistrationPayload {
    pub fn new(device_type: impl Into<String>) -> Self {
        Self {
            channel: ChannelPayload {
                device_type: device_type.into(),
                ..ChannelPayload::default()
            },
            identity_hints: None,
        }
    }

    pub fn with_opt_in(mut self, opt_in: bool) -> Self {
        self.channel.opt_in = opt_in;
        self
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.channel.background = background;
        self
    }

    pub fn with_push_address(mut self, address: impl Into<String>) -> Self {
        self.channel.push_address = Some(address.into());
        self
    }

    /// Add tags and mark the payload as authoritative for the tag set.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel.set_tags = true;
        self.channel.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.channel.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_named_user(mut self, named_user_id: impl Into<String>) -> Self {
        self.channel.named_user_id = Some(named_user_id.into());
        self
    }

    pub fn with_locale(mut self, language: impl Into<String>, country: impl Into<String>) -> Self {
        self.channel.locale_language = Some(language.into());
        self.channel.locale_country = Some(country.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.channel.timezone = Some(timezone.into());
        self
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.channel.app_version = Some(version.into());
        self
    }

    pub fn with_sdk_version(mut self, version: impl Into<String>) -> Self {
        self.channel.sdk_version = Some(version.into());
        self
    }

    pub fn with_device_model(mut self, model: impl Into<String>) -> Self {
        self.channel.device_model = Some(model.into());
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.channel.carrier = Some(carrier.into());
        self
    }

    pub fn with_user_id_hint(mut self, user_id: impl Into<String>) -> Self {
        self.identity_hints = Some(IdentityHints {
            user_id: Some(user_id.into()),
        });
        self
    }
}
