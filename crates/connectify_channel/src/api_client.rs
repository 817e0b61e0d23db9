// --- File: crates/connectify_channel/src/api_client.rs ---
//! Client for the remote channel API.

use async_trait::async_trait;
use connectify_common::http::client::create_client;
use connectify_config::ChannelApiConfig;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::ChannelApiError;
use crate::payload::ChannelRegistrationPayload;

/// Outcome of a create or update call that reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelApiResponse {
    pub status: u16,
    pub channel_id: Option<String>,
}

impl ChannelApiResponse {
    pub fn new(status: u16, channel_id: Option<String>) -> Self {
        Self { status, channel_id }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Remote operations the registrar consumes.
///
/// Implementations return `Err` only when no response was received.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelApiClient: Send + Sync {
    /// Create a new channel for `payload`.
    async fn create_channel(
        &self,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ChannelApiResponse, ChannelApiError>;

    /// Update the channel `channel_id` with `payload`.
    async fn update_channel(
        &self,
        channel_id: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ChannelApiResponse, ChannelApiError>;
}

#[derive(Debug, Deserialize)]
struct ChannelResponseBody {
    channel_id: Option<String>,
}

/// reqwest-backed [`ChannelApiClient`].
#[derive(Debug, Clone)]
pub struct HttpChannelApiClient {
    client: Client,
    base_url: Url,
    app_key: String,
    app_secret: String,
}

impl HttpChannelApiClient {
    /// Build a client from the `channel` configuration section.
    pub fn new(config: &ChannelApiConfig) -> Result<Self, ChannelApiError> {
        let client = create_client(config.request_timeout_secs, true).map_err(|e| {
            error!("Failed to build channel API HTTP client: {}", e);
            ChannelApiError::ConfigError(e.to_string())
        })?;
        Self::with_client(client, config)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(client: Client, config: &ChannelApiConfig) -> Result<Self, ChannelApiError> {
        if config.device_api_url.trim().is_empty() {
            return Err(ChannelApiError::ConfigError(
                "device_api_url must not be empty".to_string(),
            ));
        }
        if config.app_key.is_empty() {
            return Err(ChannelApiError::ConfigError(
                "app_key must not be empty".to_string(),
            ));
        }

        let base_url = Url::parse(config.device_api_url.trim())
            .map_err(|e| ChannelApiError::ConfigError(format!("invalid device_api_url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ChannelApiError::ConfigError(format!(
                "device_api_url is not a base URL: {}",
                base_url
            )));
        }

        info!("Channel API client targeting {}", base_url);
        Ok(Self {
            client,
            base_url,
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
        })
    }

    fn channels_url(&self) -> Result<Url, ChannelApiError> {
        self.api_url(&["api", "channels", ""])
    }

    /// The channel ID is percent-encoded as a single path segment.
    fn channel_url(&self, channel_id: &str) -> Result<Url, ChannelApiError> {
        self.api_url(&["api", "channels", channel_id])
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, ChannelApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ChannelApiError::ConfigError(format!(
                    "device_api_url is not a base URL: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_channel_id(response: reqwest::Response) -> Result<Option<String>, ChannelApiError> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let parsed: ChannelResponseBody = serde_json::from_str(&body)
            .map_err(|e| ChannelApiError::InvalidResponse(e.to_string()))?;
        Ok(parsed.channel_id.filter(|id| !id.is_empty()))
    }
}

#[async_trait]
impl ChannelApiClient for HttpChannelApiClient {
    async fn create_channel(
        &self,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ChannelApiResponse, ChannelApiError> {
        let url = self.channels_url()?;
        debug!("Creating channel at {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.app_key, Some(&self.app_secret))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Channel create request failed: {}", e);
                ChannelApiError::RequestError(e)
            })?;

        let status = response.status().as_u16();
        debug!("Channel create finished with status {}", status);

        if !response.status().is_success() {
            return Ok(ChannelApiResponse::new(status, None));
        }

        match Self::read_channel_id(response).await? {
            Some(channel_id) => Ok(ChannelApiResponse::new(status, Some(channel_id))),
            None => {
                error!("Channel create succeeded without a channel ID");
                Err(ChannelApiError::MissingChannelId { status })
            }
        }
    }

    async fn update_channel(
        &self,
        channel_id: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ChannelApiResponse, ChannelApiError> {
        debug!("Updating channel {}", channel_id);

        let response = self
            .client
            .put(self.channel_url(channel_id)?)
            .basic_auth(&self.app_key, Some(&self.app_secret))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Channel update request failed: {}", e);
                ChannelApiError::RequestError(e)
            })?;

        let status = response.status().as_u16();
        debug!("Channel update finished with status {}", status);

        let channel_id = response
            .status()
            .is_success()
            .then(|| channel_id.to_string());
        Ok(ChannelApiResponse::new(status, channel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ChannelApiConfig {
        ChannelApiConfig {
            device_api_url: url.to_string(),
            app_key: "app-key".to_string(),
            app_secret: "app-secret".to_string(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_response_classification() {
        assert!(ChannelApiResponse::new(201, None).is_success());
        assert!(ChannelApiResponse::new(503, None).is_server_error());
        assert!(ChannelApiResponse::new(409, None).is_conflict());
        assert!(ChannelApiResponse::new(429, None).is_rate_limited());
        assert!(!ChannelApiResponse::new(302, None).is_success());
        assert!(!ChannelApiResponse::new(302, None).is_server_error());
    }

    #[test]
    fn test_urls_are_normalized() {
        let client = HttpChannelApiClient::new(&config("https://device.example.com/")).unwrap();
        assert_eq!(
            client.channels_url().unwrap().as_str(),
            "https://device.example.com/api/channels/"
        );
        assert_eq!(
            client.channel_url("abc123").unwrap().as_str(),
            "https://device.example.com/api/channels/abc123"
        );

        let prefixed = HttpChannelApiClient::new(&config("https://example.com/push")).unwrap();
        assert_eq!(
            prefixed.channels_url().unwrap().as_str(),
            "https://example.com/push/api/channels/"
        );
    }

    #[test]
    fn test_channel_id_stays_one_path_segment() {
        let client = HttpChannelApiClient::new(&config("https://device.example.com")).unwrap();

        let url = client.channel_url("../a/b?c#d").unwrap();

        assert_eq!(url.path(), "/api/channels/..%2Fa%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_rejects_missing_url_or_key() {
        assert!(matches!(
            HttpChannelApiClient::new(&config("  ")),
            Err(ChannelApiError::ConfigError(_))
        ));

        assert!(matches!(
            HttpChannelApiClient::new(&config("not a url")),
            Err(ChannelApiError::ConfigError(_))
        ));
        assert!(matches!(
            HttpChannelApiClient::new(&config("mailto:ops@example.com")),
            Err(ChannelApiError::ConfigError(_))
        ));

        let mut no_key = config("https://device.example.com");
        no_key.app_key.clear();
        assert!(matches!(
            HttpChannelApiClient::new(&no_key),
            Err(ChannelApiError::ConfigError(_))
        ));
    }
}
