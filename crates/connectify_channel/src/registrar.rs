// --- File: crates/connectify_channel/src/registrar.rs ---
//! Channel registration.
//!
//! The registrar creates the device channel on first run, updates it when the
//! payload changes or the last update is older than the update interval, and
//! invalidates it on a 409 or when the app was restored onto another device.
//! All network work runs as a single task on the [`TaskQueue`], so at most one
//! attempt is in flight.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use connectify_common::{Clock, ConnectifyError, PreferenceStore};
use connectify_config::RegistrationConfig;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, OnceCell};
use tracing::{debug, error, info, trace, warn};

use crate::api_client::{ChannelApiClient, ChannelApiResponse};
use crate::data_store::ChannelDataStore;
use crate::delegate::ChannelRegistrarDelegate;
use crate::device::DeviceIdProvider;
use crate::error::{ChannelApiError, RegistrationError, RegistrationFailure};
use crate::events::{EventBus, InvalidationReason, RegistrarEvent};
use crate::payload::ChannelRegistrationPayload;
use crate::task::{ConflictPolicy, Task, TaskHandler, TaskQueue, TaskRequestOptions, TaskResult};

pub const REGISTRATION_TASK_ID: &str = "channel_registrar.registration";
pub const FORCEFULLY_EXTRA: &str = "forcefully";

pub(crate) const CHANNEL_ID_KEY: &str = "channel_id";
pub(crate) const LAST_PAYLOAD_KEY: &str = "channel_registrar.payload";
pub(crate) const LAST_UPDATE_KEY: &str = "channel_registrar.last_update";
pub(crate) const DEVICE_ID_KEY: &str = "channel_registrar.device_id";
pub(crate) const LAST_FAILURE_KEY: &str = "channel_registrar.last_failure";

/// Decide whether the backend needs to see `payload`.
///
/// True when nothing was acknowledged yet, when the payload changed, or when
/// the last update is at least `interval` old.
pub fn should_update(
    payload: &ChannelRegistrationPayload,
    last_payload: Option<&ChannelRegistrationPayload>,
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> bool {
    let Some(last_payload) = last_payload else {
        trace!("Should update: no previous payload");
        return true;
    };

    if payload != last_payload {
        trace!("Should update: payload changed");
        return true;
    }

    match last_update {
        Some(last_update) if now - last_update < interval => {
            trace!("Should not update: registration is current");
            false
        }
        _ => {
            trace!("Should update: update interval elapsed");
            true
        }
    }
}

/// What a registration attempt did when it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    UpToDate,
    Created { channel_id: String, existing: bool },
    Updated { channel_id: String },
}

/// Everything a [`ChannelRegistrar`] needs from its host.
pub struct RegistrarDependencies {
    /// Prefix for every stored key, normally the app key
    pub app_key: String,
    pub store: Arc<dyn PreferenceStore>,
    pub api_client: Arc<dyn ChannelApiClient>,
    pub task_queue: Arc<dyn TaskQueue>,
    pub device_ids: Arc<dyn DeviceIdProvider>,
    pub clock: Arc<dyn Clock>,
    pub delegate: Weak<dyn ChannelRegistrarDelegate>,
    pub config: RegistrationConfig,
}

struct RegistrarInner {
    data_store: ChannelDataStore,
    api_client: Arc<dyn ChannelApiClient>,
    task_queue: Arc<dyn TaskQueue>,
    device_ids: Arc<dyn DeviceIdProvider>,
    clock: Arc<dyn Clock>,
    delegate: Weak<dyn ChannelRegistrarDelegate>,
    events: EventBus,
    update_interval: Duration,
    restore_check: OnceCell<()>,
}

/// Registers the device channel with the backend.
///
/// Cheap to clone. Dropping the last clone stops the queued task from doing
/// any further work.
#[derive(Clone)]
pub struct ChannelRegistrar {
    inner: Arc<RegistrarInner>,
}

impl ChannelRegistrar {
    /// Create the registrar and bind its task handler to the task queue.
    ///
    /// If called inside a tokio runtime the app-restore check starts in the
    /// background. Registration attempts always wait for it to finish.
    pub fn new(deps: RegistrarDependencies) -> Self {
        let update_interval = update_interval(deps.config.update_interval_hours);

        let inner = Arc::new(RegistrarInner {
            data_store: ChannelDataStore::new(deps.store, deps.app_key),
            api_client: deps.api_client,
            task_queue: deps.task_queue,
            device_ids: deps.device_ids,
            clock: deps.clock,
            delegate: deps.delegate,
            events: EventBus::new(),
            update_interval,
            restore_check: OnceCell::new(),
        });

        let handler = Arc::new(RegistrationTaskHandler {
            registrar: Arc::downgrade(&inner),
        });
        inner.task_queue.register(REGISTRATION_TASK_ID, handler);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&inner);
            runtime.spawn(async move {
                // Failures are logged and retried by the next registration
                let _ = inner.ensure_restore_checked().await;
            });
        }

        Self { inner }
    }

    /// The current channel ID, if a channel was created.
    pub async fn channel_id(&self) -> Option<String> {
        // On failure the stored ID is returned unchecked
        let _ = self.inner.ensure_restore_checked().await;
        match self.inner.data_store.string(CHANNEL_ID_KEY).await {
            Ok(channel_id) => channel_id,
            Err(e) => {
                error!("Failed to read channel ID: {}", e);
                None
            }
        }
    }

    /// Queue a registration.
    ///
    /// A forceful registration replaces any queued or running one and always
    /// reaches the backend. A normal one is dropped if one is already queued.
    pub fn register(&self, forcefully: bool) {
        self.inner.register(forcefully);
    }

    /// Forget what the backend acknowledged and register forcefully.
    pub async fn perform_full_registration(&self) {
        if let Err(e) = self.inner.clear_last_registration().await {
            error!("Failed to clear last registration: {}", e);
        }
        self.inner.register(true);
    }

    /// Observe registrar events. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrarEvent> {
        self.inner.events.subscribe()
    }

    /// The last failed registration attempt since the last success.
    pub async fn last_registration_failure(&self) -> Option<RegistrationFailure> {
        match self.inner.data_store.object(LAST_FAILURE_KEY).await {
            Ok(failure) => failure,
            Err(e) => {
                warn!("Failed to read last registration failure: {}", e);
                None
            }
        }
    }
}

fn update_interval(hours: u64) -> Duration {
    i64::try_from(hours)
        .ok()
        .and_then(Duration::try_hours)
        .unwrap_or(Duration::MAX)
}

impl RegistrarInner {
    fn register(&self, forcefully: bool) {
        let policy = if forcefully {
            ConflictPolicy::Replace
        } else {
            ConflictPolicy::Keep
        };
        let options =
            TaskRequestOptions::new(policy, true).with_extra(FORCEFULLY_EXTRA, forcefully);

        debug!("Queueing channel registration (forcefully: {})", forcefully);
        self.task_queue.enqueue_request(REGISTRATION_TASK_ID, options);
    }

    /// Runs the restore check until it succeeds once. A failed check is
    /// retried by the next caller.
    async fn ensure_restore_checked(&self) -> Result<(), ConnectifyError> {
        self.restore_check
            .get_or_try_init(|| self.check_app_restore())
            .await
            .map(|_| ())
            .inspect_err(|e| error!("App restore check failed: {}", e))
    }

    async fn check_app_restore(&self) -> Result<(), ConnectifyError> {
        if self.data_store.string(CHANNEL_ID_KEY).await?.is_none() {
            return Ok(());
        }

        let device_id = self.device_ids.current_device_id().await?;

        match self.data_store.string(DEVICE_ID_KEY).await? {
            Some(stored) if stored == device_id => Ok(()),
            Some(_) => {
                info!("Device ID changed, clearing channel");
                self.clear_channel_data(InvalidationReason::AppRestore)
                    .await?;
                self.data_store
                    .set_string(DEVICE_ID_KEY, Some(&device_id))
                    .await
            }
            None => {
                self.data_store
                    .set_string(DEVICE_ID_KEY, Some(&device_id))
                    .await
            }
        }
    }

    async fn remember_device_id(&self) -> Result<(), ConnectifyError> {
        let device_id = self.device_ids.current_device_id().await?;
        self.data_store
            .set_string(DEVICE_ID_KEY, Some(&device_id))
            .await
    }

    async fn handle_task(&self, task: &Task) -> TaskResult {
        let forcefully = task
            .request_options()
            .extra_bool(FORCEFULLY_EXTRA)
            .unwrap_or(false);

        match self.run_registration(forcefully).await {
            Ok(outcome) => {
                debug!("Channel registration finished: {:?}", outcome);
                TaskResult::Completed
            }
            Err(e) if e.is_retryable() => {
                warn!("Channel registration failed, will retry: {}", e);
                TaskResult::Failed
            }
            Err(e) => {
                debug!("Channel registration ended: {}", e);
                TaskResult::Completed
            }
        }
    }

    async fn run_registration(
        &self,
        forcefully: bool,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let result = self.perform_registration(forcefully).await;
        if let Err(e) = &result {
            if !matches!(e, RegistrationError::Conflict) {
                self.record_failure(e).await;
            }
        }
        result
    }

    async fn perform_registration(
        &self,
        forcefully: bool,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.ensure_restore_checked().await?;

        let payload = self
            .create_payload()
            .await
            .ok_or(RegistrationError::PayloadUnavailable)?;

        let channel_id = self.data_store.string(CHANNEL_ID_KEY).await?;

        match channel_id {
            Some(channel_id) => {
                if !forcefully && !self.should_update(&payload).await {
                    debug!("Channel registration is up to date");
                    return Ok(RegistrationOutcome::UpToDate);
                }
                self.update_channel(&channel_id, &payload).await
            }
            None => self.create_channel(&payload).await,
        }
    }

    async fn update_channel(
        &self,
        channel_id: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        trace!("Updating channel {}", channel_id);
        let response = self.api_client.update_channel(channel_id, payload).await?;

        if response.is_success() {
            trace!("Channel {} updated", channel_id);
            self.registration_succeeded(channel_id, payload).await?;
            return Ok(RegistrationOutcome::Updated {
                channel_id: channel_id.to_string(),
            });
        }

        if response.is_conflict() {
            info!("Channel {} conflicted, creating a new one", channel_id);
            self.clear_channel_data(InvalidationReason::Conflict).await?;
            self.register(true);
            return Err(RegistrationError::Conflict);
        }

        Err(self.registration_failed(&response))
    }

    async fn create_channel(
        &self,
        payload: &ChannelRegistrationPayload,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        trace!("Creating channel");
        let response = self.api_client.create_channel(payload).await?;

        if !response.is_success() {
            return Err(self.registration_failed(&response));
        }

        let channel_id = response
            .channel_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(ChannelApiError::MissingChannelId {
                status: response.status,
            })?;
        let existing = response.status == 200;

        self.data_store
            .set_string(CHANNEL_ID_KEY, Some(&channel_id))
            .await?;
        info!("Channel ID: {}", channel_id);

        // Keep the restore check working for channels created after startup
        if let Err(e) = self.remember_device_id().await {
            warn!("Failed to store device ID: {}", e);
        }

        if let Some(delegate) = self.delegate.upgrade() {
            delegate.channel_created(&channel_id, existing);
        }
        self.events.emit(RegistrarEvent::ChannelCreated {
            channel_id: channel_id.clone(),
            existing,
        });

        self.registration_succeeded(&channel_id, payload).await?;
        Ok(RegistrationOutcome::Created {
            channel_id,
            existing,
        })
    }

    async fn registration_succeeded(
        &self,
        channel_id: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<(), ConnectifyError> {
        let now = self.clock.now();
        self.data_store
            .set_object(LAST_PAYLOAD_KEY, Some(payload))
            .await?;
        self.data_store.set_object(LAST_UPDATE_KEY, Some(&now)).await?;
        self.data_store.remove(LAST_FAILURE_KEY).await?;

        if let Some(delegate) = self.delegate.upgrade() {
            delegate.registration_succeeded();
        }
        self.events.emit(RegistrarEvent::RegistrationSucceeded {
            channel_id: channel_id.to_string(),
        });

        // The payload may have changed while the request was in flight
        if let Some(current) = self.create_payload().await {
            if self.should_update(&current).await {
                debug!("Payload changed during registration, queueing another one");
                self.register(false);
            }
        }
        Ok(())
    }

    fn registration_failed(&self, response: &ChannelApiResponse) -> RegistrationError {
        debug!("Channel registration failed with status {}", response.status);
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.registration_failed();
        }
        self.events.emit(RegistrarEvent::RegistrationFailed {
            status: response.status,
        });
        RegistrationError::from_response(response)
    }

    async fn record_failure(&self, error: &RegistrationError) {
        let failure = RegistrationFailure {
            kind: error.kind(),
            status: error.status(),
            at: self.clock.now(),
        };
        if let Err(e) = self
            .data_store
            .set_object(LAST_FAILURE_KEY, Some(&failure))
            .await
        {
            warn!("Failed to record registration failure: {}", e);
        }
    }

    async fn should_update(&self, payload: &ChannelRegistrationPayload) -> bool {
        let last_payload = self.last_payload().await;
        let last_update = match self.data_store.object::<DateTime<Utc>>(LAST_UPDATE_KEY).await {
            Ok(last_update) => last_update,
            Err(e) => {
                warn!("Ignoring unreadable last update time: {}", e);
                None
            }
        };

        should_update(
            payload,
            last_payload.as_ref(),
            last_update,
            self.clock.now(),
            self.update_interval,
        )
    }

    async fn last_payload(&self) -> Option<ChannelRegistrationPayload> {
        match self.data_store.object(LAST_PAYLOAD_KEY).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring unreadable last payload: {}", e);
                None
            }
        }
    }

    async fn create_payload(&self) -> Option<ChannelRegistrationPayload> {
        let Some(delegate) = self.delegate.upgrade() else {
            debug!("Registrar delegate is gone");
            return None;
        };
        delegate.create_channel_payload().await
    }

    async fn clear_last_registration(&self) -> Result<(), ConnectifyError> {
        self.data_store.remove(LAST_PAYLOAD_KEY).await?;
        self.data_store.remove(LAST_UPDATE_KEY).await
    }

    async fn clear_channel_data(&self, reason: InvalidationReason) -> Result<(), ConnectifyError> {
        self.data_store.remove(CHANNEL_ID_KEY).await?;
        self.clear_last_registration().await?;
        self.events.emit(RegistrarEvent::ChannelInvalidated { reason });
        Ok(())
    }
}

struct RegistrationTaskHandler {
    registrar: Weak<RegistrarInner>,
}

#[async_trait]
impl TaskHandler for RegistrationTaskHandler {
    async fn handle(&self, task: &Task) -> TaskResult {
        if task.task_id() != REGISTRATION_TASK_ID {
            error!("Invalid task: {}", task.task_id());
            return TaskResult::Completed;
        }

        match self.registrar.upgrade() {
            Some(registrar) => registrar.handle_task(task).await,
            None => {
                debug!("Registrar dropped, skipping registration");
                TaskResult::Completed
            }
        }
    }
}
