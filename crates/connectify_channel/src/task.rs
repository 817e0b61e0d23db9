// --- File: crates/connectify_channel/src/task.rs ---
//! Serialized, retried background work keyed by task ID.
//!
//! A [`TaskManager`] runs at most one attempt per task ID at a time. A handler
//! reports [`TaskResult::Failed`] to be retried with exponential backoff.
//! Expiring an attempt (timeout, replacement, shutdown) drops the handler
//! future, which cancels whatever it was awaiting.

use async_trait::async_trait;
use connectify_config::RegistrationConfig;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, trace, warn};

/// How a new request interacts with one already queued for the same task ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Drop the new request if one is queued and not yet started
    #[default]
    Keep,
    /// Replace the queued request and expire the running attempt
    Replace,
    /// Queue the new request behind the pending ones
    Append,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskRequestOptions {
    pub conflict_policy: ConflictPolicy,
    pub requires_network: bool,
    pub extras: Map<String, Value>,
}

impl TaskRequestOptions {
    pub fn new(conflict_policy: ConflictPolicy, requires_network: bool) -> Self {
        Self {
            conflict_policy,
            requires_network,
            extras: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn extra_bool(&self, key: &str) -> Option<bool> {
        self.extras.get(key).and_then(Value::as_bool)
    }
}

/// One attempt of a queued request, as seen by its handler.
#[derive(Debug, Clone)]
pub struct Task {
    task_id: String,
    request_options: TaskRequestOptions,
    attempt: u32,
}

impl Task {
    pub fn new(task_id: impl Into<String>, request_options: TaskRequestOptions, attempt: u32) -> Self {
        Self {
            task_id: task_id.into(),
            request_options,
            attempt,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn request_options(&self) -> &TaskRequestOptions {
        &self.request_options
    }

    /// 1 for the first attempt of a request.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Completed,
    Failed,
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> TaskResult;
}

/// The queue a component hands its background work to.
pub trait TaskQueue: Send + Sync {
    /// Bind `handler` to `task_id`, replacing any previous handler.
    fn register(&self, task_id: &str, handler: Arc<dyn TaskHandler>);

    /// Queue a request for `task_id`. Returns immediately.
    fn enqueue_request(&self, task_id: &str, options: TaskRequestOptions);
}

pub trait NetworkMonitor: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl NetworkMonitor for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Lower bound for any retry or network wait.
pub const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Exponential backoff between failed attempts of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// `None` retries until the request completes or is replaced
    pub max_attempts: Option<u32>,
    /// Attempts running longer than this are expired and count as failed
    pub task_timeout: Duration,
}

impl RetryPolicy {
    /// Zero durations are raised to one second.
    pub fn from_config(config: &RegistrationConfig) -> Self {
        let initial_backoff_secs = config.initial_backoff_secs.max(1);
        Self {
            initial_backoff: Duration::from_secs(initial_backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs.max(initial_backoff_secs)),
            max_attempts: config.max_attempts,
            task_timeout: Duration::from_secs(config.task_timeout_secs.max(1)),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based), never below
    /// [`MIN_BACKOFF`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
            .max(MIN_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RegistrationConfig::default())
    }
}

#[derive(Default)]
struct TaskSlot {
    queue: VecDeque<TaskRequestOptions>,
    worker_running: bool,
    expire: Option<oneshot::Sender<()>>,
}

struct TaskManagerInner {
    handlers: Mutex<HashMap<String, Arc<dyn TaskHandler>>>,
    slots: Mutex<HashMap<String, TaskSlot>>,
    retry: RetryPolicy,
    network: Arc<dyn NetworkMonitor>,
    shutdown: watch::Sender<bool>,
}

/// Tokio-backed [`TaskQueue`] with one worker per task ID.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct TaskManager {
    inner: Arc<TaskManagerInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum AttemptOutcome {
    Finished(TaskResult),
    Expired,
}

impl TaskManager {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_network_monitor(retry, Arc::new(AlwaysOnline))
    }

    pub fn with_network_monitor(retry: RetryPolicy, network: Arc<dyn NetworkMonitor>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(TaskManagerInner {
                handlers: Mutex::new(HashMap::new()),
                slots: Mutex::new(HashMap::new()),
                retry,
                network,
                shutdown,
            }),
        }
    }

    /// Requests for `task_id` waiting to start.
    pub fn pending_count(&self, task_id: &str) -> usize {
        lock(&self.inner.slots)
            .get(task_id)
            .map_or(0, |slot| slot.queue.len())
    }

    /// True while a worker is running or retrying a request for `task_id`.
    pub fn is_active(&self, task_id: &str) -> bool {
        lock(&self.inner.slots)
            .get(task_id)
            .is_some_and(|slot| slot.worker_running)
    }

    /// Expire every running attempt, drop queued requests and refuse new ones.
    pub fn shutdown(&self) {
        debug!("Shutting down task manager");
        self.inner.shutdown.send_replace(true);

        let mut slots = lock(&self.inner.slots);
        for (task_id, slot) in slots.iter_mut() {
            if !slot.queue.is_empty() {
                debug!("Dropping {} queued request(s) for {}", slot.queue.len(), task_id);
            }
            slot.queue.clear();
            if let Some(expire) = slot.expire.take() {
                let _ = expire.send(());
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }
}

impl TaskQueue for TaskManager {
    fn register(&self, task_id: &str, handler: Arc<dyn TaskHandler>) {
        debug!("Registering task handler for {}", task_id);
        lock(&self.inner.handlers).insert(task_id.to_string(), handler);
    }

    fn enqueue_request(&self, task_id: &str, options: TaskRequestOptions) {
        if self.is_shut_down() {
            warn!("Task manager is shut down, dropping request for {}", task_id);
            return;
        }
        if !lock(&self.inner.handlers).contains_key(task_id) {
            warn!("No handler registered for {}, dropping request", task_id);
            return;
        }

        let mut slots = lock(&self.inner.slots);
        let slot = slots.entry(task_id.to_string()).or_default();

        match options.conflict_policy {
            ConflictPolicy::Keep => {
                if !slot.queue.is_empty() {
                    trace!("Request for {} already pending, keeping it", task_id);
                    return;
                }
                slot.queue.push_back(options);
            }
            ConflictPolicy::Replace => {
                slot.queue.clear();
                slot.queue.push_back(options);
                if let Some(expire) = slot.expire.take() {
                    debug!("Expiring running attempt of {}", task_id);
                    let _ = expire.send(());
                }
            }
            ConflictPolicy::Append => slot.queue.push_back(options),
        }

        if slot.worker_running {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                slot.worker_running = true;
                let inner = Arc::clone(&self.inner);
                let task_id = task_id.to_string();
                handle.spawn(async move { inner.run_worker(task_id).await });
            }
            Err(e) => {
                error!("Cannot start worker for {}: {}", task_id, e);
            }
        }
    }
}

impl TaskManagerInner {
    async fn run_worker(self: Arc<Self>, task_id: String) {
        trace!("Worker for {} started", task_id);
        loop {
            let next = {
                let mut slots = lock(&self.slots);
                let Some(slot) = slots.get_mut(&task_id) else {
                    return;
                };
                let shut_down = *self.shutdown.borrow();
                match slot.queue.pop_front() {
                    Some(options) if !shut_down => {
                        let (tx, rx) = oneshot::channel();
                        slot.expire = Some(tx);
                        Some((options, rx))
                    }
                    _ => {
                        slot.worker_running = false;
                        slot.expire = None;
                        None
                    }
                }
            };

            let Some((options, expire)) = next else {
                trace!("Worker for {} idle", task_id);
                return;
            };

            let handler = lock(&self.handlers).get(&task_id).cloned();
            match handler {
                Some(handler) => self.run_request(&task_id, handler, options, expire).await,
                None => warn!("Handler for {} disappeared, dropping request", task_id),
            }
        }
    }

    async fn run_request(
        &self,
        task_id: &str,
        handler: Arc<dyn TaskHandler>,
        options: TaskRequestOptions,
        mut expire: oneshot::Receiver<()>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        let mut attempt: u32 = 1;

        loop {
            if options.requires_network && !self.network.is_online() {
                debug!("Waiting for network before running {}", task_id);
                tokio::select! {
                    _ = tokio::time::sleep(self.retry.backoff(1)) => continue,
                    _ = &mut expire => return,
                    _ = shutdown.changed() => return,
                }
            }

            let task = Task::new(task_id, options.clone(), attempt);
            trace!("Running {} (attempt {})", task_id, attempt);

            let outcome = tokio::select! {
                result = tokio::time::timeout(self.retry.task_timeout, handler.handle(&task)) => {
                    match result {
                        Ok(result) => AttemptOutcome::Finished(result),
                        Err(_) => {
                            warn!("Attempt {} of {} timed out", attempt, task_id);
                            AttemptOutcome::Finished(TaskResult::Failed)
                        }
                    }
                }
                _ = &mut expire => AttemptOutcome::Expired,
                _ = shutdown.changed() => AttemptOutcome::Expired,
            };

            match outcome {
                AttemptOutcome::Expired => {
                    debug!("Attempt {} of {} expired", attempt, task_id);
                    return;
                }
                AttemptOutcome::Finished(TaskResult::Completed) => {
                    trace!("{} completed", task_id);
                    return;
                }
                AttemptOutcome::Finished(TaskResult::Failed) => {
                    if self.retry.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!("{} failed {} time(s), giving up", task_id, attempt);
                        return;
                    }
                    let delay = self.retry.backoff(attempt);
                    debug!("{} failed, retrying in {:?}", task_id, delay);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = &mut expire => return,
                        _ = shutdown.changed() => return,
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
