// File: services/connectify_agent/src/main.rs
mod host_delegate;
mod store_factory;

use connectify_channel::{
    ChannelRegistrar, ChannelRegistrarDelegate, HttpChannelApiClient, RegistrarDependencies,
    RetryPolicy, TaskManager,
};
use connectify_common::{logging, SystemClock};
use connectify_config::load_config;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use host_delegate::HostDelegate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let _log_guard = logging::init_with_config(&config.logging);

    let store = store_factory::build_store(&config).await?;
    let device_ids = store_factory::build_device_ids(&config).await?;
    let api_client = HttpChannelApiClient::new(&config.channel)?;
    let task_manager = TaskManager::new(RetryPolicy::from_config(&config.registration));

    let delegate = Arc::new(HostDelegate::from_environment());
    let weak_delegate: Weak<dyn ChannelRegistrarDelegate> = Arc::downgrade(&delegate) as Weak<HostDelegate>;

    let registrar = ChannelRegistrar::new(RegistrarDependencies {
        app_key: config.channel.app_key.clone(),
        store,
        api_client: Arc::new(api_client),
        task_queue: Arc::new(task_manager.clone()),
        device_ids,
        clock: Arc::new(SystemClock),
        delegate: weak_delegate,
        config: config.registration.clone(),
    });

    let mut events = registrar.subscribe();
    match registrar.channel_id().await {
        Some(channel_id) => info!("Starting with channel {}", channel_id),
        None => info!("No channel yet, registering"),
    }
    registrar.register(false);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => info!("Registrar event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} registrar events", skipped),
                Err(RecvError::Closed) => break,
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    task_manager.shutdown();
    if let Some(failure) = registrar.last_registration_failure().await {
        warn!("Last registration failure: {:?}", failure);
    }
    Ok(())
}
