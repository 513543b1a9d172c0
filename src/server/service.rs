//! Router service
//!
//! Ties discovery, the channel registry, persistence and notifications
//! together, and owns the periodic tasks.
//!
//! Startup order is runtime → finder → channels, teardown is the reverse,
//! preceded by a final save.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::events::{EventBus, RouterEvent};
use crate::ndi::{NdiRuntime, SourceFinder};
use crate::persistence::ChannelStore;
use crate::registry::{
    Assignments, ChannelRegistry, ChannelSnapshot, DiscoveredSource, RegistryError, SourceCache,
};

use super::config::RouterConfig;

/// Result of a successful route command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutcome {
    pub channel_id: String,
    pub previous_source: Option<String>,
    pub new_source: String,
    pub routed_at: DateTime<Utc>,
}

/// Result of a successful clear command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub channel_id: String,
    pub previous_source: Option<String>,
    pub cleared_at: DateTime<Utc>,
}

/// What the startup restore did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Channels routed back to their saved source
    pub restored: Vec<String>,
    /// Channels whose saved source was not discovered
    pub skipped: Vec<String>,
    /// Channels whose route call failed
    pub failed: Vec<String>,
}

/// Liveness summary for the boundary layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub runtime_initialized: bool,
    pub channels: usize,
    pub sources: usize,
}

/// The routing service
pub struct RouterService {
    config: RouterConfig,
    runtime: Arc<NdiRuntime>,
    // Drop order matters: channel outputs go before the finder.
    registry: ChannelRegistry,
    finder: Mutex<SourceFinder>,
    sources: SourceCache,
    store: ChannelStore,
    events: EventBus,
    /// Assignments read at startup, consumed by the restore
    pending_restore: Mutex<Option<Assignments>>,
    shut_down: AtomicBool,
}

impl RouterService {
    /// Bring up the runtime, the finder and every configured channel
    ///
    /// Any failure here is fatal; native handles created so far are released
    /// before returning.
    pub async fn start(config: RouterConfig, runtime: Arc<NdiRuntime>) -> Result<Arc<Self>> {
        config.validate()?;

        tracing::info!("Initializing NDI runtime");
        runtime.initialize()?;

        tracing::info!("Creating NDI source finder");
        let mut finder = SourceFinder::new(runtime.sdk());
        if let Err(e) = finder.create() {
            runtime.destroy();
            return Err(e);
        }

        tracing::info!(count = config.channels.len(), "Creating routing channels");
        let registry = ChannelRegistry::with_receiver_wait(runtime.sdk(), config.receiver_wait);
        for channel in &config.channels {
            let ndi_name = config.ndi_name(&channel.label);
            let created = registry
                .create(
                    &channel.id,
                    &ndi_name,
                    &config.group,
                    &channel.label,
                    &channel.color,
                )
                .await;

            if let Err(e) = created {
                registry.destroy_all().await;
                finder.destroy();
                runtime.destroy();
                return Err(e.into());
            }
        }

        let store = ChannelStore::new(&config.persistence_file);
        let saved = store.load();

        Ok(Arc::new(Self {
            events: EventBus::new(config.event_capacity),
            config,
            runtime,
            registry,
            finder: Mutex::new(finder),
            sources: SourceCache::new(),
            store,
            pending_restore: Mutex::new(Some(saved)),
            shut_down: AtomicBool::new(false),
        }))
    }

    /// Get the configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    // --- Commands ---

    /// Route a channel to a discovered source by name
    ///
    /// On success the assignments are saved and `channel_routed` is emitted.
    pub async fn route_channel(
        &self,
        id: &str,
        source_name: &str,
    ) -> std::result::Result<RouteOutcome, RegistryError> {
        if !self.registry.contains(id).await {
            return Err(RegistryError::ChannelNotFound(id.to_string()));
        }

        let source = self
            .sources
            .get(source_name)
            .await
            .ok_or_else(|| RegistryError::SourceNotFound(source_name.to_string()))?;

        self.apply_route(id, &source).await
    }

    /// Clear a channel
    ///
    /// On success the assignments are saved and `channel_cleared` is emitted.
    pub async fn clear_channel(&self, id: &str) -> std::result::Result<ClearOutcome, RegistryError> {
        let transition = self.registry.clear(id).await?;

        self.persist().await;
        self.events.publish(RouterEvent::channel_cleared(&transition));

        Ok(ClearOutcome {
            channel_id: id.to_string(),
            previous_source: transition.previous_source,
            cleared_at: Utc::now(),
        })
    }

    async fn apply_route(
        &self,
        id: &str,
        source: &DiscoveredSource,
    ) -> std::result::Result<RouteOutcome, RegistryError> {
        let transition = self.registry.route(id, source).await?;

        self.persist().await;
        self.events.publish(RouterEvent::channel_routed(&transition));

        Ok(RouteOutcome {
            channel_id: id.to_string(),
            previous_source: transition.previous_source,
            new_source: source.name.clone(),
            routed_at: Utc::now(),
        })
    }

    // --- Queries ---

    pub async fn channel(&self, id: &str) -> Option<ChannelSnapshot> {
        self.registry.channel(id).await
    }

    pub async fn channels(&self) -> Vec<ChannelSnapshot> {
        self.registry.channels().await
    }

    pub async fn source(&self, name: &str) -> Option<DiscoveredSource> {
        self.sources.get(name).await
    }

    pub async fn sources(&self) -> Vec<DiscoveredSource> {
        self.sources.all().await
    }

    /// Snapshot event for a newly connected observer
    pub async fn channels_sync(&self) -> RouterEvent {
        RouterEvent::channels_sync(self.registry.channels().await)
    }

    pub async fn health(&self) -> ServiceHealth {
        ServiceHealth {
            runtime_initialized: self.runtime.is_initialized(),
            channels: self.registry.channel_count().await,
            sources: self.sources.len().await,
        }
    }

    // --- Periodic work ---

    /// Poll the finder, replace the cache and emit `sources_updated`
    pub async fn discover(&self) -> Vec<DiscoveredSource> {
        let discovered = self.finder.lock().await.poll();
        let snapshot = self.sources.replace(discovered).await;

        tracing::debug!(count = snapshot.len(), "Sources discovered");
        self.events
            .publish(RouterEvent::sources_updated(snapshot.clone()));
        snapshot
    }

    /// Refresh every channel's receiver count and emit one event per channel
    pub async fn poll_receivers(&self) {
        for id in self.registry.channel_ids().await {
            let count = self.registry.receiver_count(&id).await;
            self.events
                .publish(RouterEvent::receiver_count_updated(&id, count));
        }
    }

    /// Emit a heartbeat
    pub fn heartbeat(&self) {
        self.events.publish(RouterEvent::heartbeat());
    }

    /// Re-apply the assignments saved before the last shutdown
    ///
    /// Runs once; later calls do nothing. A discovery poll runs first so the
    /// cache reflects the network at restore time.
    pub async fn restore(&self) -> RestoreReport {
        let mut report = RestoreReport::default();

        let Some(saved) = self.pending_restore.lock().await.take() else {
            return report;
        };

        let discovered = self.discover().await;
        tracing::info!(count = discovered.len(), "Discovered NDI sources before restore");

        for (channel_id, source_name) in saved {
            let Some(source_name) = source_name else {
                continue;
            };

            let Some(source) = self.sources.get(&source_name).await else {
                tracing::warn!(
                    channel = %channel_id,
                    source = %source_name,
                    "Source not found, skipping restore"
                );
                report.skipped.push(channel_id);
                continue;
            };

            match self.apply_route(&channel_id, &source).await {
                Ok(_) => {
                    tracing::info!(channel = %channel_id, source = %source_name, "Restored");
                    report.restored.push(channel_id);
                }
                Err(e) => {
                    tracing::warn!(channel = %channel_id, error = %e, "Restore failed");
                    report.failed.push(channel_id);
                }
            }
        }

        report
    }

    /// Save the current assignments
    ///
    /// Does nothing once shutdown has started; the final snapshot is written
    /// by [`RouterService::shutdown`] before the channels are destroyed.
    pub async fn persist(&self) {
        let assignments = self.registry.assignments().await;

        // Checked after the read: a read racing `destroy_all` sees the flag.
        if self.shut_down.load(Ordering::SeqCst) {
            tracing::debug!("Skipping save after shutdown");
            return;
        }

        self.store.save(&assignments);
    }

    /// Spawn the discovery, receiver, heartbeat and restore tasks
    ///
    /// Returns the handles so the caller can abort them.
    pub fn spawn_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(4);

        let service = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.discovery_interval);
            loop {
                ticker.tick().await;
                service.discover().await;
            }
        }));

        let service = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.receiver_poll_interval);
            ticker.tick().await; // first tick is immediate; channels start with 0
            loop {
                ticker.tick().await;
                service.poll_receivers().await;
            }
        }));

        let service = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.heartbeat_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.heartbeat();
            }
        }));

        let service = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(service.config.restore_delay).await;
            let report = service.restore().await;
            tracing::info!(
                restored = report.restored.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Startup restore complete"
            );
        }));

        handles
    }

    /// Run the periodic tasks until `shutdown` resolves, then tear down
    pub async fn run_until<F>(self: &Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let handles = self.spawn_tasks();
        tracing::info!(
            channels = self.config.channels.len(),
            group = %self.config.group,
            "NDI router running"
        );

        shutdown.await;
        tracing::info!("Shutdown signal received");

        // Timers stop before any handle is destroyed.
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Background task panicked");
                }
            }
        }

        self.shutdown().await;
    }

    /// Save, then destroy channels, finder and runtime in that order
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Graceful shutdown started");
        self.store.save(&self.registry.assignments().await);
        self.registry.destroy_all().await;
        self.finder.lock().await.destroy();
        self.runtime.destroy();
        tracing::info!("Shutdown complete");
    }
}
