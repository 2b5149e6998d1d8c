//! # Process Lifecycle
//!
//! Composes the relay components, starts the reconnect ticker, and drives
//! graceful shutdown.

use crate::config::RelayConfig;
use crate::messenger::Messenger;
use crate::wiring;
use relay_bus::EventBus;
use relay_stream::{ContentPlatform, StreamConfig, StreamManager};
use relay_subscriptions::{FileSnapshotBackend, SubscriptionStore};
use relay_verification::VerificationRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Upper bound on the final snapshot write during shutdown. Past this the
/// process exits with whatever the last successful write captured.
const SHUTDOWN_PERSIST_TIMEOUT: Duration = Duration::from_secs(15);

/// The composed relay service.
pub struct RelayRuntime {
    bus: Arc<EventBus>,
    store: Arc<SubscriptionStore>,
    registry: Arc<VerificationRegistry>,
    manager: Arc<StreamManager>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayRuntime {
    /// Compose the relay over the given platform and messenger adapters and
    /// wire all event handlers. Nothing runs until [`Self::start`].
    pub fn new(
        config: &RelayConfig,
        client: Arc<dyn ContentPlatform>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(SubscriptionStore::new(
            Box::new(FileSnapshotBackend::new(&config.snapshot_path)),
            bus.clone(),
        ));
        let registry = Arc::new(VerificationRegistry::new());

        let mut stream_config = StreamConfig::new(&config.keyword);
        stream_config.reconnect_interval_minutes = config.reconnect_interval_minutes;

        let manager = Arc::new(StreamManager::new(
            client,
            store.clone(),
            registry.clone(),
            bus.clone(),
            stream_config,
        ));

        wiring::wire_handlers(
            &bus,
            store.clone(),
            messenger,
            config.max_followed_accounts,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            bus,
            store,
            registry,
            manager,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Load the persisted subscriptions and start the reconnect ticker.
    ///
    /// Returns the ticker task; it exits after [`Self::shutdown`].
    pub async fn start(&self) -> JoinHandle<()> {
        self.store.load().await;
        info!("Relay started");
        tokio::spawn(self.manager.clone().run(self.shutdown_rx.clone()))
    }

    /// Stop the ticker, drop the live connection, and write the final
    /// snapshot with a bounded wait.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        let _ = self.shutdown_tx.send(true);

        let store = self.store.clone();
        let save = tokio::task::spawn_blocking(move || store.persist());
        match tokio::time::timeout(SHUTDOWN_PERSIST_TIMEOUT, save).await {
            Ok(Ok(Ok(()))) => info!("Final snapshot saved"),
            Ok(Ok(Err(e))) => warn!(error = %e, "Final snapshot save failed"),
            Ok(Err(e)) => warn!(error = %e, "Final snapshot task failed"),
            Err(_) => warn!("Final snapshot save timed out, exiting anyway"),
        }
    }

    /// The shared event bus.
    #[must_use]
    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// The subscription store.
    #[must_use]
    pub fn store(&self) -> Arc<SubscriptionStore> {
        self.store.clone()
    }

    /// The verification registry.
    #[must_use]
    pub fn registry(&self) -> Arc<VerificationRegistry> {
        self.registry.clone()
    }

    /// The stream manager; follow requests enter here.
    #[must_use]
    pub fn manager(&self) -> Arc<StreamManager> {
        self.manager.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::RecordingMessenger;
    use relay_stream::NoOpContentPlatform;
    use relay_subscriptions::AccountPatch;

    fn config(snapshot_path: std::path::PathBuf) -> RelayConfig {
        RelayConfig {
            keyword: "#NintendoSwitch".to_string(),
            reconnect_interval_minutes: 15,
            max_followed_accounts: 100,
            snapshot_path,
            log_level: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn shutdown_writes_the_final_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        let runtime = RelayRuntime::new(
            &config(path.clone()),
            Arc::new(NoOpContentPlatform),
            Arc::new(RecordingMessenger::new()),
        );
        let runner = runtime.start().await;

        // Upserts alone never persist; the shutdown snapshot must capture
        // them.
        runtime.store().upsert("u1", AccountPatch::default());
        runtime.shutdown().await;
        runner.await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(snapshot.get("u1").is_some());
    }

    #[tokio::test]
    async fn restart_restores_persisted_follows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        {
            let runtime = RelayRuntime::new(
                &config(path.clone()),
                Arc::new(NoOpContentPlatform),
                Arc::new(RecordingMessenger::new()),
            );
            runtime.store().upsert("u1", AccountPatch::default());
            runtime.store().add_follow("u1", "42", "@alice").await;
        }

        let runtime = RelayRuntime::new(
            &config(path),
            Arc::new(NoOpContentPlatform),
            Arc::new(RecordingMessenger::new()),
        );
        let runner = runtime.start().await;
        assert_eq!(runtime.store().followed_ids(), vec!["42".to_string()]);

        runtime.shutdown().await;
        runner.await.unwrap();
    }
}
