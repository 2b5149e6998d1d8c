//! # Stream Manager
//!
//! The connection-lifecycle state machine and inbound-item classifier.

use crate::config::StreamConfig;
use crate::media::extract_media;
use crate::ports::{ContentPlatform, SignalStream, StreamSignal};
use crate::state::{Connection, StreamState};
use relay_bus::{EventBus, RelayEvent};
use relay_subscriptions::SubscriptionStore;
use relay_types::{ContentItem, ExternalId, FollowRequestError, PendingVerification};
use relay_verification::VerificationRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Snapshot of the manager's connection bookkeeping, for operators and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStats {
    /// Follow-set of the live connection, sorted; `None` when idle.
    pub connected_set: Option<Vec<ExternalId>>,
    /// Ticks since the last executed reconnect.
    pub skip_counter: u32,
    /// Connection generation counter.
    pub epoch: u64,
}

/// Owns the lifecycle of the single upstream filter-stream connection.
///
/// The periodic reconnect tick and inbound-item classification both run
/// under one mutex, so a reconnect and a classification can never race on
/// the connected follow-set.
pub struct StreamManager {
    client: Arc<dyn ContentPlatform>,
    store: Arc<SubscriptionStore>,
    registry: Arc<VerificationRegistry>,
    bus: Arc<EventBus>,
    config: StreamConfig,
    state: Mutex<StreamState>,
}

impl StreamManager {
    /// Create an idle manager. Nothing connects until the first tick.
    pub fn new(
        client: Arc<dyn ContentPlatform>,
        store: Arc<SubscriptionStore>,
        registry: Arc<VerificationRegistry>,
        bus: Arc<EventBus>,
        config: StreamConfig,
    ) -> Self {
        Self {
            client,
            store,
            registry,
            bus,
            config,
            state: Mutex::new(StreamState::new()),
        }
    }

    /// Resolve `handle`, register an ownership challenge for the resolved
    /// account, and pull the target into the observed follow-set as soon as
    /// the rate limit allows.
    ///
    /// Concurrent requests for the same handle are not serialized; the last
    /// lookup to complete overwrites the pending token.
    ///
    /// # Errors
    ///
    /// [`FollowRequestError::ProfileNotFound`] when the lookup fails or
    /// resolves to nothing; [`FollowRequestError::TokenSpaceExhausted`] from
    /// token issuance.
    pub async fn request_follow(
        self: &Arc<Self>,
        handle: &str,
        requester: &str,
    ) -> Result<PendingVerification, FollowRequestError> {
        let handle = handle.trim();
        let lookup = handle.trim_start_matches('@');
        let not_found = || FollowRequestError::ProfileNotFound {
            handle: handle.to_string(),
        };

        let profile = match self.client.lookup_profile(lookup).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(not_found()),
            Err(e) => {
                warn!(handle, error = %e, "Profile lookup failed");
                return Err(not_found());
            }
        };

        let display = format!("@{}", profile.handle);
        let pending = self
            .registry
            .request_verification(&profile.id, &display, requester)?;

        // The unverified target must be observed before the user is asked to
        // post the token; the tick applies the usual rate-limit policy.
        self.tick().await;

        Ok(pending)
    }

    /// One pass of the reconnect policy. Called by the periodic ticker and
    /// after a follow request; always returns, never propagates failures.
    pub async fn tick(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(next) = state.next_attempt {
            if now < next {
                return;
            }
        }
        // Advanced on every tick that reaches this check, regardless of
        // outcome: the hard floor on connection-establishment attempts.
        state.next_attempt = Some(now + self.config.reconnect_interval());
        state.skip_counter += 1;

        let forced = state.skip_counter > 3 || !state.is_connected();
        let desired = self.desired_follow_set();

        if !forced {
            if desired.is_empty() {
                debug!("Not reconnecting: no follow targets");
                return;
            }
            if state.connected_set() == Some(&desired) {
                debug!(skips = state.skip_counter, "Not reconnecting: follow-set unchanged");
                return;
            }
        }

        if desired.is_empty() {
            if state.is_connected() {
                info!("Follow-set empty, closing upstream connection");
                state.teardown();
            }
            state.skip_counter = 0;
            return;
        }

        info!(targets = desired.len(), forced, "Reconnecting filter stream");
        state.teardown();
        state.grace_until = Some(now + self.config.grace_period);

        let follow_ids: Vec<ExternalId> = desired.iter().cloned().collect();
        match self.client.open_filter_stream(&follow_ids).await {
            Ok(stream) => {
                state.epoch += 1;
                let reader = self.spawn_reader(stream, state.epoch);
                state.connection = Connection::Connected {
                    set: desired,
                    reader,
                };
                state.skip_counter = 0;
                drop(state);
                self.notify_pending().await;
            }
            Err(e) => {
                // Soft failure: stay idle, the next scheduled tick retries.
                warn!(error = %e, "Reconnect failed");
            }
        }
    }

    /// Drive the reconnect tick until shutdown is signalled, then tear the
    /// connection down. In-flight items are discarded, not drained.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.shutdown().await;
    }

    /// Tear down the live connection immediately.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.teardown();
        info!("Stream manager stopped");
    }

    /// Current connection bookkeeping.
    pub async fn stats(&self) -> StreamStats {
        let state = self.state.lock().await;
        StreamStats {
            connected_set: state
                .connected_set()
                .map(|set| set.iter().cloned().collect()),
            skip_counter: state.skip_counter,
            epoch: state.epoch,
        }
    }

    /// Union of verified follows and pending verification targets.
    fn desired_follow_set(&self) -> BTreeSet<ExternalId> {
        self.store
            .followed_ids()
            .into_iter()
            .chain(self.registry.pending_ids())
            .collect()
    }

    /// Tell requesters whose challenge just became observable that the
    /// watch window is live. One-shot per challenge.
    async fn notify_pending(&self) {
        for pending in self.registry.take_unnotified() {
            if let Err(e) = self
                .bus
                .publish(RelayEvent::VerificationReady(pending))
                .await
            {
                warn!(error = %e, "Verification-ready handler failed");
            }
        }
    }

    fn spawn_reader(
        self: &Arc<Self>,
        mut stream: SignalStream,
        epoch: u64,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = stream.next().await {
                match signal {
                    StreamSignal::Item(item) => {
                        // Serialized against the reconnect tick.
                        let state = manager.state.lock().await;
                        if state.epoch != epoch {
                            break;
                        }
                        manager.classify(&item).await;
                        drop(state);
                    }
                    StreamSignal::End => {
                        let mut state = manager.state.lock().await;
                        if state.epoch != epoch {
                            break;
                        }
                        if state.in_grace(Instant::now()) {
                            debug!("Connection end inside grace window ignored");
                            continue;
                        }
                        warn!("Upstream connection ended, reconnecting on next tick");
                        state.connection = Connection::Idle;
                        break;
                    }
                    StreamSignal::Error(e) => {
                        let mut state = manager.state.lock().await;
                        if state.epoch != epoch {
                            break;
                        }
                        warn!(error = %e, "Upstream connection failed, reconnecting on next tick");
                        state.connection = Connection::Idle;
                        break;
                    }
                }
            }
            // Stream exhausted: outside the grace window that means the
            // connection is gone for real.
            let mut state = manager.state.lock().await;
            if state.epoch == epoch
                && state.is_connected()
                && !state.in_grace(Instant::now())
            {
                state.connection = Connection::Idle;
            }
        })
    }

    /// Classify one inbound item, in strict order with early exit:
    /// verification match, followed-author check, keyword check, media
    /// extraction. A verification match re-runs classification on the same
    /// item so it can also be delivered.
    async fn classify(&self, item: &ContentItem) {
        loop {
            if let Some(consumed) = self.registry.try_consume(&item.author_id, &item.text) {
                info!(
                    external = %consumed.handle,
                    requester = %consumed.requester,
                    "Account verified by posted token"
                );
                if let Err(e) = self.bus.publish(RelayEvent::FollowVerified(consumed)).await {
                    warn!(error = %e, "Verified-follow handler failed");
                }
                // The now-verified account may also match the content
                // filter; the consumed entry cannot match twice.
                continue;
            }

            if !self.store.followed_ids().contains(&item.author_id) {
                return;
            }
            if !item.text.to_lowercase().contains(&self.config.keyword) {
                return;
            }

            let media = extract_media(&item.media);
            if media.is_empty() {
                debug!(author = %item.author_id, "Matching post without deliverable media");
                return;
            }
            if let Err(e) = self
                .bus
                .publish(RelayEvent::NewContent {
                    author_id: item.author_id.clone(),
                    media,
                })
                .await
            {
                warn!(error = %e, "Content delivery handler failed");
            }
            return;
        }
    }
}
