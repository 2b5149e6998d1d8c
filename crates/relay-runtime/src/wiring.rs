//! # Event Wiring
//!
//! Registers the handlers that connect the stream manager's events to the
//! subscription store and the outbound messenger.

use crate::messenger::Messenger;
use relay_bus::{EventBus, EventTopic, RelayEvent};
use relay_subscriptions::SubscriptionStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Subscribe all runtime handlers.
///
/// - `NewContent`: fan out to every follower of the author, best effort per
///   recipient.
/// - `FollowVerified`: add the follow (unless the capacity cap is hit) and
///   notify the requester.
/// - `VerificationReady`: tell the requester to post their token.
pub fn wire_handlers(
    bus: &EventBus,
    store: Arc<SubscriptionStore>,
    messenger: Arc<dyn Messenger>,
    max_followed_accounts: usize,
) {
    wire_delivery(bus, store.clone(), messenger.clone());
    wire_verified(bus, store, messenger.clone(), max_followed_accounts);
    wire_ready(bus, messenger);
}

fn wire_delivery(bus: &EventBus, store: Arc<SubscriptionStore>, messenger: Arc<dyn Messenger>) {
    bus.subscribe_fn(EventTopic::NewContent, move |event| {
        let store = store.clone();
        let messenger = messenger.clone();
        Box::pin(async move {
            let RelayEvent::NewContent { author_id, media } = event else {
                return Ok(());
            };
            for follower in store.followers(&author_id) {
                // The stored handle is what the follower asked for; the raw
                // id is only a fallback for records predating the handle.
                let author_handle = follower
                    .follows
                    .get(&author_id)
                    .cloned()
                    .unwrap_or_else(|| author_id.clone());
                if let Err(e) = messenger.deliver(&follower, &author_handle, &media).await {
                    warn!(recipient = %follower.id, error = %e, "Delivery failed, skipping recipient");
                }
            }
            Ok(())
        })
    });
}

fn wire_verified(
    bus: &EventBus,
    store: Arc<SubscriptionStore>,
    messenger: Arc<dyn Messenger>,
    max_followed_accounts: usize,
) {
    bus.subscribe_fn(EventTopic::FollowVerified, move |event| {
        let store = store.clone();
        let messenger = messenger.clone();
        Box::pin(async move {
            let RelayEvent::FollowVerified(pending) = event else {
                return Ok(());
            };
            let already_followed = store.followed_ids().contains(&pending.external_id);
            if !already_followed && store.followed_ids().len() >= max_followed_accounts {
                warn!(
                    handle = %pending.handle,
                    requester = %pending.requester,
                    cap = max_followed_accounts,
                    "Follow capacity reached, verified follow not added"
                );
            } else {
                store
                    .add_follow(&pending.requester, &pending.external_id, &pending.handle)
                    .await;
                info!(
                    requester = %pending.requester,
                    handle = %pending.handle,
                    "Verified follow active"
                );
            }
            messenger.notify_verified(&pending).await;
            Ok(())
        })
    });
}

fn wire_ready(bus: &EventBus, messenger: Arc<dyn Messenger>) {
    bus.subscribe_fn(EventTopic::VerificationReady, move |event| {
        let messenger = messenger.clone();
        Box::pin(async move {
            if let RelayEvent::VerificationReady(pending) = event {
                messenger.notify_ready(&pending).await;
            }
            Ok(())
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::RecordingMessenger;
    use relay_subscriptions::{AccountPatch, MemorySnapshotBackend};
    use relay_types::{MediaItem, PendingVerification};
    use std::time::SystemTime;

    fn pending(external_id: &str, requester: &str) -> PendingVerification {
        PendingVerification {
            external_id: external_id.to_string(),
            handle: "@alice".to_string(),
            token: "ab12cd34".to_string(),
            requester: requester.to_string(),
            created_at: SystemTime::now(),
        }
    }

    fn photo(url: &str) -> MediaItem {
        MediaItem::Photo {
            url: url.to_string(),
        }
    }

    struct Fixture {
        bus: Arc<EventBus>,
        store: Arc<SubscriptionStore>,
        messenger: Arc<RecordingMessenger>,
    }

    fn fixture(max_follows: usize) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(SubscriptionStore::new(
            Box::new(MemorySnapshotBackend::new()),
            bus.clone(),
        ));
        let messenger = Arc::new(RecordingMessenger::new());
        wire_handlers(&bus, store.clone(), messenger.clone(), max_follows);
        Fixture {
            bus,
            store,
            messenger,
        }
    }

    #[tokio::test]
    async fn content_fans_out_to_every_follower() {
        let f = fixture(100);
        f.store.upsert("u1", AccountPatch::default());
        f.store.upsert("u2", AccountPatch::default());
        f.store.add_follow("u1", "42", "@alice").await;
        f.store.add_follow("u2", "42", "@alice").await;

        f.bus
            .publish(RelayEvent::NewContent {
                author_id: "42".to_string(),
                media: vec![photo("https://img.example/a.jpg")],
            })
            .await
            .unwrap();

        let deliveries = f.messenger.deliveries();
        assert_eq!(deliveries.len(), 2);
        let mut recipients: Vec<_> = deliveries.iter().map(|d| d.recipient.clone()).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(deliveries[0].author_handle, "@alice");
    }

    #[tokio::test]
    async fn one_unreachable_recipient_does_not_block_the_rest() {
        let f = fixture(100);
        f.store.upsert("u1", AccountPatch::default());
        f.store.upsert("u2", AccountPatch::default());
        f.store.add_follow("u1", "42", "@alice").await;
        f.store.add_follow("u2", "42", "@alice").await;
        f.messenger.fail_delivery_for("u1");

        // Per-recipient failure is logged, not propagated to the publisher.
        f.bus
            .publish(RelayEvent::NewContent {
                author_id: "42".to_string(),
                media: vec![photo("https://img.example/a.jpg")],
            })
            .await
            .unwrap();

        let deliveries = f.messenger.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, "u2");
    }

    #[tokio::test]
    async fn verified_follow_is_added_and_the_requester_notified() {
        let f = fixture(100);
        f.store.upsert("u1", AccountPatch::default());

        f.bus
            .publish(RelayEvent::FollowVerified(pending("42", "u1")))
            .await
            .unwrap();

        assert_eq!(f.store.followed_ids(), vec!["42".to_string()]);
        assert_eq!(f.messenger.verified().len(), 1);
    }

    #[tokio::test]
    async fn capacity_cap_blocks_new_targets_but_not_existing_ones() {
        let f = fixture(1);
        f.store.upsert("u1", AccountPatch::default());
        f.store.upsert("u2", AccountPatch::default());
        f.store.add_follow("u1", "42", "@alice").await;

        // A second follower of an already-followed account is fine.
        f.bus
            .publish(RelayEvent::FollowVerified(pending("42", "u2")))
            .await
            .unwrap();
        assert_eq!(f.store.followers("42").len(), 2);

        // A brand-new target is refused at the cap; the requester is still
        // told their verification went through.
        f.bus
            .publish(RelayEvent::FollowVerified(pending("99", "u1")))
            .await
            .unwrap();
        assert_eq!(f.store.followed_ids(), vec!["42".to_string()]);
        assert_eq!(f.messenger.verified().len(), 2);
    }

    #[tokio::test]
    async fn watch_window_notice_reaches_the_requester() {
        let f = fixture(100);
        f.bus
            .publish(RelayEvent::VerificationReady(pending("42", "u1")))
            .await
            .unwrap();
        let ready = f.messenger.ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].token, "ab12cd34");
    }
}
