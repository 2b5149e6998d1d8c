//! # End-to-End Choreography Tests
//!
//! The complete relay flow over scripted adapters:
//!
//! ```text
//! request_follow ──▶ VerificationRegistry ──▶ reconnect (observes target)
//!                                                  │
//!                                          VerificationReady ──▶ Messenger
//!                                                  │
//! token post ──▶ classify ──▶ FollowVerified ──▶ Store.add_follow
//!                                                  │
//! matching post ──▶ classify ──▶ NewContent ──▶ Messenger (per follower)
//! ```

#[cfg(test)]
mod tests {
    use relay_runtime::{RecordingMessenger, RelayConfig, RelayRuntime};
    use relay_stream::ScriptedContentPlatform;
    use relay_subscriptions::AccountPatch;
    use relay_types::{ContentItem, MediaAttachment, MediaItem, MediaKind, VideoVariant};
    use std::sync::Arc;
    use std::time::Duration;

    fn config(dir: &tempfile::TempDir) -> RelayConfig {
        RelayConfig {
            keyword: "#NintendoSwitch".to_string(),
            reconnect_interval_minutes: 15,
            max_followed_accounts: 100,
            snapshot_path: dir.path().join("save.json"),
            log_level: "info".to_string(),
        }
    }

    struct Relay {
        _dir: tempfile::TempDir,
        platform: Arc<ScriptedContentPlatform>,
        messenger: Arc<RecordingMessenger>,
        runtime: RelayRuntime,
    }

    fn relay() -> Relay {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(ScriptedContentPlatform::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let runtime = RelayRuntime::new(&config(&dir), platform.clone(), messenger.clone());
        Relay {
            _dir: dir,
            platform,
            messenger,
            runtime,
        }
    }

    /// Let reader tasks and spawned handlers drain under paused time.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn text_item(author: &str, text: &str) -> ContentItem {
        ContentItem {
            author_id: author.to_string(),
            text: text.to_string(),
            media: vec![],
        }
    }

    fn photo_item(author: &str, text: &str) -> ContentItem {
        ContentItem {
            author_id: author.to_string(),
            text: text.to_string(),
            media: vec![MediaAttachment {
                kind: MediaKind::Photo,
                preview_url: "https://img.example/full.jpg".to_string(),
                variants: vec![],
            }],
        }
    }

    fn video_item(author: &str, text: &str) -> ContentItem {
        let variant = |content_type: &str, bitrate: u64, url: &str| VideoVariant {
            content_type: content_type.to_string(),
            bitrate: Some(bitrate),
            url: url.to_string(),
        };
        ContentItem {
            author_id: author.to_string(),
            text: text.to_string(),
            media: vec![MediaAttachment {
                kind: MediaKind::Video,
                preview_url: "https://img.example/thumb.jpg".to_string(),
                variants: vec![
                    variant("video/mp4", 128_000, "https://v.example/128.mp4"),
                    variant("video/mp4", 512_000, "https://v.example/512.mp4"),
                    variant("video/webm", 999_000, "https://v.example/999.webm"),
                ],
            }],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn follow_handshake_then_delivery() {
        let r = relay();
        r.platform.add_profile("alice", "42");
        r.runtime.store().upsert("u1", AccountPatch::default());

        // Request: challenge issued, target observed, watch window announced.
        let pending = r
            .runtime
            .manager()
            .request_follow("@alice", "u1")
            .await
            .unwrap();
        settle().await;
        assert_eq!(r.platform.connection_count(), 1);
        let ready = r.messenger.ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].token, pending.token);

        // The claimed owner posts the token (no keyword, no media).
        let connection = r.platform.last_connection().unwrap();
        connection.emit_item(text_item("42", &format!("my proof: {}", pending.token)));
        settle().await;

        assert_eq!(r.messenger.verified().len(), 1);
        assert_eq!(r.runtime.store().followed_ids(), vec!["42".to_string()]);
        assert!(r.runtime.registry().pending_ids().is_empty());

        // A matching post from the now-followed account is delivered.
        connection.emit_item(photo_item("42", "Look at this #NintendoSwitch shot"));
        settle().await;

        let deliveries = r.messenger.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipient, "u1");
        assert_eq!(deliveries[0].author_handle, "@alice");
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_fans_out_and_selects_the_best_video_variant() {
        let r = relay();
        r.runtime.store().upsert("u1", AccountPatch::default());
        r.runtime.store().upsert("u2", AccountPatch::default());
        r.runtime.store().add_follow("u1", "42", "@alice").await;
        r.runtime.store().add_follow("u2", "42", "@alice").await;

        r.runtime.manager().tick().await;
        let connection = r.platform.last_connection().unwrap();
        connection.emit_item(video_item("42", "#nintendoswitch clip (case-insensitive)"));
        settle().await;

        let deliveries = r.messenger.deliveries();
        assert_eq!(deliveries.len(), 2);
        for delivery in &deliveries {
            assert_eq!(
                delivery.media,
                vec![MediaItem::Video {
                    url: "https://v.example/512.mp4".to_string(),
                    thumbnail_url: "https://img.example/thumb.jpg".to_string(),
                }]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_follow_request_waits_for_the_next_reconnect_window() {
        let r = relay();
        r.platform.add_profile("alice", "42");
        r.platform.add_profile("bob", "99");
        r.runtime.store().upsert("u1", AccountPatch::default());

        r.runtime.manager().request_follow("@alice", "u1").await.unwrap();
        settle().await;
        assert_eq!(r.platform.connection_count(), 1);
        assert_eq!(r.messenger.ready().len(), 1);

        // Inside the rate-limit window the second target is registered but
        // not yet observed.
        r.runtime.manager().request_follow("@bob", "u1").await.unwrap();
        settle().await;
        assert_eq!(r.platform.connection_count(), 1);
        assert_eq!(r.messenger.ready().len(), 1);

        // The next window reconnects with both targets and announces the
        // second watch window.
        tokio::time::advance(Duration::from_secs(15 * 60)).await;
        r.runtime.manager().tick().await;
        settle().await;

        let connection = r.platform.last_connection().unwrap();
        assert_eq!(
            connection.follow_ids,
            vec!["42".to_string(), "99".to_string()]
        );
        assert_eq!(r.messenger.ready().len(), 2);
    }
}
