//! # Lifecycle Tests
//!
//! Startup, restart, and shutdown flows across process generations sharing
//! one snapshot file.

#[cfg(test)]
mod tests {
    use relay_runtime::{RecordingMessenger, RelayConfig, RelayRuntime};
    use relay_stream::ScriptedContentPlatform;
    use relay_subscriptions::AccountPatch;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(path: std::path::PathBuf) -> RelayConfig {
        RelayConfig {
            keyword: "#NintendoSwitch".to_string(),
            reconnect_interval_minutes: 15,
            max_followed_accounts: 100,
            snapshot_path: path,
            log_level: "info".to_string(),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reconnects_with_the_restored_follow_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        // First generation: subscribe and stop.
        {
            let runtime = RelayRuntime::new(
                &config(path.clone()),
                Arc::new(ScriptedContentPlatform::new()),
                Arc::new(RecordingMessenger::new()),
            );
            runtime.store().upsert("u1", AccountPatch::default());
            runtime.store().add_follow("u1", "42", "@alice").await;
            runtime.shutdown().await;
        }

        // Second generation: the restored follow set drives the first
        // connection without any new follow request.
        let platform = Arc::new(ScriptedContentPlatform::new());
        let runtime = RelayRuntime::new(
            &config(path),
            platform.clone(),
            Arc::new(RecordingMessenger::new()),
        );
        let runner = runtime.start().await;
        settle().await;

        assert_eq!(runtime.store().followed_ids(), vec!["42".to_string()]);
        let connection = platform.last_connection().unwrap();
        assert_eq!(connection.follow_ids, vec!["42".to_string()]);

        runtime.shutdown().await;
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pending_verifications_do_not_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        {
            let platform = Arc::new(ScriptedContentPlatform::new());
            platform.add_profile("alice", "42");
            let runtime = RelayRuntime::new(
                &config(path.clone()),
                platform,
                Arc::new(RecordingMessenger::new()),
            );
            runtime.store().upsert("u1", AccountPatch::default());
            runtime
                .manager()
                .request_follow("@alice", "u1")
                .await
                .unwrap();
            runtime.shutdown().await;
        }

        // Challenges are in-memory only; the requester simply asks again.
        let runtime = RelayRuntime::new(
            &config(path),
            Arc::new(ScriptedContentPlatform::new()),
            Arc::new(RecordingMessenger::new()),
        );
        let runner = runtime.start().await;
        assert!(runtime.registry().pending_ids().is_empty());
        assert!(runtime.store().followed_ids().is_empty());

        runtime.shutdown().await;
        runner.await.unwrap();
    }
}
