//! # Subscription Store
//!
//! The authoritative local-account map plus the derived reverse index.

use crate::ports::SnapshotBackend;
use relay_bus::{EventBus, RelayEvent};
use relay_types::{ExternalId, LocalAccount, LocalId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Fields that can be merged into a [`LocalAccount`] on upsert.
///
/// Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    /// New display name.
    pub name: Option<String>,
    /// New raw platform profile blob.
    pub raw_profile: Option<serde_json::Value>,
}

#[derive(Default)]
struct Inner {
    /// Authoritative account records, keyed by local id.
    accounts: BTreeMap<LocalId, LocalAccount>,
    /// Derived: external id -> local ids following it, ascending local id.
    /// Rebuilt in full on every follow-map change, never patched.
    index: BTreeMap<ExternalId, Vec<LocalId>>,
}

impl Inner {
    fn rebuild_index(&mut self) {
        let mut index: BTreeMap<ExternalId, Vec<LocalId>> = BTreeMap::new();
        for (local_id, account) in &self.accounts {
            for external_id in account.follows.keys() {
                index
                    .entry(external_id.clone())
                    .or_default()
                    .push(local_id.clone());
            }
        }
        self.index = index;
    }
}

/// Durable mapping of local accounts to the external accounts they follow.
///
/// All mutations are short and happen under one coarse mutex; persistence
/// and event publication run outside it, so bus handlers may call back into
/// the store.
pub struct SubscriptionStore {
    inner: Mutex<Inner>,
    backend: Box<dyn SnapshotBackend>,
    bus: Arc<EventBus>,
}

impl SubscriptionStore {
    /// Create an empty store over the given backend and bus.
    pub fn new(backend: Box<dyn SnapshotBackend>, bus: Arc<EventBus>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            backend,
            bus,
        }
    }

    /// Look up an account by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<LocalAccount> {
        self.lock().accounts.get(id).cloned()
    }

    /// Merge `patch` into the account with `id`, creating it with defaults
    /// if it does not exist yet. Returns the resulting record.
    ///
    /// In-memory only: upserts do not touch the snapshot or the index
    /// because the follow map is unchanged.
    pub fn upsert(&self, id: &str, patch: AccountPatch) -> LocalAccount {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .entry(id.to_string())
            .or_insert_with(|| LocalAccount::new(id));
        if let Some(name) = patch.name {
            account.name = name;
        }
        if account.name.is_empty() {
            account.name = format!("#{id}");
        }
        if let Some(raw_profile) = patch.raw_profile {
            account.raw_profile = raw_profile;
        }
        account.clone()
    }

    /// Upsert an account from a raw platform profile, deriving the display
    /// name the way the messaging platform presents it: `@username` when a
    /// username exists, else first and last name, else `#<id>`.
    pub fn upsert_from_profile(&self, id: &str, profile: serde_json::Value) -> LocalAccount {
        let name = profile
            .get("username")
            .and_then(|v| v.as_str())
            .map(|u| format!("@{u}"))
            .or_else(|| {
                let first = profile.get("first_name").and_then(|v| v.as_str())?;
                Some(match profile.get("last_name").and_then(|v| v.as_str()) {
                    Some(last) => format!("{first} {last}"),
                    None => first.to_string(),
                })
            });
        self.upsert(
            id,
            AccountPatch {
                name,
                raw_profile: Some(profile),
            },
        )
    }

    /// Record that `local_id` follows `external_id`.
    ///
    /// A brand-new pair rebuilds the index, persists the snapshot, and
    /// publishes [`RelayEvent::FollowSetChanged`]. An existing pair only
    /// refreshes the stored handle. An unknown `local_id` is an operator
    /// error: logged, not fatal.
    pub async fn add_follow(&self, local_id: &str, external_id: &str, handle: &str) {
        let followed = {
            let mut inner = self.lock();
            let Some(account) = inner.accounts.get_mut(local_id) else {
                warn!(local_id, external_id, "Cannot add follow for unknown account");
                return;
            };
            if account.follows.contains_key(external_id) {
                // Handle refresh only; the follow set is unchanged.
                account
                    .follows
                    .insert(external_id.to_string(), handle.to_string());
                debug!(local_id, external_id, handle, "Follow handle refreshed");
                return;
            }
            account
                .follows
                .insert(external_id.to_string(), handle.to_string());
            inner.rebuild_index();
            info!(local_id, external_id, handle, "Follow added");
            inner.index.keys().cloned().collect::<Vec<_>>()
        };

        self.persist_logged().await;
        if let Err(e) = self
            .bus
            .publish(RelayEvent::FollowSetChanged(followed))
            .await
        {
            warn!(error = %e, "Follow-set change handler failed");
        }
    }

    /// Accounts following `external_id`, skipping ids that no longer resolve.
    #[must_use]
    pub fn followers(&self, external_id: &str) -> Vec<LocalAccount> {
        let inner = self.lock();
        inner
            .index
            .get(external_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.accounts.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set a transient session value on an account. No-op for unknown ids.
    pub fn set_session(&self, id: &str, key: &str, value: &str) {
        if let Some(account) = self.lock().accounts.get_mut(id) {
            account.session.insert(key.to_string(), value.to_string());
        }
    }

    /// Read a transient session value.
    #[must_use]
    pub fn session(&self, id: &str, key: &str) -> Option<String> {
        self.lock()
            .accounts
            .get(id)
            .and_then(|account| account.session.get(key).cloned())
    }

    /// All external ids with at least one follower.
    #[must_use]
    pub fn followed_ids(&self) -> Vec<ExternalId> {
        self.lock().index.keys().cloned().collect()
    }

    /// Load the snapshot from the backend.
    ///
    /// Tolerates a missing snapshot (first run) and a corrupt one (logged,
    /// store continues empty). Session state is stripped on the way in and
    /// every field is normalized back to defaults if a previous schema
    /// version stored the wrong shape. Publishes the resulting follow set.
    pub async fn load(&self) {
        let snapshot = match self.backend.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("No snapshot to load, starting empty");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Snapshot load failed, starting empty");
                return;
            }
        };

        let Some(entries) = snapshot.as_object() else {
            warn!("Snapshot is not an object, starting empty");
            return;
        };

        let followed = {
            let mut inner = self.lock();
            for (id, raw) in entries {
                inner
                    .accounts
                    .insert(id.clone(), normalize_account(id, raw));
            }
            inner.rebuild_index();
            info!(accounts = inner.accounts.len(), "Snapshot loaded");
            inner.index.keys().cloned().collect::<Vec<_>>()
        };

        if let Err(e) = self
            .bus
            .publish(RelayEvent::FollowSetChanged(followed))
            .await
        {
            warn!(error = %e, "Follow-set change handler failed");
        }
    }

    /// Write the full account snapshot to the backend.
    ///
    /// # Errors
    ///
    /// [`relay_types::PersistenceError`] on write failure. Most callers use
    /// [`Self::persist_logged`]; shutdown checks the result.
    pub fn persist(&self) -> Result<(), relay_types::PersistenceError> {
        let accounts = self.lock().accounts.clone();
        // `session` is #[serde(skip)], so it never reaches the backend.
        let snapshot = serde_json::to_value(&accounts)
            .map_err(|e| relay_types::PersistenceError::Serialization(e.to_string()))?;
        self.backend.save(&snapshot)?;
        info!(accounts = accounts.len(), "Snapshot saved");
        Ok(())
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "Snapshot save failed, continuing in memory");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Rebuild a [`LocalAccount`] from raw snapshot JSON, forcing every
/// wrong-typed field back to its default instead of failing.
fn normalize_account(id: &str, raw: &serde_json::Value) -> LocalAccount {
    let mut account = LocalAccount::new(id);
    if let Some(name) = raw.get("name").and_then(|v| v.as_str()) {
        if !name.is_empty() {
            account.name = name.to_string();
        }
    }
    if let Some(follows) = raw.get("follows").and_then(|v| v.as_object()) {
        for (external_id, handle) in follows {
            if let Some(handle) = handle.as_str() {
                account
                    .follows
                    .insert(external_id.clone(), handle.to_string());
            }
        }
    }
    if let Some(raw_profile) = raw.get("raw_profile") {
        if raw_profile.is_object() {
            account.raw_profile = raw_profile.clone();
        }
    }
    account
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemorySnapshotBackend;
    use serde_json::json;

    fn store_with(
        backend: Arc<MemorySnapshotBackend>,
    ) -> (Arc<SubscriptionStore>, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(SubscriptionStore::new(Box::new(backend), bus.clone()));
        (store, bus)
    }

    fn store() -> (Arc<SubscriptionStore>, Arc<EventBus>) {
        store_with(Arc::new(MemorySnapshotBackend::new()))
    }

    #[tokio::test]
    async fn followers_reflect_exactly_the_current_follow_maps() {
        let (store, _bus) = store();
        store.upsert("a", AccountPatch::default());
        store.upsert("b", AccountPatch::default());
        store.upsert("c", AccountPatch::default());

        store.add_follow("a", "42", "@alice").await;
        store.add_follow("b", "42", "@alice").await;
        store.add_follow("c", "7", "@bob").await;

        let followers: Vec<_> = store
            .followers("42")
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(followers, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            store.followed_ids(),
            vec!["42".to_string(), "7".to_string()]
        );
    }

    #[tokio::test]
    async fn add_follow_for_unknown_account_is_logged_not_fatal() {
        let (store, bus) = store();
        store.add_follow("ghost", "42", "@alice").await;
        assert!(store.followers("42").is_empty());
        // Nothing published either.
        assert_eq!(bus.events_published(), 0);
    }

    #[tokio::test]
    async fn existing_pair_refreshes_handle_without_republishing() {
        let (store, bus) = store();
        store.upsert("a", AccountPatch::default());
        store.add_follow("a", "42", "@alice").await;
        let published_after_insert = bus.events_published();

        store.add_follow("a", "42", "@alice_renamed").await;
        assert_eq!(bus.events_published(), published_after_insert);
        assert_eq!(
            store.get("a").unwrap().follows.get("42").map(String::as_str),
            Some("@alice_renamed")
        );
    }

    #[tokio::test]
    async fn upsert_defaults_and_merges() {
        let (store, _bus) = store();
        let created = store.upsert("9", AccountPatch::default());
        assert_eq!(created.name, "#9");

        let renamed = store.upsert(
            "9",
            AccountPatch {
                name: Some("Ada".to_string()),
                raw_profile: None,
            },
        );
        assert_eq!(renamed.name, "Ada");
        // Follow map untouched by upsert.
        assert!(renamed.follows.is_empty());
    }

    #[tokio::test]
    async fn upsert_from_profile_derives_display_name() {
        let (store, _bus) = store();

        let by_username =
            store.upsert_from_profile("1", json!({ "username": "ada", "first_name": "Ada" }));
        assert_eq!(by_username.name, "@ada");

        let by_full_name = store
            .upsert_from_profile("2", json!({ "first_name": "Ada", "last_name": "Lovelace" }));
        assert_eq!(by_full_name.name, "Ada Lovelace");

        let fallback = store.upsert_from_profile("3", json!({}));
        assert_eq!(fallback.name, "#3");
    }

    #[tokio::test]
    async fn load_normalizes_malformed_fields_and_strips_session() {
        let backend = MemorySnapshotBackend::seeded(json!({
            "1": {
                "id": "1",
                "name": 12345,
                "follows": { "42": "@alice", "bad": 7 },
                "raw_profile": "not-an-object",
                "session": { "state": "follow" }
            }
        }));
        let (store, bus) = store_with(Arc::new(backend));
        store.load().await;

        let account = store.get("1").unwrap();
        assert_eq!(account.name, "#1");
        assert_eq!(account.follows.len(), 1);
        assert!(account.session.is_empty());
        assert_eq!(account.raw_profile, serde_json::Value::Null);
        // Load announces the restored follow set.
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn corrupt_snapshot_starts_empty() {
        let backend = MemorySnapshotBackend::seeded(json!("scalar, not a map"));
        let (store, _bus) = store_with(Arc::new(backend));
        store.load().await;
        assert!(store.followed_ids().is_empty());
    }

    #[tokio::test]
    async fn persisted_snapshot_excludes_session_state() {
        let backend = Arc::new(MemorySnapshotBackend::new());
        let (store, _bus) = store_with(backend.clone());
        store.upsert("1", AccountPatch::default());
        store.persist().unwrap();

        let written = backend.last_saved().unwrap();
        let entry = written.get("1").unwrap();
        assert!(entry.get("session").is_none());
        assert_eq!(entry.get("name").and_then(|v| v.as_str()), Some("#1"));
    }
}
