use serde_json::Value;

use super::KvStore;

/// Remembers which foreign stream was last embedded for a local channel, plus
/// the global auto-sync preference, under `{prefix}_...` keys.
pub struct ChannelStore<S> {
    store: S,
    prefix: String,
}

impl<S: KvStore> ChannelStore<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_for(&self, local_id: &str) -> String {
        format!("{}_{}", self.prefix, local_id)
    }

    /// `:` never appears in a normalized identity, so no channel can land on
    /// this key.
    fn auto_sync_key(&self) -> String {
        format!("{}:autosync", self.prefix)
    }

    /// Where older stores kept the preference
    fn legacy_auto_sync_key(&self) -> String {
        format!("{}_autosync", self.prefix)
    }

    /// Last-write-wins; a failed write only costs the restore on next visit.
    pub async fn remember(&self, local_id: &str, foreign_id: &str) {
        self.store
            .set(&self.key_for(local_id), Value::String(foreign_id.to_string()))
            .await;
    }

    /// Waits for the adapter; non-string values read as unset.
    pub async fn recall(&self, local_id: &str) -> Option<String> {
        match self.store.get(&self.key_for(local_id)).await? {
            Value::String(foreign) if !foreign.is_empty() => Some(foreign),
            _ => None,
        }
    }

    pub async fn forget(&self, local_id: &str) {
        self.store.remove(&self.key_for(local_id)).await;
    }

    /// Every remembered `(local, foreign)` pair for this prefix. A legacy
    /// boolean preference is not a string and drops out here.
    pub async fn associations(&self) -> Vec<(String, String)> {
        let head = format!("{}_", self.prefix);
        self.store
            .entries()
            .await
            .into_iter()
            .filter_map(|(key, value)| {
                let local = key.strip_prefix(&head)?.to_string();
                match value {
                    Value::String(foreign) => Some((local, foreign)),
                    _ => None,
                }
            })
            .collect()
    }

    pub async fn auto_sync(&self) -> bool {
        let value = match self.store.get(&self.auto_sync_key()).await {
            Some(value) => Some(value),
            None => self.store.get(&self.legacy_auto_sync_key()).await,
        };
        matches!(value, Some(Value::Bool(true)))
    }

    pub async fn set_auto_sync(&self, enabled: bool) {
        self.store
            .set(&self.auto_sync_key(), Value::Bool(enabled))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn remember_then_recall_round_trips() {
        let store = ChannelStore::new(MemoryStore::new(), "ytot");
        store.remember("chan1", "videoX").await;

        assert_eq!(store.recall("chan1").await.as_deref(), Some("videoX"));
    }

    #[tokio::test]
    async fn recall_without_remember_is_none() {
        let store = ChannelStore::new(MemoryStore::new(), "ytot");
        assert_eq!(store.recall("nobody").await, None);
    }

    #[tokio::test]
    async fn remember_overwrites_previous_association() {
        let store = ChannelStore::new(MemoryStore::new(), "ytot");
        store.remember("chan1", "first").await;
        store.remember("chan1", "second").await;

        assert_eq!(store.recall("chan1").await.as_deref(), Some("second"));
        assert_eq!(store.associations().await.len(), 1);
    }

    #[tokio::test]
    async fn auto_sync_preference_is_separate_from_associations() {
        let backing = MemoryStore::new();
        let store = ChannelStore::new(backing.clone(), "ytot");

        assert!(!store.auto_sync().await);
        store.set_auto_sync(true).await;
        store.remember("somechannel", "abc12345678").await;

        assert!(store.auto_sync().await);
        assert_eq!(backing.get("ytot:autosync").await, Some(Value::Bool(true)));
        assert_eq!(
            store.associations().await,
            vec![("somechannel".to_string(), "abc12345678".to_string())]
        );
    }

    #[tokio::test]
    async fn channel_named_autosync_keeps_preference_intact() {
        let store = ChannelStore::new(MemoryStore::new(), "ytot");
        store.set_auto_sync(true).await;
        store.remember("autosync", "abc12345678").await;

        assert!(store.auto_sync().await);
        assert_eq!(store.recall("autosync").await.as_deref(), Some("abc12345678"));
        assert_eq!(
            store.associations().await,
            vec![("autosync".to_string(), "abc12345678".to_string())]
        );
    }

    #[tokio::test]
    async fn preference_falls_back_to_legacy_key() {
        let backing = MemoryStore::new();
        backing.set("ytot_autosync", Value::Bool(true)).await;
        let store = ChannelStore::new(backing.clone(), "ytot");

        assert!(store.auto_sync().await);
        assert!(store.associations().await.is_empty());

        store.set_auto_sync(false).await;
        assert!(!store.auto_sync().await);
    }

    #[tokio::test]
    async fn prefixes_do_not_leak_into_each_other() {
        let backing = MemoryStore::new();
        let twitch = ChannelStore::new(backing.clone(), "ytot");
        let youtube = ChannelStore::new(backing.clone(), "tcfy");

        twitch.remember("chan", "vid00000001").await;
        youtube.remember("chan", "somestreamer").await;

        assert_eq!(twitch.recall("chan").await.as_deref(), Some("vid00000001"));
        assert_eq!(youtube.recall("chan").await.as_deref(), Some("somestreamer"));

        youtube.forget("chan").await;
        assert_eq!(youtube.recall("chan").await, None);
        assert!(twitch.recall("chan").await.is_some());
    }
}
