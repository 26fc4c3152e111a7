//! Per-user channel lists, persisted as a JSON file.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// File-backed store of user_id → subscribed channels.
pub struct ChannelStore {
    path: PathBuf,
    channels: Mutex<HashMap<String, Vec<String>>>,
}

impl ChannelStore {
    /// Load the store from `path`, starting empty if the file is missing.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let channels = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            channels: Mutex::new(channels),
        })
    }

    /// The user's channels, in the order they were added.
    pub async fn list(&self, user_id: &str) -> Vec<String> {
        self.channels
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Add a channel for the user. Returns `false` if already present.
    pub async fn add(&self, user_id: &str, channel: &str) -> Result<bool, StoreError> {
        let mut channels = self.channels.lock().await;
        let list = channels.entry(user_id.to_string()).or_default();
        if list.iter().any(|c| c == channel) {
            return Ok(false);
        }
        list.push(channel.to_string());
        self.persist(&channels).await?;
        Ok(true)
    }

    /// Remove a channel for the user. Returns `false` if it wasn't there.
    pub async fn remove(&self, user_id: &str, channel: &str) -> Result<bool, StoreError> {
        let mut channels = self.channels.lock().await;
        let Some(list) = channels.get_mut(user_id) else {
            return Ok(false);
        };
        let Some(index) = list.iter().position(|c| c == channel) else {
            return Ok(false);
        };
        list.remove(index);
        self.persist(&channels).await?;
        Ok(true)
    }

    async fn persist(&self, channels: &HashMap<String, Vec<String>>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(channels)?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_list_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");

        let store = ChannelStore::load(path.clone()).await.unwrap();
        assert!(store.add("7", "@technews").await.unwrap());
        assert!(store.add("7", "@worldnews").await.unwrap());
        assert!(!store.add("7", "@technews").await.unwrap(), "duplicate");
        assert_eq!(store.list("7").await, vec!["@technews", "@worldnews"]);

        assert!(store.remove("7", "@technews").await.unwrap());
        assert!(!store.remove("7", "@missing").await.unwrap());
        assert_eq!(store.list("7").await, vec!["@worldnews"]);
    }

    #[tokio::test]
    async fn store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("channels.json");

        {
            let store = ChannelStore::load(path.clone()).await.unwrap();
            store.add("1", "@a").await.unwrap();
            store.add("2", "@b").await.unwrap();
        }

        let reloaded = ChannelStore::load(path).await.unwrap();
        assert_eq!(reloaded.list("1").await, vec!["@a"]);
        assert_eq!(reloaded.list("2").await, vec!["@b"]);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChannelStore::load(dir.path().join("nope.json")).await.unwrap();
        assert!(store.list("1").await.is_empty());
    }
}
