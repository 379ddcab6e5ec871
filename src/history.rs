//! Per-(user, session) chat history, persisted as JSON files.
//!
//! Each session's record lives at `chat_histories/{user}/{session_id}.json`
//! as an ordered list of `{"type": "human"|"ai", "content": ...}` objects.
//! Histories load lazily on first access and stay cached for the life of the
//! process; `clear` drops both the cache entry and the file. Writes replace
//! the file atomically (tmp file + rename). A persistence failure is a
//! warning to the caller; the in-memory history remains usable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::errors::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

type SessionKey = (String, String);

pub struct HistoryStore {
    root: PathBuf,
    cache: Mutex<HashMap<SessionKey, Vec<Message>>>,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn record_path(&self, user: &str, session_id: &str) -> PathBuf {
        self.root.join(user).join(format!("{}.json", session_id))
    }

    /// Ordered messages for the session, loading from disk on first access.
    pub async fn get_or_create(&self, user: &str, session_id: &str) -> Vec<Message> {
        let key = (user.to_string(), session_id.to_string());
        let mut cache = self.cache.lock().await;
        if let Some(messages) = cache.get(&key) {
            return messages.clone();
        }

        let messages = load_record(&self.record_path(user, session_id));
        cache.insert(key, messages.clone());
        messages
    }

    /// Append one message to the in-memory history (call `persist` to flush).
    pub async fn append(&self, user: &str, session_id: &str, role: Role, content: &str) {
        let key = (user.to_string(), session_id.to_string());
        let mut cache = self.cache.lock().await;
        cache.entry(key).or_default().push(Message {
            role,
            content: content.to_string(),
        });
    }

    /// Write the session's durable record, replacing it atomically.
    pub async fn persist(&self, user: &str, session_id: &str) -> Result<(), ChatError> {
        let key = (user.to_string(), session_id.to_string());
        let messages = {
            let cache = self.cache.lock().await;
            cache.get(&key).cloned().unwrap_or_default()
        };

        let path = self.record_path(user, session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ChatError::Persistence(e.to_string()))?;
        }

        let payload = serde_json::to_vec_pretty(&messages)
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| ChatError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        Ok(())
    }

    /// Drop the cached history and delete the durable record.
    pub async fn clear(&self, user: &str, session_id: &str) -> Result<(), ChatError> {
        let key = (user.to_string(), session_id.to_string());
        self.cache.lock().await.remove(&key);

        let path = self.record_path(user, session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatError::Persistence(e.to_string())),
        }
    }
}

fn load_record(path: &Path) -> Vec<Message> {
    if !path.exists() {
        return Vec::new();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Could not load chat history {}: {}", path.display(), e);
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!("Could not read chat history {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
