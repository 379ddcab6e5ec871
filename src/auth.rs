//! Flat-file user store.
//!
//! `users.json` maps username to plaintext password. Prototype-grade by
//! design; salted hashing is a known production gap.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::errors::ChatError;

pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> BTreeMap<String, String> {
        if !self.path.exists() {
            return BTreeMap::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    fn save(&self, users: &BTreeMap<String, String>) -> Result<(), ChatError> {
        let payload = serde_json::to_vec_pretty(users)
            .map_err(|e| ChatError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, payload).map_err(|e| ChatError::Persistence(e.to_string()))
    }

    pub fn add_user(&self, username: &str, password: &str) -> Result<(), ChatError> {
        if username.is_empty() || password.is_empty() {
            return Err(ChatError::BadRequest(
                "Username and password cannot be empty.".to_string(),
            ));
        }

        let mut users = self.load();
        if users.contains_key(username) {
            return Err(ChatError::BadRequest("Username already exists.".to_string()));
        }

        users.insert(username.to_string(), password.to_string());
        self.save(&users)
    }

    pub fn verify_user(&self, username: &str, password: &str) -> bool {
        let users = self.load();
        users.get(username).map(String::as_str) == Some(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, UserStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::new(dir.path().join("users.json"));
        (dir, store)
    }

    #[test]
    fn signup_then_login() {
        let (_dir, store) = store();
        store.add_user("alice", "secret").unwrap();
        assert!(store.verify_user("alice", "secret"));
        assert!(!store.verify_user("alice", "wrong"));
        assert!(!store.verify_user("nobody", "secret"));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let (_dir, store) = store();
        store.add_user("alice", "secret").unwrap();
        let err = store.add_user("alice", "other").unwrap_err();
        assert!(matches!(err, ChatError::BadRequest(msg) if msg == "Username already exists."));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let (_dir, store) = store();
        assert!(store.add_user("", "pw").is_err());
        assert!(store.add_user("user", "").is_err());
    }
}
