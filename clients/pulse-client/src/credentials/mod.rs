//! Credential Store
//!
//! The authentication token is externally owned; the client only reads it.
//! Adapters cover the common sources: a credential directory on disk and the
//! process environment. Absence of a token is a hard precondition failure
//! for the connection manager, not an error.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Synchronous credential lookup. Absent means not logged in.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from files under a directory, one file per key
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        let value = std::fs::read_to_string(self.dir.join(key)).ok()?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// Reads credentials from environment variables. The key `auth-token` with
/// the default prefix maps to `PULSE_AUTH_TOKEN`.
pub struct EnvCredentialStore {
    prefix: String,
}

impl EnvCredentialStore {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('-', "_"))
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new("PULSE_")
    }
}

impl CredentialStore for EnvCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

/// In-memory store, primarily for tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn insert(&self, key: &str, value: &str) {
        let _ = self
            .entries
            .write()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        let _ = self.entries.write().remove(key);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::default();
        assert!(store.get("auth-token").is_none());

        store.insert("auth-token", "secret");
        assert_eq!(store.get("auth-token").as_deref(), Some("secret"));

        store.remove("auth-token");
        assert!(store.get("auth-token").is_none());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("auth-token"), "secret\n").unwrap();
        std::fs::write(dir.path().join("empty"), "  \n").unwrap();

        let store = FileCredentialStore::new(dir.path());
        assert_eq!(store.get("auth-token").as_deref(), Some("secret"));
        assert!(store.get("empty").is_none());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_env_var_name_mapping() {
        let store = EnvCredentialStore::default();
        assert_eq!(store.var_name("auth-token"), "PULSE_AUTH_TOKEN");

        let store = EnvCredentialStore::new("APP_");
        assert_eq!(store.var_name("session"), "APP_SESSION");
    }
}
