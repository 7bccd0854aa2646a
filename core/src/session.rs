//! Auth token storage.
//!
//! The token is set by whoever performs the login, read before every
//! request and cleared when the server answers 401. Stores are injected into
//! `AuthMiddleware`; nothing reads a global.

use std::io;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ApiError, Result};

/// Key under which persistent stores keep the token.
pub const TOKEN_KEY: &str = "token";

/// Holder of the bearer token.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

// A poisoned lock still guards a valid Option.
impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token store persisted as a small JSON object on disk.
///
/// The file holds `{"token": "..."}` next to any other keys, which are
/// preserved on write whatever their type. A missing or empty file means no
/// token. A file that is not a JSON object reads as no token, and writes to
/// it fail rather than overwrite it.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Map<String, Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            ApiError::Deserialization(format!("token file {}: {e}", self.path.display()))
        })
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        match self.load() {
            Ok(entries) => entries
                .get(TOKEN_KEY)
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.save(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.save(&entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn read_json(path: &std::path::Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn memory_store_set_and_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.token().is_none());
        store.set_token("abc").unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn memory_store_writes_through_poisoned_lock() {
        let store = Arc::new(MemoryTokenStore::with_token("abc"));
        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.token.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(store.token.is_poisoned());

        assert_eq!(store.token().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert!(store.token().is_none());
        store.set_token("def").unwrap();
        assert_eq!(store.token().as_deref(), Some("def"));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileTokenStore::new(&path).set_token("secret").unwrap();
        assert_eq!(FileTokenStore::new(&path).token().as_deref(), Some("secret"));
        assert_eq!(read_json(&path)["token"], "secret");
    }

    #[test]
    fn file_store_clear_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"theme":"dark","token":"t"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.clear().unwrap();
        assert!(store.token().is_none());

        let json = read_json(&path);
        assert_eq!(json["theme"], "dark");
        assert!(json.get("token").is_none());
    }

    #[test]
    fn file_store_handles_non_string_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"theme":"dark","visits":3,"token":"old"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.token().as_deref(), Some("old"));

        store.set_token("new").unwrap();
        let json = read_json(&path);
        assert_eq!(json["token"], "new");
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["visits"], 3);

        store.clear().unwrap();
        assert!(store.token().is_none());
        let json = read_json(&path);
        assert!(json.get("token").is_none());
        assert_eq!(json["visits"], 3);
    }

    #[test]
    fn file_store_non_string_token_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token":42}"#).unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.token().is_none());
        store.clear().unwrap();
        assert_eq!(read_json(&path), serde_json::json!({}));
    }

    #[test]
    fn file_store_missing_or_empty_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileTokenStore::new(dir.path().join("nope.json"));
        assert!(missing.token().is_none());
        missing.clear().unwrap();

        let path = dir.path().join("empty.json");
        std::fs::write(&path, "").unwrap();
        let empty = FileTokenStore::new(&path);
        assert!(empty.token().is_none());
        empty.set_token("t").unwrap();
        assert_eq!(empty.token().as_deref(), Some("t"));
    }

    #[test]
    fn file_store_refuses_to_overwrite_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.token().is_none());
        assert!(matches!(store.clear(), Err(ApiError::Deserialization(_))));
        assert!(matches!(store.set_token("t"), Err(ApiError::Deserialization(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");

        std::fs::write(&path, r#"["token"]"#).unwrap();
        assert!(store.clear().is_err());
    }
}
