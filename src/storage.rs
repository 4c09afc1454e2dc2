//! Session store adapters
//!
//! The session store holds the pending transaction across the gateway
//! redirect. A browser tab would use its session storage; here the store is
//! injected so the initiator and the return handler can run in different
//! processes as long as they share one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage keys. All of them belong to a single pending transaction and are
/// cleared together.
pub mod keys {
    pub const TRANSACTION_TYPE: &str = concat!("webpay_", "transaction_type");
    pub const DESCRIPTION: &str = concat!("webpay_", "transaction_description");
    pub const SUBJECT_REFERENCE: &str = concat!("webpay_", "reservation_url");
    pub const AMOUNT: &str = concat!("webpay_", "reservation_amount");
    pub const PRICE: &str = concat!("webpay_", "reservation_price");
    pub const PROPERTY_CONTEXT: &str = concat!("webpay_", "reservation_context");

    pub const ALL: [&str; 6] = [
        TRANSACTION_TYPE,
        DESCRIPTION,
        SUBJECT_REFERENCE,
        AMOUNT,
        PRICE,
        PROPERTY_CONTEXT,
    ];
}

/// Key-value store trait for custom session store implementations
pub trait SessionStore: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value by key
    fn set(&self, key: &str, value: &str);

    /// Remove a value by key
    fn remove(&self, key: &str);

    /// Replace the whole pending transaction: keys in [`keys::ALL`] that are
    /// not in `entries` are removed.
    ///
    /// The default goes key by key. Stores that persist should override it
    /// with a single write so a crash can't leave half a transaction behind.
    fn replace_all(&self, entries: &[(&str, String)]) {
        for key in keys::ALL {
            if !entries.iter().any(|(k, _)| *k == key) {
                self.remove(key);
            }
        }
        for (key, value) in entries {
            self.set(key, value);
        }
    }
}

/// Apply a [`SessionStore::replace_all`] to a plain map. Returns whether
/// anything changed.
fn replace_entries(map: &mut HashMap<String, String>, entries: &[(&str, String)]) -> bool {
    let before = map.clone();
    for key in keys::ALL {
        map.remove(key);
    }
    for (key, value) in entries {
        map.insert(key.to_string(), value.clone());
    }
    *map != before
}

/// In-memory store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.data.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut data) = self.data.write() {
            data.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut data) = self.data.write() {
            data.remove(key);
        }
    }

    fn replace_all(&self, entries: &[(&str, String)]) {
        if let Ok(mut data) = self.data.write() {
            replace_entries(&mut data, entries);
        }
    }
}

/// File-backed store
///
/// Stores the session in `webpay_session.json` within the given directory so
/// that the return handler, started as a fresh process after the gateway
/// redirect, sees what the initiator wrote.
pub struct FileStorage {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "webpay_session.json";

    /// Open the store in `storage_dir`.
    ///
    /// Returns `None` if the directory doesn't exist or the existing file
    /// can't be read.
    pub fn new(storage_dir: &Path) -> Option<Self> {
        if !storage_dir.is_dir() {
            return None;
        }

        let path = storage_dir.join(Self::FILE_NAME);

        let cache = if path.exists() {
            let contents = std::fs::read_to_string(&path).ok()?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            HashMap::new()
        };

        Some(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a sibling temp file so readers only ever see a
    /// complete session.
    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn save(&self) {
        let Ok(cache) = self.cache.read() else {
            return;
        };

        let result = if cache.is_empty() {
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        } else {
            match serde_json::to_string_pretty(&*cache) {
                Ok(contents) => self.write_atomic(&contents),
                Err(e) => Err(std::io::Error::other(e)),
            }
        };

        if let Err(e) = result {
            tracing::warn!("Failed to persist session store {}: {}", self.path.display(), e);
        }
    }
}

impl SessionStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), value.to_string());
        }
        self.save();
    }

    fn remove(&self, key: &str) {
        let removed = match self.cache.write() {
            Ok(mut cache) => cache.remove(key).is_some(),
            Err(_) => false,
        };
        if removed {
            self.save();
        }
    }

    fn replace_all(&self, entries: &[(&str, String)]) {
        let changed = match self.cache.write() {
            Ok(mut cache) => replace_entries(&mut cache, entries),
            Err(_) => false,
        };
        if changed {
            self.save();
        }
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}
