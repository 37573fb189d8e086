//! Simple local key-value cache.
//!
//! The in-memory fallback repository mirrors itself into this cache so a
//! degraded session survives a restart on a best-effort basis. The contract
//! is deliberately tiny: string keys, string values, no enumeration.

use std::path::PathBuf;
use std::sync::Mutex;

use atelier_core::error::Result;

/// Process-scoped persistent string storage.
pub trait LocalCache: Send + Sync {
    /// Read a value. `None` covers both "never written" and "unreadable".
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-per-key cache rooted in a directory under the data dir.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal constants, but keep filenames tame anyway.
        let name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                    ch
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(name)
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory cache used by tests and as a null mirror.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}
