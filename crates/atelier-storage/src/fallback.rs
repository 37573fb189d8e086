//! In-memory fallback session repository.
//!
//! Activated for the rest of the process once the SQLite repository fails.
//! State lives in a process-local map, mirrored opportunistically into a
//! [`LocalCache`] key on every write and reloaded from it once at
//! construction. This is explicitly a degraded mode: the mirror is
//! best-effort and carries no durability guarantee.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use atelier_core::error::{AtelierError, Result};
use atelier_core::types::{now_millis, SessionRecord, SessionSnapshot};

use crate::local_cache::LocalCache;
use crate::repository::SessionRepository;

#[derive(Clone, Serialize, Deserialize)]
struct CacheEntry {
    record: SessionRecord,
    snapshot: SessionSnapshot,
}

/// Map-backed repository with a best-effort local-cache mirror.
pub struct MemorySessionRepository {
    entries: Mutex<HashMap<String, CacheEntry>>,
    cache: Arc<dyn LocalCache>,
    cache_key: String,
}

impl MemorySessionRepository {
    /// Create the fallback store, seeding it from the cache if a previous
    /// degraded run left a mirror behind. Corrupt cache content is logged
    /// and ignored.
    pub fn new(cache: Arc<dyn LocalCache>, cache_key: impl Into<String>) -> Self {
        let cache_key = cache_key.into();
        let mut entries = HashMap::new();

        if let Some(serialized) = cache.get(&cache_key) {
            match serde_json::from_str::<Vec<CacheEntry>>(&serialized) {
                Ok(cached) => {
                    for entry in cached {
                        entries.insert(entry.record.id.clone(), entry);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse local session cache, starting empty");
                }
            }
        }

        Self {
            entries: Mutex::new(entries),
            cache,
            cache_key,
        }
    }

    fn with_entries<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<String, CacheEntry>) -> T,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AtelierError::Storage(format!("Fallback store lock poisoned: {}", e)))?;
        Ok(f(&mut entries))
    }

    /// Mirror the whole map into the local cache. Failures are logged and
    /// swallowed; in-memory state stays authoritative for this process.
    fn mirror(&self, entries: &HashMap<String, CacheEntry>) {
        let all: Vec<&CacheEntry> = entries.values().collect();
        match serde_json::to_string(&all) {
            Ok(serialized) => {
                if let Err(e) = self.cache.set(&self.cache_key, &serialized) {
                    warn!(error = %e, "Unable to persist local session cache");
                }
            }
            Err(e) => warn!(error = %e, "Unable to serialize local session cache"),
        }
    }

    fn sorted_records(entries: &HashMap<String, CacheEntry>) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> =
            entries.values().map(|entry| entry.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn list(&self) -> Result<Vec<SessionRecord>> {
        self.with_entries(|entries| Self::sorted_records(entries))
    }

    async fn search(&self, term: &str) -> Result<Vec<SessionRecord>> {
        let needle = term.trim().to_lowercase();
        self.with_entries(|entries| {
            let mut records = Self::sorted_records(entries);
            if !needle.is_empty() {
                records.retain(|record| record.title.to_lowercase().contains(&needle));
            }
            records
        })
    }

    async fn load(&self, id: &str) -> Result<Option<(SessionRecord, SessionSnapshot)>> {
        self.with_entries(|entries| {
            entries
                .get(id)
                .map(|entry| (entry.record.clone(), entry.snapshot.clone()))
        })
    }

    async fn upsert(&self, record: &SessionRecord, snapshot: &SessionSnapshot) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(
                record.id.clone(),
                CacheEntry {
                    record: record.clone(),
                    snapshot: snapshot.clone(),
                },
            );
            self.mirror(entries);
        })
    }

    async fn rename(&self, id: &str, title: &str) -> Result<()> {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(id) {
                entry.record.title = title.to_string();
                entry.record.updated_at = now_millis();
                self.mirror(entries);
            }
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.with_entries(|entries| {
            if entries.remove(id).is_some() {
                self.mirror(entries);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_cache::MemoryCache;

    const KEY: &str = "session-history-local-cache";

    fn make_repo(cache: Arc<dyn LocalCache>) -> MemorySessionRepository {
        MemorySessionRepository::new(cache, KEY)
    }

    fn make_record(id: &str, title: &str, created_at: i64) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            title: title.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let repo = make_repo(Arc::new(MemoryCache::new()));
        let record = make_record("s1", "Neon study", 100);

        repo.upsert(&record, &SessionSnapshot::empty()).await.unwrap();
        let (loaded, snap) = repo.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(snap, SessionSnapshot::empty());

        repo.delete("s1").await.unwrap();
        assert!(repo.load("s1").await.unwrap().is_none());
        // Idempotent.
        repo.delete("s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_newest_created_first() {
        let repo = make_repo(Arc::new(MemoryCache::new()));
        repo.upsert(&make_record("a", "A", 1), &SessionSnapshot::empty())
            .await
            .unwrap();
        repo.upsert(&make_record("b", "B", 3), &SessionSnapshot::empty())
            .await
            .unwrap();
        repo.upsert(&make_record("c", "C", 2), &SessionSnapshot::empty())
            .await
            .unwrap();

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_search_is_substring_case_insensitive() {
        let repo = make_repo(Arc::new(MemoryCache::new()));
        repo.upsert(&make_record("s1", "Campaign Alpha", 2), &SessionSnapshot::empty())
            .await
            .unwrap();
        repo.upsert(&make_record("s2", "Beta", 1), &SessionSnapshot::empty())
            .await
            .unwrap();

        let hits = repo.search("PAIGN").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "s1");

        assert_eq!(repo.search("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mirror_survives_restart() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());

        let repo = make_repo(Arc::clone(&cache));
        repo.upsert(&make_record("s1", "Survivor", 10), &SessionSnapshot::empty())
            .await
            .unwrap();
        repo.rename("s1", "Renamed survivor").await.unwrap();
        drop(repo);

        let revived = make_repo(cache);
        let rows = revived.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Renamed survivor");
    }

    #[tokio::test]
    async fn test_corrupt_cache_starts_empty() {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        cache.set(KEY, "garbage[").unwrap();

        let repo = make_repo(cache);
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_swallowed() {
        struct FailingCache;
        impl LocalCache for FailingCache {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&self, _key: &str, _value: &str) -> Result<()> {
                Err(AtelierError::Storage("cache offline".into()))
            }
        }

        let repo = make_repo(Arc::new(FailingCache));
        repo.upsert(&make_record("s1", "Still here", 1), &SessionSnapshot::empty())
            .await
            .unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_unknown_id_is_noop() {
        let repo = make_repo(Arc::new(MemoryCache::new()));
        repo.rename("missing", "whatever").await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }
}
