//! Repository failover strategy.
//!
//! Wraps the durable SQLite repository and the in-memory fallback behind one
//! [`SessionRepository`] face. The first failure from the durable path flips
//! a process-lifetime flag: every subsequent call goes straight to the
//! fallback, and the durable path is never retried in this run. Degradation
//! is deliberately silent for the end user; the workspace stays fully
//! functional, it just stops surviving restarts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use atelier_core::error::{AtelierError, Result};
use atelier_core::types::{SessionRecord, SessionSnapshot};
use atelier_storage::SessionRepository;

/// Durable-first repository with permanent fallback on first failure.
pub struct FailoverRepository {
    durable: Option<Arc<dyn SessionRepository>>,
    fallback: Arc<dyn SessionRepository>,
    degraded: AtomicBool,
}

impl FailoverRepository {
    pub fn new(durable: Arc<dyn SessionRepository>, fallback: Arc<dyn SessionRepository>) -> Self {
        Self {
            durable: Some(durable),
            fallback,
            degraded: AtomicBool::new(false),
        }
    }

    /// Start degraded, for when the database cannot even be opened.
    pub fn fallback_only(fallback: Arc<dyn SessionRepository>) -> Self {
        Self {
            durable: None,
            fallback,
            degraded: AtomicBool::new(true),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn durable_if_healthy(&self) -> Option<&Arc<dyn SessionRepository>> {
        if self.degraded.load(Ordering::Acquire) {
            None
        } else {
            self.durable.as_ref()
        }
    }

    fn mark_degraded(&self, operation: &str, err: &AtelierError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(
                operation,
                error = %err,
                "Durable session store unavailable, using in-memory fallback for this run"
            );
        }
    }
}

#[async_trait]
impl SessionRepository for FailoverRepository {
    async fn list(&self) -> Result<Vec<SessionRecord>> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.list().await {
                Ok(records) => return Ok(records),
                Err(e) => self.mark_degraded("list", &e),
            }
        }
        self.fallback.list().await
    }

    async fn search(&self, term: &str) -> Result<Vec<SessionRecord>> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.search(term).await {
                Ok(records) => return Ok(records),
                Err(e) => self.mark_degraded("search", &e),
            }
        }
        self.fallback.search(term).await
    }

    async fn load(&self, id: &str) -> Result<Option<(SessionRecord, SessionSnapshot)>> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.load(id).await {
                Ok(found) => return Ok(found),
                Err(e) => self.mark_degraded("load", &e),
            }
        }
        self.fallback.load(id).await
    }

    async fn upsert(&self, record: &SessionRecord, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.upsert(record, snapshot).await {
                Ok(()) => return Ok(()),
                Err(e) => self.mark_degraded("upsert", &e),
            }
        }
        self.fallback.upsert(record, snapshot).await
    }

    async fn rename(&self, id: &str, title: &str) -> Result<()> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.rename(id, title).await {
                Ok(()) => return Ok(()),
                Err(e) => self.mark_degraded("rename", &e),
            }
        }
        self.fallback.rename(id, title).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if let Some(durable) = self.durable_if_healthy() {
            match durable.delete(id).await {
                Ok(()) => return Ok(()),
                Err(e) => self.mark_degraded("delete", &e),
            }
        }
        self.fallback.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use atelier_storage::local_cache::MemoryCache;
    use atelier_storage::MemorySessionRepository;

    /// Durable stand-in that fails every call and counts how often it is hit.
    struct BrokenRepository {
        calls: AtomicUsize,
    }

    impl BrokenRepository {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn fail(&self) -> AtelierError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AtelierError::Storage("database file is corrupted".into())
        }
    }

    #[async_trait]
    impl SessionRepository for BrokenRepository {
        async fn list(&self) -> Result<Vec<SessionRecord>> {
            Err(self.fail())
        }
        async fn search(&self, _term: &str) -> Result<Vec<SessionRecord>> {
            Err(self.fail())
        }
        async fn load(&self, _id: &str) -> Result<Option<(SessionRecord, SessionSnapshot)>> {
            Err(self.fail())
        }
        async fn upsert(&self, _record: &SessionRecord, _snapshot: &SessionSnapshot) -> Result<()> {
            Err(self.fail())
        }
        async fn rename(&self, _id: &str, _title: &str) -> Result<()> {
            Err(self.fail())
        }
        async fn delete(&self, _id: &str) -> Result<()> {
            Err(self.fail())
        }
    }

    fn memory_repo() -> Arc<dyn SessionRepository> {
        Arc::new(MemorySessionRepository::new(
            Arc::new(MemoryCache::new()),
            "test-cache",
        ))
    }

    fn record(id: &str) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            title: "Test".to_string(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn test_first_failure_flips_permanently() {
        let broken = Arc::new(BrokenRepository::new());
        let repo = FailoverRepository::new(
            Arc::clone(&broken) as Arc<dyn SessionRepository>,
            memory_repo(),
        );
        assert!(!repo.is_degraded());

        // First call fails over and is served by the fallback.
        repo.upsert(&record("s1"), &SessionSnapshot::empty())
            .await
            .unwrap();
        assert!(repo.is_degraded());
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);

        // Subsequent operations of every kind never touch the durable path.
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.load("s1").await.unwrap().is_some());
        repo.rename("s1", "Renamed").await.unwrap();
        repo.delete("s1").await.unwrap();
        repo.search("x").await.unwrap();
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_healthy_durable_is_used() {
        let durable = memory_repo();
        let fallback = memory_repo();
        let repo = FailoverRepository::new(Arc::clone(&durable), Arc::clone(&fallback));

        repo.upsert(&record("s1"), &SessionSnapshot::empty())
            .await
            .unwrap();

        assert!(!repo.is_degraded());
        assert_eq!(durable.list().await.unwrap().len(), 1);
        assert!(fallback.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_only_starts_degraded() {
        let repo = FailoverRepository::fallback_only(memory_repo());
        assert!(repo.is_degraded());

        repo.upsert(&record("s1"), &SessionSnapshot::empty())
            .await
            .unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
