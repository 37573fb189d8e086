//! The session repository contract.
//!
//! Both the durable SQLite store and the in-memory fallback implement this
//! trait; the lifecycle controller only ever talks to `dyn SessionRepository`.

use async_trait::async_trait;

use atelier_core::error::Result;
use atelier_core::types::{SessionRecord, SessionSnapshot};

/// Persistent storage of session records and their snapshot blobs.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// All session records, newest `created_at` first.
    async fn list(&self) -> Result<Vec<SessionRecord>>;

    /// Records whose title matches `term`, newest first.
    ///
    /// A blank term is identical to [`list`](Self::list). Matching is
    /// case-insensitive; the durable store matches token prefixes, the
    /// fallback matches substrings.
    async fn search(&self, term: &str) -> Result<Vec<SessionRecord>>;

    /// Load one session with its snapshot. `None` for an unknown id is an
    /// expected outcome, not an error.
    async fn load(&self, id: &str) -> Result<Option<(SessionRecord, SessionSnapshot)>>;

    /// Insert-or-replace keyed by `record.id`, writing record fields and the
    /// serialized snapshot blob atomically.
    async fn upsert(&self, record: &SessionRecord, snapshot: &SessionSnapshot) -> Result<()>;

    /// Update the title and bump `updated_at`. Unknown ids are a no-op.
    async fn rename(&self, id: &str, title: &str) -> Result<()>;

    /// Remove the record, snapshot, and search index entry. Idempotent.
    async fn delete(&self, id: &str) -> Result<()>;
}
