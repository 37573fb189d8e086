//! Local persistence for Atelier sessions.
//!
//! Provides the SQLite-backed durable repository (with FTS5 title search),
//! the in-memory fallback repository mirrored to a local key-value cache,
//! and the filesystem store for per-session image assets.

pub mod assets;
pub mod db;
pub mod fallback;
pub mod local_cache;
pub mod migrations;
pub mod repository;
pub mod sqlite;

pub use assets::{AssetCleanup, FsAssetStore};
pub use db::Database;
pub use fallback::MemorySessionRepository;
pub use local_cache::{FileCache, LocalCache, MemoryCache};
pub use repository::SessionRepository;
pub use sqlite::SqliteSessionRepository;
