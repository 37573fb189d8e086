//! Filesystem store for per-session image/video assets.
//!
//! Generated artifacts are downloaded next to the database under
//! `<root>/images/<category>/<session_id>/<file>`. The session lifecycle
//! controller only consumes the cleanup half of this surface, through the
//! [`AssetCleanup`] trait, when a session is deleted.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use atelier_core::error::{AtelierError, Result};

/// Per-session external resource cleanup, invoked on session deletion.
///
/// Implementations are best-effort from the caller's point of view: the
/// controller logs failures and moves on.
#[async_trait]
pub trait AssetCleanup: Send + Sync {
    async fn remove_session_assets(&self, session_id: &str) -> Result<()>;
}

/// Asset store rooted in the application data directory.
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn images_root(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Write one asset and return its forward-slash relative path.
    pub fn save_asset(
        &self,
        session_id: &str,
        category: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<String> {
        let category = sanitize_segment(category);
        let filename = sanitize_segment(filename);
        let session = sanitize_segment(session_id);

        let dir = self.images_root().join(&category).join(&session);
        std::fs::create_dir_all(&dir)
            .map_err(|e| AtelierError::Assets(format!("Failed to create {:?}: {}", dir, e)))?;

        let absolute = dir.join(&filename);
        std::fs::write(&absolute, data)
            .map_err(|e| AtelierError::Assets(format!("Failed to write {:?}: {}", absolute, e)))?;

        Ok(format!("images/{}/{}/{}", category, session, filename))
    }

    /// Read an asset back by the relative path `save_asset` returned.
    pub fn read_asset(&self, relative_path: &str) -> Result<Vec<u8>> {
        let trimmed = relative_path.trim_start_matches(['/', '\\']);
        let relative = PathBuf::from(trimmed);
        ensure_safe_relative(&relative)?;

        let absolute = self.root.join(relative);
        std::fs::read(&absolute)
            .map_err(|e| AtelierError::Assets(format!("Failed to read {:?}: {}", absolute, e)))
    }
}

#[async_trait]
impl AssetCleanup for FsAssetStore {
    /// Remove every category directory belonging to one session. Missing
    /// directories are not errors; a session may never have downloaded
    /// anything.
    async fn remove_session_assets(&self, session_id: &str) -> Result<()> {
        let images_root = self.images_root();
        if !images_root.exists() {
            return Ok(());
        }

        let session = sanitize_segment(session_id);
        let categories = std::fs::read_dir(&images_root)
            .map_err(|e| AtelierError::Assets(format!("Failed to read {:?}: {}", images_root, e)))?;

        for category in categories {
            let category = category
                .map_err(|e| AtelierError::Assets(e.to_string()))?
                .path();
            if !category.is_dir() {
                continue;
            }
            let candidate = category.join(&session);
            if candidate.exists() {
                std::fs::remove_dir_all(&candidate).map_err(|e| {
                    AtelierError::Assets(format!("Failed to delete {:?}: {}", candidate, e))
                })?;
                info!(session_id, path = %candidate.display(), "Removed session assets");
            }
        }

        Ok(())
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so a segment can never change
/// directory levels.
fn sanitize_segment(value: &str) -> String {
    let mut sanitized: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.trim_matches(['-', '.']).is_empty() {
        sanitized = "file".into();
    }

    sanitized
}

fn ensure_safe_relative(path: &Path) -> Result<()> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => continue,
            _ => return Err(AtelierError::Assets("Unsafe asset path".to_string())),
        }
    }
    Ok(())
}
