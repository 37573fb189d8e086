//! Session lifecycle controller.
//!
//! Orchestrates which session is active, schedules debounced persists when
//! the chat or content state changes, and sequences session switches so a
//! slow load can never overwrite a newer selection. The outgoing session is
//! always flushed before a switch; skipping that flush would silently lose
//! its latest edits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, warn};
use uuid::Uuid;

use atelier_core::config::SessionConfig;
use atelier_core::types::{now_millis, SessionRecord, SessionSnapshot};
use atelier_storage::{AssetCleanup, SessionRepository};

use crate::chat_state::ChatState;
use crate::content_state::ContentState;
use crate::debounce::DebounceTimer;
use crate::error::SessionError;

#[derive(Default)]
struct ControllerState {
    sessions: Vec<SessionRecord>,
    session_map: HashMap<String, SessionRecord>,
    active_session_id: Option<String>,
    search_query: String,
    initialized: bool,
}

/// Coordinates repositories, state providers, and the active session.
///
/// Constructed once per process and shared as an `Arc`; all methods take
/// `&self`. Reentrancy is handled by the persist mutex, the hydration
/// sequence counter, and the debounce timer rather than by coarse locking.
pub struct SessionController {
    repo: Arc<dyn SessionRepository>,
    chat: Arc<ChatState>,
    content: Arc<ContentState>,
    assets: Arc<dyn AssetCleanup>,
    config: SessionConfig,
    state: Mutex<ControllerState>,
    hydrating: AtomicBool,
    hydration_seq: AtomicU64,
    persist_lock: tokio::sync::Mutex<()>,
    debounce: DebounceTimer,
    shutdown: Arc<Notify>,
    // Handed to background tasks so they never keep the controller alive.
    weak_self: Weak<SessionController>,
}

impl SessionController {
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        chat: Arc<ChatState>,
        content: Arc<ContentState>,
        assets: Arc<dyn AssetCleanup>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            repo,
            chat,
            content,
            assets,
            config,
            state: Mutex::new(ControllerState::default()),
            hydrating: AtomicBool::new(false),
            hydration_seq: AtomicU64::new(0),
            persist_lock: tokio::sync::Mutex::new(()),
            debounce: DebounceTimer::new(),
            shutdown: Arc::new(Notify::new()),
            weak_self: weak.clone(),
        })
    }

    fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ControllerState) -> T,
    {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    // -------------------------------------------------------------------------
    // Initialization
    // -------------------------------------------------------------------------

    /// Load the session list, ensure at least one session exists, hydrate
    /// the newest one, and start listening for state changes.
    ///
    /// Idempotent: a second call after the first completes is a no-op.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if self.with_state(|s| s.initialized) {
            return Ok(());
        }

        let rows = self.refresh_sessions().await?;
        let target_id = match rows.first() {
            Some(newest) => newest.id.clone(),
            None => {
                let record = self.create_blank_session().await?;
                self.refresh_sessions().await?;
                record.id
            }
        };

        self.hydrate_session(&target_id).await?;
        self.with_state(|s| s.initialized = true);
        self.spawn_subscriptions();

        info!(session_id = %target_id, "Session store initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.with_state(|s| s.initialized)
    }

    /// Watch the chat and content version counters; every change schedules a
    /// debounced persist. The tasks end when `shutdown` is called, the
    /// controller is dropped, or the state providers go away.
    fn spawn_subscriptions(&self) {
        let mut chat_rx = self.chat.subscribe();
        let weak = self.weak_self.clone();
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = chat_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match weak.upgrade() {
                            Some(controller) => controller.schedule_persist(),
                            None => break,
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        let mut content_rx = self.content.subscribe();
        let weak = self.weak_self.clone();
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = content_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match weak.upgrade() {
                            Some(controller) => controller.schedule_persist(),
                            None => break,
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });
    }

    /// Stop the subscription tasks and drop any pending persist timer.
    pub fn shutdown(&self) {
        self.debounce.cancel();
        self.shutdown.notify_waiters();
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Arm (or re-arm) the debounced persist.
    ///
    /// Ignored while a hydration is in flight: hydration writes into the
    /// state providers and must not boomerang back into a persist of the
    /// session being replaced. Also ignored before any session is active.
    pub fn schedule_persist(&self) {
        if self.hydrating.load(Ordering::Acquire) {
            return;
        }
        if self.with_state(|s| s.active_session_id.is_none()) {
            return;
        }

        let weak = self.weak_self.clone();
        self.debounce.schedule(
            Duration::from_millis(self.config.save_debounce_ms),
            async move {
                if let Some(controller) = weak.upgrade() {
                    if let Err(e) = controller.persist_snapshot().await {
                        error!(error = %e, "Failed to persist session snapshot");
                    }
                }
            },
        );
    }

    /// Flush the active session's current state to the repository.
    ///
    /// Cancels any pending debounce timer first; concurrent callers are
    /// serialized through an internal mutex so two flushes can never
    /// interleave their read-then-write cycles.
    pub async fn persist_snapshot(&self) -> Result<(), SessionError> {
        let _guard = self.persist_lock.lock().await;
        self.debounce.cancel();

        let Some(active_id) = self.with_state(|s| s.active_session_id.clone()) else {
            return Ok(());
        };

        let messages = self.chat.messages();
        let content = self.content.snapshot();
        let now = now_millis();
        let record = self.with_state(|s| match s.session_map.get(&active_id) {
            Some(existing) => SessionRecord {
                id: active_id.clone(),
                title: existing.title.clone(),
                created_at: existing.created_at,
                updated_at: now,
            },
            None => SessionRecord {
                id: active_id.clone(),
                title: self.config.default_title.clone(),
                created_at: now,
                updated_at: now,
            },
        });

        self.repo
            .upsert(&record, &SessionSnapshot { messages, content })
            .await?;
        self.refresh_sessions().await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Session operations
    // -------------------------------------------------------------------------

    /// Flush the outgoing session, then create and hydrate a blank one.
    ///
    /// The flush must come first; it carries the outgoing session's latest
    /// unsaved edits.
    pub async fn create_session(&self) -> Result<String, SessionError> {
        self.persist_snapshot().await?;

        let record = self.create_blank_session().await?;
        self.refresh_sessions().await?;
        self.hydrate_session(&record.id).await?;
        Ok(record.id)
    }

    /// Switch to another session. No-op when it is already active.
    pub async fn select_session(&self, id: &str) -> Result<(), SessionError> {
        if self.with_state(|s| s.active_session_id.as_deref() == Some(id)) {
            return Ok(());
        }

        self.hydrating.store(true, Ordering::Release);
        self.persist_snapshot().await?;
        self.hydrate_session(id).await
    }

    /// Rename a session. A blank (all-whitespace) title falls back to the
    /// default title.
    pub async fn rename_session(&self, id: &str, title: &str) -> Result<(), SessionError> {
        let trimmed = title.trim();
        let next_title = if trimmed.is_empty() {
            self.config.default_title.as_str()
        } else {
            trimmed
        };

        self.repo.rename(id, next_title).await?;
        self.refresh_sessions().await?;
        Ok(())
    }

    /// Delete a session and its external assets.
    ///
    /// The repository delete is idempotent; asset cleanup is best-effort.
    /// Deleting the last session immediately creates a fresh empty one, and
    /// deleting the active session hydrates a replacement, so the active id
    /// always resolves to a record.
    pub async fn delete_session(&self, id: &str) -> Result<(), SessionError> {
        // A timer armed for the doomed session must not fire and resurrect it.
        self.debounce.cancel();

        self.repo.delete(id).await?;
        if let Err(e) = self.assets.remove_session_assets(id).await {
            warn!(error = %e, session_id = id, "Failed to remove session assets");
        }

        let rows = self.refresh_sessions().await?;
        let was_active = self.with_state(|s| s.active_session_id.as_deref() == Some(id));

        if rows.is_empty() {
            let record = self.create_blank_session().await?;
            self.refresh_sessions().await?;
            self.hydrate_session(&record.id).await?;
        } else if was_active {
            let next_id = rows[0].id.clone();
            self.hydrate_session(&next_id).await?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Session list & search
    // -------------------------------------------------------------------------

    /// Cached session list, newest created first.
    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.with_state(|s| s.sessions.clone())
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.with_state(|s| s.active_session_id.clone())
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating.load(Ordering::Acquire)
    }

    /// Pure state setter consumed by the session-list UI; does not touch the
    /// repository by itself.
    pub fn set_search_query(&self, term: impl Into<String>) {
        let term = term.into();
        self.with_state(|s| s.search_query = term);
    }

    pub fn search_query(&self) -> String {
        self.with_state(|s| s.search_query.clone())
    }

    /// The session list the sidebar should show: the cached list when the
    /// query is blank, otherwise a repository title search.
    pub async fn visible_sessions(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let query = self.search_query();
        if query.trim().is_empty() {
            return Ok(self.sessions());
        }
        Ok(self.repo.search(&query).await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn refresh_sessions(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let rows = self.repo.list().await?;
        self.with_state(|s| {
            s.session_map = rows
                .iter()
                .map(|record| (record.id.clone(), record.clone()))
                .collect();
            s.sessions = rows.clone();
        });
        Ok(rows)
    }

    async fn create_blank_session(&self) -> Result<SessionRecord, SessionError> {
        let now = now_millis();
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            title: self.config.default_title.clone(),
            created_at: now,
            updated_at: now,
        };
        self.repo.upsert(&record, &SessionSnapshot::empty()).await?;
        Ok(record)
    }

    /// Load a session and replace the UI state with its snapshot.
    ///
    /// Hydrations are monotonically sequenced: if a newer one starts while
    /// this load is in flight, the stale result is discarded on arrival
    /// instead of overwriting the more recent selection.
    async fn hydrate_session(&self, id: &str) -> Result<(), SessionError> {
        let seq = self.hydration_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.hydrating.store(true, Ordering::Release);

        let loaded = self.repo.load(id).await;

        if self.hydration_seq.load(Ordering::Acquire) != seq {
            // A newer hydration superseded this one; it owns the flag now.
            return Ok(());
        }

        match loaded {
            Ok(Some((_, snapshot))) => {
                self.chat.set_messages(snapshot.messages);
                self.content.hydrate(snapshot.content);
            }
            Ok(None) => {
                warn!(session_id = id, "Session record missing, hydrating empty workspace");
                self.chat.clear();
                self.content.clear();
            }
            Err(e) => {
                self.hydrating.store(false, Ordering::Release);
                return Err(e.into());
            }
        }

        self.with_state(|s| s.active_session_id = Some(id.to_string()));
        self.hydrating.store(false, Ordering::Release);
        Ok(())
    }
}
