//! Session lifecycle for the Atelier workspace.
//!
//! Owns which repository is active, which session is current, debounced
//! background persists, and race-free hydration on session switch. UI-facing
//! state lives in the injected [`ChatState`] and [`ContentState`] providers;
//! the controller reads them to build snapshots and replaces them wholesale
//! when hydrating.

pub mod chat_state;
pub mod content_state;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod failover;

pub use chat_state::ChatState;
pub use content_state::{ContentState, Section};
pub use controller::SessionController;
pub use debounce::DebounceTimer;
pub use error::SessionError;
pub use failover::FailoverRepository;
