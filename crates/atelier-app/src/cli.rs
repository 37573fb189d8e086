//! CLI argument definitions for the Atelier binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Atelier — local session store for a chat-driven creative workspace.
#[derive(Parser, Debug)]
#[command(name = "atelier", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for SQLite, the local cache, and image assets.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Headless inspection commands against the session store.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all sessions, newest first (default).
    List,
    /// Search session titles.
    Search {
        /// Title prefix to search for.
        term: String,
    },
    /// Create a new empty session and make it active.
    New,
    /// Print a session's transcript and content summary.
    Show {
        /// Session id; the active session when omitted.
        id: Option<String>,
    },
    /// Rename a session.
    Rename {
        id: String,
        title: String,
    },
    /// Delete a session and its cached assets.
    Delete {
        id: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ATELIER_CONFIG env var > ~/.atelier/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ATELIER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory path.
    ///
    /// Priority: --data-dir flag > config file value.
    /// Returns `None` if not overridden (use config default).
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".atelier").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".atelier").join("config.toml");
    }
    PathBuf::from("config.toml")
}
