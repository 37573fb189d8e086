//! Atelier application binary - composition root.
//!
//! Ties the workspace crates together into a single executable:
//! 1. Load configuration from TOML
//! 2. Open local storage (SQLite + fallback cache), degrading to the
//!    in-memory repository if the database cannot be opened
//! 3. Wire the state providers and the session lifecycle controller
//! 4. Run one headless inspection command against the store
//!
//! The chat/generation UI is a separate layer; it consumes the same
//! controller surface these commands exercise.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use atelier_core::AtelierConfig;
use atelier_session::{
    ChatState, ContentState, FailoverRepository, SessionController, SessionError,
};
use atelier_storage::{
    Database, FileCache, FsAssetStore, MemorySessionRepository, SessionRepository,
    SqliteSessionRepository,
};

mod cli;

use cli::{CliArgs, Command};

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

async fn run_command(
    controller: &Arc<SessionController>,
    chat: &Arc<ChatState>,
    content: &Arc<ContentState>,
    command: Command,
) -> Result<(), SessionError> {
    match command {
        Command::List => {
            let active = controller.active_session_id();
            for record in controller.sessions() {
                let marker = if active.as_deref() == Some(record.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    record.id,
                    format_timestamp(record.updated_at),
                    record.title
                );
            }
        }
        Command::Search { term } => {
            controller.set_search_query(&term);
            for record in controller.visible_sessions().await? {
                println!(
                    "{}  {}  {}",
                    record.id,
                    format_timestamp(record.updated_at),
                    record.title
                );
            }
        }
        Command::New => {
            let id = controller.create_session().await?;
            println!("{}", id);
        }
        Command::Show { id } => {
            if let Some(ref id) = id {
                controller.select_session(id).await?;
            }
            let Some(active) = controller.active_session_id() else {
                return Ok(());
            };
            let title = controller
                .sessions()
                .into_iter()
                .find(|r| r.id == active)
                .map(|r| r.title)
                .unwrap_or_default();
            println!("{}  {}", active, title);

            for message in chat.messages() {
                println!("[{:?}] {}", message.role, message.content);
            }

            let snapshot = content.snapshot();
            println!(
                "mood board: {}, storyboard: {}, colors: {}, constraints: {}, summary: {}, finals: {}",
                snapshot.mood_board.len(),
                snapshot.storyboard.len(),
                snapshot.hex_codes.len(),
                snapshot.constraints.len(),
                if snapshot.summary.is_some() { "yes" } else { "no" },
                snapshot.final_outputs.len(),
            );
        }
        Command::Rename { id, title } => {
            controller.rename_session(&id, &title).await?;
        }
        Command::Delete { id } => {
            controller.delete_session(&id).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. --log-level wins over RUST_LOG, which wins over "info".
    let filter = match args.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Config.
    let config_file = args.resolve_config_path();
    let config = AtelierConfig::load_or_default(&config_file);

    // Storage.
    let data_dir = resolve_data_dir(
        &args
            .resolve_data_dir()
            .unwrap_or_else(|| config.general.data_dir.clone()),
    );
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let cache = Arc::new(FileCache::new(data_dir.join("cache")));
    let fallback: Arc<dyn SessionRepository> = Arc::new(MemorySessionRepository::new(
        cache,
        config.storage.fallback_cache_key.clone(),
    ));

    let db_path = data_dir.join(&config.storage.database_file);
    let repo: Arc<dyn SessionRepository> = match Database::open(&db_path) {
        Ok(db) => {
            let durable: Arc<dyn SessionRepository> =
                Arc::new(SqliteSessionRepository::new(Arc::new(db)));
            Arc::new(FailoverRepository::new(durable, fallback))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Database unavailable, running on the in-memory store");
            Arc::new(FailoverRepository::fallback_only(fallback))
        }
    };

    // State providers and controller.
    let chat = Arc::new(ChatState::new());
    let content = Arc::new(ContentState::new());
    let assets = Arc::new(FsAssetStore::new(data_dir.clone()));
    let controller = SessionController::new(
        repo,
        Arc::clone(&chat),
        Arc::clone(&content),
        assets,
        config.session.clone(),
    );

    controller.initialize().await?;

    let command = args.command.unwrap_or(Command::List);
    let result = run_command(&controller, &chat, &content, command).await;

    controller.shutdown();
    result?;
    Ok(())
}
