pub mod config;
pub mod error;
pub mod snapshot;
pub mod types;

pub use config::AtelierConfig;
pub use error::{AtelierError, Result};
pub use types::*;
