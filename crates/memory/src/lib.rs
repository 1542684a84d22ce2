//! Chat history stores for parley.
//!
//! Both backends implement `parley_core::HistoryStore`; the `[history]`
//! config section picks one.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryHistory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteHistory;

use parley_config::HistoryConfig;
use parley_core::history::HistoryStore;
use parley_core::{Error, Result};
use std::sync::Arc;

/// Build the history store named by `config.backend`.
pub async fn history_from_config(config: &HistoryConfig) -> Result<Arc<dyn HistoryStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryHistory::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteHistory::open(&config.resolved_path()).await?)),
        other => Err(Error::config(format!("unsupported history backend '{other}'"))),
    }
}
