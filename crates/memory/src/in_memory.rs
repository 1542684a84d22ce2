//! In-memory history: useful for testing and ephemeral deployments.

use async_trait::async_trait;
use parley_core::error::HistoryError;
use parley_core::history::HistoryStore;
use parley_core::job::ChatJob;
use parley_core::message::Message;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Session-keyed, append-only turns. Lost on restart.
#[derive(Default)]
pub struct InMemoryHistory {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session, e.g. in tests.
    pub fn with_session(mut self, session_id: impl Into<String>, messages: Vec<Message>) -> Self {
        self.sessions.get_mut().insert(session_id.into(), messages);
        self
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>, HistoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_history(&self, job: &ChatJob, messages: &[Message]) -> Result<(), HistoryError> {
        self.sessions
            .write()
            .await
            .entry(job.session_id.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}
