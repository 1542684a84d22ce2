//! History store: prior turns of a session.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::job::ChatJob;
use crate::message::Message;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Backend name ("memory", "sqlite").
    fn name(&self) -> &str;

    /// All turns of `session_id`, oldest first.
    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>, HistoryError>;

    /// Append `messages` to the job's session, in order.
    async fn append_history(&self, job: &ChatJob, messages: &[Message]) -> Result<(), HistoryError>;
}
