//! Chat jobs and the ids that correlate them with a waiting connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Result;
use crate::sink::DeliverySink;

/// Opaque token linking a queued job to the connection awaiting its output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a job is answered.
///
/// Unknown values survive deserialization so the orchestrator can reject
/// them as an invalid mode instead of the queue dropping them as garbage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChatMode {
    /// Single model call, streamed token by token.
    #[default]
    Normal,
    /// Bounded ReAct loop with tools.
    Agent,
    Unknown(String),
}

impl From<String> for ChatMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "normal" => Self::Normal,
            "agent" => Self::Agent,
            _ => Self::Unknown(s),
        }
    }
}

impl From<ChatMode> for String {
    fn from(mode: ChatMode) -> Self {
        match mode {
            ChatMode::Normal => "normal".into(),
            ChatMode::Agent => "agent".into(),
            ChatMode::Unknown(s) => s,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Agent => f.write_str("agent"),
            Self::Unknown(s) => f.write_str(s),
        }
    }
}

/// A chat request as it travels through the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatJob {
    pub username: String,
    pub session_id: String,
    pub query: String,
    /// Model identifier, resolved by the model factory.
    pub model: String,
    #[serde(default)]
    pub mode: ChatMode,
}

/// Whatever answers jobs on the worker side.
#[async_trait]
pub trait ChatHandler: Send + Sync {
    /// Answer `job`, streaming output into `sink`. Returns the final answer.
    ///
    /// Errors are reported to the caller; the handler does not notify or
    /// close the sink itself.
    async fn handle(&self, job: &ChatJob, sink: &dyn DeliverySink) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn correlation_id_from_existing_token() {
        let id: CorrelationId = "corr-7".into();
        assert_eq!(id, CorrelationId::from(String::from("corr-7")));
        assert_eq!(id.as_str(), "corr-7");
    }

    #[test]
    fn job_wire_format() {
        let job: ChatJob = serde_json::from_str(
            r#"{"username":"ana","session_id":"s1","query":"2+2?","model":"qwen-plus","mode":"agent"}"#,
        )
        .unwrap();
        assert_eq!(job.mode, ChatMode::Agent);

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["mode"], "agent");
        assert!(json.get("correlation_id").is_none());
    }

    #[test]
    fn missing_mode_defaults_to_normal() {
        let job: ChatJob = serde_json::from_str(
            r#"{"username":"ana","session_id":"s1","query":"hi","model":"m"}"#,
        )
        .unwrap();
        assert_eq!(job.mode, ChatMode::Normal);
    }

    #[test]
    fn unknown_mode_is_preserved() {
        let job: ChatJob = serde_json::from_str(
            r#"{"username":"ana","session_id":"s1","query":"hi","model":"m","mode":"turbo"}"#,
        )
        .unwrap();
        assert_eq!(job.mode, ChatMode::Unknown("turbo".into()));
        assert_eq!(job.mode.to_string(), "turbo");
    }
}
