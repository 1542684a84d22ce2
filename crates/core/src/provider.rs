//! Provider trait: the wire-level abstraction over LLM backends.
//!
//! A Provider knows how to send messages to an LLM endpoint and get a
//! response back, either complete or as a stream of chunks. Model
//! capabilities are built on top of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen-plus", "gpt-4o")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "dashscope", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.message.content),
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Provider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant("fixed answer"),
                usage: None,
                model: request.model,
            })
        }
    }

    #[test]
    fn request_temperature_defaults() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model":"qwen-plus","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!req.stream);
        assert!(req.max_tokens.is_none());
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let req = ProviderRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            max_tokens: None,
            stream: true,
        };
        let mut rx = Fixed.stream(req).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("fixed answer"));
        assert!(chunk.done);
        assert!(rx.recv().await.is_none());
    }
}
