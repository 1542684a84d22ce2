//! OpenAI-compatible provider implementation.
//!
//! Works with DashScope's compatible mode (Qwen models), OpenAI, OpenRouter,
//! Ollama, vLLM, and any other endpoint exposing `/chat/completions`.
//! Text only: chat completions, non-streaming and streaming SSE.

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::error::ProviderError;
use parley_core::message::{Message, Role};
use parley_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Alibaba Cloud DashScope in OpenAI-compatible mode.
    pub fn dashscope(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "dashscope",
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
            api_key,
        )
    }

    /// A local Ollama server. No key required.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    async fn post(&self, body: &serde_json::Value, streaming: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if streaming {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let body = Self::request_body(&request, false);
        let response = self.post(&body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: api_response.usage.map(Into::into),
            model: api_response.model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let body = Self::request_body(&request, true);
        let response = self.post(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and forward parsed chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    match parse_sse_line(&line) {
                        SseLine::Skip => {}
                        SseLine::Malformed(error) => {
                            trace!(provider = %provider_name, %error, "Ignoring unparseable SSE chunk");
                        }
                        SseLine::Chunk(chunk) => {
                            let done = chunk.done;
                            if tx.send(Ok(chunk)).await.is_err() || done {
                                return;
                            }
                        }
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                    usage: None,
                }))
                .await;
        });

        Ok(rx)
    }
}

/// Splits a byte stream into complete lines.
///
/// Bytes are held raw until a newline arrives, so a multi-byte character
/// split across two reads is decoded whole.
#[derive(Default)]
struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line[..line_end]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }
}

#[derive(Debug)]
enum SseLine {
    Skip,
    Malformed(String),
    Chunk(StreamChunk),
}

fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Chunk(StreamChunk {
            content: None,
            done: true,
            usage: None,
        });
    }

    let parsed: StreamResponse = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(e) => return SseLine::Malformed(e.to_string()),
    };

    // Usage arrives alone in the last chunk when stream_options asks for it
    if let Some(usage) = parsed.usage {
        return SseLine::Chunk(StreamChunk {
            content: None,
            done: true,
            usage: Some(usage.into()),
        });
    }

    match parsed.choices.into_iter().next() {
        Some(choice) if choice.delta.content.as_ref().is_some_and(|c| !c.is_empty()) => {
            SseLine::Chunk(StreamChunk {
                content: choice.delta.content,
                done: false,
                usage: None,
            })
        }
        _ => SseLine::Skip,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashscope_constructor() {
        let provider = OpenAiCompatProvider::dashscope("sk-test").unwrap();
        assert_eq!(provider.name(), "dashscope");
        assert!(provider.base_url().contains("compatible-mode"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "http://localhost:8000/v1/", "k").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn streaming_body_asks_for_usage() {
        let request = ProviderRequest {
            model: "qwen-plus".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            max_tokens: Some(64),
            stream: true,
        };
        let body = OpenAiCompatProvider::request_body(&request, true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["max_tokens"], 64);

        let body = OpenAiCompatProvider::request_body(&request, false);
        assert!(body.get("stream_options").is_none());
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: {\"cho").is_empty());
        let lines = buf.push(b"ices\":[]}\r\n\ndata: [DONE]\n");
        assert_eq!(lines, vec!["data: {\"choices\":[]}", "", "data: [DONE]"]);
    }

    #[test]
    fn line_buffer_keeps_split_multibyte_chars() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xE4).unwrap() + 1;

        let mut buf = LineBuffer::default();
        assert!(buf.push(&line[..split]).is_empty());
        let lines = buf.push(&line[split..]);
        assert_eq!(lines.len(), 1);

        match parse_sse_line(&lines[0]) {
            SseLine::Chunk(chunk) => assert_eq!(chunk.content.as_deref(), Some("你好")),
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn parse_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        match parse_sse_line(line) {
            SseLine::Chunk(chunk) => {
                assert_eq!(chunk.content.as_deref(), Some("Hello"));
                assert!(!chunk.done);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn parse_done_marker() {
        assert!(matches!(parse_sse_line("data: [DONE]"), SseLine::Chunk(c) if c.done));
    }

    #[test]
    fn parse_usage_chunk_ends_stream() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#;
        match parse_sse_line(line) {
            SseLine::Chunk(chunk) => {
                assert!(chunk.done);
                assert_eq!(chunk.usage.unwrap().total_tokens, 7);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn finish_and_comment_lines_are_skipped() {
        let finish = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(matches!(parse_sse_line(finish), SseLine::Skip));
        assert!(matches!(parse_sse_line(": keep-alive"), SseLine::Skip));
        assert!(matches!(parse_sse_line(""), SseLine::Skip));
        assert!(matches!(parse_sse_line("data: {oops"), SseLine::Malformed(_)));
    }
}
