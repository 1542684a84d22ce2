//! Model capability over a wire provider.

use async_trait::async_trait;
use parley_core::message::Message;
use parley_core::model::{LanguageModel, StreamFn};
use parley_core::provider::{Provider, ProviderRequest};
use parley_core::Result;
use std::sync::Arc;
use tracing::debug;

/// One model on one provider, prompted with a single user message.
pub struct ChatModel {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatModel {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn request(&self, prompt: &str, stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, on_chunk: Option<&StreamFn<'_>>) -> Result<String> {
        let Some(forward) = on_chunk else {
            let response = self.provider.complete(self.request(prompt, false)).await?;
            return Ok(response.message.content);
        };

        let mut rx = self.provider.stream(self.request(prompt, true)).await?;
        let mut text = String::new();
        let mut chunks = 0usize;

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content.as_deref().filter(|c| !c.is_empty()) {
                forward(content)?;
                text.push_str(content);
                chunks += 1;
            }
            if chunk.done {
                break;
            }
        }

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            chunks,
            chars = text.len(),
            "Streamed generation finished"
        );
        Ok(text)
    }
}
