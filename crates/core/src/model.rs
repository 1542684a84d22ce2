//! Model capability: "generate text from a prompt".
//!
//! The orchestrator and agent loop only see this trait. Wire protocols live
//! behind [`Provider`](crate::provider::Provider) implementations.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{DeliveryError, Result};

/// Callback receiving streamed chunks in the order they are produced.
///
/// An error stops generation; the caller sees it as [`Error::Delivery`](crate::Error::Delivery).
pub type StreamFn<'a> = dyn Fn(&str) -> std::result::Result<(), DeliveryError> + Send + Sync + 'a;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The model identifier requests are made with.
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// With `on_chunk`, each incremental chunk is passed to it before this
    /// returns, and the returned text is the concatenation of those chunks.
    async fn generate(&self, prompt: &str, on_chunk: Option<&StreamFn<'_>>) -> Result<String>;
}

/// Builds model capabilities from the model identifier a job carries.
pub trait ModelFactory: Send + Sync {
    /// Fails with a configuration error for an empty or unroutable id.
    fn create(&self, model_id: &str) -> Result<Arc<dyn LanguageModel>>;
}
