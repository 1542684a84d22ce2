//! LLM provider implementations for parley.
//!
//! Wire providers implement `parley_core::Provider`. [`ChatModel`] turns one
//! into a model capability, and [`ProviderRouter`] builds those per model id.

pub mod chat_model;
pub mod openai_compat;
pub mod router;

pub use chat_model::ChatModel;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, ProviderRouter};
