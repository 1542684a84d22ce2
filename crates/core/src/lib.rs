//! # parley core
//!
//! Domain types, traits, and error definitions shared by every parley crate.
//! Nothing here touches the network or the filesystem.
//!
//! ## Layout
//!
//! Each capability the engine depends on is a trait defined here:
//! - [`LanguageModel`] / [`ModelFactory`] generate text, optionally streaming
//! - [`Tool`] runs one named action for the agent loop
//! - [`DeliverySink`] carries output back to the waiting connection
//! - [`HistoryStore`] reads and appends a session's turns
//! - [`ChatHandler`] answers a [`ChatJob`] on the worker side
//!
//! Implementations live in their respective crates and are swapped via configuration.

pub mod error;
pub mod history;
pub mod job;
pub mod message;
pub mod model;
pub mod provider;
pub mod sink;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{DeliveryError, DispatchError, Error, HistoryError, ProviderError, Result, ToolError};
pub use history::HistoryStore;
pub use job::{ChatHandler, ChatJob, ChatMode, CorrelationId};
pub use message::{Message, Role};
pub use model::{LanguageModel, ModelFactory, StreamFn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use sink::{ChannelSink, DeliverySink, SinkEvent};
pub use tool::{Tool, ToolSet};
