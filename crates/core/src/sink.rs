//! Delivery sinks: where a job's output goes.
//!
//! A sink belongs to the connection that created it. The correlation
//! registry and the worker running the job only hold references to it.
//!
//! The client observes a sequence of `result` events carrying text chunks,
//! ended either by the stream closing or by a single `error` event.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::DeliveryError;

/// Events a client sees on its stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkEvent {
    /// A chunk of output text.
    Result { content: String },

    /// The job failed. Always the last event.
    Error { message: String },
}

impl SinkEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }

    /// The event's payload text.
    pub fn data(&self) -> &str {
        match self {
            Self::Result { content } => content,
            Self::Error { message } => message,
        }
    }
}

/// Per-connection destination for streamed output.
///
/// `deliver` must be cheap and safe to call repeatedly. Once the connection
/// is gone it fails fast with [`DeliveryError::Closed`].
pub trait DeliverySink: Send + Sync {
    /// Push one chunk of output.
    fn deliver(&self, chunk: &str) -> Result<(), DeliveryError>;

    /// Report a terminal error to the client.
    fn error(&self, message: &str) -> Result<(), DeliveryError>;

    /// End the stream. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A sink backed by an unbounded channel. The receiving half is handed to
/// whatever serves the connection (an SSE response, a terminal).
pub struct ChannelSink {
    tx: Mutex<Option<mpsc::UnboundedSender<SinkEvent>>>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Mutex::new(Some(tx)) }, rx)
    }

    fn send(&self, event: SinkEvent) -> Result<(), DeliveryError> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.send(event).map_err(|_| DeliveryError::Closed),
            None => Err(DeliveryError::Closed),
        }
    }
}

impl DeliverySink for ChannelSink {
    fn deliver(&self, chunk: &str) -> Result<(), DeliveryError> {
        self.send(SinkEvent::Result {
            content: chunk.to_string(),
        })
    }

    fn error(&self, message: &str) -> Result<(), DeliveryError> {
        self.send(SinkEvent::Error {
            message: message.to_string(),
        })
    }

    fn close(&self) {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    fn is_closed(&self) -> bool {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().is_none_or(|tx| tx.is_closed())
    }
}
