//! Job queue: FIFO, at-least-once hand-off between ingress and workers.
//!
//! Jobs travel as [`Envelope`]s. The JSON body carries the job; the
//! correlation id rides alongside as metadata and never enters the body.
//! A consumed [`Delivery`] must be acknowledged. One that is dropped
//! unacknowledged (a worker crashed mid-job) goes back on the queue
//! flagged as redelivered.

use async_trait::async_trait;
use parley_core::error::DispatchError;
use parley_core::job::{ChatJob, CorrelationId};
use std::sync::{Arc, Mutex as StdMutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A job on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub correlation_id: Option<CorrelationId>,
    pub content_type: String,
    pub body: Vec<u8>,
    /// Set when this envelope was handed out before and never acknowledged.
    pub redelivered: bool,
}

impl Envelope {
    pub fn for_job(job: &ChatJob, correlation_id: &CorrelationId) -> Result<Self, DispatchError> {
        let body = serde_json::to_vec(job)
            .map_err(|e| DispatchError::MalformedEnvelope(e.to_string()))?;
        Ok(Self {
            correlation_id: Some(correlation_id.clone()),
            content_type: JSON_CONTENT_TYPE.into(),
            body,
            redelivered: false,
        })
    }

    pub fn decode(&self) -> Result<ChatJob, DispatchError> {
        if self.content_type != JSON_CONTENT_TYPE {
            return Err(DispatchError::MalformedEnvelope(format!(
                "unsupported content type '{}'",
                self.content_type
            )));
        }
        serde_json::from_slice(&self.body).map_err(|e| DispatchError::MalformedEnvelope(e.to_string()))
    }
}

type Requeue = Box<dyn FnOnce(Envelope) + Send>;

/// One envelope handed to one consumer.
pub struct Delivery {
    envelope: Envelope,
    requeue: Option<Requeue>,
}

impl Delivery {
    pub fn new(envelope: Envelope, requeue: impl FnOnce(Envelope) + Send + 'static) -> Self {
        Self {
            envelope,
            requeue: Some(Box::new(requeue)),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Mark the envelope as handled. It will not be delivered again.
    pub fn ack(mut self) {
        self.requeue = None;
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if let Some(requeue) = self.requeue.take() {
            let mut envelope = std::mem::take(&mut self.envelope);
            envelope.redelivered = true;
            warn!(
                correlation_id = ?envelope.correlation_id,
                "Delivery dropped without ack, requeueing"
            );
            requeue(envelope);
        }
    }
}

/// Where ingress puts jobs and workers take them from.
#[async_trait]
pub trait JobQueue: Send + Sync {
    fn name(&self) -> &str;

    /// Enqueue `job`, tagged with `correlation_id`.
    async fn publish(&self, job: &ChatJob, correlation_id: &CorrelationId) -> Result<(), DispatchError>;

    /// Wait for the next envelope. `None` once the queue is closed and drained.
    async fn consume(&self) -> Option<Delivery>;
}

struct Inner {
    name: String,
    /// The only sender. Taking it closes the channel without touching the
    /// receiver lock, which an idle consumer holds while it waits.
    tx: StdMutex<Option<mpsc::UnboundedSender<Envelope>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    depth: AtomicUsize,
}

impl Inner {
    fn sender(&self) -> Option<mpsc::UnboundedSender<Envelope>> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let closed = || DispatchError::QueueClosed(self.name.clone());
        let tx = self.sender().ok_or_else(closed)?;

        self.depth.fetch_add(1, Ordering::SeqCst);
        tx.send(envelope).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            closed()
        })
    }
}

/// A named in-process queue.
///
/// Consumers wait their turn on a fair lock around the receiver, so
/// envelopes go to whichever worker is free first.
#[derive(Clone)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

impl InMemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                tx: StdMutex::new(Some(tx)),
                rx: Mutex::new(rx),
                depth: AtomicUsize::new(0),
            }),
        }
    }

    /// Enqueue a prepared envelope as-is.
    pub fn push(&self, envelope: Envelope) -> Result<(), DispatchError> {
        self.inner.push(envelope)
    }

    /// Envelopes waiting to be consumed.
    pub fn depth(&self) -> usize {
        self.inner.depth.load(Ordering::SeqCst)
    }

    /// Stop accepting envelopes. Consumers drain what is left, then see `None`.
    pub fn close(&self) {
        let tx = self.inner.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        if tx.is_some() {
            debug!(queue = %self.inner.name, "Queue closed");
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn publish(&self, job: &ChatJob, correlation_id: &CorrelationId) -> Result<(), DispatchError> {
        let envelope = Envelope::for_job(job, correlation_id)?;
        self.inner.push(envelope).map_err(|e| DispatchError::PublishFailed {
            queue: self.inner.name.clone(),
            reason: e.to_string(),
        })?;
        debug!(queue = %self.inner.name, correlation_id = %correlation_id, "Published job");
        Ok(())
    }

    async fn consume(&self) -> Option<Delivery> {
        let envelope = self.inner.rx.lock().await.recv().await?;
        self.inner.depth.fetch_sub(1, Ordering::SeqCst);

        let inner = self.inner.clone();
        Some(Delivery::new(envelope, move |envelope| {
            if let Err(e) = inner.push(envelope) {
                warn!(error = %e, "Requeue failed, envelope lost");
            }
        }))
    }
}
