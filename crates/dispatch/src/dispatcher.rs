//! Ingress side of dispatch: submit a job, get back its event stream and
//! its own completion.

use parley_core::error::DispatchError;
use parley_core::job::{ChatJob, CorrelationId};
use parley_core::sink::{ChannelSink, SinkEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::queue::JobQueue;
use crate::registry::{Completion, CorrelationRegistry, JobOutcome};

/// A submitted job, from the submitter's point of view.
pub struct Ticket {
    pub correlation_id: CorrelationId,
    /// Output events. Ends when the worker closes the sink.
    pub events: mpsc::UnboundedReceiver<SinkEvent>,
    pub completion: Completion,
}

impl Ticket {
    /// Drain every event, then wait for the outcome.
    pub async fn collect(mut self) -> (Vec<SinkEvent>, JobOutcome) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        (events, self.completion.wait().await)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    registry: Arc<CorrelationRegistry>,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, registry: Arc<CorrelationRegistry>) -> Self {
        Self { queue, registry }
    }

    /// Register a sink for a fresh correlation id, then enqueue the job.
    ///
    /// The sink is registered first so a fast worker always finds it.
    pub async fn submit(&self, job: ChatJob) -> Result<Ticket, DispatchError> {
        let correlation_id = CorrelationId::new();
        let (sink, events) = ChannelSink::new();
        let completion = self.registry.register(correlation_id.clone(), Arc::new(sink))?;

        if let Err(e) = self.queue.publish(&job, &correlation_id).await {
            warn!(correlation_id = %correlation_id, error = %e, "Publish failed, releasing registration");
            self.registry.remove(&correlation_id);
            return Err(e);
        }

        debug!(
            correlation_id = %correlation_id,
            session_id = %job.session_id,
            queue = %self.queue.name(),
            "Job submitted"
        );
        Ok(Ticket {
            correlation_id,
            events,
            completion,
        })
    }

    /// Jobs submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }
}
