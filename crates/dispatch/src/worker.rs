//! Worker pool: a fixed number of consumers draining the job queue.
//!
//! Every worker runs the same loop: take a delivery, find the sink waiting
//! on its correlation id, run the handler against that sink, then release
//! the registry entry and wake the submitter. Workers share nothing except
//! the registry.

use futures::FutureExt;
use parley_core::job::ChatHandler;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::queue::{Delivery, JobQueue};
use crate::registry::{CorrelationRegistry, JobOutcome};

pub const DEFAULT_WORKERS: usize = 5;

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) on the current runtime.
    pub fn start(
        size: usize,
        queue: Arc<dyn JobQueue>,
        registry: Arc<CorrelationRegistry>,
        handler: Arc<dyn ChatHandler>,
    ) -> Self {
        let size = size.max(1);
        let (shutdown, _) = watch::channel(false);

        let workers = (0..size)
            .map(|worker| {
                let queue = queue.clone();
                let registry = registry.clone();
                let handler = handler.clone();
                let mut stop = shutdown.subscribe();

                tokio::spawn(async move {
                    debug!(worker, queue = %queue.name(), "Worker started");
                    loop {
                        let delivery = tokio::select! {
                            _ = stop.changed() => break,
                            next = queue.consume() => match next {
                                Some(delivery) => delivery,
                                None => break,
                            },
                        };
                        process_delivery(worker, delivery, &registry, handler.as_ref()).await;
                    }
                    debug!(worker, "Worker stopped");
                })
            })
            .collect();

        info!(workers = size, queue = %queue.name(), "Worker pool started");
        Self { workers, shutdown }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stop taking new jobs and wait for every worker to finish its current one.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Worker ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

/// Handle one delivery end to end.
///
/// Envelopes that cannot be routed are acknowledged and discarded with a
/// warning. A job whose client already left is finished as disconnected
/// without running the handler. A handler panic on a first delivery leaves the envelope
/// unacknowledged so it is retried; a second panic fails the job.
pub async fn process_delivery(
    worker: usize,
    delivery: Delivery,
    registry: &CorrelationRegistry,
    handler: &dyn ChatHandler,
) {
    let envelope = delivery.envelope();
    let redelivered = envelope.redelivered;

    let Some(id) = envelope.correlation_id.clone() else {
        warn!(worker, "Envelope without correlation id, discarding");
        delivery.ack();
        return;
    };

    let Some(sink) = registry.lookup(&id) else {
        warn!(worker, correlation_id = %id, "No sink registered for correlation id, discarding");
        delivery.ack();
        return;
    };

    if sink.is_closed() {
        info!(worker, correlation_id = %id, "Client left before the job started, skipping");
        if let Some(completer) = registry.remove(&id) {
            completer.signal(JobOutcome::Disconnected);
        }
        delivery.ack();
        return;
    }

    let job = match envelope.decode() {
        Ok(job) => job,
        Err(e) => {
            warn!(worker, correlation_id = %id, error = %e, "Undecodable job, discarding");
            let _ = sink.error(&e.to_string());
            sink.close();
            if let Some(completer) = registry.remove(&id) {
                completer.signal(JobOutcome::Failed(e.to_string()));
            }
            delivery.ack();
            return;
        }
    };

    debug!(worker, correlation_id = %id, redelivered, "Processing job");

    let result = AssertUnwindSafe(handler.handle(&job, sink.as_ref()))
        .catch_unwind()
        .await;

    let outcome = match result {
        Ok(Ok(answer)) => {
            info!(worker, correlation_id = %id, "Job completed");
            JobOutcome::Completed(answer)
        }
        Ok(Err(e)) if e.is_delivery_failure() => {
            info!(worker, correlation_id = %id, "Client disconnected, job stopped");
            JobOutcome::Disconnected
        }
        Ok(Err(e)) => {
            error!(worker, correlation_id = %id, error = %e, "Job failed");
            let message = e.to_string();
            let _ = sink.error(&message);
            JobOutcome::Failed(message)
        }
        Err(_) if !redelivered => {
            error!(worker, correlation_id = %id, "Handler panicked, requeueing job");
            drop(delivery);
            return;
        }
        Err(_) => {
            error!(worker, correlation_id = %id, "Handler panicked on redelivery, failing job");
            let message = "job handler panicked".to_string();
            let _ = sink.error(&message);
            JobOutcome::Failed(message)
        }
    };

    sink.close();
    if let Some(completer) = registry.remove(&id) {
        completer.signal(outcome);
    }
    delivery.ack();
}
