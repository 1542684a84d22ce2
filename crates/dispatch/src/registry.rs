//! Correlation registry: in-flight job ids mapped to the sink waiting on them.
//!
//! Each entry also owns the job's completion sender, so finishing one job
//! wakes exactly the caller that submitted it and nobody else. A single
//! std mutex guards the map; it is never held across an await or any I/O.

use parley_core::error::DispatchError;
use parley_core::job::CorrelationId;
use parley_core::sink::DeliverySink;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::debug;

/// How a job ended, as seen by the caller that submitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The handler returned this final answer.
    Completed(String),
    /// The handler failed. The message was also sent to the sink.
    Failed(String),
    /// The client went away mid-job; work stopped early.
    Disconnected,
}

/// Sending half of a job's completion. Consumed on use.
#[derive(Debug)]
pub struct Completer(oneshot::Sender<JobOutcome>);

impl Completer {
    /// Wake the waiting caller. A caller that already gave up is ignored.
    pub fn signal(self, outcome: JobOutcome) {
        let _ = self.0.send(outcome);
    }
}

/// Receiving half of a job's completion.
#[derive(Debug)]
pub struct Completion(oneshot::Receiver<JobOutcome>);

impl Completion {
    /// Wait for this job, and only this job, to finish.
    pub async fn wait(self) -> JobOutcome {
        self.0
            .await
            .unwrap_or_else(|_| JobOutcome::Failed("worker dropped the job".into()))
    }

    /// Non-blocking check. `None` while the job is still running.
    pub fn try_outcome(&mut self) -> Option<JobOutcome> {
        match self.0.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(JobOutcome::Failed("worker dropped the job".into()))
            }
        }
    }
}

struct Entry {
    sink: Arc<dyn DeliverySink>,
    completer: Completer,
}

#[derive(Default)]
pub struct CorrelationRegistry {
    entries: Mutex<HashMap<CorrelationId, Entry>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CorrelationId, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Map `id` to `sink`. Fails if `id` is already live.
    pub fn register(
        &self,
        id: CorrelationId,
        sink: Arc<dyn DeliverySink>,
    ) -> Result<Completion, DispatchError> {
        let mut entries = self.entries();
        if entries.contains_key(&id) {
            return Err(DispatchError::DuplicateCorrelation(id.to_string()));
        }

        let (tx, rx) = oneshot::channel();
        entries.insert(
            id,
            Entry {
                sink,
                completer: Completer(tx),
            },
        );
        Ok(Completion(rx))
    }

    pub fn lookup(&self, id: &CorrelationId) -> Option<Arc<dyn DeliverySink>> {
        self.entries().get(id).map(|entry| entry.sink.clone())
    }

    /// Drop the mapping for `id`, handing back its completer.
    ///
    /// Removing an unknown id is a no-op and returns `None`.
    pub fn remove(&self, id: &CorrelationId) -> Option<Completer> {
        let removed = self.entries().remove(id);
        if removed.is_none() {
            debug!(correlation_id = %id, "Remove of unregistered correlation id");
        }
        removed.map(|entry| entry.completer)
    }

    /// Number of in-flight jobs.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
