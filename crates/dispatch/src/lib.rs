//! Job dispatch for parley.
//!
//! Turns a queued, asynchronous job into a blocking-with-streaming call:
//!
//! 1. [`Dispatcher::submit`] registers a sink under a fresh correlation id
//!    and publishes the job
//! 2. a [`WorkerPool`] worker consumes it, finds the sink in the
//!    [`CorrelationRegistry`], and runs the chat handler against it
//! 3. the worker closes the sink, removes the entry, and signals that
//!    job's own [`Completion`]

pub mod dispatcher;
pub mod queue;
pub mod registry;
pub mod worker;

pub use dispatcher::{Dispatcher, Ticket};
pub use queue::{Delivery, Envelope, InMemoryQueue, JobQueue};
pub use registry::{Completer, Completion, CorrelationRegistry, JobOutcome};
pub use worker::{process_delivery, WorkerPool, DEFAULT_WORKERS};
