//! Process-wide wiring: models, tools, history, queue, registry, workers.

use parley_agent::ChatOrchestrator;
use parley_config::AppConfig;
use parley_core::history::HistoryStore;
use parley_core::model::ModelFactory;
use parley_core::tool::Tool;
use parley_core::Result;
use parley_dispatch::{CorrelationRegistry, Dispatcher, InMemoryQueue, JobQueue, WorkerPool};
use std::sync::Arc;
use tracing::info;

/// Everything a running parley process shares between requests.
pub struct Runtime {
    pub dispatcher: Dispatcher,
    pub history: Arc<dyn HistoryStore>,
    pool: WorkerPool,
}

impl Runtime {
    /// Build the runtime from configuration. Must run inside a tokio runtime,
    /// since the worker pool starts immediately.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let models = Arc::new(parley_providers::build_from_config(config)?);
        let tools = parley_tools::build_tools(config)?;
        let history = parley_memory::history_from_config(&config.history).await?;
        Ok(Self::with_parts(config, models, tools, history))
    }

    /// Assemble from already-built parts.
    pub fn with_parts(
        config: &AppConfig,
        models: Arc<dyn ModelFactory>,
        tools: Vec<Arc<dyn Tool>>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let tool_count = tools.len();
        let orchestrator = ChatOrchestrator::new(models, history.clone())
            .with_tools(tools)
            .with_max_steps(config.agent.max_steps);

        let queue: Arc<dyn JobQueue> = Arc::new(InMemoryQueue::new(config.dispatch.queue_name.as_str()));
        let registry = Arc::new(CorrelationRegistry::new());
        let pool = WorkerPool::start(
            config.dispatch.workers,
            queue.clone(),
            registry.clone(),
            Arc::new(orchestrator),
        );

        info!(
            workers = pool.size(),
            tools = tool_count,
            history = %history.name(),
            max_steps = config.agent.max_steps,
            "Runtime ready"
        );

        Self {
            dispatcher: Dispatcher::new(queue, registry),
            history,
            pool,
        }
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    /// Stop the workers once their current jobs finish.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }

    /// Handler state sharing this runtime's dispatcher and history.
    pub fn state(&self) -> crate::api::SharedState {
        Arc::new(crate::api::AppState {
            dispatcher: self.dispatcher.clone(),
            history: self.history.clone(),
            workers: self.workers(),
        })
    }
}
