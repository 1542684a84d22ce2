//! Chat orchestration: answers one job, in normal or agent mode.
//!
//! Normal mode streams a single model call straight to the caller. Agent
//! mode runs the ReAct loop and delivers each step's raw text instead.
//! Nothing is retried here; failures go back to the caller, which decides
//! what the client sees.

use async_trait::async_trait;
use parley_core::history::HistoryStore;
use parley_core::job::{ChatHandler, ChatJob, ChatMode};
use parley_core::message::Message;
use parley_core::model::{ModelFactory, StreamFn};
use parley_core::sink::DeliverySink;
use parley_core::tool::Tool;
use parley_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::prompt::chat_prompt;
use crate::react::{ReactAgent, DEFAULT_MAX_STEPS};

pub struct ChatOrchestrator {
    models: Arc<dyn ModelFactory>,
    tools: Vec<Arc<dyn Tool>>,
    history: Arc<dyn HistoryStore>,
    max_steps: usize,
}

impl ChatOrchestrator {
    pub fn new(models: Arc<dyn ModelFactory>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            models,
            tools: Vec::new(),
            history,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Tools offered in agent mode, in prompt order.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Produce the answer for `job`, pushing output through `forward`.
    pub async fn orchestrate(&self, job: &ChatJob, forward: &StreamFn<'_>) -> Result<String> {
        info!(
            session_id = %job.session_id,
            model = %job.model,
            mode = %job.mode,
            "Orchestrating chat job"
        );

        match &job.mode {
            ChatMode::Normal => self.answer_directly(job, forward).await,
            ChatMode::Agent => self.answer_with_agent(job, forward).await,
            ChatMode::Unknown(mode) => Err(Error::InvalidMode(mode.clone())),
        }
    }

    async fn answer_directly(&self, job: &ChatJob, forward: &StreamFn<'_>) -> Result<String> {
        let model = self.models.create(&job.model)?;
        let history = self.history.get_history(&job.session_id).await?;

        let prompt = chat_prompt(&history, &job.query);
        let answer = model.generate(&prompt, Some(forward)).await?;

        debug!(session_id = %job.session_id, chars = answer.len(), "Normal answer complete");
        Ok(answer)
    }

    async fn answer_with_agent(&self, job: &ChatJob, forward: &StreamFn<'_>) -> Result<String> {
        let model = self.models.create(&job.model)?;
        let history = self.history.get_history(&job.session_id).await?;

        let agent = ReactAgent::new(model, self.tools.iter().cloned()).with_max_steps(self.max_steps);
        let result = agent.run(&job.query, &history, Some(forward)).await?;

        debug!(
            session_id = %job.session_id,
            iterations = result.iterations,
            termination = ?result.termination,
            "Agent answer complete"
        );
        Ok(result.answer)
    }
}

#[async_trait]
impl ChatHandler for ChatOrchestrator {
    /// Orchestrate, then record the exchange in history.
    async fn handle(&self, job: &ChatJob, sink: &dyn DeliverySink) -> Result<String> {
        let forward = |chunk: &str| sink.deliver(chunk);
        let answer = self.orchestrate(job, &forward).await?;

        self.history
            .append_history(job, &[Message::user(&job.query), Message::assistant(&answer)])
            .await?;

        Ok(answer)
    }
}
