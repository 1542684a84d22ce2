//! Shared test doubles for agent and orchestrator tests.

use async_trait::async_trait;
use parley_core::error::{ProviderError, ToolError};
use parley_core::model::{LanguageModel, ModelFactory, StreamFn};
use parley_core::tool::Tool;
use parley_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Reply {
    Chunks(Vec<String>),
    Fail(String),
}

/// A model that plays back a script, one reply per call.
///
/// Records every prompt it receives. Runs out with a provider error.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn from_script(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// One reply per call, each streamed as a single chunk.
    pub fn replies(replies: &[&str]) -> Self {
        Self::from_script(
            replies
                .iter()
                .map(|r| Reply::Chunks(vec![r.to_string()]))
                .collect(),
        )
    }

    /// A single reply streamed as the given chunks.
    pub fn streaming(chunks: &[&str]) -> Self {
        Self::from_script(vec![Reply::Chunks(
            chunks.iter().map(|c| c.to_string()).collect(),
        )])
    }

    /// The same reply for up to `n` calls.
    pub fn repeating(reply: &str, n: usize) -> Self {
        Self::replies(&vec![reply; n])
    }

    /// Fails on the first call.
    pub fn failing(message: &str) -> Self {
        Self::from_script(vec![Reply::Fail(message.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, on_chunk: Option<&StreamFn<'_>>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.script.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Chunks(chunks)) => {
                if let Some(forward) = on_chunk {
                    for chunk in &chunks {
                        forward(chunk)?;
                    }
                }
                Ok(chunks.concat())
            }
            Some(Reply::Fail(message)) => Err(ProviderError::Network(message).into()),
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            }
            .into()),
        }
    }
}

/// Hands out one shared scripted model and remembers the ids asked for.
pub struct ScriptedFactory {
    model: Arc<ScriptedModel>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        Self {
            model,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl ModelFactory for ScriptedFactory {
    fn create(&self, model_id: &str) -> Result<Arc<dyn LanguageModel>> {
        if model_id.trim().is_empty() {
            return Err(Error::config("missing model name"));
        }
        self.requested.lock().unwrap().push(model_id.to_string());
        Ok(self.model.clone())
    }
}

/// A tool that always fails with the same error.
pub struct FailingTool {
    pub name: &'static str,
    pub reason: &'static str,
}

impl FailingTool {
    pub fn error(&self) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name.into(),
            reason: self.reason.into(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn execute(&self, _input: &str) -> std::result::Result<String, ToolError> {
        Err(self.error())
    }
}

/// Returns `echo: <input>` and counts calls.
#[derive(Default)]
pub struct EchoTool {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "Echo"
    }

    fn description(&self) -> &str {
        "Repeats the input"
    }

    async fn execute(&self, input: &str) -> std::result::Result<String, ToolError> {
        self.calls.lock().unwrap().push(input.to_string());
        Ok(format!("echo: {input}"))
    }
}
