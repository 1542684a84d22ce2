//! ReAct loop: Thought → Action → Observation, bounded by a step budget.
//!
//! Each iteration renders the prompt, asks the model for one step, parses
//! it, and either stops on a final answer or runs the chosen tool. Tool
//! failures never abort the run: the error text becomes the observation so
//! the model can route around it on the next step. A failing model call
//! does abort it, as a planning failure.
//!
//! The raw text of every step is pushed through the step callback, followed
//! by a blank line, so a client can watch the reasoning as it happens.

use chrono::Utc;
use parley_core::message::{render_history, Message};
use parley_core::model::{LanguageModel, StreamFn};
use parley_core::tool::{Tool, ToolSet};
use parley_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::parser::{parse_step, Step};
use crate::prompt::ReactPrompt;

pub const DEFAULT_MAX_STEPS: usize = 5;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model produced a final answer.
    FinalAnswer,
    /// The step budget ran out first. The answer is empty.
    BudgetExhausted,
}

/// The result of a ReAct execution.
#[derive(Debug, Clone)]
pub struct ReactResult {
    pub answer: String,
    /// Every parsed step, in order, including the one with the final answer.
    pub steps: Vec<Step>,
    /// Number of model calls made.
    pub iterations: usize,
    pub termination: Termination,
}

/// A model, its tools, and a step budget. Immutable for the run.
pub struct ReactAgent {
    model: Arc<dyn LanguageModel>,
    tools: ToolSet,
    max_steps: usize,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn LanguageModel>, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        Self {
            model,
            tools: ToolSet::new(tools),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the step budget. Values below 1 are raised to 1.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run the loop for `query`.
    ///
    /// `on_step` receives each step's raw model text. If it fails, the run
    /// stops with [`Error::Delivery`].
    pub async fn run(
        &self,
        query: &str,
        history: &[Message],
        on_step: Option<&StreamFn<'_>>,
    ) -> Result<ReactResult> {
        let chat_history = render_history(history);
        let tool_detail = self.tools.describe();
        let tool_names = self.tools.names();

        let mut scratchpad = String::new();
        let mut steps = Vec::with_capacity(self.max_steps);

        info!(
            model = %self.model.model_id(),
            max_steps = self.max_steps,
            tools = self.tools.len(),
            "Starting ReAct run"
        );

        for current_step in 1..=self.max_steps {
            let prompt = ReactPrompt {
                max_steps: self.max_steps,
                current_step,
                current_time: Utc::now(),
                tool_detail: &tool_detail,
                tool_names: &tool_names,
                chat_history: &chat_history,
                scratchpad: &scratchpad,
                question: query,
            }
            .to_string();

            let raw = self
                .model
                .generate(&prompt, None)
                .await
                .map_err(|e| Error::Planning {
                    step: current_step,
                    source: Box::new(e),
                })?;

            if let Some(forward) = on_step {
                forward(&format!("{raw}\n\n"))?;
            }

            let mut step = parse_step(&raw);
            debug!(
                step = current_step,
                thought = %step.thought,
                action = %step.action,
                "Parsed step"
            );

            if step.has_final_answer() {
                let answer = step.final_answer.clone();
                steps.push(step);
                info!(step = current_step, "Final answer reached");
                return Ok(ReactResult {
                    answer,
                    steps,
                    iterations: current_step,
                    termination: Termination::FinalAnswer,
                });
            }

            if step.has_action() {
                step.observation = match self.tools.execute(&step.action, &step.action_input).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(
                            step = current_step,
                            action = %step.action,
                            error = %e,
                            "Tool failed, recording as observation"
                        );
                        e.to_string()
                    }
                };
            }

            scratchpad.push_str(&step.to_string());
            steps.push(step);
        }

        warn!(max_steps = self.max_steps, "Step budget exhausted without a final answer");
        Ok(ReactResult {
            answer: String::new(),
            iterations: steps.len(),
            steps,
            termination: Termination::BudgetExhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, FailingTool, ScriptedModel};
    use parley_core::error::{DeliveryError, ProviderError};
    use std::sync::Mutex;

    fn agent(model: Arc<ScriptedModel>, tools: Vec<Arc<dyn Tool>>, max: usize) -> ReactAgent {
        ReactAgent::new(model, tools).with_max_steps(max)
    }

    #[tokio::test]
    async fn final_answer_on_first_step() {
        let model = Arc::new(ScriptedModel::replies(&["Thought: easy\nFinal Answer: 4"]));
        let result = agent(model.clone(), vec![], 5).run("2+2?", &[], None).await.unwrap();

        assert_eq!(result.answer, "4");
        assert_eq!(result.iterations, 1);
        assert_eq!(result.termination, Termination::FinalAnswer);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_observation_feeds_next_prompt() {
        let echo = Arc::new(EchoTool::default());
        let model = Arc::new(ScriptedModel::replies(&[
            "Thought: ask the tool\nAction: echo\nAction Input: ping",
            "Thought: got it\nFinal Answer: pong",
        ]));

        let result = agent(model.clone(), vec![echo.clone() as Arc<dyn Tool>], 5)
            .run("ping?", &[], None)
            .await
            .unwrap();

        assert_eq!(result.answer, "pong");
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].observation, "echo: ping");
        assert_eq!(*echo.calls.lock().unwrap(), vec!["ping"]);

        let prompts = model.prompts();
        assert!(prompts[1].contains("Observation: echo: ping"));
        assert!(prompts[1].contains("Current Step: 2"));
    }

    #[tokio::test]
    async fn never_exceeds_step_budget() {
        let model = Arc::new(ScriptedModel::repeating("Thought: still thinking", 10));
        let result = agent(model.clone(), vec![], 4).run("q", &[], None).await.unwrap();

        assert_eq!(model.call_count(), 4);
        assert_eq!(result.iterations, 4);
        assert_eq!(result.termination, Termination::BudgetExhausted);
    }

    #[tokio::test]
    async fn budget_of_one_without_final_answer() {
        let model = Arc::new(ScriptedModel::replies(&["Thought: hmm"]));
        let result = agent(model.clone(), vec![], 1).run("q", &[], None).await.unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.answer, "");
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_observed_and_loop_continues() {
        let model = Arc::new(ScriptedModel::replies(&[
            "Thought: try it\nAction: Calculator\nAction Input: 2+2",
            "Thought: no calculator\nFinal Answer: 4",
        ]));

        let result = agent(model, vec![Arc::new(EchoTool::default()) as Arc<dyn Tool>], 5)
            .run("2+2?", &[], None)
            .await
            .unwrap();

        assert_eq!(result.steps.len(), 2);
        assert!(result.steps[0].observation.contains("Calculator"));
        assert_eq!(result.steps[0].observation, "tool not found: Calculator");
        assert_eq!(result.answer, "4");
    }

    #[tokio::test]
    async fn failing_tool_every_step_exhausts_budget() {
        let search = Arc::new(FailingTool {
            name: "Search",
            reason: "service unavailable",
        });
        let expected = search.error().to_string();
        let model = Arc::new(ScriptedModel::repeating(
            "Thought: search\nAction: Search\nAction Input: weather",
            3,
        ));

        let result = agent(model, vec![search as Arc<dyn Tool>], 3).run("weather?", &[], None).await.unwrap();

        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.termination, Termination::BudgetExhausted);
        for step in &result.steps {
            assert_eq!(step.observation, expected);
        }
    }

    #[tokio::test]
    async fn model_failure_is_planning_error() {
        let model = Arc::new(ScriptedModel::failing("connection reset"));
        let err = agent(model, vec![], 3).run("q", &[], None).await.unwrap_err();

        match err {
            Error::Planning { step, source } => {
                assert_eq!(step, 1);
                assert!(matches!(*source, Error::Provider(ProviderError::Network(_))));
            }
            other => panic!("expected planning error, got {other}"),
        }
    }

    #[tokio::test]
    async fn each_step_is_emitted_with_trailing_break() {
        let seen = Mutex::new(Vec::new());
        let forward = |chunk: &str| -> std::result::Result<(), DeliveryError> {
            seen.lock().unwrap().push(chunk.to_string());
            Ok(())
        };

        let model = Arc::new(ScriptedModel::replies(&[
            "Thought: one",
            "Thought: two\nFinal Answer: done",
        ]));
        agent(model, vec![], 5).run("q", &[], Some(&forward)).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Thought: one\n\n", "Thought: two\nFinal Answer: done\n\n"]
        );
    }

    #[tokio::test]
    async fn delivery_failure_stops_the_run() {
        let forward = |_: &str| -> std::result::Result<(), DeliveryError> { Err(DeliveryError::Closed) };
        let model = Arc::new(ScriptedModel::repeating("Thought: working", 5));

        let err = agent(model.clone(), vec![], 5)
            .run("q", &[], Some(&forward))
            .await
            .unwrap_err();

        assert!(err.is_delivery_failure());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn history_and_tools_appear_in_prompt() {
        let model = Arc::new(ScriptedModel::replies(&["Final Answer: ok"]));
        let history = vec![Message::user("earlier question"), Message::assistant("earlier answer")];

        agent(model.clone(), vec![Arc::new(EchoTool::default()) as Arc<dyn Tool>], 2)
            .run("now?", &history, None)
            .await
            .unwrap();

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("user: earlier question\nassistant: earlier answer"));
        assert!(prompt.contains("Echo: Repeats the input"));
        assert!(prompt.contains("Question: now?"));
    }

    #[test]
    fn zero_budget_is_raised_to_one() {
        let model = Arc::new(ScriptedModel::replies(&[]));
        assert_eq!(agent(model, vec![], 0).max_steps(), 1);
    }
}
