//! Prompt builders.
//!
//! [`ReactPrompt`] renders the per-step ReAct instructions; [`chat_prompt`]
//! is the single-shot prompt used in normal mode.

use chrono::{DateTime, Utc};
use parley_core::message::{render_history, Message};
use std::fmt;

/// Everything the ReAct template needs for one step.
#[derive(Debug, Clone)]
pub struct ReactPrompt<'a> {
    pub max_steps: usize,
    /// 1-based.
    pub current_step: usize,
    pub current_time: DateTime<Utc>,
    /// `name: description` blocks.
    pub tool_detail: &'a str,
    /// Comma-separated tool names.
    pub tool_names: &'a str,
    /// `role: content` lines.
    pub chat_history: &'a str,
    /// Rendered prior steps of this run.
    pub scratchpad: &'a str,
    pub question: &'a str,
}

impl fmt::Display for ReactPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "You are an AI agent that solves problems step by step.")?;
        writeln!(
            f,
            "You may take at most {} steps. If you run out of steps without a solution, give the best answer you have so far.",
            self.max_steps
        )?;
        writeln!(f)?;
        writeln!(f, "Current Time: {}", self.current_time.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Current Step: {}", self.current_step)?;
        writeln!(f, "Steps Remaining: {}", self.max_steps.saturating_sub(self.current_step))?;
        writeln!(f)?;
        writeln!(f, "You have access to the following tools:")?;
        writeln!(f, "{}", self.tool_detail)?;
        writeln!(f, "Chat History:")?;
        writeln!(f, "{}", self.chat_history)?;
        writeln!(f, "Agent Scratchpad:")?;
        writeln!(f, "{}", self.scratchpad)?;
        writeln!(
            f,
            "Decide the next step from the Agent Scratchpad. Answer in exactly one of these formats."
        )?;
        writeln!(f)?;
        writeln!(f, "1. To think without acting:")?;
        writeln!(f)?;
        writeln!(f, "Thought: your current reasoning.")?;
        writeln!(f)?;
        writeln!(f, "2. To use a tool:")?;
        writeln!(f)?;
        writeln!(f, "Thought: why you need the tool.")?;
        writeln!(f, "Action: the tool to use, one of [{}].", self.tool_names)?;
        writeln!(f, "Action Input: the input for the tool.")?;
        writeln!(f)?;
        writeln!(f, "If a tool call fails, do not call that tool again.")?;
        writeln!(f)?;
        writeln!(f, "3. When you know the answer:")?;
        writeln!(f)?;
        writeln!(f, "Thought: how you reached the answer.")?;
        writeln!(f, "Final Answer: the answer to the original question.")?;
        writeln!(f)?;
        writeln!(f, "Begin!")?;
        writeln!(f)?;
        write!(f, "Question: {}", self.question)
    }
}

/// Prompt for a normal-mode request: prior turns, then the query.
pub fn chat_prompt(history: &[Message], query: &str) -> String {
    format!("Chat History:\n{}User Query:\n{}", render_history(history), query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt<'a>(scratchpad: &'a str) -> ReactPrompt<'a> {
        ReactPrompt {
            max_steps: 5,
            current_step: 2,
            current_time: Utc::now(),
            tool_detail: "Search: Looks things up\n\n",
            tool_names: "Search",
            chat_history: "user: hi\nassistant: hello\n",
            scratchpad,
            question: "Who wrote Dune?",
        }
    }

    #[test]
    fn react_prompt_contains_every_section() {
        let text = prompt("Thought: look it up\nAction: Search\n\n").to_string();
        assert!(text.contains("at most 5 steps"));
        assert!(text.contains("Current Step: 2"));
        assert!(text.contains("Steps Remaining: 3"));
        assert!(text.contains("Search: Looks things up"));
        assert!(text.contains("one of [Search]"));
        assert!(text.contains("Chat History:\nuser: hi\nassistant: hello\n"));
        assert!(text.contains("Agent Scratchpad:\nThought: look it up"));
        assert!(text.ends_with("Question: Who wrote Dune?"));
    }

    #[test]
    fn chat_prompt_with_empty_history() {
        assert_eq!(chat_prompt(&[], "2+2?"), "Chat History:\nUser Query:\n2+2?");
    }

    #[test]
    fn chat_prompt_includes_prior_turns() {
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let text = chat_prompt(&history, "2+2?");
        assert_eq!(text, "Chat History:\nuser: hi\nassistant: hello\nUser Query:\n2+2?");
    }
}
