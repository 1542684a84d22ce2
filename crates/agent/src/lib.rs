//! The reasoning side of parley.
//!
//! - [`parser`] reads ReAct-formatted model output into a [`Step`]
//! - [`prompt`] renders the ReAct and normal-mode prompts
//! - [`react`] runs the bounded Thought → Action → Observation loop
//! - [`orchestrator`] picks the mode for a job and records the exchange
//!
//! [`ChatOrchestrator`] is the [`parley_core::ChatHandler`] the worker pool
//! runs for every job.

pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod react;

#[cfg(test)]
mod test_helpers;

pub use orchestrator::ChatOrchestrator;
pub use parser::{parse_step, Step};
pub use prompt::{chat_prompt, ReactPrompt};
pub use react::{ReactAgent, ReactResult, Termination, DEFAULT_MAX_STEPS};
