//! Output parser for ReAct-formatted model text.
//!
//! A response is a sequence of labeled fields:
//!
//! ```text
//! Thought: I should look this up.
//! Action: Exa Search API
//! Action Input: population of Lisbon 2024
//! ```
//!
//! Each field starts at its marker and runs to the next marker or the end
//! of the text. The scanner finds every marker occurrence, orders them by
//! position, and slices the bodies in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One plan/act/observe iteration. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
    pub final_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Thought,
    Action,
    ActionInput,
    Observation,
    FinalAnswer,
}

const MARKERS: [(&str, Field); 5] = [
    ("Thought:", Field::Thought),
    ("Action:", Field::Action),
    ("Action Input:", Field::ActionInput),
    ("Observation:", Field::Observation),
    ("Final Answer:", Field::FinalAnswer),
];

impl Step {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Thought => &mut self.thought,
            Field::Action => &mut self.action,
            Field::ActionInput => &mut self.action_input,
            Field::Observation => &mut self.observation,
            Field::FinalAnswer => &mut self.final_answer,
        }
    }

    pub fn has_final_answer(&self) -> bool {
        !self.final_answer.is_empty()
    }

    pub fn has_action(&self) -> bool {
        !self.action.is_empty()
    }
}

/// Parse one model response into a [`Step`]. Never fails: text without any
/// marker yields an empty step.
///
/// When a marker appears more than once, its first occurrence wins.
pub fn parse_step(text: &str) -> Step {
    let mut hits: Vec<(usize, usize, Field)> = MARKERS
        .iter()
        .flat_map(|&(marker, field)| {
            text.match_indices(marker)
                .map(move |(pos, m)| (pos, pos + m.len(), field))
        })
        .collect();
    hits.sort_by_key(|&(start, _, _)| start);

    let mut step = Step::default();
    let mut seen = [false; MARKERS.len()];

    for (i, &(_, body_start, field)) in hits.iter().enumerate() {
        let idx = field as usize;
        if seen[idx] {
            continue;
        }
        seen[idx] = true;

        let body_end = hits.get(i + 1).map_or(text.len(), |&(next, _, _)| next);
        *step.slot(field) = text[body_start..body_end].trim().to_string();
    }

    step
}

/// Renders the step in the same labeled format the parser reads.
///
/// `Thought` is always written; the other fields only when non-empty.
impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Thought: {}", self.thought)?;
        if !self.action.is_empty() {
            writeln!(f, "Action: {}", self.action)?;
        }
        if !self.action_input.is_empty() {
            writeln!(f, "Action Input: {}", self.action_input)?;
        }
        if !self.observation.is_empty() {
            writeln!(f, "Observation: {}", self.observation)?;
        }
        if !self.final_answer.is_empty() {
            writeln!(f, "Final Answer: {}", self.final_answer)?;
        }
        writeln!(f)
    }
}
