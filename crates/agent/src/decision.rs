//! Decisions: the typed output of each deciding step.

use crate::tools::{ToolCall, ToolName};
use crate::trace::LoopState;
use async_trait::async_trait;
use regex::Regex;
use rights_core::AppResult;
use std::sync::OnceLock;
use thiserror::Error;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// The next move of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Invoke(ToolCall),
    Finish(String),
}

/// What a decider produced: an already typed decision, or model text
/// that still has to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDecision {
    Typed(Decision),
    Text(String),
}

/// Decision text that does not fit the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("empty output")]
    Empty,

    #[error("output contains both an action and a final answer")]
    Ambiguous,

    #[error("no 'Action:' or 'Final Answer:' found")]
    MissingAction,

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("missing 'Action Input:' for tool '{0}'")]
    MissingInput(String),
}

impl ParseFailure {
    /// Observation fed back to the next deciding step.
    pub fn correction(&self) -> String {
        let names: Vec<&str> = ToolName::ALL.iter().map(|t| t.as_str()).collect();
        format!(
            "Invalid Format: {}. Reply with 'Action:' naming one of [{}] followed by an \
             'Action Input:' line, or with a single 'Final Answer:' line.",
            self,
            names.join(", ")
        )
    }
}

fn action_pattern() -> &'static Regex {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    ACTION.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid action pattern")
    })
}

fn bare_action_pattern() -> &'static Regex {
    static BARE: OnceLock<Regex> = OnceLock::new();
    BARE.get_or_init(|| {
        Regex::new(r"(?m)^\s*Action\s*\d*\s*:[ \t]*(\S.*)$").expect("valid bare action pattern")
    })
}

/// Parse model output into a [`Decision`].
///
/// Accepts either an `Action:` / `Action Input:` pair or a
/// `Final Answer:` block, never both.
pub fn parse_decision(text: &str) -> Result<Decision, ParseFailure> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let final_at = text.find(FINAL_ANSWER_MARKER);

    if let Some(caps) = action_pattern().captures(text) {
        if final_at.is_some() {
            return Err(ParseFailure::Ambiguous);
        }

        let raw_name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let tool = ToolName::parse(raw_name)
            .ok_or_else(|| ParseFailure::UnknownTool(raw_name.to_string()))?;

        let input = caps
            .get(2)
            .map(|m| strip_quotes(m.as_str().trim()))
            .unwrap_or_default();
        if input.is_empty() {
            return Err(ParseFailure::MissingInput(tool.as_str().to_string()));
        }

        return Ok(Decision::Invoke(ToolCall::from_parts(tool, input)));
    }

    if let Some(at) = final_at {
        let answer = text[at + FINAL_ANSWER_MARKER.len()..].trim();
        if answer.is_empty() {
            return Err(ParseFailure::Empty);
        }
        return Ok(Decision::Finish(answer.to_string()));
    }

    match bare_action_pattern().captures(text).and_then(|c| c.get(1)) {
        Some(name) => {
            let name = name.as_str().trim();
            match ToolName::parse(name) {
                Some(tool) => Err(ParseFailure::MissingInput(tool.as_str().to_string())),
                None => Err(ParseFailure::UnknownTool(name.to_string())),
            }
        }
        None => Err(ParseFailure::MissingAction),
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// Chooses the next step from the loop state.
///
/// An `Err` is fatal to the run; parse problems are not errors here but
/// `RawDecision::Text` the loop fails to parse.
#[async_trait]
pub trait Decider: Send + Sync {
    fn name(&self) -> &str;

    async fn decide(&self, state: &LoopState) -> AppResult<RawDecision>;
}
