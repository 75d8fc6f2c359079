//! Loop state: the trace of tool invocations and the terminal answer.

use crate::tools::{ToolError, ToolErrorKind, ToolName};
use serde::Serialize;
use std::fmt;

/// What a trace step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "tool")]
pub enum Action {
    Tool(ToolName),
    /// The decision output could not be parsed.
    InvalidFormat,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool(tool) => write!(f, "{}", tool),
            Self::InvalidFormat => f.write_str("invalid-format"),
        }
    }
}

/// Error recorded on an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl From<&ToolError> for ToolFailure {
    fn from(err: &ToolError) -> Self {
        Self {
            kind: err.kind(),
            message: err.detail(),
        }
    }
}

/// One loop step. Read-only once appended to the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub action: Action,
    pub input: String,
    /// Observation text; for failures, the rendered error.
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolInvocation {
    pub fn success(tool: ToolName, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            action: Action::Tool(tool),
            input: input.into(),
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(tool: ToolName, input: impl Into<String>, err: &ToolError) -> Self {
        Self {
            action: Action::Tool(tool),
            input: input.into(),
            output: format!("Error: {}", err),
            error: Some(err.into()),
        }
    }

    /// Synthetic step recording unparseable decision output and the
    /// correction fed back to the next decision.
    pub fn invalid_format(raw: impl Into<String>, correction: impl Into<String>) -> Self {
        Self {
            action: Action::InvalidFormat,
            input: raw.into(),
            output: correction.into(),
            error: None,
        }
    }

    pub fn tool(&self) -> Option<ToolName> {
        match self.action {
            Action::Tool(tool) => Some(tool),
            Action::InvalidFormat => None,
        }
    }

    /// True for a tool step that completed without error.
    pub fn succeeded(&self) -> bool {
        self.tool().is_some() && self.error.is_none()
    }
}

/// Ordered history of one run's invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    invocations: Vec<ToolInvocation>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, invocation: ToolInvocation) {
        self.invocations.push(invocation);
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ToolInvocation> {
        self.invocations.iter()
    }

    pub fn last(&self) -> Option<&ToolInvocation> {
        self.invocations.last()
    }

    /// Most recent step that ran a tool, skipping format corrections.
    pub fn last_tool_invocation(&self) -> Option<&ToolInvocation> {
        self.invocations.iter().rev().find(|i| i.tool().is_some())
    }

    /// Most recent successful output of `tool`.
    pub fn last_success_of(&self, tool: ToolName) -> Option<&ToolInvocation> {
        self.invocations
            .iter()
            .rev()
            .find(|i| i.succeeded() && i.tool() == Some(tool))
    }

    pub fn tools(&self) -> Vec<Action> {
        self.invocations.iter().map(|i| i.action).collect()
    }

    /// Serialize the trace for the reasoning prompt as
    /// `Action / Action Input / Observation` triples.
    pub fn render_scratchpad(&self) -> String {
        let mut scratchpad = String::new();
        for invocation in &self.invocations {
            scratchpad.push_str(&format!(
                "Action: {}\nAction Input: {}\nObservation: {}\nThought: ",
                invocation.action, invocation.input, invocation.output
            ));
        }
        scratchpad
    }
}

/// State of one agent run. Owned and mutated by the loop only.
#[derive(Debug, Clone, Serialize)]
pub struct LoopState {
    pub query: String,
    /// Prior conversation, rendered, when a session is wired in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    pub trace: Trace,
    pub step: usize,
    pub terminal: bool,
    pub final_answer: Option<String>,
    /// Set when the loop stopped on the step budget.
    pub exhausted: bool,
    /// Set when a fatal failure ended the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl LoopState {
    pub fn new(query: impl Into<String>, history: Option<String>) -> Self {
        Self {
            query: query.into(),
            history,
            trace: Trace::new(),
            step: 0,
            terminal: false,
            final_answer: None,
            exhausted: false,
            failure: None,
        }
    }

    /// Append an observation and advance the step counter.
    pub fn record(&mut self, invocation: ToolInvocation) {
        self.trace.push(invocation);
        self.step += 1;
    }

    pub fn finish(&mut self, answer: impl Into<String>) {
        self.final_answer = Some(answer.into());
        self.terminal = true;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.final_answer = Some(message.clone());
        self.failure = Some(message);
        self.terminal = true;
    }
}
