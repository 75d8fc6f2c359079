//! Tool-orchestration agent for human rights questions.
//!
//! The [`Agent`] runs a bounded decide / invoke / observe loop over a
//! closed set of tools ([`ToolName`]), then picks the authoritative answer
//! from the trace. Every collaborator (retriever, generation client,
//! prompts, decider) is constructed by the caller and injected.

pub mod decision;
pub mod history;
pub mod orchestrator;
pub mod publish;
pub mod react;
pub mod rules;
pub mod selection;
pub mod tools;
pub mod trace;

// Re-export main types
pub use decision::{parse_decision, Decider, Decision, ParseFailure, RawDecision};
pub use history::{render_history, ChatHistory, ChatMessage, Role};
pub use orchestrator::{Agent, AgentOutput, AgentRun, DEFAULT_MAX_STEPS, QUERY_REQUIRED};
pub use publish::{split_segments, NotionPublisher, Report, ReportPublisher};
pub use react::ReactDecider;
pub use rules::{Intent, RuleDecider};
pub use selection::{select, NO_RESPONSE};
pub use tools::{
    ContextPayload, ToolCall, ToolError, ToolErrorKind, ToolName, ToolOptions, ToolRegistry,
    NO_RELEVANT_DOCUMENTS,
};
pub use trace::{Action, LoopState, ToolFailure, ToolInvocation, Trace};

use rights_core::{AppError, AppResult};
use rights_llm::LlmClient;
use rights_prompt::PromptSet;
use std::sync::Arc;

/// Build the decider named by `planner` ("rules" or "react").
pub fn create_decider(
    planner: &str,
    generator: Arc<dyn LlmClient>,
    prompts: PromptSet,
    model: &str,
) -> AppResult<Box<dyn Decider>> {
    match planner.to_lowercase().as_str() {
        "rules" => Ok(Box::new(RuleDecider::new())),
        "react" => Ok(Box::new(ReactDecider::new(generator, prompts, model))),
        other => Err(AppError::Config(format!(
            "Unknown planner '{}'. Supported planners: rules, react",
            other
        ))),
    }
}
