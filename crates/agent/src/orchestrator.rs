//! The orchestration loop.
//!
//! Each step asks the decider for a decision, runs the chosen tool and
//! records the observation. The loop ends on a final answer, a fatal
//! failure, or when the step budget is spent. `run` never returns an
//! error: failures are rendered into the output text.

use crate::decision::{parse_decision, Decider, Decision, RawDecision};
use crate::selection::select;
use crate::tools::{ToolCall, ToolRegistry};
use crate::trace::{LoopState, ToolInvocation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Rendered when the query is blank.
pub const QUERY_REQUIRED: &str = "Error: Query is required";

/// Default step budget.
pub const DEFAULT_MAX_STEPS: usize = 5;

/// The agent's answer, serialized as `{"output": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: String,
}

/// A finished run with its full loop state.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub output: String,
    pub state: LoopState,
}

impl From<AgentRun> for AgentOutput {
    fn from(run: AgentRun) -> Self {
        AgentOutput { output: run.output }
    }
}

pub struct Agent {
    registry: ToolRegistry,
    decider: Box<dyn Decider>,
    max_steps: usize,
}

impl Agent {
    pub fn new(registry: ToolRegistry, decider: Box<dyn Decider>, max_steps: usize) -> Self {
        Self {
            registry,
            decider,
            max_steps: max_steps.max(1),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Answer one query.
    pub async fn run(&self, query: &str) -> AgentOutput {
        self.run_traced(query, None).await.into()
    }

    /// Answer one query and keep the loop state. `history` is prior
    /// conversation, rendered, passed to the decider as opaque context.
    pub async fn run_traced(&self, query: &str, history: Option<String>) -> AgentRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("agent_run", %run_id, planner = self.decider.name());

        async move {
            let state = self.drive(query, history).await;
            let output = match &state.failure {
                Some(failure) => failure.clone(),
                None => select(&state),
            };

            info!(
                steps = state.step,
                exhausted = state.exhausted,
                failed = state.failure.is_some(),
                "Agent run finished"
            );

            AgentRun {
                run_id,
                output,
                state,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, query: &str, history: Option<String>) -> LoopState {
        let mut state = LoopState::new(query.trim(), history);

        if state.query.is_empty() {
            state.fail(QUERY_REQUIRED);
            return state;
        }

        info!("Starting agent run");

        while !state.terminal {
            if state.step >= self.max_steps {
                warn!("Step budget of {} exhausted", self.max_steps);
                let answer = best_observation(&state).unwrap_or_else(|| {
                    format!(
                        "Agent stopped after {} steps without reaching a final answer.",
                        self.max_steps
                    )
                });
                state.exhausted = true;
                state.finish(answer);
                break;
            }

            let raw = match self.decider.decide(&state).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Deciding step failed: {}", e);
                    state.fail(format!("Error: {}", e));
                    break;
                }
            };

            let (decision, raw_text) = match raw {
                RawDecision::Typed(decision) => (Ok(decision), None),
                RawDecision::Text(text) => (parse_decision(&text), Some(text)),
            };

            match decision {
                Ok(Decision::Finish(answer)) => {
                    debug!("Final answer after {} steps", state.step);
                    state.finish(answer);
                }
                Ok(Decision::Invoke(call)) => {
                    let invocation = self.invoke(&call).await;
                    state.record(invocation);
                }
                Err(failure) => {
                    warn!("Could not parse decision: {}", failure);
                    state.record(ToolInvocation::invalid_format(
                        raw_text.unwrap_or_default(),
                        failure.correction(),
                    ));
                }
            }
        }

        state
    }

    async fn invoke(&self, call: &ToolCall) -> ToolInvocation {
        let tool = call.name();
        let input = call.input_text();
        debug!("Invoking {}", tool);

        match self.registry.execute(call).await {
            Ok(output) => ToolInvocation::success(tool, input, output),
            Err(e) => {
                warn!("Tool {} failed: {}", tool, e);
                ToolInvocation::failure(tool, input, &e)
            }
        }
    }
}

/// Latest successful tool output, preferring detailed reports.
fn best_observation(state: &LoopState) -> Option<String> {
    let successes = || state.trace.iter().rev().filter(|i| i.succeeded());
    successes()
        .find(|i| i.tool().is_some_and(|t| t.is_detailed()))
        .or_else(|| successes().next())
        .map(|i| i.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolName;

    #[test]
    fn test_best_observation_prefers_detailed() {
        let mut state = LoopState::new("q", None);
        state.record(ToolInvocation::success(ToolName::GenerateFromGeneralKnowledge, "q", "report"));
        state.record(ToolInvocation::success(ToolName::RetrieveAndCite, "q", "context"));
        state.record(ToolInvocation::invalid_format("x", "y"));
        assert_eq!(best_observation(&state).as_deref(), Some("report"));
    }

    #[test]
    fn test_best_observation_falls_back_to_any_success() {
        let mut state = LoopState::new("q", None);
        state.record(ToolInvocation::success(ToolName::RetrieveAndCite, "q", "context"));
        state.record(ToolInvocation::invalid_format("x", "y"));
        assert_eq!(best_observation(&state).as_deref(), Some("context"));

        let empty = LoopState::new("q", None);
        assert_eq!(best_observation(&empty), None);
    }

    #[test]
    fn test_output_serializes_as_object() {
        let output = AgentOutput {
            output: "text".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"output":"text"}"#
        );
    }
}
