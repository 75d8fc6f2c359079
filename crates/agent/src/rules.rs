//! Deterministic rule-table decider.

use crate::decision::{Decider, Decision, RawDecision};
use crate::tools::{ContextPayload, ToolCall, ToolErrorKind, ToolName, NO_RELEVANT_DOCUMENTS};
use crate::trace::LoopState;
use async_trait::async_trait;
use rights_core::{AppError, AppResult};
use tracing::debug;

const SUMMARY_KEYWORDS: &[&str] = &["summary", "summarize", "summarise", "overview", "brief", "quick"];

const SOURCING_KEYWORDS: &[&str] = &[
    "report", "detailed", "full", "source", "sources", "evidence", "cite", "citation", "citations",
];

/// What the query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Quick or plain summary, no sourcing requested.
    QuickSummary,
    /// Report, sourced answer, or anything ambiguous.
    Report,
}

impl Intent {
    pub fn classify(query: &str) -> Self {
        let lower = query.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

        if has_any(SUMMARY_KEYWORDS) && !has_any(SOURCING_KEYWORDS) {
            Self::QuickSummary
        } else {
            Self::Report
        }
    }
}

/// Chooses tools from the query intent and the last observation.
///
/// Report path: retrieve-and-cite, then summarize-with-context on the
/// retrieved context, or generate-from-general-knowledge when retrieval
/// failed or found nothing. Quick path: summarize-without-context only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleDecider;

impl RuleDecider {
    pub fn new() -> Self {
        Self
    }

    pub fn next(&self, state: &LoopState) -> AppResult<Decision> {
        let query = state.query.trim().to_string();

        let Some(last) = state.trace.last_tool_invocation() else {
            let intent = Intent::classify(&query);
            debug!("Classified query intent as {:?}", intent);
            return Ok(Decision::Invoke(match intent {
                Intent::QuickSummary => ToolCall::SummarizeWithoutContext { query },
                Intent::Report => ToolCall::RetrieveAndCite { query },
            }));
        };

        let tool = last.tool().unwrap_or(ToolName::RetrieveAndCite);
        let failure = last.error.as_ref();

        if let Some(f) = failure.filter(|f| f.kind == ToolErrorKind::Generation) {
            return Err(AppError::Llm(f.message.clone()));
        }

        match (tool, failure) {
            (ToolName::RetrieveAndCite, None) if last.output != NO_RELEVANT_DOCUMENTS => Ok(
                Decision::Invoke(ToolCall::SummarizeWithContext(ContextPayload::new(
                    query,
                    last.output.clone(),
                ))),
            ),
            (ToolName::RetrieveAndCite, None) => {
                debug!("No relevant documents, falling back to general knowledge");
                Ok(Decision::Invoke(ToolCall::GenerateFromGeneralKnowledge { query }))
            }
            (ToolName::RetrieveAndCite, Some(f)) if f.kind == ToolErrorKind::Retrieval => {
                debug!("Retrieval failed, falling back to general knowledge");
                Ok(Decision::Invoke(ToolCall::GenerateFromGeneralKnowledge { query }))
            }
            (ToolName::SummarizeWithContext, Some(f)) if f.kind == ToolErrorKind::MalformedInput => {
                // Rebuild the payload from the query and the last retrieved context.
                match state.trace.last_success_of(ToolName::RetrieveAndCite) {
                    Some(retrieved) if retrieved.output != NO_RELEVANT_DOCUMENTS => {
                        Ok(Decision::Invoke(ToolCall::SummarizeWithContext(
                            ContextPayload::new(query, retrieved.output.clone()),
                        )))
                    }
                    _ => Ok(Decision::Invoke(ToolCall::RetrieveAndCite { query })),
                }
            }
            (_, None) => Ok(Decision::Finish(last.output.clone())),
            (_, Some(f)) => Err(AppError::Agent(f.message.clone())),
        }
    }
}

#[async_trait]
impl Decider for RuleDecider {
    fn name(&self) -> &str {
        "rules"
    }

    async fn decide(&self, state: &LoopState) -> AppResult<RawDecision> {
        self.next(state).map(RawDecision::Typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use crate::trace::ToolInvocation;
    use rights_knowledge::RetrievalError;

    fn state_with(query: &str, invocations: Vec<ToolInvocation>) -> LoopState {
        let mut state = LoopState::new(query, None);
        for invocation in invocations {
            state.record(invocation);
        }
        state
    }

    #[test]
    fn test_intent_classification() {
        assert_eq!(Intent::classify("summarize human rights in Iran"), Intent::QuickSummary);
        assert_eq!(Intent::classify("Give me a quick overview of Chad"), Intent::QuickSummary);
        assert_eq!(Intent::classify("detailed report on Syria"), Intent::Report);
        assert_eq!(Intent::classify("write a report on Syria"), Intent::Report);
        assert_eq!(Intent::classify("summarize Syria with sources"), Intent::Report);
        assert_eq!(Intent::classify("what evidence exists of torture in Eritrea"), Intent::Report);
        assert_eq!(Intent::classify("human rights in Cuba"), Intent::Report);
        // Substrings do not count as keywords.
        assert_eq!(Intent::classify("summarize the briefing on reporters"), Intent::QuickSummary);
    }

    #[test]
    fn test_first_step_by_intent() {
        let decider = RuleDecider::new();
        assert_eq!(
            decider.next(&state_with("summarize human rights in Iran", vec![])).unwrap(),
            Decision::Invoke(ToolCall::SummarizeWithoutContext {
                query: "summarize human rights in Iran".to_string()
            })
        );
        assert_eq!(
            decider.next(&state_with("detailed report on Syria", vec![])).unwrap(),
            Decision::Invoke(ToolCall::RetrieveAndCite {
                query: "detailed report on Syria".to_string()
            })
        );
    }

    #[test]
    fn test_retrieved_context_feeds_summary() {
        let state = state_with(
            "detailed report on Syria",
            vec![ToolInvocation::success(
                ToolName::RetrieveAndCite,
                "detailed report on Syria",
                "Source [a.pdf]: text",
            )],
        );
        assert_eq!(
            RuleDecider::new().next(&state).unwrap(),
            Decision::Invoke(ToolCall::SummarizeWithContext(ContextPayload::new(
                "detailed report on Syria",
                "Source [a.pdf]: text"
            )))
        );
    }

    #[test]
    fn test_fallback_on_sentinel_and_retrieval_error() {
        let expected = Decision::Invoke(ToolCall::GenerateFromGeneralKnowledge {
            query: "report on Chad".to_string(),
        });

        let empty = state_with(
            "report on Chad",
            vec![ToolInvocation::success(
                ToolName::RetrieveAndCite,
                "report on Chad",
                NO_RELEVANT_DOCUMENTS,
            )],
        );
        assert_eq!(RuleDecider::new().next(&empty).unwrap(), expected);

        let err = ToolError::Retrieval(RetrievalError::Index("disk I/O error".to_string()));
        let failed = state_with(
            "report on Chad",
            vec![ToolInvocation::failure(ToolName::RetrieveAndCite, "report on Chad", &err)],
        );
        assert_eq!(RuleDecider::new().next(&failed).unwrap(), expected);
    }

    #[test]
    fn test_malformed_input_is_retried_with_context() {
        let state = state_with(
            "report on Syria",
            vec![
                ToolInvocation::success(ToolName::RetrieveAndCite, "report on Syria", "Source [a]: x"),
                ToolInvocation::failure(
                    ToolName::SummarizeWithContext,
                    "{}",
                    &ToolError::MalformedInput("missing required key 'query'".to_string()),
                ),
            ],
        );
        assert_eq!(
            RuleDecider::new().next(&state).unwrap(),
            Decision::Invoke(ToolCall::SummarizeWithContext(ContextPayload::new(
                "report on Syria",
                "Source [a]: x"
            )))
        );
    }

    #[test]
    fn test_producer_success_finishes() {
        let state = state_with(
            "summarize Iran",
            vec![ToolInvocation::success(
                ToolName::SummarizeWithoutContext,
                "summarize Iran",
                "# Iran\n- point",
            )],
        );
        assert_eq!(
            RuleDecider::new().next(&state).unwrap(),
            Decision::Finish("# Iran\n- point".to_string())
        );
    }

    #[test]
    fn test_generation_failure_is_fatal() {
        let state = state_with(
            "report on Syria",
            vec![ToolInvocation::failure(
                ToolName::GenerateFromGeneralKnowledge,
                "report on Syria",
                &ToolError::Generation("connection refused".to_string()),
            )],
        );
        let err = RuleDecider::new().next(&state).unwrap_err();
        assert_eq!(err.to_string(), "LLM error: connection refused");
    }

    #[test]
    fn test_format_corrections_are_skipped() {
        let state = state_with(
            "report on Syria",
            vec![ToolInvocation::invalid_format("???", "Invalid Format: retry")],
        );
        assert_eq!(
            RuleDecider::new().next(&state).unwrap(),
            Decision::Invoke(ToolCall::RetrieveAndCite {
                query: "report on Syria".to_string()
            })
        );
    }
}
