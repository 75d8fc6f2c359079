//! Model-driven decider using the ReAct reasoning prompt.

use crate::decision::{Decider, RawDecision};
use crate::tools::ToolName;
use crate::trace::LoopState;
use async_trait::async_trait;
use rights_core::{AppError, AppResult};
use rights_llm::{LlmClient, LlmRequest};
use rights_prompt::builtin::AGENT_REACT;
use rights_prompt::PromptSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Generation stops before the model invents its own observation.
const OBSERVATION_STOP: &str = "\nObservation:";

/// Asks the generation capability for the next `Action` or `Final Answer`.
pub struct ReactDecider {
    generator: Arc<dyn LlmClient>,
    prompts: PromptSet,
    model: String,
}

impl ReactDecider {
    pub fn new(generator: Arc<dyn LlmClient>, prompts: PromptSet, model: impl Into<String>) -> Self {
        Self {
            generator,
            prompts,
            model: model.into(),
        }
    }

    /// Render the reasoning prompt for the current state.
    pub fn build_request(&self, state: &LoopState) -> AppResult<LlmRequest> {
        let tools = ToolName::ALL
            .iter()
            .map(|t| format!("{}: {}", t.as_str(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = ToolName::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut variables = HashMap::new();
        variables.insert("tools".to_string(), tools);
        variables.insert("tool_names".to_string(), tool_names);
        variables.insert("input".to_string(), state.query.clone());
        variables.insert("scratchpad".to_string(), state.trace.render_scratchpad());
        variables.insert(
            "history".to_string(),
            state.history.clone().unwrap_or_default(),
        );

        let built = self.prompts.render(AGENT_REACT, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(built.temperature.unwrap_or(0.0))
            .with_stop(OBSERVATION_STOP);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }
}

#[async_trait]
impl Decider for ReactDecider {
    fn name(&self) -> &str {
        "react"
    }

    async fn decide(&self, state: &LoopState) -> AppResult<RawDecision> {
        let request = self.build_request(state)?;
        let response = self.generator.complete(&request).await.map_err(|e| match e {
            AppError::Llm(_) => e,
            other => AppError::Llm(other.to_string()),
        })?;

        debug!("Reasoning step {} produced {} chars", state.step, response.content.len());
        Ok(RawDecision::Text(response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::ToolInvocation;
    use rights_llm::LlmResponse;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingLlm {
        requests: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmClient for CapturingLlm {
        fn provider_name(&self) -> &str {
            "capturing"
        }
        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(LlmResponse {
                content: "Final Answer: done".to_string(),
                model: request.model.clone(),
                usage: Default::default(),
            })
        }
    }

    struct OfflineLlm;

    #[async_trait]
    impl LlmClient for OfflineLlm {
        fn provider_name(&self) -> &str {
            "offline"
        }
        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            Err(AppError::Llm("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_tools_query_and_scratchpad() {
        let llm = Arc::new(CapturingLlm::default());
        let decider = ReactDecider::new(llm.clone(), PromptSet::builtin(), "llama3:8b");

        let mut state = LoopState::new("detailed report on Syria", Some("user: hello".to_string()));
        state.record(ToolInvocation::success(
            ToolName::RetrieveAndCite,
            "Syria",
            "Source [a.pdf]: text",
        ));

        let decision = decider.decide(&state).await.unwrap();
        assert_eq!(decision, RawDecision::Text("Final Answer: done".to_string()));

        let requests = llm.requests.lock().unwrap();
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("Question: detailed report on Syria"));
        assert!(prompt.contains("retrieve-and-cite, summarize-with-context"));
        assert!(prompt.contains("Observation: Source [a.pdf]: text"));
        assert!(prompt.contains("Previous conversation:\nuser: hello"));
        assert_eq!(requests[0].stop, vec![OBSERVATION_STOP.to_string()]);
        assert_eq!(requests[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_prompt_omits_empty_history() {
        let llm = Arc::new(CapturingLlm::default());
        let decider = ReactDecider::new(llm.clone(), PromptSet::builtin(), "llama3:8b");
        decider.decide(&LoopState::new("q", None)).await.unwrap();
        assert!(!llm.requests.lock().unwrap()[0]
            .prompt
            .contains("Previous conversation"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_llm_error() {
        let decider = ReactDecider::new(Arc::new(OfflineLlm), PromptSet::builtin(), "llama3:8b");
        let err = decider.decide(&LoopState::new("q", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
