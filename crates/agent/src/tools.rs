//! The closed set of tools the agent can invoke, and their execution.

use rights_core::{AppConfig, AppError};
use rights_knowledge::{ContextFormatter, RetrievalError, Retriever};
use rights_llm::{LlmClient, LlmRequest};
use rights_prompt::builtin::{REPORT_GENERAL, REPORT_WITH_CONTEXT, SUMMARY_PLAIN};
use rights_prompt::{BuiltPrompt, PromptSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Observation returned by retrieve-and-cite when nothing passes the threshold.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found.";

/// Tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolName {
    RetrieveAndCite,
    SummarizeWithContext,
    SummarizeWithoutContext,
    GenerateFromGeneralKnowledge,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::RetrieveAndCite,
        ToolName::SummarizeWithContext,
        ToolName::SummarizeWithoutContext,
        ToolName::GenerateFromGeneralKnowledge,
    ];

    /// Parse a tool name. Case, surrounding quotes and backticks are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let name = s
            .trim()
            .trim_matches(|c| c == '`' || c == '"' || c == '\'')
            .to_lowercase()
            .replace('_', "-");
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrieveAndCite => "retrieve-and-cite",
            Self::SummarizeWithContext => "summarize-with-context",
            Self::SummarizeWithoutContext => "summarize-without-context",
            Self::GenerateFromGeneralKnowledge => "generate-from-general-knowledge",
        }
    }

    /// One-line description shown to the reasoning model.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RetrieveAndCite => {
                "Search the human rights document index and return matching passages, each tagged with its source."
            }
            Self::SummarizeWithContext => {
                "Write a report answering the query from retrieved context, citing the sources. Input is a JSON object with \"query\" and \"context\"."
            }
            Self::SummarizeWithoutContext => {
                "Write a short markdown summary of a human rights topic without searching documents."
            }
            Self::GenerateFromGeneralKnowledge => {
                "Write a long, structured markdown report from general knowledge. Use when no documents are relevant."
            }
        }
    }

    /// Tools whose output is a full report and wins output selection.
    pub fn is_detailed(&self) -> bool {
        matches!(
            self,
            Self::SummarizeWithContext | Self::GenerateFromGeneralKnowledge
        )
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of summarize-with-context. Both keys are required at execution
/// time; missing keys are a recoverable error, not a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl ContextPayload {
    pub fn new(query: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            context: Some(context.into()),
        }
    }

    /// Read a payload from free-form action input. Anything that is not a
    /// JSON object yields an empty payload.
    pub fn from_input(raw: &str) -> Self {
        serde_json::from_str(raw.trim()).unwrap_or_default()
    }
}

/// A typed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    RetrieveAndCite { query: String },
    SummarizeWithContext(ContextPayload),
    SummarizeWithoutContext { query: String },
    GenerateFromGeneralKnowledge { query: String },
}

impl ToolCall {
    /// Build a call from a tool name and its raw input text.
    pub fn from_parts(tool: ToolName, input: &str) -> Self {
        let query = input.trim().to_string();
        match tool {
            ToolName::RetrieveAndCite => Self::RetrieveAndCite { query },
            ToolName::SummarizeWithContext => {
                Self::SummarizeWithContext(ContextPayload::from_input(input))
            }
            ToolName::SummarizeWithoutContext => Self::SummarizeWithoutContext { query },
            ToolName::GenerateFromGeneralKnowledge => Self::GenerateFromGeneralKnowledge { query },
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::RetrieveAndCite { .. } => ToolName::RetrieveAndCite,
            Self::SummarizeWithContext(_) => ToolName::SummarizeWithContext,
            Self::SummarizeWithoutContext { .. } => ToolName::SummarizeWithoutContext,
            Self::GenerateFromGeneralKnowledge { .. } => ToolName::GenerateFromGeneralKnowledge,
        }
    }

    /// Input as it appears in the trace and the scratchpad.
    pub fn input_text(&self) -> String {
        match self {
            Self::RetrieveAndCite { query }
            | Self::SummarizeWithoutContext { query }
            | Self::GenerateFromGeneralKnowledge { query } => query.clone(),
            Self::SummarizeWithContext(payload) => {
                serde_json::to_string(payload).unwrap_or_default()
            }
        }
    }
}

/// Tool-level failures. All of them are recorded as observations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Query is required")]
    EmptyQuery,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Malformed tool input: {0}")]
    MalformedInput(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

/// Discriminant of [`ToolError`], kept in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    EmptyQuery,
    Retrieval,
    MalformedInput,
    Generation,
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::EmptyQuery => ToolErrorKind::EmptyQuery,
            Self::Retrieval(_) => ToolErrorKind::Retrieval,
            Self::MalformedInput(_) => ToolErrorKind::MalformedInput,
            Self::Generation(_) => ToolErrorKind::Generation,
        }
    }

    /// Error detail without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Generation(msg) | Self::MalformedInput(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Generation(msg) => AppError::Llm(msg),
            ToolError::Retrieval(e) => e.into(),
            other => AppError::Agent(other.to_string()),
        }
    }
}

/// Options shared by every tool call.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    pub model: String,
    pub temperature: f32,
    pub top_k: usize,
    pub score_threshold: f32,
    pub context_chars: usize,
}

impl ToolOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            top_k: config.retrieval.top_k,
            score_threshold: config.retrieval.score_threshold,
            context_chars: config.retrieval.context_chars,
        }
    }
}

/// Executes tool calls against injected retrieval and generation clients.
pub struct ToolRegistry {
    retriever: Retriever,
    generator: Arc<dyn LlmClient>,
    prompts: PromptSet,
    options: ToolOptions,
    formatter: ContextFormatter,
}

impl ToolRegistry {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn LlmClient>,
        prompts: PromptSet,
        options: ToolOptions,
    ) -> Self {
        let formatter = ContextFormatter::new(options.context_chars);
        Self {
            retriever,
            generator,
            prompts,
            options,
            formatter,
        }
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    /// Run one tool call and return its observation text.
    #[instrument(skip(self, call), fields(tool = %call.name()))]
    pub async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        match call {
            ToolCall::RetrieveAndCite { query } => self.retrieve_and_cite(query).await,
            ToolCall::SummarizeWithContext(payload) => {
                let query = required(&payload.query, "query")?;
                let context = required(&payload.context, "context")?;
                self.generate(REPORT_WITH_CONTEXT, query, Some(context)).await
            }
            ToolCall::SummarizeWithoutContext { query } => {
                self.generate(SUMMARY_PLAIN, non_blank(query)?, None).await
            }
            ToolCall::GenerateFromGeneralKnowledge { query } => {
                self.generate(REPORT_GENERAL, non_blank(query)?, None).await
            }
        }
    }

    async fn retrieve_and_cite(&self, query: &str) -> Result<String, ToolError> {
        let query = non_blank(query)?;
        let matches = self
            .retriever
            .retrieve(query, self.options.top_k, self.options.score_threshold)
            .await?;

        if matches.is_empty() {
            info!("No documents passed the score threshold");
            return Ok(NO_RELEVANT_DOCUMENTS.to_string());
        }

        let context = self.formatter.format(&matches);
        debug!("Formatted context with sources {:?}", context.citations());
        Ok(context.render())
    }

    async fn generate(
        &self,
        prompt_id: &str,
        query: &str,
        context: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        if let Some(context) = context {
            variables.insert("context".to_string(), context.to_string());
        }

        let built = self
            .prompts
            .render(prompt_id, variables)
            .map_err(generation_error)?;

        let response = self
            .generator
            .complete(&self.request(built))
            .await
            .map_err(generation_error)?;

        debug!(
            "Generated {} chars with prompt {}",
            response.content.len(),
            prompt_id
        );
        Ok(response.content.trim().to_string())
    }

    fn request(&self, built: BuiltPrompt) -> LlmRequest {
        let temperature = built.temperature.unwrap_or(self.options.temperature);
        let mut request =
            LlmRequest::new(built.user, &self.options.model).with_temperature(temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        request
    }
}

fn generation_error(err: AppError) -> ToolError {
    match err {
        AppError::Llm(msg) => ToolError::Generation(msg),
        other => ToolError::Generation(other.to_string()),
    }
}

fn non_blank(query: &str) -> Result<&str, ToolError> {
    let query = query.trim();
    if query.is_empty() {
        Err(ToolError::EmptyQuery)
    } else {
        Ok(query)
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ToolError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::MalformedInput(format!("missing required key '{}'", key)))
}
