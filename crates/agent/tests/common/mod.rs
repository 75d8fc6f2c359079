//! Scripted collaborators shared by the agent scenarios.

#![allow(dead_code)]

use async_trait::async_trait;
use rights_agent::{Agent, Decider, RawDecision, ToolOptions, ToolRegistry};
use rights_core::{AppError, AppResult};
use rights_knowledge::{
    DocumentChunk, EmbeddingProvider, IndexMetric, Retriever, SqliteIndex, VectorIndex,
};
use rights_llm::{LlmClient, LlmRequest, LlmResponse};
use rights_prompt::PromptSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replies from a fixed script, in order. Fails once the script runs out.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(vec![Err(AppError::Llm(message.to_string()))])),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompt(&self, n: usize) -> String {
        self.requests.lock().unwrap()[n].prompt.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Llm("script exhausted".to_string())))?;
        Ok(LlmResponse {
            content: reply,
            model: request.model.clone(),
            usage: Default::default(),
        })
    }
}

/// Embeds every text as the same unit vector.
#[derive(Debug, Default)]
pub struct UnitEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for UnitEmbedder {
    fn provider_name(&self) -> &str {
        "unit"
    }
    fn model_name(&self) -> &str {
        "unit"
    }
    fn dimensions(&self) -> usize {
        2
    }
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Embedding backend that is down.
#[derive(Debug)]
pub struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    fn provider_name(&self) -> &str {
        "down"
    }
    fn model_name(&self) -> &str {
        "down"
    }
    fn dimensions(&self) -> usize {
        2
    }
    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Knowledge("embedding service unavailable".to_string()))
    }
}

/// Cosine index holding one chunk per `(source, text, embedding)`.
pub fn index_with(chunks: &[(&str, &str, [f32; 2])]) -> Arc<SqliteIndex> {
    let index = SqliteIndex::in_memory(IndexMetric::Cosine).unwrap();
    for (i, (source, text, embedding)) in chunks.iter().enumerate() {
        index
            .upsert_chunk(&DocumentChunk {
                id: format!("chunk-{}", i),
                text: text.to_string(),
                source: source.to_string(),
                document_type: "country_report".to_string(),
                title: "Country Report".to_string(),
                embedding: Some(embedding.to_vec()),
            })
            .unwrap();
    }
    Arc::new(index)
}

pub fn syria_index() -> Arc<SqliteIndex> {
    index_with(&[
        ("dos-2023-syria.pdf", "Arbitrary detention remained widespread.", [1.0, 0.0]),
        ("hrw-2023-syria.pdf", "Torture in detention facilities was reported.", [0.9, 0.1]),
        ("ai-2023-syria.csv", "Enforced disappearances continued.", [0.8, 0.2]),
    ])
}

pub fn options(threshold: f32) -> ToolOptions {
    ToolOptions {
        model: "llama3:8b".to_string(),
        temperature: 0.3,
        top_k: 5,
        score_threshold: threshold,
        context_chars: 800,
    }
}

pub fn registry(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    threshold: f32,
) -> ToolRegistry {
    ToolRegistry::new(
        Retriever::new(embedder, index),
        llm,
        PromptSet::builtin(),
        options(threshold),
    )
}

pub fn agent(registry: ToolRegistry, decider: Box<dyn Decider>, max_steps: usize) -> Agent {
    Agent::new(registry, decider, max_steps)
}

/// Returns the same raw decision forever.
pub struct RepeatingDecider(pub RawDecision);

#[async_trait]
impl Decider for RepeatingDecider {
    fn name(&self) -> &str {
        "repeating"
    }

    async fn decide(&self, _state: &rights_agent::LoopState) -> AppResult<RawDecision> {
        Ok(self.0.clone())
    }
}
