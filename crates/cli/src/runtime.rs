//! Builds every collaborator the agent needs, once per process.

use rights_agent::{create_decider, Agent, ToolOptions, ToolRegistry};
use rights_core::{AppConfig, AppResult};
use rights_knowledge::build_retriever;
use rights_llm::create_client;
use rights_prompt::PromptSet;
use std::time::Duration;

pub fn build_agent(config: &AppConfig) -> AppResult<Agent> {
    let generator = create_client(
        &config.llm.provider,
        Some(&config.llm.endpoint),
        Some(Duration::from_secs(config.llm.timeout_secs)),
    )?;

    let prompts = PromptSet::load(&config.workspace)?;
    let retriever = build_retriever(config)?;

    let registry = ToolRegistry::new(
        retriever,
        generator.clone(),
        prompts.clone(),
        ToolOptions::from_config(config),
    );
    let decider = create_decider(&config.agent.planner, generator, prompts, &config.llm.model)?;

    tracing::debug!(
        "Agent ready: planner={}, max_steps={}",
        decider.name(),
        config.agent.max_steps
    );

    Ok(Agent::new(registry, decider, config.agent.max_steps))
}
