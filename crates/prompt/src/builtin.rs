//! Built-in prompt definitions.
//!
//! These ship with the binary so the agent works without any files in the
//! workspace. A YAML file with the same id under `.rights/prompts/` replaces
//! the built-in definition.

use crate::types::PromptDefinition;

/// Report written from retrieved context, citing it.
pub const REPORT_WITH_CONTEXT: &str = "tool.report.with_context";

/// Short summary written without retrieval.
pub const SUMMARY_PLAIN: &str = "tool.summary.plain";

/// Long structured report written from general knowledge.
pub const REPORT_GENERAL: &str = "tool.report.general";

/// Reasoning prompt used by the ReAct decider.
pub const AGENT_REACT: &str = "agent.react";

/// Every built-in prompt id.
pub const BUILTIN_IDS: &[&str] = &[REPORT_WITH_CONTEXT, SUMMARY_PLAIN, REPORT_GENERAL, AGENT_REACT];

const EXPERT_SYSTEM: &str = "You are an expert in human rights, international law, and \
United States homeland security policies.";

const REPORT_WITH_CONTEXT_TEMPLATE: &str = r#"Using the provided context, write a report that answers the user's question.
Be factual and cite your sources inline using the bracketed source keys from the context, for example [state-dept-2023-syria].
Do not cite sources that are not in the context.

Question: {{query}}

Context:
{{context}}

Report:
"#;

const SUMMARY_PLAIN_TEMPLATE: &str = r#"Summarize the following human rights topic in markdown format.
Keep it short: a one-line heading followed by at most five bullet points.

{{query}}
"#;

const REPORT_GENERAL_TEMPLATE: &str = r#"Write a detailed human rights report in markdown on the topic below, using your general knowledge.

Topic: {{query}}

Use exactly these sections:

## Overview
## Key Human Rights Concerns
## Affected Groups
## Legal and Policy Framework
## Recent Developments
## Recommendations

End with a short note stating that the report was written from general knowledge, not from retrieved documents.
"#;

const AGENT_REACT_TEMPLATE: &str = r#"You are a helpful human rights expert with access to tools that retrieve documents, summarize topics and write reports.

Use the following tools:
{{tools}}

When answering, follow this format strictly:

Question: the input question you must answer
Thought: think about what to do
Action: the action to take, should be one of [{{tool_names}}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat)
Thought: I now know the final answer
Final Answer: your final answer to the question

The Action Input for summarize-with-context must be a JSON object with the keys "query" and "context".
Every other tool takes the plain question text.
{{#if history}}

Previous conversation:
{{history}}
{{/if}}

Begin!

Question: {{input}}
{{scratchpad}}"#;

/// Look up a built-in definition by id.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    let (title, system, template, temperature, required): (_, _, _, _, &[&str]) = match id {
        REPORT_WITH_CONTEXT => (
            "Report with retrieved context",
            Some(EXPERT_SYSTEM),
            REPORT_WITH_CONTEXT_TEMPLATE,
            None,
            &["query", "context"],
        ),
        SUMMARY_PLAIN => (
            "Plain summary",
            None,
            SUMMARY_PLAIN_TEMPLATE,
            None,
            &["query"],
        ),
        REPORT_GENERAL => (
            "Structured report from general knowledge",
            Some(EXPERT_SYSTEM),
            REPORT_GENERAL_TEMPLATE,
            None,
            &["query"],
        ),
        AGENT_REACT => (
            "ReAct reasoning step",
            None,
            AGENT_REACT_TEMPLATE,
            Some(0.0),
            &["input", "tools", "tool_names"],
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        system: system.map(str::to_string),
        template: template.to_string(),
        temperature,
        required: required.iter().map(|v| v.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_id_resolves() {
        for id in BUILTIN_IDS {
            let def = builtin(id).unwrap();
            assert_eq!(def.id, *id);
            assert!(!def.template.is_empty());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin("tool.unknown").is_none());
    }

    #[test]
    fn test_react_prompt_is_deterministic() {
        let def = builtin(AGENT_REACT).unwrap();
        assert_eq!(def.temperature, Some(0.0));
        assert!(def.template.contains("Final Answer:"));
        assert!(def.template.contains("{{scratchpad}}"));
    }
}
