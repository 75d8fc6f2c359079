//! Prompt definition types.

use serde::{Deserialize, Serialize};

/// A prompt definition, built-in or loaded from a workspace YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDefinition {
    /// Prompt id, e.g. `tool.report.with_context`
    pub id: String,

    pub title: String,

    /// Schema version of the definition file (`x.y`)
    pub api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Handlebars template for the user message
    pub template: String,

    /// Sampling temperature requested by this prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Variables that must be present and non-blank when rendering.
    /// Other variables render as empty strings when missing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// A rendered prompt ready for the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub prompt_id: String,
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_file_shape() {
        let yaml = r#"
id: tool.summary.plain
title: Plain summary
apiVersion: "1.0"
template: "Summarize {{query}}"
temperature: 0.2
required: [query]
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "tool.summary.plain");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.temperature, Some(0.2));
        assert_eq!(def.required, vec!["query".to_string()]);
        assert!(def.system.is_none());
    }

    #[test]
    fn test_required_defaults_to_empty() {
        let yaml = "id: x\ntitle: X\napiVersion: \"1.0\"\ntemplate: \"{{query}}\"\n";
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.required.is_empty());
    }
}
