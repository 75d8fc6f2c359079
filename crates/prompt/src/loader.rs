//! Prompt loader: built-in definitions with workspace YAML overrides.

use crate::builder::{build_prompt, check_template};
use crate::builtin::{builtin, BUILTIN_IDS};
use crate::types::{BuiltPrompt, PromptDefinition};
use rights_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a prompt definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOrigin {
    Builtin,
    Workspace,
}

impl PromptOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Workspace => "workspace",
        }
    }
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".rights/prompts")
}

/// Load a prompt definition by ID.
///
/// A `.rights/prompts/<id>.yml` file in the workspace wins over the
/// built-in definition with the same id.
///
/// # Example
/// ```no_run
/// use rights_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "tool.report.general")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to parse prompt YAML {:?}: {}",
                prompt_file, e
            ))
        })?;

        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file, definition.id, prompt_id
            )));
        }

        validate_prompt(&definition)?;
        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    builtin(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt id: {}", prompt_id)))
}

/// List every available prompt id with its origin.
///
/// Built-in ids come first in their declared order, followed by
/// workspace-only ids sorted by name.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<(String, PromptOrigin)>> {
    let dir = prompts_dir(workspace_path);
    let mut workspace_ids = Vec::new();

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    workspace_ids.push(stem.to_string());
                }
            }
        }
    }

    let mut listed: Vec<(String, PromptOrigin)> = BUILTIN_IDS
        .iter()
        .map(|id| {
            let origin = if workspace_ids.iter().any(|w| w == id) {
                PromptOrigin::Workspace
            } else {
                PromptOrigin::Builtin
            };
            (id.to_string(), origin)
        })
        .collect();

    workspace_ids.retain(|id| !BUILTIN_IDS.contains(&id.as_str()));
    workspace_ids.sort();
    listed.extend(
        workspace_ids
            .into_iter()
            .map(|id| (id, PromptOrigin::Workspace)),
    );

    Ok(listed)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    check_template(&def.id, &def.template)
}

/// The prompt definitions one agent run needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptSet {
    /// Built-in definitions only.
    pub fn builtin() -> Self {
        let definitions = BUILTIN_IDS
            .iter()
            .filter_map(|id| builtin(id).map(|def| (id.to_string(), def)))
            .collect();
        Self { definitions }
    }

    /// Built-in definitions with workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in BUILTIN_IDS {
            definitions.insert(id.to_string(), load_prompt(workspace_path, id)?);
        }
        Ok(Self { definitions })
    }

    /// Get a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt '{}' is not loaded", id)))
    }

    /// Render the definition with the given variables.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        build_prompt(self.get(id)?, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{REPORT_GENERAL, SUMMARY_PLAIN};
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        let prompts_dir = dir.join(".rights/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), body).unwrap();
    }

    fn valid_yaml(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Custom"
apiVersion: "1.0"
template: "Custom template: {{{{query}}}}"
"#,
            id
        )
    }

    #[test]
    fn test_builtin_used_without_override() {
        let temp_dir = TempDir::new().unwrap();
        let def = load_prompt(temp_dir.path(), SUMMARY_PLAIN).unwrap();
        assert_eq!(def.title, "Plain summary");
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), SUMMARY_PLAIN, &valid_yaml(SUMMARY_PLAIN));

        let def = load_prompt(temp_dir.path(), SUMMARY_PLAIN).unwrap();
        assert_eq!(def.title, "Custom");
        assert_eq!(def.template, "Custom template: {{query}}");
    }

    #[test]
    fn test_override_with_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), SUMMARY_PLAIN, &valid_yaml("something.else"));
        assert!(load_prompt(temp_dir.path(), SUMMARY_PLAIN).is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), REPORT_GENERAL, "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), REPORT_GENERAL).is_err());
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_list_prompts_marks_overrides() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), SUMMARY_PLAIN, &valid_yaml(SUMMARY_PLAIN));
        write_prompt(temp_dir.path(), "extra.notes", &valid_yaml("extra.notes"));

        let listed = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(listed.len(), BUILTIN_IDS.len() + 1);
        assert!(listed.contains(&(SUMMARY_PLAIN.to_string(), PromptOrigin::Workspace)));
        assert!(listed.contains(&(REPORT_GENERAL.to_string(), PromptOrigin::Builtin)));
        assert_eq!(listed.last().unwrap().0, "extra.notes");
    }

    #[test]
    fn test_prompt_set_render() {
        let set = PromptSet::builtin();
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "Iran".to_string());
        let built = set.render(SUMMARY_PLAIN, vars).unwrap();
        assert!(built.user.contains("Iran"));
        assert!(set.get("missing").is_err());
    }
}
