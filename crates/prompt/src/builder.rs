//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use rights_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every variable listed in `definition.required` must be present and
/// non-blank. Any other missing variable renders as an empty string.
///
/// # Example
/// ```no_run
/// use rights_prompt::{build_prompt, builtin};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin::builtin(builtin::SUMMARY_PLAIN).unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "Freedom of assembly in Iran".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .required
        .iter()
        .find(|name| variables.get(*name).map_or(true, |v| v.trim().is_empty()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let user = render_template(&definition.id, &definition.template, &variables)?;

    Ok(BuiltPrompt {
        prompt_id: definition.id.clone(),
        system: definition.system.clone(),
        user,
        temperature: definition.temperature,
    })
}

/// Render a Handlebars template with variables.
fn render_template(
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template '{}': {}", name, e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", name, e)))
}

/// Check that a template compiles without rendering it.
pub(crate) fn check_template(name: &str, template: &str) -> AppResult<()> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Invalid template '{}': {}", name, e)))
}
