//! Prompt system for the Rights Agent.
//!
//! This crate provides:
//! - Built-in prompt definitions for every tool and for the reasoning step
//! - YAML overrides under `.rights/prompts/<id>.yml`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, PromptOrigin, PromptSet};
pub use types::{BuiltPrompt, PromptDefinition};
