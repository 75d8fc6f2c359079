//! Configuration management for the Rights Agent.
//!
//! Configuration is loaded in layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.rights/config.yaml` or `RIGHTS_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Every external capability (generation, embeddings, index, publisher,
//! history store) is described here and constructed explicitly by the
//! process entry point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Generation providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama"];

/// Embedding providers the factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["ollama", "trigram"];

/// Index metrics. `cosine` is a similarity, `l2` is a distance.
pub const KNOWN_METRICS: &[&str] = &["cosine", "l2"];

/// Decision policies for the orchestration loop.
pub const KNOWN_PLANNERS: &[&str] = &["rules", "react"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .rights/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    pub llm: LlmSettings,
    pub embeddings: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub agent: AgentSettings,
    pub publish: PublishSettings,
    pub history: HistorySettings,
}

/// Generation capability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider identifier (e.g., "ollama")
    pub provider: String,

    /// Provider endpoint
    pub endpoint: String,

    /// Model used by every tool and by the reasoning prompt
    pub model: String,

    /// Sampling temperature for report generation
    pub temperature: f32,

    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

/// Embedding capability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint override; falls back to the LLM endpoint
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

/// Retriever and context formatter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Index database path, relative to the workspace unless absolute
    pub index_path: PathBuf,

    /// Number of nearest chunks requested from the index
    pub top_k: usize,

    /// Score threshold; 0.0 disables filtering
    pub score_threshold: f32,

    /// Index metric: "cosine" (similarity) or "l2" (distance)
    pub metric: String,

    /// Per-chunk character budget inside a formatted context
    pub context_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(".rights/index.sqlite"),
            top_k: 5,
            score_threshold: 0.0,
            metric: "cosine".to_string(),
            context_chars: 800,
        }
    }
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentSettings {
    /// Maximum number of loop steps (tool invocations)
    pub max_steps: usize,

    /// Decision policy: "rules" or "react"
    pub planner: String,

    /// Wall-clock budget for one query, enforced by the caller
    pub timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 5,
            planner: "rules".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Report publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishSettings {
    /// Target Notion page receiving appended reports
    pub page_id: Option<String>,

    /// Environment variable holding the Notion integration token
    pub api_key_env: String,

    /// Default source label written next to the report date
    pub source: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            page_id: None,
            api_key_env: "NOTION_API_KEY".to_string(),
            source: "Human Rights LLM Report".to_string(),
        }
    }
}

/// Chat history store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistorySettings {
    /// SQLite path, relative to the workspace unless absolute
    pub path: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".rights/history.sqlite"),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embeddings: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    agent: Option<AgentSettings>,
    publish: Option<PublishSettings>,
    history: Option<HistorySettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: LlmSettings::default(),
            embeddings: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            agent: AgentSettings::default(),
            publish: PublishSettings::default(),
            history: HistorySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `RIGHTS_WORKSPACE`: Override workspace path
    /// - `RIGHTS_CONFIG`: Path to config file
    /// - `RIGHTS_PROVIDER`: Generation provider
    /// - `RIGHTS_MODEL`: Generation model
    /// - `RIGHTS_ENDPOINT`: Generation endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("RIGHTS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("RIGHTS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.rights_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("RIGHTS_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = var("RIGHTS_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = var("RIGHTS_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Some(level) = var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if var("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Merge a config file named after `load` ran, then re-apply the
    /// environment so it still wins over the file. A file that was already
    /// merged is skipped.
    fn merge_late_config(
        mut self,
        path: PathBuf,
        var: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        if self.config_file.as_deref() == Some(path.as_path()) {
            return Ok(self);
        }
        self = self.merge_yaml(&path)?;
        self.apply_env(var);
        self.config_file = Some(path);
        Ok(self)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embeddings) = file.embeddings {
            result.embeddings = embeddings;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(agent) = file.agent {
            result.agent = agent;
        }
        if let Some(publish) = file.publish {
            result.publish = publish;
        }
        if let Some(history) = file.history {
            result.history = history;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> AppResult<Self> {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self = self.merge_late_config(config_file, |name| std::env::var(name).ok())?;
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        Ok(self)
    }

    /// Get the path to the .rights directory.
    pub fn rights_dir(&self) -> PathBuf {
        self.workspace.join(".rights")
    }

    /// Ensure the .rights directory exists.
    pub fn ensure_rights_dir(&self) -> AppResult<()> {
        let dir = self.rights_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .rights directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved path of the embedding index database.
    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.retrieval.index_path)
    }

    /// Resolved path of the chat history database.
    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.history.path)
    }

    /// Endpoint used by the embedding provider.
    pub fn embedding_endpoint(&self) -> &str {
        self.embeddings
            .endpoint
            .as_deref()
            .unwrap_or(&self.llm.endpoint)
    }

    /// Resolve the Notion token from the configured environment variable.
    pub fn resolve_publish_key(&self) -> Option<String> {
        std::env::var(&self.publish.api_key_env).ok()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate configuration values before any capability is built.
    pub fn validate(&self) -> AppResult<()> {
        check_known("provider", &self.llm.provider, KNOWN_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embeddings.provider,
            KNOWN_EMBEDDING_PROVIDERS,
        )?;
        check_known("metric", &self.retrieval.metric, KNOWN_METRICS)?;
        check_known("planner", &self.agent.planner, KNOWN_PLANNERS)?;

        if self.agent.max_steps == 0 {
            return Err(AppError::Config(
                "agent.maxSteps must be at least 1".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if self.retrieval.context_chars == 0 {
            return Err(AppError::Config(
                "retrieval.contextChars must be at least 1".to_string(),
            ));
        }

        if self.embeddings.dimensions == 0 {
            return Err(AppError::Config(
                "embeddings.dimensions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.score_threshold, 0.0);
        assert_eq!(config.retrieval.context_chars, 800);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rights_dir_and_paths() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/tmp/ws");
        assert!(config.rights_dir().ends_with(".rights"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/tmp/ws/.rights/index.sqlite")
        );

        config.history.path = PathBuf::from("/var/lib/history.sqlite");
        assert_eq!(
            config.history_path(),
            PathBuf::from("/var/lib/history.sqlite")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default()
            .with_overrides(
                None,
                None,
                Some("ollama".to_string()),
                Some("mistral:latest".to_string()),
                None,
                true,
                false,
                true,
            )
            .unwrap();

        assert_eq!(config.llm.model, "mistral:latest");
        assert!(config.verbose);
        assert!(config.log_json);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  model: mistral:latest
  temperature: 0.1
retrieval:
  topK: 3
  scoreThreshold: 0.5
  metric: l2
agent:
  maxSteps: 7
logging:
  level: warn
  color: false
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.llm.model, "mistral:latest");
        assert_eq!(merged.llm.endpoint, "http://localhost:11434");
        assert_eq!(merged.retrieval.top_k, 3);
        assert_eq!(merged.retrieval.metric, "l2");
        assert_eq!(merged.retrieval.context_chars, 800);
        assert_eq!(merged.agent.max_steps, 7);
        assert_eq!(merged.agent.planner, "rules");
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_config_file_override_is_merged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "agent:\n  planner: react\n").unwrap();

        let config = AppConfig::default()
            .with_overrides(None, Some(path.clone()), None, None, None, false, false, false)
            .unwrap();
        assert_eq!(config.agent.planner, "react");
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_validate_rejects_unknown_values() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.metric = "dot".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.planner = "freeform".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    fn write_config(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "llm:\n  provider: ollama\n  model: mistral:latest\n").unwrap();
        path
    }

    #[test]
    fn test_already_loaded_config_file_is_not_merged_again() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir);

        // State after `load` merged the file and applied RIGHTS_ENDPOINT.
        let mut config = AppConfig::default().merge_yaml(&path).unwrap();
        config.config_file = Some(path.clone());
        config.llm.endpoint = "http://gpu-box:11434".to_string();

        let config = config
            .with_overrides(None, Some(path), None, None, None, false, false, false)
            .unwrap();
        assert_eq!(config.llm.endpoint, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "mistral:latest");
    }

    #[test]
    fn test_environment_wins_over_late_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir);

        let env = |name: &str| match name {
            "RIGHTS_ENDPOINT" => Some("http://gpu-box:11434".to_string()),
            _ => None,
        };
        let config = AppConfig::default()
            .merge_late_config(path.clone(), env)
            .unwrap();

        assert_eq!(config.llm.endpoint, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "mistral:latest");
        assert_eq!(config.config_file, Some(path));
    }
}
