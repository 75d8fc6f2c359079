//! Generation provider factory.

use crate::client::LlmClient;
use crate::providers::ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
use rights_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

pub const SUPPORTED_PROVIDERS: &[&str] = &["ollama"];

/// Build the generation client named by `provider`.
///
/// Called once by the process entry point; the same client is shared by
/// every tool and by the reasoning step.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client = match timeout {
                Some(timeout) => OllamaClient::with_timeout(base_url, timeout),
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!(
            "Unknown generation provider '{}'. Supported: {}",
            other,
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_is_case_insensitive() {
        let client = create_client("Ollama", Some("http://gpu-box:11434"), Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let err = create_client("openai", None, None).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("Supported: ollama"));
    }
}
