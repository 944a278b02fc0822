//! Model backends able to return JSON conforming to a schema.
use async_trait::async_trait;
use log::*;
use secrecy::SecretString;
use serde_json::Value;
use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

#[cfg(test)]
use mockall::automock;

use crate::{Result, agent::kind::AnalysisKind, error::AnvilError};

mod ollama;
mod openai;

pub use ollama::Ollama;
pub use openai::OpenAi;

/// Default OpenAI-compatible API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default local Ollama host.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
/// Default context window requested from local backends.
pub const DEFAULT_NUM_CTX: u32 = 32768;
/// Default timeout for a single analysis call.
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Which backend performs the analyses.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
    #[default]
    Disabled,
}

impl FromStr for LlmProvider {
    type Err = AnvilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            "none" | "off" | "" => Ok(LlmProvider::Disabled),
            other => Err(AnvilError::invalid_config(format!(
                "unknown analysis provider: {other}"
            ))),
        }
    }
}

impl Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAi => f.write_str("openai"),
            LlmProvider::Ollama => f.write_str("ollama"),
            LlmProvider::Disabled => f.write_str("none"),
        }
    }
}

/// Backend selection and connection settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// API key for hosted backends.
    pub api_key: Option<SecretString>,
    /// API root override. Provider default when `None`.
    pub base_url: Option<String>,
    /// Context window for local backends.
    pub num_ctx: u32,
    /// Upper bound for one analysis call.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Disabled,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            base_url: None,
            num_ctx: DEFAULT_NUM_CTX,
            timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
        }
    }
}

/// A fully rendered request for one analysis kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub system: String,
    pub user: String,
    /// JSON schema the response must satisfy.
    pub schema: Value,
}

/// A model that answers a prompt pair with JSON matching a schema.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> String;

    async fn complete(&self, request: &AnalysisRequest) -> Result<Value>;
}

/// Build the configured backend. `None` means analysis is disabled.
pub fn backend_from_config(
    config: &LlmConfig,
) -> Result<Option<Arc<dyn AnalysisBackend>>> {
    let backend: Arc<dyn AnalysisBackend> = match config.provider {
        LlmProvider::Disabled => {
            info!("no analysis backend configured");
            return Ok(None);
        }
        LlmProvider::OpenAi => Arc::new(OpenAi::new(config)?),
        LlmProvider::Ollama => Arc::new(Ollama::new(config)?),
    };

    info!(
        "using {} analysis backend with model {}",
        backend.name(),
        config.model
    );

    Ok(Some(backend))
}

/// Decode the JSON document a model returned as message text. Models
/// sometimes wrap it in a markdown code fence.
pub(crate) fn parse_json_content(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim()).map_err(|e| {
        AnvilError::malformed(format!("backend returned invalid JSON: {e}"))
    })
}

/// Map a non-success HTTP status from a backend to an error.
pub(crate) fn status_error(
    backend: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> AnvilError {
    error!("{backend} API error ({status}): {body}");
    match status.as_u16() {
        401 | 403 => AnvilError::AuthenticationError(format!(
            "{backend} rejected the credentials"
        )),
        429 => AnvilError::RateLimitExceeded,
        _ => AnvilError::backend(format!("{backend} API error: {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_provider_names() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert_eq!("none".parse::<LlmProvider>().unwrap(), LlmProvider::Disabled);
        assert!("claude-local".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn disabled_provider_builds_no_backend() {
        let backend = backend_from_config(&LlmConfig::default()).unwrap();
        assert!(backend.is_none());
    }

    #[test]
    fn strips_code_fences_from_content() {
        assert_eq!(
            parse_json_content("```json\n{\"a\": 1}\n```").unwrap(),
            json!({"a": 1})
        );
        assert_eq!(parse_json_content(" {\"a\": 2} ").unwrap(), json!({"a": 2}));
        assert!(matches!(
            parse_json_content("I think it is fine"),
            Err(AnvilError::MalformedOutput(_))
        ));
    }
}
