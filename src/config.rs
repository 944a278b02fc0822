//! Run configuration assembled from the environment.
//!
//! Every setting has a default, so an empty environment yields a working
//! configuration with analysis disabled. Values are read once at startup
//! and passed down explicitly.
use derive_builder::Builder;
use log::*;
use secrecy::SecretString;
use std::{env, str::FromStr, time::Duration};

use crate::{
    Result,
    agent::{
        aggregate::AggregationPolicy,
        analyst::DEFAULT_MAX_CHANGELOG_CHARS,
        backend::{
            DEFAULT_NUM_CTX, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_MODEL,
            LlmConfig, LlmProvider,
        },
        orchestrator::{AnalysisSettings, ExecutionMode},
    },
    error::AnvilError,
    source::config::{
        DEFAULT_GITHUB_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PYPI_URL,
        SourceConfig,
    },
};

pub const MAX_CHANGELOG_CHARS_VAR: &str = "ANVIL_MAX_CHANGELOG_CHARS";
pub const LLM_PROVIDER_VAR: &str = "ANVIL_LLM_PROVIDER";
pub const LLM_MODEL_VAR: &str = "ANVIL_LLM_MODEL";
pub const LLM_NUM_CTX_VAR: &str = "ANVIL_LLM_NUM_CTX";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const OLLAMA_HOST_VAR: &str = "OLLAMA_HOST";
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const PARALLEL_AGENTS_VAR: &str = "ANVIL_PARALLEL_AGENTS";
pub const RECOMMEND_ON_MEDIUM_VAR: &str = "ANVIL_RECOMMEND_ON_MEDIUM";
pub const PYPI_URL_VAR: &str = "ANVIL_PYPI_URL";
pub const GITHUB_API_URL_VAR: &str = "ANVIL_GITHUB_API_URL";
pub const HTTP_TIMEOUT_VAR: &str = "ANVIL_HTTP_TIMEOUT_SECS";

/// Settings for one run.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct AnvilConfig {
    pub source: SourceConfig,
    pub analysis: AnalysisSettings,
    pub llm: LlmConfig,
}

impl AnvilConfigBuilder {
    pub fn build(&self) -> Result<AnvilConfig> {
        let config = self._build().map_err(|e| {
            AnvilError::invalid_config(format!(
                "Failed to build anvil config: {}",
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl AnvilConfig {
    pub fn builder() -> AnvilConfigBuilder {
        AnvilConfigBuilder::default()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns the value of a
    /// variable when set. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let source = SourceConfig {
            registry_url: var(PYPI_URL_VAR)
                .unwrap_or_else(|| DEFAULT_PYPI_URL.to_string()),
            github_api_url: var(GITHUB_API_URL_VAR)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_token: var(GITHUB_TOKEN_VAR).map(SecretString::from),
            timeout: Duration::from_secs(parse_var(
                HTTP_TIMEOUT_VAR,
                var(HTTP_TIMEOUT_VAR),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        };

        let parallel =
            parse_bool(PARALLEL_AGENTS_VAR, var(PARALLEL_AGENTS_VAR), true)?;
        let mode = if parallel {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        };

        let analysis = AnalysisSettings {
            max_changelog_chars: parse_var(
                MAX_CHANGELOG_CHARS_VAR,
                var(MAX_CHANGELOG_CHARS_VAR),
                DEFAULT_MAX_CHANGELOG_CHARS,
            )?,
            mode,
            policy: AggregationPolicy {
                recommend_on_medium: parse_bool(
                    RECOMMEND_ON_MEDIUM_VAR,
                    var(RECOMMEND_ON_MEDIUM_VAR),
                    true,
                )?,
            },
            ..AnalysisSettings::default()
        };

        let api_key = var(OPENAI_API_KEY_VAR);

        let provider = match var(LLM_PROVIDER_VAR) {
            Some(name) => LlmProvider::from_str(&name)?,
            None if api_key.is_some() => LlmProvider::OpenAi,
            None => LlmProvider::Disabled,
        };

        let default_model = match provider {
            LlmProvider::Ollama => DEFAULT_OLLAMA_MODEL,
            _ => DEFAULT_OPENAI_MODEL,
        };

        let base_url = match provider {
            LlmProvider::Ollama => var(OLLAMA_HOST_VAR),
            _ => var(OPENAI_BASE_URL_VAR),
        };

        let llm = LlmConfig {
            provider,
            model: var(LLM_MODEL_VAR).unwrap_or_else(|| default_model.to_string()),
            api_key: api_key.map(SecretString::from),
            base_url,
            num_ctx: parse_var(LLM_NUM_CTX_VAR, var(LLM_NUM_CTX_VAR), DEFAULT_NUM_CTX)?,
            timeout: analysis.timeout,
        };

        debug!(
            "config: provider={} model={} mode={:?} max_changelog_chars={}",
            llm.provider, llm.model, analysis.mode, analysis.max_changelog_chars
        );

        Self::builder()
            .source(source)
            .analysis(analysis)
            .llm(llm)
            .build()
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.max_changelog_chars == 0 {
            return Err(AnvilError::invalid_config(format!(
                "{MAX_CHANGELOG_CHARS_VAR} must be greater than zero"
            )));
        }

        if self.source.timeout.is_zero() {
            return Err(AnvilError::invalid_config(format!(
                "{HTTP_TIMEOUT_VAR} must be greater than zero"
            )));
        }

        if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.is_none()
        {
            return Err(AnvilError::invalid_config(format!(
                "{OPENAI_API_KEY_VAR} is required for the openai provider"
            )));
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(value) => value.parse::<T>().map_err(|_| {
            AnvilError::invalid_config(format!("{name}: invalid value {value:?}"))
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(AnvilError::invalid_config(format!(
            "{name}: expected true or false, got {other:?}"
        ))),
    }
}
