//! OpenAI-compatible chat completions backend.
use async_trait::async_trait;
use log::*;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result,
    agent::backend::{
        AnalysisBackend, AnalysisRequest, DEFAULT_OPENAI_BASE_URL, LlmConfig,
        parse_json_content, status_error,
    },
    error::AnvilError,
};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client requesting `json_schema` structured output.
pub struct OpenAi {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAi {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.as_ref().ok_or_else(|| {
            AnvilError::invalid_config(
                "OPENAI_API_KEY is required for the openai provider",
            )
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(
            format!("Bearer {}", api_key.expose_secret()).as_str(),
        )?;
        auth.set_sensitive(true);
        headers.append(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/');

        Ok(Self {
            client,
            endpoint: format!("{base_url}/chat/completions"),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl AnalysisBackend for OpenAi {
    fn name(&self) -> String {
        "openai".to_string()
    }

    async fn complete(&self, request: &AnalysisRequest) -> Result<Value> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.kind.schema_name(),
                    "schema": request.schema,
                    "strict": false,
                }
            }),
        };

        debug!("sending {} request to {}", request.kind, self.endpoint);

        let response =
            self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("OpenAI", status, &text));
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AnvilError::malformed("OpenAI response had no message content")
            })?;

        parse_json_content(&content)
    }
}
