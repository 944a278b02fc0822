//! Local Ollama backend.
use async_trait::async_trait;
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    agent::backend::{
        AnalysisBackend, AnalysisRequest, DEFAULT_OLLAMA_HOST, LlmConfig,
        parse_json_content, status_error,
    },
};

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    num_ctx: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    format: &'a Value,
    options: Options,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// `/api/chat` client using Ollama's schema constrained `format`.
pub struct Ollama {
    client: Client,
    endpoint: String,
    model: String,
    num_ctx: u32,
}

impl Ollama {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let host = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_HOST)
            .trim_end_matches('/');

        Ok(Self {
            client,
            endpoint: format!("{host}/api/chat"),
            model: config.model.clone(),
            num_ctx: config.num_ctx,
        })
    }
}

#[async_trait]
impl AnalysisBackend for Ollama {
    fn name(&self) -> String {
        "ollama".to_string()
    }

    async fn complete(&self, request: &AnalysisRequest) -> Result<Value> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            stream: false,
            format: &request.schema,
            options: Options {
                num_ctx: self.num_ctx,
                temperature: 0.0,
            },
        };

        debug!(
            "sending {} request to {} (num_ctx={})",
            request.kind, self.endpoint, self.num_ctx
        );

        let response =
            self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("Ollama", status, &text));
        }

        let chat: ChatResponse = response.json().await?;
        parse_json_content(&chat.message.content)
    }
}
