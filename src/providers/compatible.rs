//! Generic OpenAI-compatible provider.
//! Most LLM APIs follow the same `/v1/chat/completions` format.
//! This module provides a single implementation that works for all of them.

use crate::providers::traits::Provider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// A provider that speaks the OpenAI-compatible chat completions API.
/// Used by: OpenAI, OpenRouter, Groq, Mistral, xAI, local gateways, etc.
pub struct OpenAiCompatibleProvider {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) auth_header: AuthStyle,
    client: Client,
}

/// How the provider expects the API key to be sent.
#[derive(Debug, Clone)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
    /// Custom header name
    Custom(String),
}

impl OpenAiCompatibleProvider {
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>, auth_style: AuthStyle) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            auth_header: auth_style,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Build the full URL for chat completions, detecting if base_url already
    /// includes the path. This allows custom providers with non-standard
    /// endpoints to be configured with the complete endpoint URL.
    fn chat_completions_url(&self) -> String {
        let has_full_endpoint = reqwest::Url::parse(&self.base_url)
            .map(|url| {
                url.path()
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            })
            .unwrap_or_else(|_| {
                self.base_url
                    .trim_end_matches('/')
                    .ends_with("/chat/completions")
            });

        if has_full_endpoint {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn apply_auth_header(
        &self,
        req: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        match &self.auth_header {
            AuthStyle::Bearer => req.header("Authorization", format!("Bearer {api_key}")),
            AuthStyle::XApiKey => req.header("x-api-key", api_key),
            AuthStyle::Custom(header) => req.header(header, api_key),
        }
    }

    fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set it in config.toml or the appropriate env var.",
                self.name
            )
        })
    }

    async fn post_chat(&self, request: &ChatRequest) -> anyhow::Result<ApiChatResponse> {
        let api_key = self.require_api_key()?;
        let url = self.chat_completions_url();

        let response = self
            .apply_auth_header(self.client.post(&url).json(request), api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error(&self.name, response).await);
        }

        Ok(response.json().await?)
    }

    fn first_choice_content(&self, response: ApiChatResponse) -> anyhow::Result<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// `response_format` payload for schema-constrained generation.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
    json_schema: JsonSchemaSpec,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
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

fn build_messages(system_prompt: Option<&str>, message: &str) -> Vec<Message> {
    let mut messages = Vec::new();

    if let Some(sys) = system_prompt {
        messages.push(Message {
            role: "system".to_string(),
            content: sys.to_string(),
        });
    }

    messages.push(Message {
        role: "user".to_string(),
        content: message.to_string(),
    });

    messages
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: build_messages(system_prompt, message),
            temperature,
            response_format: None,
        };

        let response = self.post_chat(&request).await?;
        self.first_choice_content(response)
    }

    async fn generate_structured(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        schema: &serde_json::Value,
    ) -> anyhow::Result<String> {
        // Constrained decoding keeps the classification branch deterministic,
        // so temperature is pinned to 0.
        let request = ChatRequest {
            model: model.to_string(),
            messages: build_messages(system_prompt, message),
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_schema".to_string(),
                json_schema: JsonSchemaSpec {
                    name: "structured_output".to_string(),
                    strict: true,
                    schema: schema.clone(),
                },
            }),
        };

        let response = self.post_chat(&request).await?;
        self.first_choice_content(response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
