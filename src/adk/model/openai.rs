// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API
//!
//! Serves OpenAI itself and Groq, which exposes the same API. Each service
//! has its own key and base-URL variables, see [`Endpoint`].

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

/// Credentials and base URL of an OpenAI-compatible service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub provider: &'static str,
    pub api_key_var: &'static str,
    pub base_url_var: &'static str,
    pub default_base_url: &'static str,
}

pub const OPENAI_ENDPOINT: Endpoint = Endpoint {
    provider: "openai",
    api_key_var: "OPENAI_API_KEY",
    base_url_var: "OPENAI_BASE_URL",
    default_base_url: "https://api.openai.com/v1",
};

pub const GROQ_ENDPOINT: Endpoint = Endpoint {
    provider: "groq",
    api_key_var: "GROQ_API_KEY",
    base_url_var: "GROQ_BASE_URL",
    default_base_url: "https://api.groq.com/openai/v1",
};

/// OpenAI-compatible chat model implementation
pub struct OpenAIModel {
    client: Client,
    provider: &'static str,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, ModelError> {
        Self::from_env(model_name, &OPENAI_ENDPOINT)
    }

    /// Groq-hosted model; reads `GROQ_API_KEY` and optionally `GROQ_BASE_URL`
    pub fn groq(model_name: String) -> Result<Self, ModelError> {
        Self::from_env(model_name, &GROQ_ENDPOINT)
    }

    fn from_env(model_name: String, endpoint: &Endpoint) -> Result<Self, ModelError> {
        Self::from_lookup(model_name, endpoint, |key| env::var(key).ok())
    }

    /// Resolve credentials for `endpoint` through `lookup`
    pub fn from_lookup<F>(
        model_name: String,
        endpoint: &Endpoint,
        lookup: F,
    ) -> Result<Self, ModelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(endpoint.api_key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::ApiKeyMissing(endpoint.provider.into()))?;
        let base_url = lookup(endpoint.base_url_var)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| endpoint.default_base_url.to_string());

        let mut model = Self::with_endpoint(model_name, api_key, base_url);
        model.provider = endpoint.provider;
        Ok(model)
    }

    /// Create a model against an explicit endpoint
    pub fn with_endpoint(model_name: String, api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            provider: OPENAI_ENDPOINT.provider,
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> serde_json::Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let text_content: String = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(t) | Part::Thinking(t) => t.as_str(),
            })
            .collect();

        json!({
            "role": role,
            "content": text_content
        })
    }

    fn build_request_body(&self, history: &[Content], config: Option<&GenerationConfig>) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &serde_json::Value) -> Result<Content, ModelError> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let mut parts = Vec::new();
        // Some hosted reasoning models return their chain separately
        if let Some(reasoning) = choice["message"]["reasoning"].as_str() {
            if !reasoning.is_empty() {
                parts.push(Part::Thinking(reasoning.to_string()));
            }
        }
        if let Some(content) = choice["message"]["content"].as_str() {
            parts.push(Part::Text(content.to_string()));
        }

        if !parts.iter().any(|p| matches!(p, Part::Text(_))) {
            return Err(ModelError::InvalidResponse(
                "OpenAI response has no text content".into(),
            ));
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    fn provider(&self) -> &str {
        self.provider
    }

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(history, config);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ModelError::Api {
                provider: self.provider.into(),
                status: status.as_u16(),
                message: text,
            });
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}
