// SPDX-License-Identifier: MIT

//! Completion service - prompt in, text out
//!
//! Stages never talk to a [`Model`] directly. They hand a [`Prompt`] and a
//! [`ModelTier`] to a [`CompletionService`], which picks the model and the
//! generation settings fixed for that tier.

use super::anthropic::AnthropicModel;
use super::openai::{OpenAIModel, GROQ_ENDPOINT, OPENAI_ENDPOINT};
use super::{Content, GenerationConfig, Model};
use crate::adk::error::ModelError;
use async_trait::async_trait;
use std::sync::Arc;

/// Which configured model a stage wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Routing, pruning and synthesis; deterministic
    Fast,
    /// Query generation
    Main,
}

/// A prompt, either a single text or a system/human turn pair
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Text(String),
    Chat { system: String, human: String },
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn chat(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self::Chat {
            system: system.into(),
            human: human.into(),
        }
    }

    /// Conversation history handed to the model
    pub fn to_history(&self) -> Vec<Content> {
        match self {
            Prompt::Text(text) => vec![Content::user(text.clone())],
            Prompt::Chat { system, human } => {
                vec![Content::system(system.clone()), Content::user(human.clone())]
            }
        }
    }
}

/// Text-completion boundary used by every LLM-backed stage
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &Prompt, tier: ModelTier) -> Result<String, ModelError>;
}

/// Completion service backed by two models with per-tier settings
pub struct LlmCompletionService {
    fast: Arc<dyn Model>,
    main: Arc<dyn Model>,
    fast_config: GenerationConfig,
    main_config: GenerationConfig,
}

impl LlmCompletionService {
    pub fn new(
        fast: Arc<dyn Model>,
        main: Arc<dyn Model>,
        fast_config: GenerationConfig,
        main_config: GenerationConfig,
    ) -> Self {
        Self {
            fast,
            main,
            fast_config,
            main_config,
        }
    }

    fn select(&self, tier: ModelTier) -> (&Arc<dyn Model>, &GenerationConfig) {
        match tier {
            ModelTier::Fast => (&self.fast, &self.fast_config),
            ModelTier::Main => (&self.main, &self.main_config),
        }
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete(&self, prompt: &Prompt, tier: ModelTier) -> Result<String, ModelError> {
        let (model, config) = self.select(tier);
        log::debug!("Completion via {} ({:?} tier)", model.provider(), tier);

        let response = model
            .generate_content(&prompt.to_history(), Some(config))
            .await?;
        Ok(response.text())
    }
}

/// Instantiate a provider model by name, reading credentials from the environment
pub fn create_model(provider: &str, model_name: &str) -> Result<Arc<dyn Model>, ModelError> {
    create_model_with(provider, model_name, |key| std::env::var(key).ok())
}

/// Instantiate a provider model, resolving OpenAI/Groq credentials through `lookup`
pub fn create_model_with<F>(
    provider: &str,
    model_name: &str,
    lookup: F,
) -> Result<Arc<dyn Model>, ModelError>
where
    F: Fn(&str) -> Option<String>,
{
    let model_name = model_name.to_string();
    match provider {
        "openai" | "OpenAI" => Ok(Arc::new(OpenAIModel::from_lookup(
            model_name,
            &OPENAI_ENDPOINT,
            lookup,
        )?)),
        "groq" | "Groq" => Ok(Arc::new(OpenAIModel::from_lookup(
            model_name,
            &GROQ_ENDPOINT,
            lookup,
        )?)),
        "anthropic" | "Anthropic" => Ok(Arc::new(AnthropicModel::new(model_name)?)),
        other => Err(ModelError::UnsupportedProvider(other.to_string())),
    }
}

/// Guess the provider from a model name; open-weight models go to Groq
pub fn infer_provider_from_model(model_name: &str) -> String {
    if model_name.starts_with("claude") {
        "anthropic".to_string()
    } else if ["gpt", "o1", "o3", "o4"]
        .iter()
        .any(|prefix| model_name.starts_with(prefix))
    {
        "openai".to_string()
    } else {
        "groq".to_string()
    }
}
