// SPDX-License-Identifier: MIT

//! Pipeline configuration
//!
//! Resolution order: built-in defaults, then an optional YAML file, then
//! environment variables. Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adk::error::{ModelError, Result};
use crate::adk::model::completion::{create_model_with, infer_provider_from_model};
use crate::adk::model::{GenerationConfig, LlmCompletionService};

pub const DEFAULT_DATABASE_PATH: &str = "uber_trips.db";
pub const DEFAULT_KNOWLEDGE_BASE_PATH: &str = "knowledge_base.json";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

pub const ENV_DATABASE: &str = "QUERYGPT_DB";
pub const ENV_KNOWLEDGE_BASE: &str = "QUERYGPT_KNOWLEDGE_BASE";
pub const ENV_PROVIDER: &str = "MODEL_PROVIDER";
pub const ENV_FAST_MODEL: &str = "QUERYGPT_FAST_MODEL";
pub const ENV_MAIN_MODEL: &str = "QUERYGPT_MAIN_MODEL";

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_knowledge_base_path() -> PathBuf {
    PathBuf::from(DEFAULT_KNOWLEDGE_BASE_PATH)
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_main_temperature() -> f32 {
    0.1
}

/// Settings for one pipeline instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: PathBuf,

    /// Provider name; inferred from `main_model` when unset
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default = "default_model")]
    pub fast_model: String,

    #[serde(default = "default_model")]
    pub main_model: String,

    #[serde(default)]
    pub fast_temperature: f32,

    #[serde(default = "default_main_temperature")]
    pub main_temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            knowledge_base_path: default_knowledge_base_path(),
            provider: None,
            fast_model: default_model(),
            main_model: default_model(),
            fast_temperature: 0.0,
            main_temperature: default_main_temperature(),
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Self::from_yaml(&content)
    }

    /// Defaults, then `path` if given, then the process environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Overlay the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_DATABASE) {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_KNOWLEDGE_BASE) {
            self.knowledge_base_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_PROVIDER) {
            self.provider = Some(v);
        }
        if let Some(v) = get(ENV_FAST_MODEL) {
            self.fast_model = v;
        }
        if let Some(v) = get(ENV_MAIN_MODEL) {
            self.main_model = v;
        }
        self
    }

    /// Explicit provider, or one inferred from the main model name
    pub fn provider(&self) -> String {
        self.provider
            .clone()
            .unwrap_or_else(|| infer_provider_from_model(&self.main_model))
    }

    /// Build the two-tier completion service from the process environment
    pub fn completion_service(&self) -> Result<Arc<LlmCompletionService>, ModelError> {
        self.completion_service_with(|key| std::env::var(key).ok())
    }

    /// Build the two-tier completion service, resolving credentials via `lookup`
    pub fn completion_service_with<F>(
        &self,
        lookup: F,
    ) -> Result<Arc<LlmCompletionService>, ModelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = self.provider();
        log::info!(
            "Using provider {} (fast: {}, main: {})",
            provider,
            self.fast_model,
            self.main_model
        );

        let fast = create_model_with(&provider, &self.fast_model, &lookup)?;
        let main = create_model_with(&provider, &self.main_model, &lookup)?;
        Ok(Arc::new(LlmCompletionService::new(
            fast,
            main,
            GenerationConfig::with_temperature(self.fast_temperature),
            GenerationConfig::with_temperature(self.main_temperature),
        )))
    }
}
