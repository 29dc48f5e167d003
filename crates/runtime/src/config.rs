// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/gemma-2b"
//! config_file = "config.json"
//! weights_file = "model.safetensors"
//! seed = 42
//! enable_profiling = true
//!
//! # Used only when `config_file` does not exist in `model_path`.
//! [model]
//! hidden_size = 12
//! num_attention_heads = 4
//! num_hidden_layers = 2
//! intermediate_size = 48
//! vocab_size = 100
//! ```

use std::path::{Path, PathBuf};

use gemma_model::GemmaConfig;

use crate::RuntimeError;

/// Configuration for the inference runtime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the model directory.
    pub model_path: PathBuf,
    /// Hyperparameter file inside `model_path`.
    #[serde(default = "default_config_file")]
    pub config_file: String,
    /// SafeTensors weight file inside `model_path`.
    #[serde(default = "default_weights_file")]
    pub weights_file: String,
    /// Seed for synthetic weights when no weight file exists.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Whether to record per-stage profiling metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    /// Inline hyperparameters, used when `config_file` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<GemmaConfig>,
}

fn default_config_file() -> String {
    "config.json".to_string()
}

fn default_weights_file() -> String {
    "model.safetensors".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// A config for `model_path` with every other field at its default.
    pub fn for_model(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Full path of the hyperparameter file.
    pub fn config_path(&self) -> PathBuf {
        self.model_path.join(&self.config_file)
    }

    /// Full path of the weight file.
    pub fn weights_path(&self) -> PathBuf {
        self.model_path.join(&self.weights_file)
    }

    /// Resolves the model hyperparameters: the config file when it exists,
    /// otherwise the inline `[model]` table. The result is validated.
    pub fn resolve_model_config(&self) -> Result<GemmaConfig, RuntimeError> {
        let path = self.config_path();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "reading model config");
            return Ok(GemmaConfig::from_file(&path)?);
        }
        match &self.model {
            Some(inline) => {
                inline.validate()?;
                Ok(inline.clone())
            }
            None => Err(RuntimeError::ModelConfigNotFound(path)),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/gemma-2b"),
            config_file: default_config_file(),
            weights_file: default_weights_file(),
            seed: default_seed(),
            enable_profiling: true,
            model: None,
        }
    }
}
