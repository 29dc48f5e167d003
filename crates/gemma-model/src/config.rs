// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model hyperparameters, read from a HuggingFace-style `config.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ModelError;

fn default_norm_eps() -> f32 {
    1e-5
}

/// Hyperparameters of a Gemma-style decoder.
///
/// Field names follow the HuggingFace `config.json` schema so that a model
/// directory can be read as-is; unrecognised fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemmaConfig {
    /// Embedding (model) dimension.
    pub hidden_size: usize,
    /// Number of attention heads.
    pub num_attention_heads: usize,
    /// Number of decoder blocks.
    pub num_hidden_layers: usize,
    /// Feed-forward hidden dimension.
    pub intermediate_size: usize,
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Epsilon applied by every layer norm.
    #[serde(default = "default_norm_eps")]
    pub rms_norm_eps: f32,
    /// Per-head dimension; derived from `hidden_size / num_attention_heads`
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_dim: Option<usize>,
}

impl GemmaConfig {
    /// The small configuration used by the demo and tests:
    /// vocab 100, embed 12, 4 heads, feed-forward 48, 2 blocks.
    pub fn toy() -> Self {
        Self {
            hidden_size: 12,
            num_attention_heads: 4,
            num_hidden_layers: 2,
            intermediate_size: 48,
            vocab_size: 100,
            rms_norm_eps: default_norm_eps(),
            head_dim: None,
        }
    }

    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants every model built from this config relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = [
            ("hidden_size", self.hidden_size),
            ("num_attention_heads", self.num_attention_heads),
            ("intermediate_size", self.intermediate_size),
            ("vocab_size", self.vocab_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ModelError::Configuration(format!("{name} must be positive")));
            }
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            return Err(ModelError::Configuration(format!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        let derived = self.hidden_size / self.num_attention_heads;
        if let Some(head_dim) = self.head_dim {
            if head_dim != derived {
                return Err(ModelError::Configuration(format!(
                    "head_dim {head_dim} does not equal hidden_size / num_attention_heads = {derived}"
                )));
            }
        }
        if !self.rms_norm_eps.is_finite() || self.rms_norm_eps < 0.0 {
            return Err(ModelError::Configuration(format!(
                "rms_norm_eps must be finite and non-negative, got {}",
                self.rms_norm_eps
            )));
        }
        Ok(())
    }

    /// Alias for `hidden_size`.
    pub fn embed_dim(&self) -> usize {
        self.hidden_size
    }

    /// Per-head dimension.
    pub fn head_dim(&self) -> usize {
        self.head_dim
            .unwrap_or(self.hidden_size / self.num_attention_heads.max(1))
    }

    /// Total number of scalar parameters, counting layer-norm shifts and an
    /// untied output projection.
    pub fn parameter_count(&self) -> usize {
        let e = self.hidden_size;
        let h = self.intermediate_size;
        let norm = 2 * e;
        let per_block = 4 * e * e + 2 * e * h + 2 * norm;
        let embedding = self.vocab_size * e;
        embedding + self.num_hidden_layers * per_block + norm + self.vocab_size * e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_is_valid() {
        let config = GemmaConfig::toy();
        config.validate().unwrap();
        assert_eq!(config.head_dim(), 3);
        assert_eq!(config.embed_dim(), 12);
    }

    #[test]
    fn test_parse_hf_config_ignores_unknown_fields() {
        let json = r#"{
            "architectures": ["GemmaForCausalLM"],
            "hidden_size": 2048,
            "num_attention_heads": 8,
            "num_hidden_layers": 18,
            "intermediate_size": 16384,
            "vocab_size": 256000,
            "rms_norm_eps": 1e-6,
            "head_dim": 256,
            "torch_dtype": "bfloat16"
        }"#;
        let config = GemmaConfig::from_json(json).unwrap();
        assert_eq!(config.num_hidden_layers, 18);
        assert_eq!(config.head_dim(), 256);
        assert!((config.rms_norm_eps - 1e-6).abs() < 1e-12);
    }

    #[test]
    fn test_missing_eps_defaults() {
        let json = r#"{"hidden_size": 12, "num_attention_heads": 4, "num_hidden_layers": 1,
                       "intermediate_size": 48, "vocab_size": 100}"#;
        let config = GemmaConfig::from_json(json).unwrap();
        assert_eq!(config.rms_norm_eps, 1e-5);
        assert_eq!(config.head_dim, None);
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let config = GemmaConfig {
            num_attention_heads: 5,
            ..GemmaConfig::toy()
        };
        assert!(matches!(config.validate(), Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_inconsistent_head_dim_rejected() {
        let config = GemmaConfig {
            head_dim: Some(4),
            ..GemmaConfig::toy()
        };
        assert!(matches!(config.validate(), Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            GemmaConfig::from_json("{\"hidden_size\": }"),
            Err(ModelError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_string(&GemmaConfig::toy()).unwrap()).unwrap();

        let config = GemmaConfig::from_file(&path).unwrap();
        assert_eq!(config, GemmaConfig::toy());
    }

    #[test]
    fn test_from_file_missing() {
        let err = GemmaConfig::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ModelError::ConfigRead(_)));
    }

    #[test]
    fn test_parameter_count_toy() {
        // embed 1200 + 2 * (576 + 1152 + 48) + 24 + head 1200
        assert_eq!(GemmaConfig::toy().parameter_count(), 5976);
    }
}
