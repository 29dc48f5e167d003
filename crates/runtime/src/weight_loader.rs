// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Weight loading from SafeTensors files with memory-mapped I/O.
//!
//! [`WeightLoader`] provides two modes:
//!
//! 1. **File-backed**: opens `model.safetensors` via mmap and decodes
//!    tensors on demand. F32, F16 and BF16 checkpoints are widened to F32.
//! 2. **Synthetic**: generates seeded N(0, 0.02²) weights (unit layer-norm
//!    scales, zero shifts) for demos, tests and benchmarks without model
//!    files.
//!
//! Tensor names follow the HuggingFace Gemma checkpoint layout:
//!
//! ```text
//! model.embed_tokens.weight
//! model.layers.{i}.input_layernorm.{weight,bias}
//! model.layers.{i}.self_attn.{q,k,v,o}_proj.{weight,bias}
//! model.layers.{i}.post_attention_layernorm.{weight,bias}
//! model.layers.{i}.mlp.{up,down}_proj.weight
//! model.norm.{weight,bias}
//! lm_head.weight
//! ```
//!
//! Biases are optional (absent layer-norm shifts become zeros) and a
//! missing `lm_head.weight` falls back to the tied embedding matrix.

use std::path::{Path, PathBuf};

use gemma_model::{
    EmbeddingLayer, GemmaConfig, GemmaModel, LayerNorm, LinearLayer, MultiHeadAttention,
    TransformerBlock,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use safetensors::tensor::SafeTensorError;
use safetensors::{Dtype, SafeTensors};
use tensor_core::{DType, Shape, Tensor};

use crate::{RuntimeConfig, RuntimeError};

/// Standard deviation of synthetic weights.
const SYNTHETIC_STD: f32 = 0.02;

/// Name, dtype and shape of one tensor stored in a weight file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

enum Source {
    File { path: PathBuf, mmap: memmap2::Mmap },
    Synthetic { seed: u64 },
}

/// Supplies weight tensors to model assembly.
pub struct WeightLoader {
    source: Source,
}

impl WeightLoader {
    /// Memory-maps `model_dir/weights_file`.
    pub fn open(model_dir: &Path, weights_file: &str) -> Result<Self, RuntimeError> {
        let path = model_dir.join(weights_file);
        let file = std::fs::File::open(&path).map_err(|e| RuntimeError::WeightLoadError {
            tensor: "<file>".into(),
            detail: format!("cannot open '{}': {e}", path.display()),
        })?;
        // SAFETY: the mapping is read-only and lives as long as the loader;
        // the file is not expected to be modified while the model is loaded.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| {
            RuntimeError::WeightLoadError {
                tensor: "<file>".into(),
                detail: format!("mmap failed: {e}"),
            }
        })?;
        // Reject a corrupt header up front rather than on first lookup.
        SafeTensors::deserialize(&mmap).map_err(|e| RuntimeError::WeightLoadError {
            tensor: "<header>".into(),
            detail: format!("SafeTensors parse error: {e}"),
        })?;
        tracing::info!(
            "weight loader: mmap'd {} ({:.2} MB)",
            path.display(),
            mmap.len() as f64 / (1024.0 * 1024.0),
        );
        Ok(Self {
            source: Source::File { path, mmap },
        })
    }

    /// Creates a loader that generates seeded random weights.
    pub fn synthetic(seed: u64) -> Self {
        Self {
            source: Source::Synthetic { seed },
        }
    }

    /// Opens the configured weight file, or falls back to synthetic weights
    /// seeded from `config.seed` when it does not exist.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let path = config.weights_path();
        if path.is_file() {
            Self::open(&config.model_path, &config.weights_file)
        } else {
            tracing::warn!(
                "weight loader: '{}' not found, using synthetic mode (seed {})",
                path.display(),
                config.seed,
            );
            Ok(Self::synthetic(config.seed))
        }
    }

    /// Returns `true` if operating in file-backed mode.
    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, Source::File { .. })
    }

    /// Lists every tensor in the weight file, sorted by name. Empty in
    /// synthetic mode.
    pub fn inventory(&self) -> Result<Vec<TensorInfo>, RuntimeError> {
        let Source::File { mmap, .. } = &self.source else {
            return Ok(Vec::new());
        };
        let st = parse(mmap)?;
        let mut infos: Vec<TensorInfo> = st
            .tensors()
            .into_iter()
            .map(|(name, view)| TensorInfo {
                name,
                dtype: format!("{:?}", view.dtype()),
                shape: view.shape().to_vec(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    /// Loads one tensor as F32, checking it has `shape`.
    pub fn load_tensor(&self, name: &str, shape: &Shape) -> Result<Tensor, RuntimeError> {
        self.reader()?.required(name, shape)
    }

    /// Assembles a [`GemmaModel`] for `config` from this loader's weights.
    pub fn build_model(&self, config: &GemmaConfig) -> Result<GemmaModel, RuntimeError> {
        config.validate()?;
        let reader = self.reader()?;
        let e = config.embed_dim();
        let h = config.intermediate_size;
        let eps = config.rms_norm_eps;

        let embedding_weight =
            reader.required("model.embed_tokens.weight", &Shape::matrix(config.vocab_size, e))?;

        let mut blocks = Vec::with_capacity(config.num_hidden_layers);
        for i in 0..config.num_hidden_layers {
            let prefix = format!("model.layers.{i}");
            let attention = MultiHeadAttention::new(
                reader.linear(&format!("{prefix}.self_attn.q_proj"), e, e)?,
                reader.linear(&format!("{prefix}.self_attn.k_proj"), e, e)?,
                reader.linear(&format!("{prefix}.self_attn.v_proj"), e, e)?,
                reader.linear(&format!("{prefix}.self_attn.o_proj"), e, e)?,
                config.num_attention_heads,
            )?;
            blocks.push(TransformerBlock::new(
                attention,
                reader.layer_norm(&format!("{prefix}.input_layernorm"), e, eps)?,
                reader.layer_norm(&format!("{prefix}.post_attention_layernorm"), e, eps)?,
                reader.linear(&format!("{prefix}.mlp.up_proj"), h, e)?,
                reader.linear(&format!("{prefix}.mlp.down_proj"), e, h)?,
            )?);
            tracing::debug!(block = i, "loaded decoder block");
        }

        let final_norm = reader.layer_norm("model.norm", e, eps)?;
        let head_shape = Shape::matrix(config.vocab_size, e);
        let head_weight = match reader.optional("lm_head.weight", &head_shape)? {
            Some(w) => w,
            None => {
                if self.is_file_backed() {
                    tracing::warn!("lm_head.weight not found, tying output projection to embeddings");
                }
                embedding_weight.clone()
            }
        };

        let model = GemmaModel::new(
            EmbeddingLayer::new(embedding_weight)?,
            blocks,
            final_norm,
            LinearLayer::new(head_weight, None)?,
        )?;
        tracing::info!(
            blocks = model.num_blocks(),
            vocab_size = model.vocab_size(),
            embed_dim = model.embed_dim(),
            file_backed = self.is_file_backed(),
            "model assembled"
        );
        Ok(model)
    }

    fn reader(&self) -> Result<Reader<'_>, RuntimeError> {
        match &self.source {
            Source::File { mmap, .. } => Ok(Reader::File(parse(mmap)?)),
            Source::Synthetic { seed } => Ok(Reader::Synthetic(*seed)),
        }
    }
}

impl std::fmt::Debug for WeightLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::File { path, mmap } => f
                .debug_struct("WeightLoader")
                .field("path", path)
                .field("bytes", &mmap.len())
                .finish(),
            Source::Synthetic { seed } => f
                .debug_struct("WeightLoader")
                .field("synthetic_seed", seed)
                .finish(),
        }
    }
}

fn parse(mmap: &memmap2::Mmap) -> Result<SafeTensors<'_>, RuntimeError> {
    SafeTensors::deserialize(mmap).map_err(|e| RuntimeError::WeightLoadError {
        tensor: "<header>".into(),
        detail: format!("SafeTensors parse error: {e}"),
    })
}

/// A parsed view of the weight source used while assembling one model.
enum Reader<'a> {
    File(SafeTensors<'a>),
    Synthetic(u64),
}

impl Reader<'_> {
    fn required(&self, name: &str, shape: &Shape) -> Result<Tensor, RuntimeError> {
        match self {
            Reader::File(st) => {
                let view = st.tensor(name).map_err(|e| RuntimeError::WeightLoadError {
                    tensor: name.to_string(),
                    detail: format!("not found: {e}"),
                })?;
                decode(name, &view, shape)
            }
            Reader::Synthetic(seed) => gaussian(*seed, name, shape),
        }
    }

    /// Like [`required`](Self::required), but a tensor missing from the
    /// file is `None`. Synthetic weights have no optional tensors.
    fn optional(&self, name: &str, shape: &Shape) -> Result<Option<Tensor>, RuntimeError> {
        match self {
            Reader::File(st) => match st.tensor(name) {
                Ok(view) => decode(name, &view, shape).map(Some),
                Err(SafeTensorError::TensorNotFound(_)) => Ok(None),
                Err(e) => Err(RuntimeError::WeightLoadError {
                    tensor: name.to_string(),
                    detail: e.to_string(),
                }),
            },
            Reader::Synthetic(_) => Ok(None),
        }
    }

    fn linear(&self, prefix: &str, out: usize, inp: usize) -> Result<LinearLayer, RuntimeError> {
        let weight = self.required(&format!("{prefix}.weight"), &Shape::matrix(out, inp))?;
        let bias = self.optional(&format!("{prefix}.bias"), &Shape::vector(out))?;
        Ok(LinearLayer::new(weight, bias)?)
    }

    fn layer_norm(&self, prefix: &str, features: usize, eps: f32) -> Result<LayerNorm, RuntimeError> {
        let shape = Shape::vector(features);
        let gamma = match self {
            Reader::File(_) => self.required(&format!("{prefix}.weight"), &shape)?,
            Reader::Synthetic(_) => Tensor::full(shape.clone(), 1.0),
        };
        let beta = self
            .optional(&format!("{prefix}.bias"), &shape)?
            .unwrap_or_else(|| Tensor::zeros(shape, DType::F32));
        Ok(LayerNorm::new(gamma, beta, eps)?)
    }
}

/// Widens a stored tensor to F32 after checking its shape.
fn decode(
    name: &str,
    view: &safetensors::tensor::TensorView<'_>,
    shape: &Shape,
) -> Result<Tensor, RuntimeError> {
    if view.shape() != shape.dims() {
        return Err(RuntimeError::WeightLoadError {
            tensor: name.to_string(),
            detail: format!("expected shape {shape}, found {:?}", view.shape()),
        });
    }
    let data = view.data();
    let load_error = |e: tensor_core::TensorError| RuntimeError::WeightLoadError {
        tensor: name.to_string(),
        detail: e.to_string(),
    };
    let values: Vec<f32> = match view.dtype() {
        Dtype::F32 => {
            return Tensor::from_bytes(shape.clone(), DType::F32, data).map_err(load_error);
        }
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| half::f16::from_bits(u16::from_le_bytes([b[0], b[1]])).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| half::bf16::from_bits(u16::from_le_bytes([b[0], b[1]])).to_f32())
            .collect(),
        other => {
            return Err(RuntimeError::WeightLoadError {
                tensor: name.to_string(),
                detail: format!("unsupported dtype {other:?}"),
            })
        }
    };
    Tensor::from_vec(shape.clone(), values).map_err(load_error)
}

/// Seeded N(0, 0.02²) weights. Each tensor gets its own stream derived
/// from the name, so values do not depend on load order.
fn gaussian(seed: u64, name: &str, shape: &Shape) -> Result<Tensor, RuntimeError> {
    let mut rng = StdRng::seed_from_u64(seed ^ fnv1a(name));
    let values = (0..shape.num_elements())
        .map(|_| {
            // Box-Muller transform.
            let u1: f32 = rng.gen_range(1e-7..1.0);
            let u2: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
            (-2.0 * u1.ln()).sqrt() * u2.cos() * SYNTHETIC_STD
        })
        .collect();
    Ok(Tensor::from_vec(shape.clone(), values)?)
}

fn fnv1a(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_mode() {
        let loader = WeightLoader::synthetic(7);
        assert!(!loader.is_file_backed());
        assert!(loader.inventory().unwrap().is_empty());

        let w = loader.load_tensor("w", &Shape::matrix(64, 64)).unwrap();
        assert_eq!(w.shape(), &Shape::matrix(64, 64));
    }

    #[test]
    fn test_synthetic_is_seeded_and_name_dependent() {
        let a = WeightLoader::synthetic(1);
        let b = WeightLoader::synthetic(1);
        let shape = Shape::vector(16);
        assert_eq!(
            a.load_tensor("x", &shape).unwrap(),
            b.load_tensor("x", &shape).unwrap()
        );
        assert_ne!(
            a.load_tensor("x", &shape).unwrap(),
            a.load_tensor("y", &shape).unwrap()
        );
        assert_ne!(
            a.load_tensor("x", &shape).unwrap(),
            WeightLoader::synthetic(2).load_tensor("x", &shape).unwrap()
        );
    }

    #[test]
    fn test_synthetic_distribution() {
        let w = WeightLoader::synthetic(3)
            .load_tensor("dist", &Shape::vector(20_000))
            .unwrap();
        let v = w.as_f32_slice();
        let mean = v.iter().sum::<f32>() / v.len() as f32;
        let std = (v.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / v.len() as f32).sqrt();
        assert!(mean.abs() < 0.002, "mean {mean}");
        assert!((std - SYNTHETIC_STD).abs() < 0.002, "std {std}");
    }

    #[test]
    fn test_synthetic_build_model() {
        let model = WeightLoader::synthetic(42)
            .build_model(&GemmaConfig::toy())
            .unwrap();
        assert_eq!(model.num_blocks(), 2);
        assert_eq!(model.vocab_size(), 100);
        assert_eq!(model.embed_dim(), 12);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = GemmaConfig {
            num_attention_heads: 5,
            ..GemmaConfig::toy()
        };
        assert!(matches!(
            WeightLoader::synthetic(0).build_model(&config),
            Err(RuntimeError::ModelError(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            WeightLoader::open(dir.path(), "model.safetensors"),
            Err(RuntimeError::WeightLoadError { .. })
        ));
    }

    #[test]
    fn test_from_config_falls_back_to_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let loader = WeightLoader::from_config(&RuntimeConfig::for_model(dir.path())).unwrap();
        assert!(!loader.is_file_backed());
    }

    #[test]
    fn test_decode_f32_little_endian() {
        let bytes: Vec<u8> = [1.5f32, -2.0, 0.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = safetensors::tensor::TensorView::new(Dtype::F32, vec![3], &bytes).unwrap();

        let t = decode("w", &view, &Shape::vector(3)).unwrap();

        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.as_f32_slice(), &[1.5, -2.0, 0.25]);
    }

    #[test]
    fn test_decode_wrong_shape() {
        let bytes = [0u8; 8];
        let view = safetensors::tensor::TensorView::new(Dtype::F32, vec![2], &bytes).unwrap();
        assert!(matches!(
            decode("w", &view, &Shape::vector(3)),
            Err(RuntimeError::WeightLoadError { tensor, .. }) if tensor == "w"
        ));
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
