// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # gemma-model
//!
//! Forward inference for a Gemma-style decoder-only transformer, built from
//! [`tensor_core`] kernels.
//!
//! Components, leaf to root:
//! - [`LinearLayer`]: `y = x·Wᵀ + b`.
//! - [`LayerNorm`]: per-row normalization with learnable scale and shift.
//! - [`EmbeddingLayer`]: token id → vector lookup with strict range checks.
//! - [`MultiHeadAttention`]: scaled dot-product self-attention.
//! - [`TransformerBlock`]: pre-norm attention and GELU feed-forward, each
//!   wrapped in a residual connection.
//! - [`GemmaModel`]: embedding, blocks, final norm and output projection.
//!
//! Every component validates its weights at construction and is read-only
//! afterwards. [`GemmaConfig`] carries the hyperparameters of a
//! HuggingFace-style `config.json`; weight loading lives in the `runtime`
//! crate.
//!
//! # Example
//! ```
//! use gemma_model::{
//!     EmbeddingLayer, GemmaModel, LayerNorm, LinearLayer,
//! };
//! use tensor_core::{Shape, Tensor};
//!
//! let embedding = EmbeddingLayer::new(Tensor::full(Shape::matrix(10, 4), 0.1)).unwrap();
//! let head = LinearLayer::new(Tensor::full(Shape::matrix(10, 4), 0.2), None).unwrap();
//! let model = GemmaModel::new(embedding, vec![], LayerNorm::identity(4, 1e-5).unwrap(), head).unwrap();
//!
//! let ids = Tensor::from_i64(Shape::matrix(1, 3), &[1, 2, 3]).unwrap();
//! let logits = model.forward(&ids).unwrap();
//! assert_eq!(logits.shape(), &Shape::from([1, 3, 10]));
//! ```

mod attention;
mod block;
mod config;
mod embedding;
mod error;
mod layer_norm;
mod linear;
mod model;

pub use attention::MultiHeadAttention;
pub use block::TransformerBlock;
pub use config::GemmaConfig;
pub use embedding::EmbeddingLayer;
pub use error::ModelError;
pub use layer_norm::LayerNorm;
pub use linear::LinearLayer;
pub use model::{GemmaModel, Stage};
