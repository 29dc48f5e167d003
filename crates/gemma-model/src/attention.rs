// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multi-head scaled dot-product self-attention.
//!
//! The pass projects the input to queries, keys and values, splits each
//! into `num_heads` slices of `head_dim` features, attends every position
//! to every other position within a head, and merges the heads back before
//! the output projection:
//!
//! ```text
//! (B, S, E) ─q/k/v─▶ (B, S, H, D) ─permute─▶ (B, H, S, D)
//! scores  = softmax(Q·Kᵀ / √D)               (B, H, S, S)
//! context = scores · V ─permute─▶ (B, S, H, D) ─reshape─▶ (B, S, E) ─o─▶
//! ```
//!
//! There is no causal mask: every position sees the whole sequence.

use tensor_core::{matmul, matmul_transposed, permute, scale, softmax, DType, Shape, Tensor};

use crate::error::InLayer;
use crate::{LinearLayer, ModelError};

/// Swaps the sequence and head axes of a rank-4 tensor.
const SWAP_SEQ_HEADS: [usize; 4] = [0, 2, 1, 3];

/// Multi-head scaled dot-product self-attention with bias-free or biased
/// `q`, `k`, `v` and output projections.
#[derive(Debug, Clone)]
pub struct MultiHeadAttention {
    q_proj: LinearLayer,
    k_proj: LinearLayer,
    v_proj: LinearLayer,
    o_proj: LinearLayer,
    num_heads: usize,
    head_dim: usize,
}

impl MultiHeadAttention {
    /// Assembles the attention layer from its four `(embed_dim, embed_dim)`
    /// projections.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] if `num_heads` is zero, does not divide
    /// `embed_dim`, or any projection is not square in `embed_dim`.
    pub fn new(
        q_proj: LinearLayer,
        k_proj: LinearLayer,
        v_proj: LinearLayer,
        o_proj: LinearLayer,
        num_heads: usize,
    ) -> Result<Self, ModelError> {
        let embed_dim = q_proj.in_features();
        if num_heads == 0 {
            return Err(ModelError::Configuration(
                "num_heads must be positive".to_string(),
            ));
        }
        if embed_dim % num_heads != 0 {
            return Err(ModelError::Configuration(format!(
                "embed_dim {embed_dim} must be divisible by num_heads {num_heads}"
            )));
        }
        for (name, proj) in [("q", &q_proj), ("k", &k_proj), ("v", &v_proj), ("o", &o_proj)] {
            if proj.in_features() != embed_dim || proj.out_features() != embed_dim {
                return Err(ModelError::Configuration(format!(
                    "{name}_proj must map {embed_dim} -> {embed_dim}, got {} -> {}",
                    proj.in_features(),
                    proj.out_features()
                )));
            }
        }
        Ok(Self {
            q_proj,
            k_proj,
            v_proj,
            o_proj,
            num_heads,
            head_dim: embed_dim / num_heads,
        })
    }

    /// Model width, `num_heads * head_dim`.
    pub fn embed_dim(&self) -> usize {
        self.num_heads * self.head_dim
    }

    /// Number of attention heads.
    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Width of each head; scores are scaled by `1 / sqrt(head_dim)`.
    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    /// `(batch, seq_len, embed_dim)` → `(batch, seq_len, embed_dim)`.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let shape = input.shape();
        if shape.rank() != 3 || shape.last_dim() != Some(self.embed_dim()) {
            return Err(ModelError::ShapeMismatch {
                layer: "attention",
                expected: Shape::from([
                    shape.dim(0).unwrap_or(1),
                    shape.dim(1).unwrap_or(1),
                    self.embed_dim(),
                ]),
                actual: shape.clone(),
            });
        }
        let (batch, seq_len) = (shape.dims()[0], shape.dims()[1]);
        let heads_shape = Shape::from([batch, self.num_heads, seq_len, self.head_dim]);

        let q = self.split_heads(self.q_proj.forward(input)?)?;
        let k = self.split_heads(self.k_proj.forward(input)?)?;
        let v = self.split_heads(self.v_proj.forward(input)?)?;

        let scores_shape = Shape::from([batch, self.num_heads, seq_len, seq_len]);
        let mut scores = Tensor::zeros(scores_shape.clone(), DType::F32);
        matmul_transposed(&q.view(), &k.view(), &mut scores).in_layer("attention")?;

        let mut scaled = Tensor::zeros(scores_shape, DType::F32);
        let factor = 1.0 / (self.head_dim as f32).sqrt();
        scale(&scores.view(), factor, &mut scaled).in_layer("attention")?;

        let mut weights = scores;
        softmax(&scaled.view(), &mut weights).in_layer("attention")?;

        let mut context = Tensor::zeros(heads_shape, DType::F32);
        matmul(&weights.view(), &v.view(), &mut context).in_layer("attention")?;

        let merged = self.merge_heads(&context, batch, seq_len)?;
        self.o_proj.forward(&merged)
    }

    /// `(B, S, E)` → `(B, H, S, D)`.
    fn split_heads(&self, projected: Tensor) -> Result<Tensor, ModelError> {
        let dims = projected.shape().dims();
        let (batch, seq_len) = (dims[0], dims[1]);
        let split = projected
            .reshape(Shape::from([batch, seq_len, self.num_heads, self.head_dim]))
            .in_layer("attention")?;
        let mut heads = Tensor::zeros(
            Shape::from([batch, self.num_heads, seq_len, self.head_dim]),
            DType::F32,
        );
        permute(&split.view(), &SWAP_SEQ_HEADS, &mut heads).in_layer("attention")?;
        Ok(heads)
    }

    /// `(B, H, S, D)` → `(B, S, E)`.
    fn merge_heads(
        &self,
        context: &Tensor,
        batch: usize,
        seq_len: usize,
    ) -> Result<Tensor, ModelError> {
        let mut seq_major = Tensor::zeros(
            Shape::from([batch, seq_len, self.num_heads, self.head_dim]),
            DType::F32,
        );
        permute(&context.view(), &SWAP_SEQ_HEADS, &mut seq_major).in_layer("attention")?;
        seq_major
            .reshape(Shape::from([batch, seq_len, self.embed_dim()]))
            .in_layer("attention")
    }
}
