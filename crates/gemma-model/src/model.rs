// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The full decoder: embedding, blocks, final norm and output projection.

use std::fmt;
use std::time::{Duration, Instant};

use tensor_core::Tensor;

use crate::{EmbeddingLayer, LayerNorm, LinearLayer, ModelError, TransformerBlock};

/// A step of the forward pass, reported to [`GemmaModel::forward_traced`]
/// observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    Block(usize),
    FinalNorm,
    OutputProjection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Embedding => f.write_str("embedding"),
            Stage::Block(i) => write!(f, "block.{i}"),
            Stage::FinalNorm => f.write_str("final_norm"),
            Stage::OutputProjection => f.write_str("output_projection"),
        }
    }
}

/// A Gemma-style decoder-only transformer.
///
/// The model is immutable after construction and holds no per-call state,
/// so one instance can serve concurrent forward passes from several threads.
#[derive(Debug, Clone)]
pub struct GemmaModel {
    embedding: EmbeddingLayer,
    blocks: Vec<TransformerBlock>,
    final_norm: LayerNorm,
    output: LinearLayer,
}

impl GemmaModel {
    /// Assembles the decoder from its parts.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] if a block or the final norm disagrees
    /// with the embedding width, or `output` does not map
    /// `embed_dim → vocab_size`. An empty block list is allowed.
    pub fn new(
        embedding: EmbeddingLayer,
        blocks: Vec<TransformerBlock>,
        final_norm: LayerNorm,
        output: LinearLayer,
    ) -> Result<Self, ModelError> {
        let embed_dim = embedding.embed_dim();
        if let Some((i, block)) = blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.embed_dim() != embed_dim)
        {
            return Err(ModelError::Configuration(format!(
                "block {i} has embed_dim {}, embedding has {embed_dim}",
                block.embed_dim()
            )));
        }
        if final_norm.features() != embed_dim {
            return Err(ModelError::Configuration(format!(
                "final norm covers {} features, embedding has {embed_dim}",
                final_norm.features()
            )));
        }
        if output.in_features() != embed_dim || output.out_features() != embedding.vocab_size() {
            return Err(ModelError::Configuration(format!(
                "output projection maps {} -> {}, expected {embed_dim} -> {}",
                output.in_features(),
                output.out_features(),
                embedding.vocab_size()
            )));
        }
        tracing::debug!(
            vocab_size = embedding.vocab_size(),
            embed_dim,
            blocks = blocks.len(),
            "assembled model"
        );
        Ok(Self {
            embedding,
            blocks,
            final_norm,
            output,
        })
    }

    /// Number of logits produced per position.
    pub fn vocab_size(&self) -> usize {
        self.embedding.vocab_size()
    }

    /// Width of the residual stream.
    pub fn embed_dim(&self) -> usize {
        self.embedding.embed_dim()
    }

    /// Number of decoder blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// `(batch, seq_len)` `I64` token ids → `(batch, seq_len, vocab_size)`
    /// logits.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor, ModelError> {
        self.forward_traced(token_ids, |_, _| {})
    }

    /// Runs [`forward`](Self::forward), calling `observer` with each stage
    /// and its wall-clock time as the stage completes.
    pub fn forward_traced<F>(&self, token_ids: &Tensor, mut observer: F) -> Result<Tensor, ModelError>
    where
        F: FnMut(Stage, Duration),
    {
        tracing::debug!(shape = %token_ids.shape(), "forward pass");

        let mut hidden = timed(Stage::Embedding, &mut observer, || {
            self.embedding.forward(token_ids)
        })?;
        for (i, block) in self.blocks.iter().enumerate() {
            hidden = timed(Stage::Block(i), &mut observer, || block.forward(&hidden))?;
        }
        let normed = timed(Stage::FinalNorm, &mut observer, || {
            self.final_norm.forward(&hidden)
        })?;
        timed(Stage::OutputProjection, &mut observer, || {
            self.output.forward(&normed)
        })
    }
}

fn timed<F, O>(stage: Stage, observer: &mut O, f: F) -> Result<Tensor, ModelError>
where
    F: FnOnce() -> Result<Tensor, ModelError>,
    O: FnMut(Stage, Duration),
{
    let start = Instant::now();
    let out = f()?;
    let elapsed = start.elapsed();
    tracing::trace!(%stage, shape = %out.shape(), ?elapsed, "stage complete");
    observer(stage, elapsed);
    Ok(out)
}
