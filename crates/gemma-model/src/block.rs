// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pre-norm decoder block.

use tensor_core::{add, gelu, DType, Tensor};

use crate::error::InLayer;
use crate::{LayerNorm, LinearLayer, ModelError, MultiHeadAttention};

/// One decoder block:
///
/// ```text
/// r   = x + attention(norm_1(x))
/// out = r + down(gelu(up(norm_2(r))))
/// ```
#[derive(Debug, Clone)]
pub struct TransformerBlock {
    attention: MultiHeadAttention,
    attention_norm: LayerNorm,
    ffn_norm: LayerNorm,
    ffn_up: LinearLayer,
    ffn_down: LinearLayer,
}

impl TransformerBlock {
    /// Assembles a block from its attention, norms and feed-forward pair.
    ///
    /// # Errors
    /// [`ModelError::Configuration`] unless both norms cover `embed_dim`,
    /// `ffn_up` maps `embed_dim → hidden` and `ffn_down` maps
    /// `hidden → embed_dim`.
    pub fn new(
        attention: MultiHeadAttention,
        attention_norm: LayerNorm,
        ffn_norm: LayerNorm,
        ffn_up: LinearLayer,
        ffn_down: LinearLayer,
    ) -> Result<Self, ModelError> {
        let embed_dim = attention.embed_dim();
        if attention_norm.features() != embed_dim || ffn_norm.features() != embed_dim {
            return Err(ModelError::Configuration(format!(
                "block norms cover {} and {} features, attention uses {embed_dim}",
                attention_norm.features(),
                ffn_norm.features()
            )));
        }
        if ffn_up.in_features() != embed_dim
            || ffn_down.out_features() != embed_dim
            || ffn_up.out_features() != ffn_down.in_features()
        {
            return Err(ModelError::Configuration(format!(
                "feed-forward {} -> {} -> {} -> {} does not round-trip embed_dim {embed_dim}",
                ffn_up.in_features(),
                ffn_up.out_features(),
                ffn_down.in_features(),
                ffn_down.out_features()
            )));
        }
        Ok(Self {
            attention,
            attention_norm,
            ffn_norm,
            ffn_up,
            ffn_down,
        })
    }

    /// Width of the residual stream.
    pub fn embed_dim(&self) -> usize {
        self.attention.embed_dim()
    }

    /// Output has the same shape as `input`.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let attended = self.attention.forward(&self.attention_norm.forward(input)?)?;
        let residual = residual_add(input, &attended)?;

        let up = self.ffn_up.forward(&self.ffn_norm.forward(&residual)?)?;
        let mut activated = Tensor::zeros(up.shape().clone(), DType::F32);
        gelu(&up.view(), &mut activated).in_layer("feed_forward")?;
        let down = self.ffn_down.forward(&activated)?;

        residual_add(&residual, &down)
    }
}

fn residual_add(input: &Tensor, update: &Tensor) -> Result<Tensor, ModelError> {
    if input.shape() != update.shape() {
        return Err(ModelError::ShapeMismatch {
            layer: "residual",
            expected: input.shape().clone(),
            actual: update.shape().clone(),
        });
    }
    let mut out = Tensor::zeros(input.shape().clone(), DType::F32);
    add(&input.view(), &update.view(), &mut out).in_layer("residual")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn linear(out: usize, inp: usize, f: impl Fn(usize, usize) -> f32) -> LinearLayer {
        let values = (0..out * inp).map(|i| f(i / inp, i % inp)).collect();
        LinearLayer::new(Tensor::from_vec(Shape::matrix(out, inp), values).unwrap(), None).unwrap()
    }

    fn wavy(out: usize, inp: usize) -> LinearLayer {
        linear(out, inp, |r, c| ((r * 7 + c * 3) as f32 * 0.1).sin() * 0.2)
    }

    fn block(embed: usize, heads: usize, hidden: usize, zero_outputs: bool) -> TransformerBlock {
        let o_proj = if zero_outputs {
            linear(embed, embed, |_, _| 0.0)
        } else {
            wavy(embed, embed)
        };
        let down = if zero_outputs {
            linear(embed, hidden, |_, _| 0.0)
        } else {
            wavy(embed, hidden)
        };
        let attention = MultiHeadAttention::new(
            wavy(embed, embed),
            wavy(embed, embed),
            wavy(embed, embed),
            o_proj,
            heads,
        )
        .unwrap();
        TransformerBlock::new(
            attention,
            LayerNorm::identity(embed, 1e-5).unwrap(),
            LayerNorm::identity(embed, 1e-5).unwrap(),
            wavy(hidden, embed),
            down,
        )
        .unwrap()
    }

    fn input(batch: usize, seq: usize, embed: usize) -> Tensor {
        let data = (0..batch * seq * embed).map(|i| (i as f32 * 0.53).cos()).collect();
        Tensor::from_vec(Shape::from([batch, seq, embed]), data).unwrap()
    }

    #[test]
    fn test_shape_preserved() {
        let b = block(12, 4, 48, false);
        let x = input(2, 5, 12);

        let out = b.forward(&x).unwrap();

        assert_eq!(out.shape(), x.shape());
        assert_ne!(out.as_f32_slice(), x.as_f32_slice());
    }

    #[test]
    fn test_zero_sublayers_return_input_exactly() {
        let b = block(12, 4, 48, true);
        let x = input(1, 5, 12);

        let out = b.forward(&x).unwrap();

        assert_eq!(out.as_f32_slice(), x.as_f32_slice());
    }

    #[test]
    fn test_mismatched_feed_forward_rejected() {
        let attention = MultiHeadAttention::new(
            wavy(12, 12),
            wavy(12, 12),
            wavy(12, 12),
            wavy(12, 12),
            4,
        )
        .unwrap();
        let result = TransformerBlock::new(
            attention,
            LayerNorm::identity(12, 1e-5).unwrap(),
            LayerNorm::identity(12, 1e-5).unwrap(),
            wavy(48, 12),
            wavy(12, 32),
        );
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_wrong_width_input() {
        let b = block(12, 4, 48, false);
        let x = input(1, 5, 8);
        assert!(matches!(
            b.forward(&x),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
