// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer normalization operation.

use super::{ensure_f32, ensure_same_shape};
use crate::{Shape, Tensor, TensorError, TensorView};

/// Applies layer normalization over the last dimension:
///
/// `output = gamma * (x - mean) / sqrt(var + eps) + beta`
///
/// The variance is the biased (population) estimate, `mean((x - mean)²)`.
///
/// # Arguments
/// * `input` : the input tensor (rank ≥ 1, normalised over last dim).
/// * `gamma` : scale parameter, 1-D with length equal to the last dimension.
/// * `beta`  : shift parameter, 1-D with length equal to the last dimension.
/// * `eps`   : small constant for numerical stability (typically 1e-5).
/// * `output`: pre-allocated output tensor (same shape as `input`).
///
/// # Errors
/// Returns errors if shapes are incompatible or dtype is not F32.
pub fn layer_norm(
    input: &TensorView<'_>,
    gamma: &TensorView<'_>,
    beta: &TensorView<'_>,
    eps: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    for view in [input, gamma, beta, &output.view()] {
        ensure_f32("layer_norm", view)?;
    }
    ensure_same_shape("layer_norm", input, &output.view())?;

    let Some(last_dim) = input.shape().last_dim() else {
        return Err(TensorError::ShapeMismatch {
            op: "layer_norm (scalar input)",
            lhs: input.shape().clone(),
            rhs: gamma.shape().clone(),
        });
    };

    // gamma and beta must be 1-D with length == last_dim.
    let param_shape = Shape::vector(last_dim);
    if gamma.shape() != &param_shape {
        return Err(TensorError::ShapeMismatch {
            op: "layer_norm (gamma)",
            lhs: gamma.shape().clone(),
            rhs: input.shape().clone(),
        });
    }
    if beta.shape() != &param_shape {
        return Err(TensorError::ShapeMismatch {
            op: "layer_norm (beta)",
            lhs: beta.shape().clone(),
            rhs: input.shape().clone(),
        });
    }
    if last_dim == 0 {
        return Ok(());
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    let g = gamma.as_f32_slice();
    let b = beta.as_f32_slice();

    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        let mean: f32 = row_src.iter().sum::<f32>() / last_dim as f32;
        let var: f32 =
            row_src.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / last_dim as f32;

        let inv_std = 1.0 / (var + eps).sqrt();
        for j in 0..last_dim {
            row_dst[j] = g[j] * (row_src[j] - mean) * inv_std + b[j];
        }
    }

    Ok(())
}
