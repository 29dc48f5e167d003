// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use super::{ensure_f32, ensure_same_shape};
use crate::{Tensor, TensorError, TensorView};

/// Normalises every row along the last axis into a probability
/// distribution. The row maximum is subtracted before exponentiation, so
/// large scores do not overflow.
///
/// `input` and `output` must share a shape and be `F32`. This is applied to
/// `(batch, heads, seq, seq)` attention scores.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    ensure_f32("softmax", input)?;
    ensure_f32("softmax", &output.view())?;
    ensure_same_shape("softmax", input, &output.view())?;

    let Some(last_dim) = input.shape().last_dim() else {
        output.as_f32_slice_mut()[0] = 1.0;
        return Ok(());
    };
    if last_dim == 0 {
        return Ok(());
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    for (row_src, row_dst) in src.chunks_exact(last_dim).zip(dst.chunks_exact_mut(last_dim)) {
        softmax_row(row_src, row_dst);
    }

    Ok(())
}

/// Writes `exp(x - max) / Σ exp(x - max)` for one row.
fn softmax_row(src: &[f32], dst: &mut [f32]) {
    let max = src.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut total = 0.0f32;
    for (d, &x) in dst.iter_mut().zip(src) {
        *d = (x - max).exp();
        total += *d;
    }
    if total > 0.0 {
        let inv = total.recip();
        dst.iter_mut().for_each(|d| *d *= inv);
    }
}
