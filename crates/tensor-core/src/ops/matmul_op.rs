// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batched matrix multiplication.

use super::ensure_f32;
use crate::{Tensor, TensorError, TensorView};

/// Performs (batched) matrix multiplication: `output = lhs @ rhs`.
///
/// `lhs` is `[..., M, K]` and `rhs` is `[..., K, N]`; `output` must be
/// `[..., M, N]`. A rank-2 `rhs` is shared across every leading batch of
/// `lhs`, otherwise the batch dimensions of both operands must match.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn matmul(
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    batched_matmul("matmul", lhs, rhs, false, output)
}

/// Performs (batched) matrix multiplication against a transposed right
/// operand: `output = lhs @ rhsᵀ`.
///
/// `lhs` is `[..., M, K]` and `rhs` is `[..., N, K]`; `output` is
/// `[..., M, N]`. This is the layout of a linear layer's `(out, in)` weight
/// and of attention keys, so neither needs to be transposed in memory.
///
/// # Errors
/// Same as [`matmul`].
pub fn matmul_transposed(
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    batched_matmul("matmul_transposed", lhs, rhs, true, output)
}

fn batched_matmul(
    op: &'static str,
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    rhs_transposed: bool,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    ensure_f32(op, lhs)?;
    ensure_f32(op, rhs)?;
    ensure_f32(op, &output.view())?;

    let expected = lhs
        .shape()
        .matmul_output(rhs.shape(), rhs_transposed)
        .ok_or_else(|| TensorError::ShapeMismatch {
            op,
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        })?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let lhs_dims = lhs.shape().dims();
    let rank = lhs_dims.len();
    let m = lhs_dims[rank - 2];
    let k = lhs_dims[rank - 1];
    let n = expected.dims()[rank - 1];
    let batches: usize = lhs_dims[..rank - 2].iter().product();
    let rhs_shared = rhs.shape().rank() == 2;

    let a = lhs.as_f32_slice();
    let b = rhs.as_f32_slice();
    let c = output.as_f32_slice_mut();

    for batch in 0..batches {
        let a_mat = &a[batch * m * k..(batch + 1) * m * k];
        let b_mat = if rhs_shared {
            b
        } else {
            &b[batch * k * n..(batch + 1) * k * n]
        };
        let c_mat = &mut c[batch * m * n..(batch + 1) * m * n];
        if rhs_transposed {
            matmul_nt_f32(a_mat, b_mat, c_mat, m, k, n);
        } else {
            matmul_nn_f32(a_mat, b_mat, c_mat, m, k, n);
        }
    }

    Ok(())
}

/// Portable f32 kernel for `C = A @ B`.
///
/// Uses an ikj loop order so the inner loop is a saxpy over a row of `C`,
/// sequential in memory.
fn matmul_nn_f32(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);
    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                *cv += a_ip * bv;
            }
        }
    }
}

/// Portable f32 kernel for `C = A @ Bᵀ` with `B` stored as `[N, K]`.
///
/// Both operands are walked row-wise, so each output element is a
/// contiguous dot product.
fn matmul_nt_f32(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let b_row = &b[j * k..(j + 1) * k];
            c[i * n + j] = a_row.iter().zip(b_row).map(|(x, y)| x * y).sum();
        }
    }
}
