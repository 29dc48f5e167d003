// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Each operation writes into a caller-provided output tensor whose shape is
//! checked against the operands before any element is touched, so a failed
//! call never leaves partially-written results behind.

mod elementwise_op;
mod gather_op;
mod gelu_op;
mod layer_norm_op;
mod matmul_op;
mod permute_op;
mod softmax_op;

pub use elementwise_op::{add, scale};
pub use gather_op::gather_rows;
pub use gelu_op::gelu;
pub use layer_norm_op::layer_norm;
pub use matmul_op::{matmul, matmul_transposed};
pub use permute_op::permute;
pub use softmax_op::softmax;

use crate::{DType, TensorError, TensorView};

/// Rejects any operand that is not `F32`.
pub(crate) fn ensure_f32(op: &'static str, view: &TensorView<'_>) -> Result<(), TensorError> {
    if view.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op,
            dtype: view.dtype(),
        });
    }
    Ok(())
}

/// Rejects an output whose shape differs from the input's.
pub(crate) fn ensure_same_shape(
    op: &'static str,
    input: &TensorView<'_>,
    output: &TensorView<'_>,
) -> Result<(), TensorError> {
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}
