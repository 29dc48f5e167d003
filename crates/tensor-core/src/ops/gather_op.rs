// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Row gather (table lookup).

use super::ensure_f32;
use crate::{DType, Tensor, TensorError, TensorView};

/// Copies `table[indices[i]]` into row `i` of `output`.
///
/// `table` is `[rows, width]` `F32`, `indices` is an `I64` tensor of any
/// shape, and `output` is `indices.shape() ++ [width]`. Every index is
/// checked: negative values and values `>= rows` are errors, never wrapped
/// or clamped.
///
/// # Errors
/// Returns [`TensorError::IndexOutOfRange`] for the first invalid index,
/// naming its flat position in `indices`.
pub fn gather_rows(
    table: &TensorView<'_>,
    indices: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    ensure_f32("gather_rows", table)?;
    ensure_f32("gather_rows", &output.view())?;
    if indices.dtype() != DType::I64 {
        return Err(TensorError::UnsupportedDType {
            op: "gather_rows",
            dtype: indices.dtype(),
        });
    }

    let table_dims = table.shape().dims();
    if table_dims.len() != 2 {
        return Err(TensorError::ShapeMismatch {
            op: "gather_rows (table)",
            lhs: table.shape().clone(),
            rhs: indices.shape().clone(),
        });
    }
    let (rows, width) = (table_dims[0], table_dims[1]);

    let mut out_dims = indices.shape().dims().to_vec();
    out_dims.push(width);
    if output.shape().dims() != out_dims.as_slice() {
        return Err(TensorError::ShapeMismatch {
            op: "gather_rows (output)",
            lhs: out_dims.into(),
            rhs: output.shape().clone(),
        });
    }

    let ids = indices.as_i64_slice();
    // Validate everything up front so a failure leaves `output` untouched.
    for (position, &index) in ids.iter().enumerate() {
        if index < 0 || index as u64 >= rows as u64 {
            return Err(TensorError::IndexOutOfRange {
                op: "gather_rows",
                index,
                bound: rows,
                position,
            });
        }
    }

    let src = table.as_f32_slice();
    let dst = output.as_f32_slice_mut();
    if width == 0 {
        return Ok(());
    }
    for (row_dst, &index) in dst.chunks_exact_mut(width).zip(ids) {
        let start = index as usize * width;
        row_dst.copy_from_slice(&src[start..start + width]);
    }

    Ok(())
}
