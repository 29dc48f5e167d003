// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer does not hold exactly one element per shape slot.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype:?} for operation {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },

    /// An index tensor referenced a row outside `[0, bound)`.
    #[error("index {index} at position {position} out of range [0, {bound}) in {op}")]
    IndexOutOfRange {
        op: &'static str,
        index: i64,
        bound: usize,
        position: usize,
    },

    /// A reshape would change the number of elements.
    #[error("cannot reshape {from} ({} elements) into {to} ({} elements)", from.num_elements(), to.num_elements())]
    InvalidReshape { from: Shape, to: Shape },

    /// A permutation was not a reordering of `0..rank`.
    #[error("invalid axes {axes:?} for tensor of shape {shape}")]
    InvalidAxes { axes: Vec<usize>, shape: Shape },
}
