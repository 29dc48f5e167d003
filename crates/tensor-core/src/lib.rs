// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Lightweight tensor types and arithmetic kernels for transformer inference.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, n-dimensional, typed buffer (`f32` activations
//!   and weights, `i64` token ids) with zero-copy [`TensorView`]s.
//! - [`Shape`]: shape descriptors with stride, broadcast, contraction and
//!   permutation rules.
//! - [`DType`]: supported element data types.
//! - Kernels: batched matrix multiplication (plain and right-transposed),
//!   softmax, layer normalization, GELU, broadcast add, scaling, axis
//!   permutation and row gather.
//!
//! # Design Goals
//! - Zero-copy views and metadata-only reshapes.
//! - Kernels write into caller-allocated outputs and validate every operand
//!   shape before touching data.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    add, gather_rows, gelu, layer_norm, matmul, matmul_transposed, permute, scale, softmax,
};
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
