// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Gaussian Error Linear Unit (GELU) activation.

use super::{ensure_f32, ensure_same_shape};
use crate::{Tensor, TensorError, TensorView};

/// Applies the exact GELU activation element-wise:
///
/// `GELU(x) = 0.5 * x * (1 + erf(x / sqrt(2)))`
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn gelu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    ensure_f32("gelu", input)?;
    ensure_f32("gelu", &output.view())?;
    ensure_same_shape("gelu", input, &output.view())?;

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for (d, &x) in dst.iter_mut().zip(src.iter()) {
        *d = gelu_scalar(x);
    }

    Ok(())
}

/// Computes GELU for a single f32 value.
#[inline(always)]
fn gelu_scalar(x: f32) -> f32 {
    0.5 * x * (1.0 + libm::erff(x * std::f32::consts::FRAC_1_SQRT_2))
}
