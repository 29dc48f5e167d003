// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise arithmetic: broadcast addition and scalar scaling.

use super::{ensure_f32, ensure_same_shape};
use crate::{Tensor, TensorError, TensorView};

/// Computes `output = lhs + rhs`, broadcasting `rhs` onto `lhs`.
///
/// `rhs` must satisfy [`Shape::broadcasts_to`](crate::Shape::broadcasts_to)
/// against `lhs` (e.g. a `[features]` bias onto `[batch, seq, features]`,
/// or an identical shape for a residual connection). `output` has the shape
/// of `lhs`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `rhs` does not broadcast or the
/// output shape differs from `lhs`.
/// Returns [`TensorError::UnsupportedDType`] if any operand is not `F32`.
pub fn add(
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    ensure_f32("add", lhs)?;
    ensure_f32("add", rhs)?;
    ensure_f32("add", &output.view())?;
    if !rhs.shape().broadcasts_to(lhs.shape()) {
        return Err(TensorError::ShapeMismatch {
            op: "add",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }
    ensure_same_shape("add (output)", lhs, &output.view())?;

    let a = lhs.as_f32_slice();
    let b = rhs.as_f32_slice();
    let c = output.as_f32_slice_mut();

    if lhs.shape() == rhs.shape() {
        for ((cv, &av), &bv) in c.iter_mut().zip(a).zip(b) {
            *cv = av + bv;
        }
        return Ok(());
    }

    // Trailing-suffix broadcast (the bias case) cycles `rhs` row by row.
    let suffix = &lhs.shape().dims()[lhs.shape().rank() - rhs.shape().rank()..];
    if suffix == rhs.shape().dims() && !b.is_empty() {
        for (c_row, a_row) in c.chunks_exact_mut(b.len()).zip(a.chunks_exact(b.len())) {
            for ((cv, &av), &bv) in c_row.iter_mut().zip(a_row).zip(b) {
                *cv = av + bv;
            }
        }
        return Ok(());
    }

    // General right-aligned broadcast: size-1 dims of `rhs` get stride 0.
    let out_dims = lhs.shape().dims();
    let offset = out_dims.len() - rhs.shape().rank();
    let rhs_strides = rhs.shape().strides();
    let mut strides = vec![0usize; out_dims.len()];
    for (i, &d) in rhs.shape().dims().iter().enumerate() {
        if d != 1 {
            strides[offset + i] = rhs_strides[i];
        }
    }
    let mut index = vec![0usize; out_dims.len()];
    for (cv, &av) in c.iter_mut().zip(a) {
        let rhs_pos: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        *cv = av + b[rhs_pos];
        increment(&mut index, out_dims);
    }

    Ok(())
}

/// Computes `output = input * factor` element-wise.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn scale(input: &TensorView<'_>, factor: f32, output: &mut Tensor) -> Result<(), TensorError> {
    ensure_f32("scale", input)?;
    ensure_f32("scale", &output.view())?;
    ensure_same_shape("scale", input, &output.view())?;

    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(input.as_f32_slice()) {
        *d = x * factor;
    }
    Ok(())
}

/// Advances a row-major multi-index by one element.
pub(crate) fn increment(index: &mut [usize], dims: &[usize]) {
    for axis in (0..dims.len()).rev() {
        index[axis] += 1;
        if index[axis] < dims[axis] {
            return;
        }
        index[axis] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Shape};

    #[test]
    fn test_add_same_shape() {
        let a = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Tensor::from_f32(Shape::matrix(2, 2), &[10.0, 20.0, 30.0, 40.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);

        add(&a.view(), &b.view(), &mut c).unwrap();

        assert_eq!(c.as_f32_slice(), &[11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_add_bias_broadcast() {
        // [1, 2, 3] + [3] adds the bias to every row.
        let a = Tensor::zeros(Shape::from([1, 2, 3]), DType::F32);
        let bias = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
        let mut c = Tensor::zeros(Shape::from([1, 2, 3]), DType::F32);

        add(&a.view(), &bias.view(), &mut c).unwrap();

        assert_eq!(c.as_f32_slice(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_add_column_broadcast() {
        // [2, 3] + [2, 1] adds one value per row.
        let a = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]).unwrap();
        let col = Tensor::from_f32(Shape::matrix(2, 1), &[10.0, 20.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 3), DType::F32);

        add(&a.view(), &col.view(), &mut c).unwrap();

        assert_eq!(c.as_f32_slice(), &[11.0, 11.0, 11.0, 22.0, 22.0, 22.0]);
    }

    #[test]
    fn test_add_incompatible() {
        let a = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        let b = Tensor::zeros(Shape::vector(2), DType::F32);
        let mut c = Tensor::zeros(Shape::matrix(2, 3), DType::F32);

        let err = add(&a.view(), &b.view(), &mut c).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { op: "add", .. }));
    }

    #[test]
    fn test_scale() {
        let a = Tensor::from_f32(Shape::vector(3), &[1.0, -2.0, 4.0]).unwrap();
        let mut c = Tensor::zeros(Shape::vector(3), DType::F32);

        scale(&a.view(), 0.5, &mut c).unwrap();

        assert_eq!(c.as_f32_slice(), &[0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_increment_wraps() {
        let dims = [2, 2];
        let mut idx = vec![0, 1];
        increment(&mut idx, &dims);
        assert_eq!(idx, vec![1, 0]);
        increment(&mut idx, &dims);
        assert_eq!(idx, vec![1, 1]);
    }
}
